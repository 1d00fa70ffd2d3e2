//! In-memory PDF builder for extraction tests

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

pub enum AcroFormMode {
    WithFields,
    Empty,
    Missing,
}

pub struct FieldSpec<'a> {
    pub name: Option<&'a str>,
    pub ft: &'a str,
    pub flags: i64,
    pub page: Option<usize>,
    pub rect: Option<[i64; 4]>,
    pub options: Option<Vec<&'a str>>,
    pub radio_widgets: Vec<(&'a str, [i64; 4])>,
}

impl<'a> FieldSpec<'a> {
    pub fn new(ft: &'a str, page: usize) -> Self {
        Self {
            name: None,
            ft,
            flags: 0,
            page: Some(page),
            rect: None,
            options: None,
            radio_widgets: Vec::new(),
        }
    }

    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn flags(mut self, flags: i64) -> Self {
        self.flags = flags;
        self
    }

    pub fn rect(mut self, rect: [i64; 4]) -> Self {
        self.rect = Some(rect);
        self
    }

    pub fn options(mut self, options: &[&'a str]) -> Self {
        self.options = Some(options.to_vec());
        self
    }

    pub fn radio_widget(mut self, state: &'a str, rect: [i64; 4]) -> Self {
        self.radio_widgets.push((state, rect));
        self
    }

    pub fn unplaced(mut self) -> Self {
        self.page = None;
        self
    }
}

pub struct TestPdf {
    pub doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    labels: Vec<Vec<(String, i64, i64)>>,
    annots: Vec<Vec<ObjectId>>,
    fields: Vec<ObjectId>,
    contents: Vec<Option<Stream>>,
    acroform: AcroFormMode,
    info: Option<Dictionary>,
}

pub fn text(s: &str) -> Object {
    Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
}

pub fn rect_object(rect: [i64; 4]) -> Object {
    Object::Array(rect.iter().map(|&v| Object::Integer(v)).collect())
}

impl TestPdf {
    pub fn new(pages: usize) -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let page_ids = (0..pages).map(|_| doc.new_object_id()).collect();
        Self {
            doc,
            pages_id,
            page_ids,
            labels: vec![Vec::new(); pages],
            annots: vec![Vec::new(); pages],
            fields: Vec::new(),
            contents: (0..pages).map(|_| None).collect(),
            acroform: AcroFormMode::WithFields,
            info: None,
        }
    }

    pub fn page_id(&self, page: usize) -> ObjectId {
        self.page_ids[page]
    }

    /// Draw `text` at (x, y) in 10pt Helvetica on the 0-based `page`
    pub fn label(mut self, page: usize, text: &str, x: i64, y: i64) -> Self {
        self.labels[page].push((text.to_string(), x, y));
        self
    }

    pub fn text_field(self, name: &str, page: usize, rect: [i64; 4]) -> Self {
        self.field(FieldSpec::new("Tx", page).name(name).rect(rect))
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        let mut dict = Dictionary::new();
        dict.set("FT", Object::Name(spec.ft.as_bytes().to_vec()));
        if let Some(name) = spec.name {
            dict.set("T", text(name));
        }
        if spec.flags != 0 {
            dict.set("Ff", Object::Integer(spec.flags));
        }
        if let Some(options) = &spec.options {
            dict.set(
                "Opt",
                Object::Array(options.iter().map(|o| text(o)).collect()),
            );
        }

        if spec.radio_widgets.is_empty() {
            dict.set("Type", Object::Name(b"Annot".to_vec()));
            dict.set("Subtype", Object::Name(b"Widget".to_vec()));
            if let Some(rect) = spec.rect {
                dict.set("Rect", rect_object(rect));
            }
            if let Some(page) = spec.page {
                dict.set("P", Object::Reference(self.page_ids[page]));
            }
            let id = self.doc.add_object(dict);
            if let Some(page) = spec.page {
                self.annots[page].push(id);
            }
            self.fields.push(id);
            return self;
        }

        let parent_id = self.doc.new_object_id();
        let mut kids = Vec::new();
        for (state, rect) in &spec.radio_widgets {
            let normal = Dictionary::from_iter(vec![(*state, Object::Null), ("Off", Object::Null)]);
            let appearance = Dictionary::from_iter(vec![("N", Object::Dictionary(normal))]);
            let mut widget = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Annot".to_vec())),
                ("Subtype", Object::Name(b"Widget".to_vec())),
                ("Rect", rect_object(*rect)),
                ("Parent", Object::Reference(parent_id)),
                ("AP", Object::Dictionary(appearance)),
            ]);
            if let Some(page) = spec.page {
                widget.set("P", Object::Reference(self.page_ids[page]));
            }
            let kid_id = self.doc.add_object(widget);
            if let Some(page) = spec.page {
                self.annots[page].push(kid_id);
            }
            kids.push(Object::Reference(kid_id));
        }
        dict.set("Kids", Object::Array(kids));
        self.doc.objects.insert(parent_id, Object::Dictionary(dict));
        self.fields.push(parent_id);
        self
    }

    /// Register a top-level field object built by the caller
    pub fn raw_field(mut self, id: ObjectId) -> Self {
        self.fields.push(id);
        self
    }

    /// List an annotation on a page without declaring it as a field
    pub fn annotate(mut self, page: usize, id: ObjectId) -> Self {
        self.annots[page].push(id);
        self
    }

    /// Use `stream` as the page content instead of the drawn labels
    pub fn content_stream(mut self, page: usize, stream: Stream) -> Self {
        self.contents[page] = Some(stream);
        self
    }

    pub fn acroform(mut self, mode: AcroFormMode) -> Self {
        self.acroform = mode;
        self
    }

    pub fn info(mut self, info: Dictionary) -> Self {
        self.info = Some(info);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let font_id = self.doc.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        for (idx, page_id) in self.page_ids.clone().into_iter().enumerate() {
            let mut operations = Vec::new();
            for (label, x, y) in &self.labels[idx] {
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new(
                    "Tf",
                    vec![Object::Name(b"F1".to_vec()), Object::Integer(10)],
                ));
                operations.push(Operation::new(
                    "Td",
                    vec![Object::Integer(*x), Object::Integer(*y)],
                ));
                operations.push(Operation::new("Tj", vec![text(label)]));
                operations.push(Operation::new("ET", vec![]));
            }
            let stream = self.contents[idx].take().unwrap_or_else(|| {
                let content = Content { operations };
                Stream::new(Dictionary::new(), content.encode().unwrap())
            });
            let content_id = self.doc.add_object(stream);

            let resources = Dictionary::from_iter(vec![(
                "Font",
                Object::Dictionary(Dictionary::from_iter(vec![(
                    "F1",
                    Object::Reference(font_id),
                )])),
            )]);
            let page = Dictionary::from_iter(vec![
                ("Type", Object::Name(b"Page".to_vec())),
                ("Parent", Object::Reference(self.pages_id)),
                ("MediaBox", rect_object([0, 0, 612, 792])),
                ("Contents", Object::Reference(content_id)),
                ("Resources", Object::Dictionary(resources)),
                (
                    "Annots",
                    Object::Array(
                        self.annots[idx]
                            .iter()
                            .map(|id| Object::Reference(*id))
                            .collect(),
                    ),
                ),
            ]);
            self.doc.objects.insert(page_id, Object::Dictionary(page));
        }

        let pages = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(self.page_ids.len() as i64)),
            (
                "Kids",
                Object::Array(
                    self.page_ids
                        .iter()
                        .map(|id| Object::Reference(*id))
                        .collect(),
                ),
            ),
        ]);
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(self.pages_id)),
        ]);
        match self.acroform {
            AcroFormMode::WithFields => {
                let fields = self.fields.iter().map(|id| Object::Reference(*id)).collect();
                let acroform = Dictionary::from_iter(vec![("Fields", Object::Array(fields))]);
                catalog.set("AcroForm", Object::Dictionary(acroform));
            }
            AcroFormMode::Empty => {
                let acroform = Dictionary::from_iter(vec![("Fields", Object::Array(vec![]))]);
                catalog.set("AcroForm", Object::Dictionary(acroform));
            }
            AcroFormMode::Missing => {}
        }
        let catalog_id = self.doc.add_object(catalog);
        self.doc.trailer.set("Root", Object::Reference(catalog_id));

        if let Some(info) = self.info.take() {
            let info_id = self.doc.add_object(info);
            self.doc.trailer.set("Info", Object::Reference(info_id));
        }

        let mut buffer = Vec::new();
        self.doc.save_to(&mut buffer).unwrap();
        buffer
    }
}
