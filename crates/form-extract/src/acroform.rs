//! AcroForm field tree walk
//!
//! Flattens `/AcroForm /Fields` into terminal fields with their inherited
//! attributes and widget annotations, in declaration order.

use form_types::BoundingBox;
use lopdf::{Dictionary, Object, ObjectId};
use std::collections::HashSet;

use crate::classify::{FieldFlags, NativeKind};
use crate::document::FormDocument;

/// Field trees deeper than this are truncated
const MAX_TREE_DEPTH: usize = 64;

/// A terminal field as declared in the document
#[derive(Debug, Clone)]
pub struct RawField {
    /// Fully-qualified name; `None` when no ancestor declares a non-empty `/T`
    pub name: Option<String>,
    /// `/FT` as written, empty if absent
    pub raw_type: String,
    pub kind: Option<NativeKind>,
    pub flags: FieldFlags,
    /// Export values from `/Opt`, if declared
    pub options: Option<Vec<String>>,
    pub widgets: Vec<Widget>,
}

/// One widget annotation of a field
#[derive(Debug, Clone)]
pub struct Widget {
    pub rect: Option<BoundingBox>,
    pub page: Option<u32>,
    /// Appearance states other than `Off`, in declaration order
    pub on_states: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct Inherited {
    field_type: Option<Vec<u8>>,
    flags: Option<u32>,
    options: Option<Vec<String>>,
}

/// Collect the terminal fields of the document's interactive form.
///
/// Returns an empty list when there is no AcroForm or it has no fields.
pub fn collect_fields(pdf: &FormDocument) -> Result<Vec<RawField>, crate::ExtractError> {
    let catalog = pdf.catalog()?;
    let Some(acroform) = pdf.dict_get_dict(catalog, b"AcroForm") else {
        return Ok(Vec::new());
    };
    let roots = match pdf.dict_get(acroform, b"Fields") {
        Some(Object::Array(items)) => items,
        _ => return Ok(Vec::new()),
    };

    let mut walker = Walker {
        pdf,
        visited: HashSet::new(),
        out: Vec::new(),
    };
    for root in roots {
        walker.visit(root, None, &Inherited::default(), 0);
    }
    Ok(walker.out)
}

struct Walker<'a> {
    pdf: &'a FormDocument,
    visited: HashSet<ObjectId>,
    out: Vec<RawField>,
}

impl<'a> Walker<'a> {
    fn node(&mut self, obj: &'a Object) -> Option<(Option<ObjectId>, &'a Dictionary)> {
        let pdf = self.pdf;
        match obj {
            Object::Reference(id) => {
                if !self.visited.insert(*id) {
                    tracing::debug!(?id, "Skipping field node already visited");
                    return None;
                }
                pdf.dictionary(*id).map(|d| (Some(*id), d))
            }
            Object::Dictionary(d) => Some((None, d)),
            _ => None,
        }
    }

    fn visit(&mut self, obj: &'a Object, parent: Option<&str>, inherited: &Inherited, depth: usize) {
        if depth > MAX_TREE_DEPTH {
            tracing::warn!("Field tree deeper than {} levels, truncating", MAX_TREE_DEPTH);
            return;
        }
        let Some((id, dict)) = self.node(obj) else {
            return;
        };
        let pdf = self.pdf;

        let partial = pdf
            .dict_get(dict, b"T")
            .and_then(|t| pdf.text(t))
            .filter(|t| !t.is_empty());
        let name = match (parent, partial) {
            (Some(p), Some(t)) => Some(format!("{}.{}", p, t)),
            (Some(p), None) => Some(p.to_string()),
            (None, t) => t,
        };

        let mut own = inherited.clone();
        if let Some(Object::Name(ft)) = pdf.dict_get(dict, b"FT") {
            own.field_type = Some(ft.clone());
        }
        if let Some(Object::Integer(ff)) = pdf.dict_get(dict, b"Ff") {
            own.flags = Some(*ff as u32);
        }
        if let Some(opt) = pdf.dict_get(dict, b"Opt") {
            own.options = Some(parse_options(pdf, opt));
        }

        let kids = match pdf.dict_get(dict, b"Kids") {
            Some(Object::Array(kids)) => kids.as_slice(),
            _ => &[],
        };

        let (child_fields, widget_kids): (Vec<&Object>, Vec<&Object>) = kids
            .iter()
            .partition(|kid| is_field_node(pdf, kid));

        if !child_fields.is_empty() {
            if !widget_kids.is_empty() {
                tracing::debug!(
                    ?id,
                    ignored = widget_kids.len(),
                    "Ignoring widget kids of a non-terminal field"
                );
            }
            for kid in child_fields {
                self.visit(kid, name.as_deref(), &own, depth + 1);
            }
            return;
        }

        let widgets = if widget_kids.is_empty() {
            // Merged field/widget dictionary
            vec![read_widget(pdf, id, dict)]
        } else {
            widget_kids
                .into_iter()
                .filter_map(|kid| {
                    let (kid_id, kid_dict) = self.node(kid)?;
                    Some(read_widget(pdf, kid_id, kid_dict))
                })
                .collect()
        };

        let raw_type = own
            .field_type
            .as_deref()
            .map(|ft| String::from_utf8_lossy(ft).into_owned())
            .unwrap_or_default();

        self.out.push(RawField {
            name,
            kind: own.field_type.as_deref().and_then(NativeKind::from_name),
            raw_type,
            flags: FieldFlags(own.flags.unwrap_or(0)),
            options: own.options,
            widgets,
        });
    }
}

/// A kid is a field (rather than a bare widget) when it carries `/T`
fn is_field_node(pdf: &FormDocument, kid: &Object) -> bool {
    let dict = match pdf.resolve(kid) {
        Some(Object::Dictionary(d)) => d,
        _ => return false,
    };
    dict.has(b"T")
}

fn read_widget(pdf: &FormDocument, id: Option<ObjectId>, dict: &Dictionary) -> Widget {
    let rect = pdf.dict_get(dict, b"Rect").and_then(|r| pdf.rect(r));

    let page = id.and_then(|id| pdf.page_of_annotation(id)).or_else(|| {
        dict.get(b"P")
            .ok()
            .and_then(|p| p.as_reference().ok())
            .and_then(|page_id| pdf.page_number_of(page_id))
    });

    let on_states = pdf
        .dict_get_dict(dict, b"AP")
        .and_then(|ap| pdf.dict_get_dict(ap, b"N"))
        .map(|normal| {
            normal
                .iter()
                .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
                .filter(|state| state != "Off")
                .collect()
        })
        .unwrap_or_default();

    Widget {
        rect,
        page,
        on_states,
    }
}

/// `/Opt` entries in declaration order; `[export display]` pairs contribute the export value
fn parse_options(pdf: &FormDocument, opt: &Object) -> Vec<String> {
    let Object::Array(entries) = opt else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match pdf.resolve(entry)? {
            Object::Array(pair) => pair.first().and_then(|export| pdf.text(export)),
            other => pdf.text(other),
        })
        .collect()
}
