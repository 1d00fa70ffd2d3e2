//! lopdf wrapper with the lookups the extractor needs

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use form_types::{BoundingBox, DocumentMetadata};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};

use crate::error::ExtractError;

/// Reference chains longer than this are treated as broken
const MAX_REFERENCE_DEPTH: usize = 32;

/// US Letter, used when no MediaBox can be found
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Parsed PDF plus the page and annotation indexes built once per document
pub struct FormDocument {
    pub(crate) doc: Document,
    pages: BTreeMap<u32, ObjectId>,
    page_by_id: HashMap<ObjectId, u32>,
    page_by_annotation: HashMap<ObjectId, u32>,
}

impl FormDocument {
    /// Load a PDF from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ExtractError> {
        let doc =
            Document::load_mem(bytes).map_err(|e| ExtractError::CorruptDocument(e.to_string()))?;
        Ok(Self::from_document(doc))
    }

    pub fn from_document(doc: Document) -> Self {
        let pages = doc.get_pages();
        let page_by_id = pages.iter().map(|(&num, &id)| (id, num)).collect();

        let mut page_by_annotation = HashMap::new();
        for (&num, &page_id) in pages.iter() {
            let Some(page) = doc.get_object(page_id).ok().and_then(|o| o.as_dict().ok()) else {
                continue;
            };
            let annots = page.get(b"Annots").ok().and_then(|o| resolve(&doc, o));
            if let Some(Object::Array(annots)) = annots {
                for annot in annots {
                    if let Object::Reference(id) = annot {
                        // First page wins if a widget is (wrongly) shared
                        page_by_annotation.entry(*id).or_insert(num);
                    }
                }
            }
        }

        Self {
            doc,
            pages,
            page_by_id,
            page_by_annotation,
        }
    }

    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    /// Page numbers (1-indexed) with their object ids, in page order
    pub fn pages(&self) -> impl Iterator<Item = (u32, ObjectId)> + '_ {
        self.pages.iter().map(|(&num, &id)| (num, id))
    }

    /// Page that lists `annotation` in its `/Annots`
    pub fn page_of_annotation(&self, annotation: ObjectId) -> Option<u32> {
        self.page_by_annotation.get(&annotation).copied()
    }

    /// Page number for a page object id (used for a widget's `/P`)
    pub fn page_number_of(&self, page_id: ObjectId) -> Option<u32> {
        self.page_by_id.get(&page_id).copied()
    }

    /// Follow references until a direct object is reached
    pub fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        resolve(&self.doc, obj)
    }

    /// Dictionary lookup with reference resolution
    pub fn dict_get<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
        dict.get(key).ok().and_then(|o| self.resolve(o))
    }

    pub fn dict_get_dict<'a>(&'a self, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Dictionary> {
        match self.dict_get(dict, key)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        match self.doc.get_object(id).ok()? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Document catalog (`/Root`)
    pub fn catalog(&self) -> Result<&Dictionary, ExtractError> {
        match self.doc.trailer.get(b"Root").ok().and_then(|o| self.resolve(o)) {
            Some(Object::Dictionary(d)) => Ok(d),
            _ => Err(ExtractError::CorruptDocument(
                "trailer has no /Root catalog".to_string(),
            )),
        }
    }

    /// Decoded content stream bytes of a page (all streams concatenated)
    ///
    /// Fails when a stream is missing or its filters cannot be decoded.
    pub fn page_content(&self, page_id: ObjectId) -> Result<Vec<u8>, lopdf::Error> {
        let mut content = Vec::new();
        for id in self.doc.get_page_contents(page_id) {
            let stream = self.doc.get_object(id).and_then(Object::as_stream)?;
            if stream.dict.has(b"Filter") {
                content.extend(stream.decompressed_content()?);
            } else {
                content.extend_from_slice(&stream.content);
            }
            content.push(b'\n');
        }
        Ok(content)
    }

    /// Page MediaBox, inherited through `/Parent` when absent on the page
    pub fn media_box(&self, page_id: ObjectId) -> BoundingBox {
        let mut current = Some(page_id);
        let mut depth = 0;
        while let Some(id) = current {
            if depth > MAX_REFERENCE_DEPTH {
                break;
            }
            depth += 1;
            let Some(dict) = self.dictionary(id) else {
                break;
            };
            if let Some(rect) = self.dict_get(dict, b"MediaBox").and_then(|o| self.rect(o)) {
                return rect;
            }
            current = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok());
        }
        let [x0, y0, x1, y1] = DEFAULT_MEDIA_BOX;
        BoundingBox { x0, y0, x1, y1 }
    }

    /// Parse a 4-number rectangle array into a normalized box
    pub fn rect(&self, obj: &Object) -> Option<BoundingBox> {
        let arr = match self.resolve(obj)? {
            Object::Array(a) => a,
            _ => return None,
        };
        if arr.len() != 4 {
            return None;
        }
        let mut values = [0.0f64; 4];
        for (slot, item) in values.iter_mut().zip(arr) {
            *slot = self.resolve(item).and_then(object_to_f64)?;
        }
        BoundingBox::new(values[0], values[1], values[2], values[3])
    }

    /// Text string value (`/T`, `/Title`, `/Opt` entries, ...)
    pub fn text(&self, obj: &Object) -> Option<String> {
        match self.resolve(obj)? {
            Object::String(bytes, _) => Some(decode_text(bytes)),
            Object::Name(name) => Some(decode_text(name)),
            _ => None,
        }
    }

    /// Contents of the trailer `/Info` dictionary
    pub fn metadata(&self) -> DocumentMetadata {
        let mut metadata = DocumentMetadata {
            pdf_version: Some(self.doc.version.clone()).filter(|v| !v.is_empty()),
            ..Default::default()
        };

        let info = match self.doc.trailer.get(b"Info").ok().and_then(|o| self.resolve(o)) {
            Some(Object::Dictionary(d)) => d,
            _ => return metadata,
        };

        let field = |key: &[u8]| {
            self.dict_get(info, key)
                .and_then(|o| self.text(o))
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        metadata.title = field(b"Title");
        metadata.author = field(b"Author");
        metadata.subject = field(b"Subject");
        metadata.creator = field(b"Creator");
        metadata.producer = field(b"Producer");
        metadata.creation_date = field(b"CreationDate").and_then(|s| parse_pdf_date(&s));
        metadata.modification_date = field(b"ModDate").and_then(|s| parse_pdf_date(&s));
        metadata
    }
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => current = doc.get_object(*id).ok()?,
            other => return Some(other),
        }
    }
    None
}

/// Convert a lopdf numeric object (Integer or Real) to f64
pub(crate) fn object_to_f64(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Decode a PDF string: UTF-16BE with BOM, then UTF-8, then Latin-1
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }
    bytes.iter().map(|&b| b as char).collect()
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`) into UTC.
///
/// Only the year is mandatory; missing components default to the start of
/// the period and a missing offset means UTC.
pub fn parse_pdf_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() < 4 {
        return None;
    }
    let part = |start: usize, len: usize, default: u32| -> Option<u32> {
        match digits.get(start..start + len) {
            Some(p) => p.parse().ok(),
            None => Some(default),
        }
    };

    let year: i32 = digits[0..4].parse().ok()?;
    let naive = NaiveDate::from_ymd_opt(year, part(4, 2, 1)?, part(6, 2, 1)?)?.and_hms_opt(
        part(8, 2, 0)?,
        part(10, 2, 0)?,
        part(12, 2, 0)?,
    )?;

    let rest = &s[digits.len()..];
    let offset = match rest.chars().next() {
        Some(sign @ ('+' | '-')) => {
            let tz: String = rest[1..].chars().filter(|c| c.is_ascii_digit()).collect();
            let hours: i32 = tz.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i32 = tz.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let seconds = hours * 3600 + minutes * 60;
            FixedOffset::east_opt(if sign == '-' { -seconds } else { seconds })?
        }
        _ => FixedOffset::east_opt(0)?,
    };

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}
