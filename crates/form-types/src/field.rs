//! Form field records and their geometry

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle in PDF user space (origin bottom-left, y up).
///
/// Always satisfies `x0 < x1` and `y0 < y1` when built through [`BoundingBox::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BoundingBox {
    /// Build a box from two opposite corners in any order.
    ///
    /// Returns `None` for non-finite coordinates or a zero-area rectangle.
    pub fn new(ax: f64, ay: f64, bx: f64, by: f64) -> Option<Self> {
        if ![ax, ay, bx, by].iter().all(|v| v.is_finite()) {
            return None;
        }
        let (x0, x1) = if ax <= bx { (ax, bx) } else { (bx, ax) };
        let (y0, y1) = if ay <= by { (ay, by) } else { (by, ay) };
        if x0 == x1 || y0 == y1 {
            return None;
        }
        Some(Self { x0, y0, x1, y1 })
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center_y(&self) -> f64 {
        (self.y0 + self.y1) / 2.0
    }

    /// Smallest box containing both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// True when the vertical extents intersect (same horizontal band)
    pub fn overlaps_vertically(&self, other: &BoundingBox) -> bool {
        self.y0 < other.y1 && other.y0 < self.y1
    }

    /// True when the horizontal extents intersect
    pub fn overlaps_horizontally(&self, other: &BoundingBox) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1
    }

    /// Euclidean gap between the two rectangles; zero when they touch or overlap.
    pub fn distance_to(&self, other: &BoundingBox) -> f64 {
        let dx = (other.x0 - self.x1).max(self.x0 - other.x1).max(0.0);
        let dy = (other.y0 - self.y1).max(self.y0 - other.y1).max(0.0);
        dx.hypot(dy)
    }

    /// Largest absolute per-coordinate delta against another box
    pub fn max_coordinate_delta(&self, other: &BoundingBox) -> f64 {
        (self.x0 - other.x0)
            .abs()
            .max((self.y0 - other.y0).abs())
            .max((self.x1 - other.x1).abs())
            .max((self.y1 - other.y1).abs())
    }
}

/// Closed set of normalized form field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Checkbox,
    #[serde(rename = "radiobutton")]
    RadioButton,
    /// Combo box or list box
    Select,
    Textarea,
    Button,
    Signature,
}

impl FieldType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Checkbox => "checkbox",
            FieldType::RadioButton => "radiobutton",
            FieldType::Select => "select",
            FieldType::Textarea => "textarea",
            FieldType::Button => "button",
            FieldType::Signature => "signature",
        }
    }

    /// Whether records of this type carry `value_options`
    pub fn has_options(&self) -> bool {
        matches!(self, FieldType::Select | FieldType::RadioButton)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One form field on one page of one version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub field_id: String,
    pub field_type: FieldType,
    pub raw_type: String,
    /// 1-indexed
    pub page_number: u32,
    /// 0-indexed reading order on the page
    pub order_within_page: u32,
    pub near_text: Option<String>,
    pub value_options: Option<Vec<String>>,
    pub position: Option<BoundingBox>,
}

impl FieldRecord {
    /// Identifier used for fields that declare no name
    pub fn synthesized_id(page_number: u32, order_within_page: u32) -> String {
        format!("page{}_field{}", page_number, order_within_page)
    }
}
