//! Positioned text runs from page content streams
//!
//! Interprets the graphics and text state operators of a content stream
//! closely enough to place every shown string on the page. Glyph widths are
//! estimated from the font size since font programs are not loaded.

use form_types::BoundingBox;
use lopdf::content::{Content, Operation};
use lopdf::Object;

use crate::document::{decode_text, object_to_f64};

/// Average glyph advance as a fraction of the font size
const AVG_GLYPH_WIDTH: f64 = 0.5;

/// TJ adjustments below this (thousandths of an em) read as a word gap
const WORD_GAP_ADJUSTMENT: f64 = -100.0;

/// A string drawn on the page and its estimated extent
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub bbox: BoundingBox,
}

/// Affine transform `[a b c d e f]` using the PDF row-vector convention
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix {
    a: f64,
    b: f64,
    c: f64,
    d: f64,
    e: f64,
    f: f64,
}

impl Matrix {
    const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    fn translate(tx: f64, ty: f64) -> Matrix {
        Matrix {
            e: tx,
            f: ty,
            ..Matrix::IDENTITY
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Matrix> {
        let values: Vec<f64> = operands.iter().filter_map(object_to_f64).collect();
        match values[..] {
            [a, b, c, d, e, f] => Some(Matrix { a, b, c, d, e, f }),
            _ => None,
        }
    }

    /// `self × other`
    fn then(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn origin(&self) -> (f64, f64) {
        (self.e, self.f)
    }
}

struct TextState {
    ctm: Matrix,
    ctm_stack: Vec<Matrix>,
    tm: Matrix,
    tlm: Matrix,
    font_size: f64,
    leading: f64,
    horizontal_scale: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            ctm_stack: Vec::new(),
            tm: Matrix::IDENTITY,
            tlm: Matrix::IDENTITY,
            font_size: 0.0,
            leading: 0.0,
            horizontal_scale: 1.0,
            rise: 0.0,
        }
    }
}

impl TextState {
    fn move_line(&mut self, tx: f64, ty: f64) {
        self.tlm = Matrix::translate(tx, ty).then(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        self.move_line(0.0, -self.leading);
    }

    /// Place `text` at the current text position and advance past it
    fn show(&mut self, text: &str, runs: &mut Vec<TextRun>) {
        let glyphs = text.chars().count() as f64;
        let advance = glyphs * AVG_GLYPH_WIDTH * self.font_size * self.horizontal_scale;

        let text_space = Matrix {
            a: self.font_size * self.horizontal_scale,
            b: 0.0,
            c: 0.0,
            d: self.font_size,
            e: 0.0,
            f: self.rise,
        };
        let trm = text_space.then(&self.tm).then(&self.ctm);
        let (x, y) = trm.origin();
        let scale_x = trm.a.hypot(trm.b);
        let height = trm.c.hypot(trm.d);
        let width = glyphs * AVG_GLYPH_WIDTH * scale_x;

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            if let Some(bbox) = BoundingBox::new(x, y, x + width, y + height) {
                runs.push(TextRun {
                    text: trimmed.to_string(),
                    bbox,
                });
            }
        }

        self.tm = Matrix::translate(advance, 0.0).then(&self.tm);
    }
}

/// Decode a content stream and return its text runs in drawing order
pub fn text_runs(content: &[u8]) -> Result<Vec<TextRun>, lopdf::Error> {
    let content = Content::decode(content)?;
    Ok(interpret(&content.operations))
}

fn interpret(operations: &[Operation]) -> Vec<TextRun> {
    let mut state = TextState::default();
    let mut runs = Vec::new();

    for op in operations {
        let num = |idx: usize| op.operands.get(idx).and_then(object_to_f64);
        match op.operator.as_str() {
            "q" => state.ctm_stack.push(state.ctm),
            "Q" => {
                if let Some(ctm) = state.ctm_stack.pop() {
                    state.ctm = ctm;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    state.ctm = m.then(&state.ctm);
                }
            }
            "BT" => {
                state.tm = Matrix::IDENTITY;
                state.tlm = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(size) = num(1) {
                    state.font_size = size;
                }
            }
            "TL" => {
                if let Some(leading) = num(0) {
                    state.leading = leading;
                }
            }
            "Tz" => {
                if let Some(scale) = num(0) {
                    state.horizontal_scale = scale / 100.0;
                }
            }
            "Ts" => {
                if let Some(rise) = num(0) {
                    state.rise = rise;
                }
            }
            "Td" | "TD" => {
                if let (Some(tx), Some(ty)) = (num(0), num(1)) {
                    if op.operator == "TD" {
                        state.leading = -ty;
                    }
                    state.move_line(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    state.tm = m;
                    state.tlm = m;
                }
            }
            "T*" => state.next_line(),
            "Tj" | "TJ" => {
                if let Some(text) = op.operands.first().and_then(operand_text) {
                    state.show(&text, &mut runs);
                }
            }
            "'" => {
                state.next_line();
                if let Some(text) = op.operands.first().and_then(operand_text) {
                    state.show(&text, &mut runs);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(text) = op.operands.get(2).and_then(operand_text) {
                    state.show(&text, &mut runs);
                }
            }
            _ => {}
        }
    }

    runs
}

/// Text of a `Tj` string or `TJ` array operand
fn operand_text(operand: &Object) -> Option<String> {
    match operand {
        Object::String(bytes, _) => Some(decode_text(bytes)),
        Object::Array(items) => {
            let mut text = String::new();
            for item in items {
                match item {
                    Object::String(bytes, _) => text.push_str(&decode_text(bytes)),
                    other => {
                        if object_to_f64(other).is_some_and(|n| n < WORD_GAP_ADJUSTMENT) {
                            text.push(' ');
                        }
                    }
                }
            }
            Some(text)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::StringFormat;

    fn literal(s: &str) -> Object {
        Object::String(s.as_bytes().to_vec(), StringFormat::Literal)
    }

    fn ints(values: &[i64]) -> Vec<Object> {
        values.iter().map(|&v| Object::Integer(v)).collect()
    }

    fn font(size: i64) -> Operation {
        Operation::new("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(size)])
    }

    #[test]
    fn test_td_positions_run() {
        let ops = vec![
            Operation::new("BT", vec![]),
            font(10),
            Operation::new("Td", ints(&[50, 700])),
            Operation::new("Tj", vec![literal("Name:")]),
            Operation::new("ET", vec![]),
        ];
        let runs = interpret(&ops);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Name:");
        assert_eq!(runs[0].bbox.x0, 50.0);
        assert_eq!(runs[0].bbox.y0, 700.0);
        assert_eq!(runs[0].bbox.x1, 75.0);
        assert_eq!(runs[0].bbox.y1, 710.0);
    }

    #[test]
    fn test_consecutive_tj_advances() {
        let ops = vec![
            Operation::new("BT", vec![]),
            font(10),
            Operation::new("Td", ints(&[0, 0])),
            Operation::new("Tj", vec![literal("ab")]),
            Operation::new("Tj", vec![literal("cd")]),
            Operation::new("ET", vec![]),
        ];
        let runs = interpret(&ops);
        assert_eq!(runs[1].bbox.x0, 10.0);
    }

    #[test]
    fn test_cm_and_tm_compose() {
        let ops = vec![
            Operation::new("q", vec![]),
            Operation::new("cm", ints(&[1, 0, 0, 1, 100, 100])),
            Operation::new("BT", vec![]),
            font(12),
            Operation::new("Tm", ints(&[1, 0, 0, 1, 20, 30])),
            Operation::new("Tj", vec![literal("X")]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
            Operation::new("BT", vec![]),
            font(12),
            Operation::new("Tj", vec![literal("Y")]),
            Operation::new("ET", vec![]),
        ];
        let runs = interpret(&ops);
        assert_eq!((runs[0].bbox.x0, runs[0].bbox.y0), (120.0, 130.0));
        // Q restored the identity CTM
        assert_eq!((runs[1].bbox.x0, runs[1].bbox.y0), (0.0, 0.0));
    }

    #[test]
    fn test_next_line_uses_leading() {
        let ops = vec![
            Operation::new("BT", vec![]),
            font(10),
            Operation::new("TD", ints(&[40, -14])),
            Operation::new("Tj", vec![literal("first")]),
            Operation::new("T*", vec![]),
            Operation::new("Tj", vec![literal("second")]),
            Operation::new("ET", vec![]),
        ];
        let runs = interpret(&ops);
        assert_eq!(runs[0].bbox.y0, -14.0);
        assert_eq!(runs[1].bbox.y0, -28.0);
        assert_eq!(runs[1].bbox.x0, 40.0);
    }

    #[test]
    fn test_tj_array_with_word_gap() {
        let operand = Object::Array(vec![
            literal("Date"),
            Object::Integer(-250),
            literal("of"),
            Object::Integer(-20),
            literal("Birth"),
        ]);
        assert_eq!(operand_text(&operand).as_deref(), Some("Date ofBirth"));
    }

    #[test]
    fn test_blank_runs_skipped() {
        let ops = vec![
            Operation::new("BT", vec![]),
            font(10),
            Operation::new("Tj", vec![literal("   ")]),
            Operation::new("ET", vec![]),
        ];
        assert!(interpret(&ops).is_empty());
    }

    #[test]
    fn test_text_runs_decodes_stream() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                font(12),
                Operation::new("Td", ints(&[72, 720])),
                Operation::new("Tj", vec![literal("Applicant")]),
                Operation::new("ET", vec![]),
            ],
        };
        let runs = text_runs(&content.encode().unwrap()).unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].text, "Applicant");
    }
}
