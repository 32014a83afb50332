//! ページのテキストレイヤー
//!
//! コンテンツストリームを解釈し、テキスト表示オペレーターごとに
//! 1つの `TextItem`（ユーザー空間の配置と送り幅）を作る。
//! Form XObject の中身は辿らない。

use super::{decode_text_bytes, number_of, numbers, resolve};
use crate::error::Result;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::{BTreeMap, HashMap};
use vibewriting_common::{Matrix, TextItem};

/// Glyph advance (1/1000 em) when a simple font has no usable `/Widths`.
const DEFAULT_GLYPH_WIDTH: f64 = 500.0;
/// `/DW` default for CID fonts.
const DEFAULT_CID_WIDTH: f64 = 1000.0;

pub fn read_text_items(doc: &Document, page_id: ObjectId) -> Result<Vec<TextItem>> {
    let fonts = doc.get_page_fonts(page_id).unwrap_or_default();
    let metrics: HashMap<Vec<u8>, FontMetrics> = fonts
        .iter()
        .map(|(name, dict)| (name.clone(), FontMetrics::from_dict(doc, dict)))
        .collect();

    let data = doc.get_page_content(page_id)?;
    let content = Content::decode(&data)?;

    let mut layer = TextLayer::new(doc, &fonts, &metrics);
    for op in &content.operations {
        layer.apply(op.operator.as_str(), &op.operands);
    }
    tracing::debug!(items = layer.items.len(), "decoded text layer");
    Ok(layer.items)
}

#[derive(Debug, Clone, PartialEq)]
struct CidWidthRange {
    start: u32,
    end: u32,
    width: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct FontMetrics {
    /// Type0 fonts use 2-byte codes.
    two_byte: bool,
    first_char: i64,
    widths: Vec<f64>,
    missing_width: f64,
    cid_widths: Vec<CidWidthRange>,
    cid_default_width: f64,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            two_byte: false,
            first_char: 0,
            widths: Vec::new(),
            missing_width: DEFAULT_GLYPH_WIDTH,
            cid_widths: Vec::new(),
            cid_default_width: DEFAULT_CID_WIDTH,
        }
    }
}

impl FontMetrics {
    fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let is_type0 = entry(doc, font, b"Subtype")
            .and_then(|o| o.as_name().ok())
            .map(|n| n == b"Type0")
            .unwrap_or(false);

        if is_type0 {
            let descendant = entry(doc, font, b"DescendantFonts")
                .and_then(|o| o.as_array().ok())
                .and_then(|a| a.first())
                .and_then(|o| resolve(doc, o).as_dict().ok());
            let cid_default_width = descendant
                .and_then(|d| entry(doc, d, b"DW"))
                .and_then(number_of)
                .unwrap_or(DEFAULT_CID_WIDTH);
            let cid_widths = descendant
                .and_then(|d| entry(doc, d, b"W"))
                .and_then(|o| o.as_array().ok())
                .map(|w| parse_cid_widths(doc, w))
                .unwrap_or_default();
            return Self {
                two_byte: true,
                cid_widths,
                cid_default_width,
                ..Self::default()
            };
        }

        let missing_width = entry(doc, font, b"FontDescriptor")
            .and_then(|o| o.as_dict().ok())
            .and_then(|d| entry(doc, d, b"MissingWidth"))
            .and_then(number_of)
            .filter(|w| *w > 0.0)
            .unwrap_or(DEFAULT_GLYPH_WIDTH);

        Self {
            first_char: entry(doc, font, b"FirstChar").and_then(number_of).unwrap_or(0.0) as i64,
            widths: entry(doc, font, b"Widths")
                .and_then(|o| numbers(doc, o))
                .unwrap_or_default(),
            missing_width,
            ..Self::default()
        }
    }

    fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| c.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32))
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    /// Advance of one glyph in 1/1000 em.
    fn width(&self, code: u32) -> f64 {
        if self.two_byte {
            return self
                .cid_widths
                .iter()
                .find(|r| code >= r.start && code <= r.end)
                .map(|r| r.width)
                .unwrap_or(self.cid_default_width);
        }
        let index = code as i64 - self.first_char;
        if index >= 0 {
            if let Some(w) = self.widths.get(index as usize).filter(|w| w.is_finite()) {
                return *w;
            }
        }
        self.missing_width
    }
}

fn entry<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    dict.get(key).ok().map(|o| resolve(doc, o))
}

/// `/W` array: `c [w1 w2 ...]` or `c_first c_last w`.
fn parse_cid_widths(doc: &Document, array: &[Object]) -> Vec<CidWidthRange> {
    let mut ranges = Vec::new();
    let mut i = 0;
    while i < array.len() {
        let Some(start) = number_of(resolve(doc, &array[i])) else {
            break;
        };
        let start = start as u32;
        match array.get(i + 1).map(|o| resolve(doc, o)) {
            Some(Object::Array(ws)) => {
                for (k, w) in ws.iter().enumerate() {
                    if let Some(width) = number_of(resolve(doc, w)) {
                        let code = start + k as u32;
                        ranges.push(CidWidthRange { start: code, end: code, width });
                    }
                }
                i += 2;
            }
            Some(last) => {
                let end = number_of(last);
                let width = array.get(i + 2).and_then(|o| number_of(resolve(doc, o)));
                match (end, width) {
                    (Some(end), Some(width)) => ranges.push(CidWidthRange {
                        start,
                        end: end as u32,
                        width,
                    }),
                    _ => break,
                }
                i += 3;
            }
            None => break,
        }
    }
    ranges
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    font_size: f64,
    char_spacing: f64,
    word_spacing: f64,
    /// `Tz / 100`
    horiz_scaling: f64,
    leading: f64,
    rise: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horiz_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct TextLayer<'a> {
    doc: &'a Document,
    fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
    metrics: &'a HashMap<Vec<u8>, FontMetrics>,
    fallback: FontMetrics,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    text_matrix: Matrix,
    line_matrix: Matrix,
    items: Vec<TextItem>,
}

impl<'a> TextLayer<'a> {
    fn new(
        doc: &'a Document,
        fonts: &'a BTreeMap<Vec<u8>, &'a Dictionary>,
        metrics: &'a HashMap<Vec<u8>, FontMetrics>,
    ) -> Self {
        Self {
            doc,
            fonts,
            metrics,
            fallback: FontMetrics::default(),
            state: GraphicsState::default(),
            stack: Vec::new(),
            text_matrix: Matrix::IDENTITY,
            line_matrix: Matrix::IDENTITY,
            items: Vec::new(),
        }
    }

    fn apply(&mut self, operator: &str, operands: &[Object]) {
        let num = |i: usize| operands.get(i).and_then(number_of);

        match operator {
            "q" => self.stack.push(self.state.clone()),
            "Q" => {
                if let Some(saved) = self.stack.pop() {
                    self.state = saved;
                }
            }
            "cm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.state.ctm = m.multiply(&self.state.ctm);
                }
            }
            "BT" => {
                self.text_matrix = Matrix::IDENTITY;
                self.line_matrix = Matrix::IDENTITY;
            }
            "Tf" => {
                if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
                    self.state.text.font = name.to_vec();
                }
                if let Some(size) = num(1) {
                    self.state.text.font_size = size;
                }
            }
            "Tc" => self.state.text.char_spacing = num(0).unwrap_or(0.0),
            "Tw" => self.state.text.word_spacing = num(0).unwrap_or(0.0),
            "Tz" => self.state.text.horiz_scaling = num(0).unwrap_or(100.0) / 100.0,
            "TL" => self.state.text.leading = num(0).unwrap_or(0.0),
            "Ts" => self.state.text.rise = num(0).unwrap_or(0.0),
            "Td" => self.move_line(num(0).unwrap_or(0.0), num(1).unwrap_or(0.0)),
            "TD" => {
                let ty = num(1).unwrap_or(0.0);
                self.state.text.leading = -ty;
                self.move_line(num(0).unwrap_or(0.0), ty);
            }
            "Tm" => {
                if let Some(m) = matrix_operand(operands) {
                    self.text_matrix = m;
                    self.line_matrix = m;
                }
            }
            "T*" => self.next_line(),
            "Tj" => {
                if let Some(op) = operands.first() {
                    self.show(std::slice::from_ref(op));
                }
            }
            "TJ" => {
                if let Some(Ok(array)) = operands.first().map(Object::as_array) {
                    self.show(array);
                }
            }
            "'" => {
                self.next_line();
                if let Some(op) = operands.first() {
                    self.show(std::slice::from_ref(op));
                }
            }
            "\"" => {
                self.state.text.word_spacing = num(0).unwrap_or(0.0);
                self.state.text.char_spacing = num(1).unwrap_or(0.0);
                self.next_line();
                if let Some(op) = operands.get(2) {
                    self.show(std::slice::from_ref(op));
                }
            }
            _ => {}
        }
    }

    fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translate(tx, ty).multiply(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    fn next_line(&mut self) {
        let leading = self.state.text.leading;
        self.move_line(0.0, -leading);
    }

    /// Shows strings (and `TJ` adjustments) as one item starting at the
    /// current text position, then advances the text matrix.
    fn show(&mut self, parts: &[Object]) {
        let ts = &self.state.text;
        let font = self.metrics.get(&ts.font).unwrap_or(&self.fallback);

        let mut text = String::new();
        let mut advance = 0.0;
        for part in parts {
            match part {
                Object::String(bytes, _) => {
                    text.push_str(&self.decode(bytes));
                    for code in font.codes(bytes) {
                        let is_space = !font.two_byte && code == 32;
                        let mut w = font.width(code) / 1000.0 * ts.font_size + ts.char_spacing;
                        if is_space {
                            w += ts.word_spacing;
                        }
                        advance += w * ts.horiz_scaling;
                    }
                }
                other => {
                    if let Some(adjust) = number_of(other) {
                        advance -= adjust / 1000.0 * ts.font_size * ts.horiz_scaling;
                    }
                }
            }
        }

        let font_matrix = Matrix::new(ts.font_size * ts.horiz_scaling, 0.0, 0.0, ts.font_size, 0.0, ts.rise);
        let placement = self.text_matrix.multiply(&self.state.ctm);
        if !text.is_empty() {
            self.items.push(TextItem {
                str: text,
                transform: font_matrix.multiply(&placement),
                width: advance * placement.horizontal_scale(),
            });
        }
        self.text_matrix = Matrix::translate(advance, 0.0).multiply(&self.text_matrix);
    }

    fn decode(&self, bytes: &[u8]) -> String {
        if let Some(font) = self.fonts.get(&self.state.text.font) {
            if let Ok(encoding) = font.get_font_encoding(self.doc) {
                if let Ok(text) = Document::decode_text(&encoding, bytes) {
                    return text;
                }
            }
        }
        decode_text_bytes(bytes)
    }
}

fn matrix_operand(operands: &[Object]) -> Option<Matrix> {
    if operands.len() < 6 {
        return None;
    }
    let mut m = [0.0; 6];
    for (slot, operand) in m.iter_mut().zip(operands) {
        *slot = number_of(operand)?;
    }
    Some(Matrix(m))
}
