//! PDF読み込み（lopdf）
//!
//! ページごとに注釈・テキストレイヤー・表示変換を取り出して
//! `PageContent` にする。ドキュメントは `read_pdf` の中だけで保持する。

mod annots;
mod text;

pub use annots::read_annotations;
pub use text::read_text_items;

use crate::error::Result;
use lopdf::{Document, Object, ObjectId};
use vibewriting_common::{PageContent, Viewport};

/// US Letter, used when a page has no usable box.
const DEFAULT_PAGE_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

/// Everything extracted from one document.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// `/Info /Title`, or empty.
    pub title: String,
    pub page_count: usize,
    /// Pages that could be read, in page order.
    pub pages: Vec<PageContent>,
}

pub fn read_pdf(data: &[u8]) -> Result<PdfContent> {
    let doc = Document::load_mem(data)?;
    let title = document_title(&doc);
    let page_ids = doc.get_pages();

    let mut pages = Vec::with_capacity(page_ids.len());
    for (&number, &page_id) in page_ids.iter() {
        match read_page(&doc, number, page_id) {
            Ok(page) => pages.push(page),
            Err(e) => tracing::warn!(page = number, "skipping unreadable page: {}", e),
        }
    }

    Ok(PdfContent {
        title,
        page_count: page_ids.len(),
        pages,
    })
}

fn read_page(doc: &Document, number: u32, page_id: ObjectId) -> Result<PageContent> {
    let annotations = read_annotations(doc, page_id, number)?;

    // 注釈のないページはテキストを読まない
    let text = if annotations.is_empty() {
        Some(Vec::new())
    } else {
        match read_text_items(doc, page_id) {
            Ok(items) => Some(items),
            Err(e) => {
                tracing::warn!(page = number, "text layer unavailable: {}", e);
                None
            }
        }
    };

    let rotation = inherited(doc, page_id, b"Rotate")
        .and_then(number_of)
        .map(|r| r as i64)
        .unwrap_or(0);
    let viewport = Viewport::new(page_box(doc, page_id), 1.0, rotation);

    Ok(PageContent {
        page: number,
        view_transform: viewport.transform,
        annotations,
        text,
    })
}

/// CropBox, else MediaBox, normalised to `[x0, y0, x1, y1]` with x0 ≤ x1, y0 ≤ y1.
fn page_box(doc: &Document, page_id: ObjectId) -> [f64; 4] {
    let found = [b"CropBox".as_slice(), b"MediaBox".as_slice()]
        .iter()
        .filter_map(|key| inherited(doc, page_id, key))
        .filter_map(|obj| numbers(doc, obj))
        .find(|v| v.len() == 4 && v.iter().all(|n| n.is_finite()));

    match found {
        Some(v) => [v[0].min(v[2]), v[1].min(v[3]), v[0].max(v[2]), v[1].max(v[3])],
        None => DEFAULT_PAGE_BOX,
    }
}

/// Looks up a page attribute, following `/Parent` for inheritable keys.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    // 循環参照への備え
    for _ in 0..64 {
        if let Ok(value) = dict.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn document_title(doc: &Document) -> String {
    doc.trailer
        .get(b"Info")
        .ok()
        .map(|info| resolve(doc, info))
        .and_then(|info| info.as_dict().ok())
        .and_then(|info| info.get(b"Title").ok())
        .and_then(|title| text_string(resolve(doc, title)))
        .map(|title| title.trim().to_string())
        .unwrap_or_default()
}

pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

pub(crate) fn number_of(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Numeric array; non-numeric elements become NaN.
pub(crate) fn numbers(doc: &Document, obj: &Object) -> Option<Vec<f64>> {
    let array = resolve(doc, obj).as_array().ok()?;
    Some(
        array
            .iter()
            .map(|v| number_of(resolve(doc, v)).unwrap_or(f64::NAN))
            .collect(),
    )
}

/// PDF text string: UTF-16BE with BOM, UTF-8, else Latin-1.
pub(crate) fn text_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    Some(decode_text_bytes(bytes))
}

pub(crate) fn decode_text_bytes(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
