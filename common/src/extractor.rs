//! ハイライト抽出
//!
//! Recovers the text covered by each text-markup annotation on a page by
//! testing which text spans have their centre inside one of the annotation's
//! quadrilaterals (mapped to viewport space).
//!
//! The centre-in-rectangle test is an approximation: spacing that the PDF
//! encodes through positioning instead of literal spaces is not recovered, and
//! a span that is only partly covered is either taken whole or dropped.

use crate::geometry::{rects_from_quad_points, Matrix, Rect};
use crate::types::{Annotation, ExtractedNote, PageContent, TextItem};

/// Text and vertical extent recovered for one annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct Coverage {
    pub text: String,
    pub min_y: f64,
    pub max_y: f64,
}

impl Coverage {
    fn degenerate() -> Self {
        Self {
            text: String::new(),
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }
}

/// Extracts one note per annotation on the page, in annotation order.
pub fn extract_page_notes(page: &PageContent) -> Vec<ExtractedNote> {
    page.annotations
        .iter()
        .map(|annotation| {
            let coverage = match &page.text {
                Some(items) => covered_text(annotation, items, &page.view_transform),
                None => Coverage::degenerate(),
            };
            ExtractedNote {
                page: page.page,
                subtype: annotation.subtype,
                contents: annotation.contents.trim().to_string(),
                text: coverage.text,
                min_y: coverage.min_y,
                max_y: coverage.max_y,
                color: annotation.color,
            }
        })
        .collect()
}

/// Text covered by `annotation` among `items`.
///
/// Malformed quad points (empty, not a multiple of 8, or non-finite) yield
/// an empty text with an unbounded extent instead of an error.
pub fn covered_text(annotation: &Annotation, items: &[TextItem], view: &Matrix) -> Coverage {
    let quads = &annotation.quad_points;
    if quads.is_empty() || quads.len() % 8 != 0 || quads.iter().any(|v| !v.is_finite()) {
        tracing::debug!(
            page = annotation.page,
            len = quads.len(),
            "annotation has malformed quad points"
        );
        return Coverage::degenerate();
    }

    let rects: Vec<Rect> = rects_from_quad_points(quads)
        .iter()
        .map(|r| r.transform(view))
        .collect();

    let mut captured = String::new();
    for item in items {
        let (cx, cy) = item_center(item, view);
        if rects.iter().any(|r| r.contains(cx, cy)) {
            captured.push_str(&item.str);
        }
    }

    let min_y = rects.iter().map(|r| r.y).fold(f64::INFINITY, f64::min);
    let max_y = rects.iter().map(Rect::max_y).fold(f64::NEG_INFINITY, f64::max);

    Coverage {
        text: captured.trim().to_string(),
        min_y,
        max_y,
    }
}

/// Viewport-space centre of a text span.
///
/// The span origin sits on the baseline; the viewport's y axis points down,
/// so the centre is half a glyph height *above* (smaller y) the origin.
pub fn item_center(item: &TextItem, view: &Matrix) -> (f64, f64) {
    let t = &item.transform.0;
    let (x0, y0) = view.apply(t[4], t[5]);
    let w = item.width * view.horizontal_scale();
    let h = t[2].hypot(t[3]) * view.vertical_scale();
    let w = if w.is_finite() { w } else { 0.0 };
    let h = if h.is_finite() { h } else { 0.0 };
    (x0 + w / 2.0, y0 - h / 2.0)
}
