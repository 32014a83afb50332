use super::{numbers, resolve, text_string};
use crate::error::{Result, VibeError};
use lopdf::{Document, ObjectId};
use vibewriting_common::{Annotation, Rgb, Subtype};

/// Text-markup annotations of a page, in `/Annots` order.
///
/// Other annotation types are ignored. A page whose `/Annots` entry is not
/// an array is an error; a single malformed annotation is skipped.
pub fn read_annotations(doc: &Document, page_id: ObjectId, page: u32) -> Result<Vec<Annotation>> {
    let page_dict = doc.get_dictionary(page_id)?;
    let entries = match page_dict.get(b"Annots") {
        Ok(obj) => resolve(doc, obj)
            .as_array()
            .map_err(|_| VibeError::Pdf(format!("page {}: /Annots is not an array", page)))?,
        Err(_) => return Ok(Vec::new()),
    };

    let mut annotations = Vec::new();
    for entry in entries {
        let Ok(dict) = resolve(doc, entry).as_dict() else {
            tracing::debug!(page, "annotation entry is not a dictionary");
            continue;
        };

        let subtype = dict
            .get(b"Subtype")
            .ok()
            .and_then(|o| resolve(doc, o).as_name().ok())
            .and_then(|name| Subtype::from_name(&String::from_utf8_lossy(name)));
        let Some(subtype) = subtype else {
            continue;
        };

        let contents = dict
            .get(b"Contents")
            .ok()
            .and_then(|o| text_string(resolve(doc, o)))
            .unwrap_or_default();
        let quad_points = dict
            .get(b"QuadPoints")
            .ok()
            .and_then(|o| numbers(doc, o))
            .unwrap_or_default();
        let color = dict
            .get(b"C")
            .ok()
            .and_then(|o| numbers(doc, o))
            .and_then(|c| Rgb::from_components(&c));

        annotations.push(Annotation {
            page,
            subtype,
            contents,
            quad_points,
            color,
        });
    }

    tracing::debug!(page, count = annotations.len(), "read text-markup annotations");
    Ok(annotations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Object, StringFormat};

    fn quad_object(x0: f64, y0: f64, x1: f64, y1: f64) -> Object {
        Object::Array(
            [x0, y1, x1, y1, x0, y0, x1, y0]
                .iter()
                .map(|&v| Object::Real(v as f32))
                .collect(),
        )
    }

    fn page_with(annots: Vec<Object>) -> (Document, ObjectId) {
        let mut doc = Document::with_version("1.7");
        let refs: Vec<Object> = annots
            .into_iter()
            .map(|a| Object::Reference(doc.add_object(a)))
            .collect();
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => refs,
        });
        (doc, page_id)
    }

    #[test]
    fn test_reads_markup_annotations_only() {
        let (doc, page_id) = page_with(vec![
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Highlight",
                "Contents" => Object::String(b"  why?  ".to_vec(), StringFormat::Literal),
                "QuadPoints" => quad_object(10.0, 20.0, 30.0, 40.0),
                "C" => vec![1.into(), 1.into(), 0.into()],
            }),
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
            }),
            Object::Dictionary(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Squiggly",
            }),
        ]);

        let annotations = read_annotations(&doc, page_id, 4).unwrap();
        assert_eq!(annotations.len(), 2);

        let first = &annotations[0];
        assert_eq!(first.page, 4);
        assert_eq!(first.subtype, Subtype::Highlight);
        assert_eq!(first.contents, "  why?  ");
        assert_eq!(first.quad_points, vec![10.0, 40.0, 30.0, 40.0, 10.0, 20.0, 30.0, 20.0]);
        assert_eq!(first.color, Some(Rgb([255, 255, 0])));

        assert_eq!(annotations[1].subtype, Subtype::Squiggly);
        assert!(annotations[1].quad_points.is_empty());
        assert_eq!(annotations[1].color, None);
    }

    #[test]
    fn test_page_without_annots() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! { "Type" => "Page" });
        assert!(read_annotations(&doc, page_id, 1).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_annots_entry_is_page_error() {
        let mut doc = Document::with_version("1.7");
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Annots" => 42,
        });
        assert!(matches!(read_annotations(&doc, page_id, 1), Err(VibeError::Pdf(_))));
    }
}
