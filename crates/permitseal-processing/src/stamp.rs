//! PDF stamping.
//!
//! Overlays an image on the first page of a PDF as a fixed-size square
//! inset from the top-right corner, and re-serializes to a new buffer.
//! Documents carrying an encryption dictionary are handled best-effort:
//! the dictionary is dropped and processing continues without any password
//! recovery. Only the first page is stamped; permits are conventionally a
//! single page.

use lopdf::{xobject, Document as PdfDocument, Object, ObjectId};
use permitseal_core::constants::{QR_STAMP_INSET_PT, QR_STAMP_SIZE_PT};

/// Fallback page size (US Letter, points) when no MediaBox is resolvable.
const DEFAULT_PAGE_SIZE: (f32, f32) = (612.0, 792.0);

#[derive(Debug, thiserror::Error)]
pub enum StampError {
    /// The document cannot be parsed, even on the encryption-tolerant path.
    #[error("invalid PDF: {0}")]
    InvalidPdf(String),

    /// The document has zero pages.
    #[error("PDF has no pages")]
    EmptyDocument,

    /// The overlay image could not be embedded.
    #[error("overlay image error: {0}")]
    OverlayImage(String),
}

/// Stamp `overlay_png` onto the first page of `pdf` and return the
/// re-serialized document. The input buffer is untouched.
pub fn stamp_first_page(pdf: &[u8], overlay_png: &[u8]) -> Result<Vec<u8>, StampError> {
    let mut doc =
        PdfDocument::load_mem(pdf).map_err(|e| StampError::InvalidPdf(e.to_string()))?;

    if doc.trailer.has(b"Encrypt") {
        // Tolerate encryption metadata without password recovery.
        doc.trailer.remove(b"Encrypt");
        tracing::debug!("dropped encryption dictionary from PDF trailer");
    }

    let pages = doc.get_pages();
    let (_, &page_id) = pages.iter().next().ok_or(StampError::EmptyDocument)?;

    let (width, height) = page_size(&doc, page_id);
    let size = QR_STAMP_SIZE_PT;
    let inset = QR_STAMP_INSET_PT;
    let position = (width - size - inset, height - size - inset);

    let image = xobject::image_from(overlay_png.to_vec())
        .map_err(|e| StampError::OverlayImage(e.to_string()))?;

    doc.insert_image(page_id, image, position, (size, size))
        .map_err(|e| StampError::InvalidPdf(e.to_string()))?;

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map_err(|e| StampError::InvalidPdf(e.to_string()))?;
    Ok(out)
}

/// Resolve a page's MediaBox, following the Parent chain for inherited
/// boxes, with a US-Letter fallback.
fn page_size(doc: &PdfDocument, page_id: ObjectId) -> (f32, f32) {
    let mut current = page_id;
    for _ in 0..32 {
        let Ok(dict) = doc.get_dictionary(current) else {
            break;
        };
        if let Ok(media_box) = dict.get(b"MediaBox") {
            if let Some(size) = rect_size(doc, media_box) {
                return size;
            }
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => break,
        }
    }
    DEFAULT_PAGE_SIZE
}

fn rect_size(doc: &PdfDocument, obj: &Object) -> Option<(f32, f32)> {
    let array = match obj {
        Object::Array(array) => array.clone(),
        Object::Reference(id) => {
            let resolved = doc.get_object(*id).ok()?;
            if let Object::Array(array) = resolved {
                array.clone()
            } else {
                return None;
            }
        }
        _ => return None,
    };
    if array.len() != 4 {
        return None;
    }
    let number = |obj: &Object| -> Option<f32> {
        match obj {
            Object::Integer(i) => Some(*i as f32),
            Object::Real(f) => Some(*f),
            _ => None,
        }
    };
    let x0 = number(&array[0])?;
    let y0 = number(&array[1])?;
    let x1 = number(&array[2])?;
    let y1 = number(&array[3])?;
    Some(((x1 - x0).abs(), (y1 - y0).abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::Content;
    use lopdf::{dictionary, Stream};

    /// Minimal n-page PDF with the MediaBox inherited from the page tree.
    fn build_pdf(page_count: usize) -> Vec<u8> {
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for _ in 0..page_count {
            let content = Content {
                operations: Vec::new(),
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }

    fn test_png() -> Vec<u8> {
        crate::qr::generate_qr("https://x.test/document/PERMIT-001").unwrap()
    }

    #[test]
    fn test_stamp_preserves_page_count() {
        for pages in [1, 2, 5] {
            let pdf = build_pdf(pages);
            let stamped = stamp_first_page(&pdf, &test_png()).unwrap();
            let reloaded = PdfDocument::load_mem(&stamped).unwrap();
            assert_eq!(reloaded.get_pages().len(), pages);
        }
    }

    #[test]
    fn test_stamp_places_image_top_right_of_first_page() {
        let pdf = build_pdf(2);
        let stamped = stamp_first_page(&pdf, &test_png()).unwrap();
        let reloaded = PdfDocument::load_mem(&stamped).unwrap();
        let pages = reloaded.get_pages();
        let mut page_ids = pages.values();
        let first = *page_ids.next().unwrap();
        let second = *page_ids.next().unwrap();

        // First page gained an image XObject
        let (resources, _) = reloaded.get_page_resources(first).unwrap();
        let resources = resources.expect("first page has resources");
        assert!(resources.get(b"XObject").is_ok());

        // Content draws it at the expected top-right transform
        let raw = reloaded.get_page_content(first).unwrap();
        let content = Content::decode(&raw).unwrap();
        assert!(content.operations.iter().any(|op| op.operator == "Do"));
        let expected_x = 612.0 - QR_STAMP_SIZE_PT - QR_STAMP_INSET_PT;
        let expected_y = 792.0 - QR_STAMP_SIZE_PT - QR_STAMP_INSET_PT;
        let has_placement = content.operations.iter().any(|op| {
            op.operator == "cm"
                && op.operands.len() == 6
                && matches!(&op.operands[4], Object::Real(x) if (*x - expected_x).abs() < 0.01)
                && matches!(&op.operands[5], Object::Real(y) if (*y - expected_y).abs() < 0.01)
        });
        assert!(has_placement, "missing top-right placement transform");

        // Second page untouched
        let raw = reloaded.get_page_content(second).unwrap();
        let content = Content::decode(&raw).unwrap();
        assert!(content.operations.iter().all(|op| op.operator != "Do"));
    }

    #[test]
    fn test_input_buffer_untouched() {
        let pdf = build_pdf(1);
        let before = pdf.clone();
        let _ = stamp_first_page(&pdf, &test_png()).unwrap();
        assert_eq!(pdf, before);
    }

    #[test]
    fn test_garbage_input_is_invalid_pdf() {
        let result = stamp_first_page(b"not a pdf at all", &test_png());
        assert!(matches!(result, Err(StampError::InvalidPdf(_))));
    }

    #[test]
    fn test_zero_page_document_rejected() {
        let pdf = build_pdf(0);
        let result = stamp_first_page(&pdf, &test_png());
        assert!(matches!(result, Err(StampError::EmptyDocument)));
    }

    #[test]
    fn test_page_size_falls_back_to_letter() {
        // A page tree with no MediaBox anywhere
        let mut doc = PdfDocument::with_version("1.5");
        let pages_id = doc.new_object_id();
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            Content {
                operations: Vec::new(),
            }
            .encode()
            .unwrap(),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );
        assert_eq!(page_size(&doc, page_id), DEFAULT_PAGE_SIZE);
    }
}
