//! Compositing overlay streams onto existing pages, and combining documents.
//!
//! # Coordinate System
//!
//! Overlay coordinates are PDF user space: (0, 0) is the bottom-left corner of
//! the page, X grows to the right and Y grows upward. The overlay is drawn
//! with the identity transform, so profile coordinates address the same spot
//! on every template of a given page size.
//!
//! # Stacking
//!
//! The original content streams are bracketed by `q` / `Q` so whatever
//! graphics state they leave behind cannot leak into the overlay, then the
//! overlay stream is appended last and painted on top.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use super::tree;
use crate::error::{Error, Result};

fn lopdf_error(e: lopdf::Error) -> Error {
    Error::Lopdf(e.to_string())
}

// =============================================================================
// Page Content
// =============================================================================

/// Append an overlay content stream to a page, above its original content.
pub(crate) fn stack_content(doc: &mut Document, page_id: ObjectId, overlay: Vec<u8>) -> Result<()> {
    let existing = match doc
        .get_dictionary(page_id)
        .map_err(lopdf_error)?
        .get(b"Contents")
    {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(arr)) => arr.clone(),
        _ => Vec::new(),
    };

    let mut contents = Vec::with_capacity(existing.len() + 3);
    if !existing.is_empty() {
        let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
        let restore = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
        contents.push(Object::Reference(save));
        contents.extend(existing);
        contents.push(Object::Reference(restore));
    }
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), overlay));
    contents.push(Object::Reference(overlay_id));

    doc.get_dictionary_mut(page_id)
        .map_err(lopdf_error)?
        .set("Contents", Object::Array(contents));
    Ok(())
}

// =============================================================================
// Page Resources
// =============================================================================

/// Register `target` as `/<category>/<name>` in a page's resources.
///
/// Resources and the category dictionary may each be inline or indirect;
/// indirect dictionaries are edited in place, so pages sharing them all see
/// the new entry.
pub(crate) fn register_resource(
    doc: &mut Document,
    page_id: ObjectId,
    category: &[u8],
    name: &[u8],
    target: ObjectId,
) -> Result<()> {
    let indirect = {
        let resources = resources_mut(doc, page_id)?;
        let indirect = resources.get(category).and_then(Object::as_reference).ok();
        let inline = resources.get(category).and_then(Object::as_dict).is_ok();
        if indirect.is_none() && !inline {
            resources.set(category.to_vec(), Dictionary::new());
        }
        indirect
    };

    let entries = match indirect {
        Some(id) => doc.get_dictionary_mut(id).map_err(lopdf_error)?,
        None => resources_mut(doc, page_id)?
            .get_mut(category)
            .and_then(Object::as_dict_mut)
            .map_err(lopdf_error)?,
    };
    entries.set(name.to_vec(), Object::Reference(target));
    Ok(())
}

/// The page's Resources dictionary, created inline if absent.
fn resources_mut(doc: &mut Document, page_id: ObjectId) -> Result<&mut Dictionary> {
    let indirect = {
        let page = doc.get_dictionary_mut(page_id).map_err(lopdf_error)?;
        let indirect = page.get(b"Resources").and_then(Object::as_reference).ok();
        let inline = page.get(b"Resources").and_then(Object::as_dict).is_ok();
        if indirect.is_none() && !inline {
            page.set("Resources", Dictionary::new());
        }
        indirect
    };

    match indirect {
        Some(id) => doc.get_dictionary_mut(id).map_err(lopdf_error),
        None => doc
            .get_dictionary_mut(page_id)
            .and_then(|page| page.get_mut(b"Resources"))
            .and_then(Object::as_dict_mut)
            .map_err(lopdf_error),
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Media box of a page as `[x0, y0, x1, y1]`.
pub(crate) fn media_box(doc: &Document, page_id: ObjectId) -> [f32; 4] {
    let values: Option<Vec<f32>> = doc
        .get_dictionary(page_id)
        .and_then(|page| page.get(b"MediaBox"))
        .and_then(Object::as_array)
        .ok()
        .map(|arr| {
            arr.iter()
                .filter_map(|o| match o {
                    #[allow(clippy::cast_precision_loss)]
                    Object::Integer(i) => Some(*i as f32),
                    Object::Real(r) => Some(*r),
                    _ => None,
                })
                .collect()
        });

    match values.as_deref() {
        Some(&[x0, y0, x1, y1]) => [x0, y0, x1, y1],
        // Default to US Letter size
        _ => [0.0, 0.0, 612.0, 792.0],
    }
}

// =============================================================================
// PDF Combining
// =============================================================================

/// Combine documents into one, keeping every page in order.
pub fn combine_pdfs(documents: &[Vec<u8>]) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(Error::Lopdf("No documents to combine".to_string()));
    }

    if documents.len() == 1 {
        return Ok(documents[0].clone());
    }

    let mut max_id: u32 = 1;
    let mut pages: Vec<(ObjectId, Dictionary)> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut document = Document::with_version("1.5");

    for (i, bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(bytes)
            .map_err(|e| Error::Lopdf(format!("Failed to load document {}: {}", i + 1, e)))?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for page_id in tree::page_ids(&doc) {
            pages.push((page_id, tree::flattened_page(&doc, page_id)?));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    document.objects.extend(objects);
    document.max_id = max_id;

    let pages_id = document.new_object_id();

    let mut kids = Vec::with_capacity(pages.len());
    for (page_id, mut page) in pages {
        page.set("Parent", Object::Reference(pages_id));
        document.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len())
        .map_err(|_| Error::Lopdf(format!("Too many pages: {}", kids.len())))?;

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    document.trailer.set("Root", Object::Reference(catalog_id));

    document.renumber_objects();
    document.compress();

    tree::save(&mut document)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};

    fn create_test_pdf(page_text: &str, shared_resources: bool) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let page_tree_id = doc.new_object_id();

        let font_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Font".to_vec())),
            ("Subtype", Object::Name(b"Type1".to_vec())),
            ("BaseFont", Object::Name(b"Helvetica".to_vec())),
        ]));

        let resources = Dictionary::from_iter([(
            "Font",
            Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
        )]);
        let resources = if shared_resources {
            Object::Reference(doc.add_object(resources))
        } else {
            Object::Dictionary(resources)
        };

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(page_text)]),
                Operation::new("ET", vec![]),
            ],
        };

        let content_bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content_bytes));

        let single_page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(page_tree_id)),
            ("Contents", Object::Reference(content_id)),
            ("Resources", resources),
            (
                "MediaBox",
                Object::Array(vec![0.into(), 0.into(), 612.into(), 792.into()]),
            ),
        ]));

        let page_tree = Dictionary::from_iter([
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(single_page_id)])),
            ("Count", Object::Integer(1)),
        ]);
        doc.objects.insert(page_tree_id, Object::Dictionary(page_tree));

        let catalog_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(page_tree_id)),
        ]));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        doc.save_to(&mut output).unwrap_or_default();
        output
    }

    fn first_page_id(doc: &Document) -> ObjectId {
        tree::page_ids(doc)[0]
    }

    #[test]
    fn test_stack_content_brackets_original() {
        let mut doc = Document::load_mem(&create_test_pdf("Page 1", false)).unwrap();
        let page_id = first_page_id(&doc);

        stack_content(&mut doc, page_id, b"0 g\n".to_vec()).unwrap();

        let contents = doc.get_page_contents(page_id);
        assert_eq!(contents.len(), 4);
        let content = doc.get_page_content(page_id).unwrap();
        let text = String::from_utf8_lossy(&content);
        assert!(text.starts_with("q\n"));
        assert!(text.ends_with("\nQ\n0 g\n"));
    }

    #[test]
    fn test_register_resource_inline() {
        let mut doc = Document::load_mem(&create_test_pdf("Page 1", false)).unwrap();
        let page_id = first_page_id(&doc);
        let target = doc.add_object(Dictionary::new());

        register_resource(&mut doc, page_id, b"Font", b"SMFont", target).unwrap();

        let page = doc.get_dictionary(page_id).unwrap();
        let fonts = page
            .get(b"Resources")
            .and_then(Object::as_dict)
            .and_then(|r| r.get(b"Font"))
            .and_then(Object::as_dict)
            .unwrap();
        assert!(fonts.has(b"F1"), "existing fonts must survive");
        assert_eq!(fonts.get(b"SMFont").unwrap().as_reference().unwrap(), target);
    }

    #[test]
    fn test_register_resource_indirect_creates_category() {
        let mut doc = Document::load_mem(&create_test_pdf("Page 1", true)).unwrap();
        let page_id = first_page_id(&doc);
        let resources_id = doc
            .get_dictionary(page_id)
            .and_then(|p| p.get(b"Resources"))
            .and_then(Object::as_reference)
            .unwrap();
        let target = doc.add_object(Dictionary::new());

        register_resource(&mut doc, page_id, b"XObject", b"SMImage", target).unwrap();

        let resources = doc.get_dictionary(resources_id).unwrap();
        let xobjects = resources.get(b"XObject").and_then(Object::as_dict).unwrap();
        assert!(xobjects.has(b"SMImage"));
    }

    #[test]
    fn test_media_box_default() {
        let mut doc = Document::load_mem(&create_test_pdf("Page 1", false)).unwrap();
        let page_id = first_page_id(&doc);
        doc.get_dictionary_mut(page_id).unwrap().remove(b"MediaBox");
        assert_eq!(media_box(&doc, page_id), [0.0, 0.0, 612.0, 792.0]);
    }

    #[test]
    fn test_combine_pdfs_empty() {
        let result = combine_pdfs(&[]);
        assert!(result.is_err());
    }

    #[test]
    fn test_combine_pdfs_single() {
        let pdf1 = create_test_pdf("Page 1", false);
        let result = combine_pdfs(std::slice::from_ref(&pdf1));
        assert_eq!(result.unwrap(), pdf1);
    }

    #[test]
    fn test_combine_pdfs_preserves_order() {
        let pdfs: Vec<Vec<u8>> = ["Page 1", "Page 2", "Page 3"]
            .iter()
            .map(|t| create_test_pdf(t, true))
            .collect();

        let combined = Document::load_mem(&combine_pdfs(&pdfs).unwrap()).unwrap();
        let pages = tree::page_ids(&combined);
        assert_eq!(pages.len(), 3, "Combined PDF should have 3 pages");

        for (i, page_id) in pages.iter().enumerate() {
            let content = combined.get_page_content(*page_id).unwrap();
            let expected = format!("Page {}", i + 1);
            assert!(
                String::from_utf8_lossy(&content).contains(&expected),
                "page {i} should carry {expected}"
            );
        }
    }
}
