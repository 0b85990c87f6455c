//! Page tree helpers shared by the replicator, compositor and combiner.

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Depth limit when walking `Parent` links (guards against cycles).
const MAX_TREE_DEPTH: usize = 32;

pub(crate) fn load(pdf_bytes: &[u8]) -> Result<Document> {
    Document::load_mem(pdf_bytes).map_err(|e| Error::PdfOpen(format!("Failed to parse PDF: {e}")))
}

pub(crate) fn save(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save PDF: {e}")))?;
    Ok(output)
}

/// Page object ids in document order.
pub(crate) fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Number of pages in a PDF.
pub fn page_count(pdf_bytes: &[u8]) -> Result<usize> {
    Ok(load(pdf_bytes)?.get_pages().len())
}

/// Copy of a page dictionary with inherited attributes materialized and
/// the `Parent` link removed.
pub(crate) fn flattened_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page object: {e}")))?
        .clone();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(parent_id) = parent {
        if depth == MAX_TREE_DEPTH {
            break;
        }
        depth += 1;

        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !page.has(key)
                && let Ok(value) = node.get(key)
            {
                page.set(key.to_vec(), value.clone());
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    page.remove(b"Parent");
    Ok(page)
}

fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .and_then(|root| doc.get_dictionary(root))
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| Error::PdfOpen(format!("Missing page tree: {e}")))
}

/// Replace the page tree with one independent page object per entry of
/// `layout`, in order. Entries may repeat; each repetition shares the
/// source page's content streams and resources.
pub(crate) fn rebuild_page_tree(doc: &mut Document, layout: &[ObjectId]) -> Result<()> {
    let pages_id = pages_root(doc)?;

    let mut kids = Vec::with_capacity(layout.len());
    for &source in layout {
        let mut page = flattened_page(doc, source)?;
        page.set("Parent", Object::Reference(pages_id));
        kids.push(Object::Reference(doc.add_object(Object::Dictionary(page))));
    }

    let count = i64::try_from(kids.len())
        .map_err(|_| Error::Lopdf(format!("Too many pages: {}", kids.len())))?;

    let root = doc
        .get_dictionary_mut(pages_id)
        .map_err(|e| Error::Lopdf(format!("Failed to get page tree: {e}")))?;
    root.set("Kids", Object::Array(kids));
    root.set("Count", Object::Integer(count));
    // Inherited values now live on every page
    for key in INHERITABLE {
        root.remove(key);
    }

    doc.prune_objects();
    Ok(())
}
