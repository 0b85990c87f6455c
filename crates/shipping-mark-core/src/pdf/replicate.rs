//! Expands a label template into the physical pages of one batch.

use std::num::NonZeroUsize;

use tracing::debug;

use super::tree;
use crate::error::{Error, Result};

/// Replicate a 1- or 2-page template into exactly `copies` pages.
///
/// A 1-page template yields `copies` copies of its page. A 2-page template
/// yields `copies - 1` copies of page 1 followed by page 2 once, so the back
/// page always closes the batch.
pub fn replicate_pages(pdf_bytes: &[u8], copies: NonZeroUsize) -> Result<Vec<u8>> {
    let mut doc = tree::load(pdf_bytes)?;
    let pages = tree::page_ids(&doc);

    let layout = match pages.as_slice() {
        [front] => vec![*front; copies.get()],
        [front, back] => {
            let mut layout = vec![*front; copies.get() - 1];
            layout.push(*back);
            layout
        }
        other => return Err(Error::UnsupportedPageCount(other.len())),
    };

    debug!(
        "Replicating {}-page template into {} pages",
        pages.len(),
        layout.len()
    );

    tree::rebuild_page_tree(&mut doc, &layout)?;
    tree::save(&mut doc)
}

/// Extract the first page of a 1- or 2-page template on its own.
pub fn first_page(pdf_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut doc = tree::load(pdf_bytes)?;
    let pages = tree::page_ids(&doc);

    let front = match pages.as_slice() {
        [front] | [front, _] => *front,
        other => return Err(Error::UnsupportedPageCount(other.len())),
    };

    tree::rebuild_page_tree(&mut doc, &[front])?;
    tree::save(&mut doc)
}
