//! PDF segmentation: split a document into page-range slices via lopdf.
//!
//! ## Why slice at all?
//!
//! The layout-parsing service processes a PDF request serially and holds the
//! whole document in memory. Cutting a 200-page scan into 10-page slices
//! lets several slices be recognised in parallel and keeps each request
//! under the service's body-size limit.
//!
//! ## Why spawn_blocking?
//!
//! Parsing and re-serialising a PDF is CPU-bound and can take hundreds of
//! milliseconds for large scans. `tokio::task::spawn_blocking` keeps that
//! work off the async worker threads that drive the network calls of sibling
//! documents.
//!
//! Each slice is produced by cloning the parsed document, pointing the root
//! page tree straight at the pages in range and pruning objects that became
//! unreachable, so every slice is a self-contained PDF the service can treat
//! like any small upload. Attributes a page inherited from an intermediate
//! `Pages` node are copied onto the page first, since that node is dropped.

use crate::error::UnitError;
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info};

/// Split `pdf` into slices of `segmentation` pages, or keep it whole.
///
/// `None` and `Some(0)` bypass parsing entirely and return the input bytes
/// as the single slice.
pub async fn segment_pdf(
    pdf: Vec<u8>,
    segmentation: Option<usize>,
) -> Result<Vec<Vec<u8>>, UnitError> {
    let pages_per_slice = match segmentation {
        Some(n) if n > 0 => n,
        _ => return Ok(vec![pdf]),
    };

    tokio::task::spawn_blocking(move || split_pdf(&pdf, pages_per_slice))
        .await
        .map_err(|e| UnitError::MalformedDocument {
            detail: format!("split task panicked: {e}"),
        })?
}

/// Blocking implementation of page-range splitting.
///
/// Produces `ceil(P / pages_per_slice)` slices in page order; the last one
/// holds the remainder.
pub fn split_pdf(pdf: &[u8], pages_per_slice: usize) -> Result<Vec<Vec<u8>>, UnitError> {
    let pages_per_slice = pages_per_slice.max(1);
    let document = load(pdf)?;

    let pages: Vec<(u32, ObjectId)> = document.get_pages().into_iter().collect();
    let total_pages = pages.len();
    if total_pages == 0 {
        return Err(UnitError::MalformedDocument {
            detail: "document has no pages".into(),
        });
    }
    let root_pages = root_pages_id(&document)?;

    let mut slices = Vec::with_capacity(total_pages.div_ceil(pages_per_slice));
    for (slice_idx, range) in pages.chunks(pages_per_slice).enumerate() {
        let mut slice = document.clone();

        let first = range[0].0;
        let last = range[range.len() - 1].0;
        let keep: Vec<ObjectId> = range.iter().map(|(_, id)| *id).collect();
        keep_only_pages(&mut slice, root_pages, &keep)?;
        slice.prune_objects();

        let mut buf = Vec::new();
        slice
            .save_to(&mut buf)
            .map_err(|e| UnitError::MalformedDocument {
                detail: format!("failed to write pages {first}-{last}: {e}"),
            })?;

        debug!(
            "Slice {}: pages {}-{} → {} bytes",
            slice_idx,
            first,
            last,
            buf.len()
        );
        slices.push(buf);
    }

    info!(
        "Split {} pages into {} slices of ≤{} pages",
        total_pages,
        slices.len(),
        pages_per_slice
    );
    Ok(slices)
}

/// Number of pages in `pdf`.
pub fn page_count(pdf: &[u8]) -> Result<usize, UnitError> {
    Ok(load(pdf)?.get_pages().len())
}

/// Page attributes a page may inherit from its ancestors.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

fn malformed(detail: impl Into<String>) -> UnitError {
    UnitError::MalformedDocument {
        detail: detail.into(),
    }
}

fn root_pages_id(document: &Document) -> Result<ObjectId, UnitError> {
    document
        .catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| malformed(format!("missing page tree root: {e}")))
}

/// Make `keep` the only kids of the root page tree, in order.
///
/// Touches only the kept pages and the root node, so the cost per slice is
/// independent of how many pages are dropped.
fn keep_only_pages(
    document: &mut Document,
    root_pages: ObjectId,
    keep: &[ObjectId],
) -> Result<(), UnitError> {
    for &page_id in keep {
        let inherited = inherited_attributes(document, page_id, root_pages);
        let page = document
            .get_dictionary_mut(page_id)
            .map_err(|e| malformed(format!("page {page_id:?}: {e}")))?;
        for (key, value) in inherited {
            if !page.has(&key) {
                page.set(key, value);
            }
        }
        page.set("Parent", root_pages);
    }

    let root = document
        .get_dictionary_mut(root_pages)
        .map_err(|e| malformed(format!("page tree root: {e}")))?;
    root.set(
        "Kids",
        keep.iter().map(|id| Object::Reference(*id)).collect::<Vec<_>>(),
    );
    root.set("Count", keep.len() as i64);
    Ok(())
}

/// Inheritable attributes held by the page's ancestors below the root,
/// nearest ancestor first.
fn inherited_attributes(
    document: &Document,
    page_id: ObjectId,
    root_pages: ObjectId,
) -> Vec<(Vec<u8>, Object)> {
    let parent_of = |id: ObjectId| {
        document
            .get_dictionary(id)
            .and_then(|dict| dict.get(b"Parent"))
            .and_then(Object::as_reference)
            .ok()
    };

    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut node = parent_of(page_id);
    let mut depth = 0;
    while let Some(id) = node {
        // The root stays in the slice, so its attributes still apply.
        if id == root_pages || depth > 64 {
            break;
        }
        let Ok(dict) = document.get_dictionary(id) else {
            break;
        };
        for key in INHERITABLE {
            if found.iter().all(|(k, _)| k.as_slice() != key) {
                if let Ok(value) = dict.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        node = parent_of(id);
        depth += 1;
    }
    found
}

fn load(pdf: &[u8]) -> Result<Document, UnitError> {
    Document::load_mem(pdf).map_err(|e| UnitError::MalformedDocument {
        detail: format!("failed to parse PDF: {e}"),
    })
}
