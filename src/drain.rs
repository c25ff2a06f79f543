//! Pagination drain: exhausts a cursor-paginated range query into one
//! ordered sequence.

use tracing::debug;

use crate::error::{Error, Result};
use crate::normalizer::RawRecord;
use crate::store::{RangePredicate, StoreAdapter};

/// Repeatedly queries `store` until the adapter stops returning a cursor,
/// concatenating pages in the order received.
///
/// The adapter-returned cursor is the sole iteration state; the same table
/// and predicate are passed on every call. Fails with
/// [`Error::PaginationExhausted`] once `max_pages` queries have been issued
/// without the adapter signalling exhaustion, bounding the worst case
/// against a misbehaving store.
pub async fn drain<S: StoreAdapter + ?Sized>(
    store: &S,
    table: &str,
    predicate: &RangePredicate,
    max_pages: usize,
) -> Result<Vec<RawRecord>> {
    let mut records = Vec::new();
    let mut cursor = None;

    for page_no in 0..max_pages {
        let page = store.query(table, predicate, cursor).await?;
        debug!(
            table,
            page_no,
            entries = page.entries.len(),
            has_more = page.next_cursor.is_some(),
            "drained page"
        );
        records.extend(page.entries);

        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => return Ok(records),
        }
    }

    Err(Error::PaginationExhausted(max_pages))
}
