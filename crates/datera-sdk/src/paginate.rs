//! Stitching of paged list responses.

use crate::context::RequestOptions;
use datera_core::params::OFFSET;
use datera_core::{ApiListOuter, ListParams, Result};
use std::future::Future;
use tracing::{debug, warn};

/// Fetch every page of a list call.
///
/// When the caller asked for a specific window (`limit` or `offset`) the first
/// page is returned as is. Otherwise pages are requested with the offset set to
/// the number of items collected so far, until `total_count` is reached or the
/// server returns an empty page. A failing page fails the whole call.
///
/// # Errors
///
/// Returns [`datera_core::Error::InvalidParams`] for a non-numeric `limit` or
/// `offset`, or the error of the first page fetch that fails.
pub async fn collect_pages<F, Fut>(options: &RequestOptions, mut fetch: F) -> Result<ApiListOuter>
where
    F: FnMut(RequestOptions) -> Fut,
    Fut: Future<Output = Result<ApiListOuter>>,
{
    let window = ListParams::from_map(&options.params)?;
    let mut list = fetch(options.clone()).await?;
    if window.is_windowed() {
        return Ok(list);
    }

    let Some(total) = list.total_count() else {
        return Ok(list);
    };

    while list.data.len() < total {
        let offset = list.data.len();
        let mut next = options.clone();
        next.params.insert(OFFSET.to_string(), offset.to_string());
        debug!(offset, total, "Fetching next page");

        let page = fetch(next).await?;
        if page.data.is_empty() {
            warn!(
                offset,
                total, "Server returned an empty page before total_count was reached"
            );
            break;
        }
        list.data.extend(page.data);
    }

    Ok(list)
}
