//! Mount-time catalog fetch.

use ordrfs_core::CatalogSnapshot;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::source::CatalogSource;

/// Fetch the whole catalog and build the immutable snapshot.
///
/// Any failure aborts the load; a partial or empty catalog is never returned.
pub async fn load_snapshot<S: CatalogSource>(source: &S) -> CatalogResult<CatalogSnapshot> {
    let summaries = source.fetch_restaurant_summaries().await?;
    if summaries.is_empty() {
        return Err(CatalogError::Empty);
    }

    let mut records = Vec::with_capacity(summaries.len());
    for summary in &summaries {
        debug!(id = %summary.id, name = %summary.name, "fetching restaurant");
        records.push(source.fetch_restaurant_detail(&summary.id).await?);
    }

    let snapshot = CatalogSnapshot::from_records(records);
    info!(
        restaurants = snapshot.restaurant_count(),
        categories = snapshot.category_count(),
        "catalog snapshot loaded"
    );
    Ok(snapshot)
}
