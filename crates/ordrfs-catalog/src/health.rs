//! Catalog health check

use anyhow::Result;
use opendal::Operator;

use crate::store::OpendalCatalog;

/// Verify the catalog is reachable by stat-ing the restaurant list.
///
/// `stat` rather than `list` because the HTTP service cannot list.
pub async fn check_health(op: &Operator, prefix: &str) -> Result<()> {
    let key = OpendalCatalog::summaries_key_for(prefix);
    op.stat(&key)
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!("catalog health check failed ({key}): {e}"))
}
