//! The interface the filesystem consumes from the catalog/ordering service.

use std::future::Future;

use ordrfs_core::config::AccountConfig;
use ordrfs_core::RestaurantRecord;
use serde::{Deserialize, Serialize};

use crate::error::CatalogResult;

/// One row of the delivery list: enough to fetch the full detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub quantity: u32,
}

impl OrderItem {
    /// Parse `id` or `id:qty` (quantity defaults to 1).
    pub fn parse(spec: &str) -> Option<Self> {
        let (id, qty) = match spec.split_once(':') {
            Some((id, qty)) => (id, qty.parse::<u32>().ok()?),
            None => (spec, 1),
        };
        let id = id.trim();
        if id.is_empty() || qty == 0 {
            return None;
        }
        Some(OrderItem {
            item_id: id.to_string(),
            quantity: qty,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub restaurant_id: String,
    pub items: Vec<OrderItem>,
    /// Tip as a decimal string ("2.50")
    pub tip: String,
    pub account: AccountConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub success: bool,
    pub reference_number: String,
    pub message: String,
}

/// Catalog/ordering collaborator.
///
/// Every method fails with `CatalogError::RemoteUnavailable` when the backend
/// cannot be reached.
pub trait CatalogSource: Send + Sync {
    /// Fetch the delivery list for the configured account.
    fn fetch_restaurant_summaries(
        &self,
    ) -> impl Future<Output = CatalogResult<Vec<RestaurantSummary>>> + Send;

    /// Fetch one restaurant with its full menu. The returned name is raw
    /// (not yet sanitised for use as a path component).
    fn fetch_restaurant_detail(
        &self,
        id: &str,
    ) -> impl Future<Output = CatalogResult<RestaurantRecord>> + Send;

    /// Submit an order.
    fn submit_order(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = CatalogResult<OrderReceipt>> + Send;
}
