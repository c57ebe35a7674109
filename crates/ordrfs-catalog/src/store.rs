//! [`CatalogSource`] backed by JSON documents behind an OpenDAL operator.
//!
//! Layout under `{prefix}`:
//!
//! ```text
//! restaurants.json          delivery list
//! restaurants/{id}.json     detail + menu
//! orders/{reference}.json   staged orders (writable backends only)
//! ```

use opendal::Operator;
use ordrfs_core::RestaurantRecord;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{CatalogError, CatalogResult};
use crate::source::{CatalogSource, OrderReceipt, OrderRequest, RestaurantSummary};
use crate::wire::{RestaurantDetailWire, SummaryWire};

pub struct OpendalCatalog {
    op: Operator,
    prefix: String,
}

/// What actually lands in `orders/{reference}.json`.
#[derive(Serialize)]
struct StagedOrder<'a> {
    reference_number: &'a str,
    #[serde(flatten)]
    order: &'a OrderRequest,
}

impl OpendalCatalog {
    pub fn new(op: Operator, prefix: impl Into<String>) -> Self {
        OpendalCatalog {
            op,
            prefix: prefix.into(),
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.op
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn join(prefix: &str, rel: &str) -> String {
        let prefix = prefix.trim_matches('/');
        if prefix.is_empty() {
            rel.to_string()
        } else {
            format!("{prefix}/{rel}")
        }
    }

    /// Key of the delivery list for a given prefix.
    pub fn summaries_key_for(prefix: &str) -> String {
        Self::join(prefix, "restaurants.json")
    }

    fn detail_key(&self, id: &str) -> String {
        Self::join(&self.prefix, &format!("restaurants/{id}.json"))
    }

    fn order_key(&self, reference: &str) -> String {
        Self::join(&self.prefix, &format!("orders/{reference}.json"))
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> CatalogResult<T> {
        let data = self
            .op
            .read(key)
            .await
            .map_err(|e| CatalogError::from_opendal(key, e))?;
        serde_json::from_slice(&data.to_vec()).map_err(|source| CatalogError::Decode {
            path: key.to_string(),
            source,
        })
    }
}

impl CatalogSource for OpendalCatalog {
    async fn fetch_restaurant_summaries(&self) -> CatalogResult<Vec<RestaurantSummary>> {
        let key = Self::summaries_key_for(&self.prefix);
        let rows: Vec<SummaryWire> = self.read_json(&key).await?;
        debug!(key = %key, count = rows.len(), "fetched restaurant list");
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn fetch_restaurant_detail(&self, id: &str) -> CatalogResult<RestaurantRecord> {
        if id.is_empty() || id.contains('/') {
            return Err(CatalogError::NotFound(format!("restaurant id {id:?}")));
        }
        let key = self.detail_key(id);
        let wire: RestaurantDetailWire = self.read_json(&key).await?;
        debug!(key = %key, name = %wire.name, "fetched restaurant detail");
        Ok(wire.into())
    }

    async fn submit_order(&self, order: &OrderRequest) -> CatalogResult<OrderReceipt> {
        if order.items.is_empty() {
            return Err(CatalogError::InvalidOrder("no items".into()));
        }
        if order.restaurant_id.is_empty() || order.restaurant_id.contains('/') {
            return Err(CatalogError::InvalidOrder(format!(
                "restaurant id {:?}",
                order.restaurant_id
            )));
        }
        if !self.op.info().full_capability().write {
            return Err(CatalogError::Unsupported(
                "catalog backend is read-only; orders cannot be staged".into(),
            ));
        }

        let reference = uuid::Uuid::new_v4().to_string();
        let key = self.order_key(&reference);
        let body = serde_json::to_vec_pretty(&StagedOrder {
            reference_number: &reference,
            order,
        })
        .map_err(|source| CatalogError::Decode {
            path: key.clone(),
            source,
        })?;

        self.op
            .write(&key, body)
            .await
            .map_err(|e| CatalogError::from_opendal(&key, e))?;

        info!(
            restaurant = %order.restaurant_id,
            items = order.items.len(),
            reference = %reference,
            "order staged"
        );

        Ok(OrderReceipt {
            success: true,
            reference_number: reference,
            message: format!("order staged at {key}"),
        })
    }
}
