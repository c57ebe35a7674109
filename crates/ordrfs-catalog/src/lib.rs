//! ordrfs-catalog: the catalog/ordering collaborator
//!
//! The remote service publishes a restaurant list and one detail document per
//! restaurant. [`CatalogSource`] is the interface the filesystem consumes;
//! [`OpendalCatalog`] reads the JSON documents through an OpenDAL operator so
//! the same code serves an HTTP endpoint, a local dump, or an in-memory store.

pub mod error;
pub mod health;
pub mod operator;
pub mod snapshot;
pub mod source;
pub mod store;
pub mod wire;

pub use error::{CatalogError, CatalogResult};
pub use health::check_health;
pub use operator::build_operator;
pub use snapshot::load_snapshot;
pub use source::{CatalogSource, OrderItem, OrderReceipt, OrderRequest, RestaurantSummary};
pub use store::OpendalCatalog;
