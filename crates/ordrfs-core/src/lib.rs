pub mod catalog;
pub mod config;
pub mod error;

pub use catalog::{
    sanitize_name, CatalogSnapshot, MenuItem, MenuRecord, MenuSection, RestaurantRecord,
    MENU_FILE_NAME,
};
pub use error::{OrdrfsError, OrdrfsResult};
