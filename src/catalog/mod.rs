//! Catalog domain module
//!
//! Products, categories, seller storefronts, favorites and recently viewed.

mod model;
mod service;

pub use model::*;
pub use service::CatalogService;
