//! Orders domain module
//!
//! Orders snapshot catalog prices when created; payment state changes go
//! through [`crate::payments`].

mod model;
mod service;

pub use model::*;
pub use service::OrderService;
