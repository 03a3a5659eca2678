//! Middleware for GameHub API
//!
//! This module provides middleware for request tracing and authentication.

pub mod auth;
mod tracing;

pub use auth::{AdminUser, AuthenticatedUser};
pub use tracing::request_tracing;
