//! API handlers for the GameHub backend

pub mod admin;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod content;
pub mod orders;
pub mod wallet;

pub use crate::middleware::auth::{AdminUser, AuthenticatedUser};
