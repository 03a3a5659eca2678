//! Wallet domain module
//!
//! Internal user balance with a deposit/withdrawal ledger.

mod model;
mod service;

pub use model::*;
pub use service::WalletService;
