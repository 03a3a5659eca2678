//! Payments domain module
//!
//! Checkout sessions with the payment provider and the reconciler that
//! turns a paid session into a paid order.

mod model;
mod provider;
mod service;
pub mod stripe;

pub use model::*;
pub use provider::{
    to_minor_units, NewCheckoutSession, PaymentProvider, ProviderError,
    ProviderPaymentStatus, ProviderSession, ProviderSessionStatus, WebhookEvent,
};
pub use service::PaymentService;
pub use stripe::StripeClient;
