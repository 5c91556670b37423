//! Subscription ledger fed by payment processor webhooks

pub mod store;
pub mod webhook;

pub use store::SubscriptionStore;
pub use webhook::{verify_signature, WebhookError, WebhookEvent};
