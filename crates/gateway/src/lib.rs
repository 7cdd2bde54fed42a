//! Capability interfaces for external collaborators.
//!
//! The dispatch/lifecycle core never talks to a concrete payment
//! gateway, blob service, or push provider. Each concern is an injected
//! trait object; production wiring picks real implementations, tests and
//! local development use the in-memory ones shipped here.

pub mod blobs;
pub mod notify;
pub mod payments;

pub use blobs::{BlobRef, BlobStore, InMemoryBlobStore};
pub use notify::{Notifier, TracingNotifier};
pub use payments::{ChargeRef, MockPaymentGateway, PaymentGateway};

/// Errors surfaced by gateway capabilities.
///
/// Kept separate from `CoreError`: a gateway fault is an infrastructure
/// problem, and callers decide whether it is retriable.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway rejected the request: {0}")]
    Rejected(String),

    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}
