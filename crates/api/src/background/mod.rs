//! Long-lived background tasks spawned from `main`.

pub mod payments;

pub use payments::PaymentCapture;
