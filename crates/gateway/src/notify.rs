//! Notification-delivery capability.
//!
//! The notification router turns bus events into calls on this trait;
//! what happens next (push, SMS, e-mail) is the provider's business.

use async_trait::async_trait;
use wayside_core::types::DbId;

use crate::GatewayError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a message to a platform user.
    async fn notify(&self, user_id: DbId, subject: &str, body: &str) -> Result<(), GatewayError>;
}

/// Delivery that just logs. The default for local development.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, user_id: DbId, subject: &str, body: &str) -> Result<(), GatewayError> {
        tracing::info!(user_id, subject, body, "notification");
        Ok(())
    }
}
