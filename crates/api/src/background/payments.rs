//! Payment capture task.
//!
//! Subscribes to the event bus and issues a charge through the payment
//! capability when a breakdown completes. The engine itself never talks
//! to the gateway; a failed charge is logged for reconciliation and does
//! not affect the breakdown record.

use std::sync::Arc;

use tokio::sync::broadcast;
use wayside_events::{names, PlatformEvent};
use wayside_gateway::PaymentGateway;

pub struct PaymentCapture {
    gateway: Arc<dyn PaymentGateway>,
}

impl PaymentCapture {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Consume completion events until the bus closes.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == names::BREAKDOWN_COMPLETED => {
                    self.capture(&event).await;
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Payment capture lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, payment capture shutting down");
                    break;
                }
            }
        }
    }

    async fn capture(&self, event: &PlatformEvent) {
        let Some(breakdown_id) = event.source_entity_id else {
            return;
        };
        let Some(rider_id) = event.payload["rider_id"].as_i64() else {
            tracing::error!(breakdown_id, "Completion event missing rider_id");
            return;
        };
        let Some(amount_cents) = event.payload["final_price"].as_i64() else {
            tracing::error!(breakdown_id, "Completion event missing final_price");
            return;
        };

        match self
            .gateway
            .create_charge(breakdown_id, rider_id, amount_cents)
            .await
        {
            Ok(charge) => {
                tracing::info!(breakdown_id, rider_id, amount_cents, charge = %charge.0, "Charge created");
            }
            Err(e) => {
                tracing::error!(breakdown_id, rider_id, amount_cents, error = %e, "Charge failed");
            }
        }
    }
}
