//! Event-to-notification routing engine.
//!
//! [`NotificationRouter`] subscribes to the platform event bus and
//! forwards each event to the affected users through the injected
//! [`Notifier`] capability. Delivery failures are logged, never
//! propagated back into the dispatch path.

use std::sync::Arc;

use tokio::sync::broadcast;
use wayside_core::types::DbId;
use wayside_events::{names, PlatformEvent};
use wayside_gateway::Notifier;
use wayside_store::Store;

/// Routes platform events to user notifications.
pub struct NotificationRouter {
    store: Arc<Store>,
    notifier: Arc<dyn Notifier>,
}

impl NotificationRouter {
    pub fn new(store: Arc<Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Run the main routing loop.
    ///
    /// Subscribes to the event bus via `receiver` and processes each
    /// event. The loop exits when the channel is closed (i.e. the
    /// [`EventBus`](wayside_events::EventBus) is dropped).
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => self.route_event(&event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Map one event onto notifier calls.
    async fn route_event(&self, event: &PlatformEvent) {
        let payload = &event.payload;
        match event.event_type.as_str() {
            names::BREAKDOWN_OFFER_SENT => {
                if let Some(user_id) = payload["mechanic_user_id"].as_i64() {
                    let distance = payload["distance_km"].as_f64().unwrap_or_default();
                    self.deliver(
                        user_id,
                        "New breakdown offer",
                        &format!("A rider {distance:.1} km away needs help"),
                    )
                    .await;
                }
            }
            names::BREAKDOWN_ACCEPTED => {
                if let Some(rider_id) = payload["rider_id"].as_i64() {
                    self.deliver(
                        rider_id,
                        "Mechanic on the way",
                        "A mechanic accepted your breakdown request",
                    )
                    .await;
                }
            }
            names::BREAKDOWN_STATUS_CHANGED => {
                if let Some(rider_id) = payload["rider_id"].as_i64() {
                    let to = payload["to"].as_str().unwrap_or("updated");
                    self.deliver(rider_id, "Status update", &format!("Your breakdown is now {to}"))
                        .await;
                }
            }
            names::BREAKDOWN_COMPLETED => {
                if let Some(rider_id) = payload["rider_id"].as_i64() {
                    self.deliver(rider_id, "Job completed", "Your breakdown has been resolved")
                        .await;
                }
            }
            names::BREAKDOWN_CANCELLED => {
                if let Some(rider_id) = payload["rider_id"].as_i64() {
                    self.deliver(rider_id, "Request cancelled", "Your breakdown request was cancelled")
                        .await;
                }
                // The assigned mechanic (if any) also hears about it.
                if let Some(mechanic_id) = payload["mechanic_id"].as_i64() {
                    if let Some(mechanic) = self.store.mechanics.find_by_id(mechanic_id).await {
                        self.deliver(
                            mechanic.user_id,
                            "Job cancelled",
                            "An assigned breakdown was cancelled",
                        )
                        .await;
                    }
                }
            }
            names::DISPUTE_RESOLVED => {
                if let Some(raised_by) = payload["raised_by"].as_i64() {
                    self.deliver(raised_by, "Dispute resolved", "Your dispute has been resolved")
                        .await;
                }
            }
            // Internal bookkeeping events need no user-facing delivery.
            _ => {}
        }
    }

    async fn deliver(&self, user_id: DbId, subject: &str, body: &str) {
        if let Err(e) = self.notifier.notify(user_id, subject, body).await {
            tracing::error!(user_id, subject, error = %e, "Notification delivery failed");
        }
    }
}
