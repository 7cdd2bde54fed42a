//! Payment-gateway capability: create a charge, refund a charge.
//!
//! The engine only issues the state change; capture/settlement mechanics
//! belong to the provider behind this trait.

use async_trait::async_trait;
use tokio::sync::RwLock;
use wayside_core::types::{DbId, Timestamp};

use crate::GatewayError;

/// Opaque reference to a charge held by the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChargeRef(pub String);

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Charge the rider the final price (cents) for a completed breakdown.
    async fn create_charge(
        &self,
        breakdown_id: DbId,
        rider_id: DbId,
        amount_cents: i64,
    ) -> Result<ChargeRef, GatewayError>;

    /// Refund a previously created charge in full.
    async fn refund(&self, charge: &ChargeRef) -> Result<(), GatewayError>;
}

/// A recorded charge, for inspection in tests.
#[derive(Debug, Clone)]
pub struct RecordedCharge {
    pub charge: ChargeRef,
    pub breakdown_id: DbId,
    pub rider_id: DbId,
    pub amount_cents: i64,
    pub refunded: bool,
    pub created_at: Timestamp,
}

/// In-memory gateway that records every charge and refund.
#[derive(Default)]
pub struct MockPaymentGateway {
    charges: RwLock<Vec<RecordedCharge>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all charges recorded so far.
    pub async fn charges(&self) -> Vec<RecordedCharge> {
        self.charges.read().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_charge(
        &self,
        breakdown_id: DbId,
        rider_id: DbId,
        amount_cents: i64,
    ) -> Result<ChargeRef, GatewayError> {
        if amount_cents <= 0 {
            return Err(GatewayError::Rejected(format!(
                "non-positive amount {amount_cents}"
            )));
        }
        let charge = ChargeRef(uuid::Uuid::new_v4().to_string());
        self.charges.write().await.push(RecordedCharge {
            charge: charge.clone(),
            breakdown_id,
            rider_id,
            amount_cents,
            refunded: false,
            created_at: chrono::Utc::now(),
        });
        tracing::info!(
            breakdown_id,
            rider_id,
            amount_cents,
            charge = %charge.0,
            "Mock charge created"
        );
        Ok(charge)
    }

    async fn refund(&self, charge: &ChargeRef) -> Result<(), GatewayError> {
        let mut charges = self.charges.write().await;
        let found = charges.iter_mut().find(|c| c.charge == *charge);
        match found {
            Some(c) if !c.refunded => {
                c.refunded = true;
                Ok(())
            }
            Some(_) => Err(GatewayError::Rejected("charge already refunded".into())),
            None => Err(GatewayError::Rejected("unknown charge".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn charge_is_recorded() {
        let gw = MockPaymentGateway::new();
        let charge = gw.create_charge(1, 100, 12_500).await.unwrap();

        let charges = gw.charges().await;
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].charge, charge);
        assert_eq!(charges[0].amount_cents, 12_500);
        assert!(!charges[0].refunded);
    }

    #[tokio::test]
    async fn refund_marks_charge_once() {
        let gw = MockPaymentGateway::new();
        let charge = gw.create_charge(1, 100, 5_000).await.unwrap();

        gw.refund(&charge).await.unwrap();
        assert!(gw.charges().await[0].refunded);

        let err = gw.refund(&charge).await.unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn zero_amount_rejected() {
        let gw = MockPaymentGateway::new();
        assert!(gw.create_charge(1, 100, 0).await.is_err());
    }
}
