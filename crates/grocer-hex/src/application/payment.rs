use std::time::Duration;

use async_trait::async_trait;
use grocer_types::domain::order::PaymentDetails;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("{0}")]
    Declined(String),
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn charge(&self, amount_cents: i64, payment: &PaymentDetails) -> Result<(), PaymentError>;
}

/// Approves every charge after an optional delay, or declines all of them.
#[derive(Debug, Clone, Default)]
pub struct SimulatedGateway {
    delay: Duration,
    decline: bool,
}

impl SimulatedGateway {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            decline: false,
        }
    }

    pub fn declining() -> Self {
        Self {
            delay: Duration::ZERO,
            decline: true,
        }
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    async fn charge(&self, amount_cents: i64, payment: &PaymentDetails) -> Result<(), PaymentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.decline {
            return Err(PaymentError::Declined(format!(
                "card ending {} declined",
                payment.last_four()
            )));
        }
        tracing::debug!(amount_cents, card = %payment.last_four(), "simulated charge approved");
        Ok(())
    }
}
