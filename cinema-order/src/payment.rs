use async_trait::async_trait;
use chrono::Utc;
use cinema_core::payment::{
    Authorization, PaymentError, PaymentGateway, PaymentRequest, PaymentStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Stand-in provider for local runs and tests.
///
/// Payment methods starting with `decline` are declined and methods starting
/// with `unavailable` fail as if the provider were down. Everything else is
/// authorized after the configured latency.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    latency: Duration,
    authorized: AtomicUsize,
    voided: AtomicUsize,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    pub fn authorized_count(&self) -> usize {
        self.authorized.load(Ordering::SeqCst)
    }

    pub fn voided_count(&self) -> usize {
        self.voided.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn authorize(&self, request: &PaymentRequest) -> Result<Authorization, PaymentError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let method = request.method.expose().as_str();
        if method.starts_with("decline") {
            return Err(PaymentError::Declined("card declined by issuer".to_string()));
        }
        if method.starts_with("unavailable") {
            return Err(PaymentError::Unavailable("simulated payment gateway failure".to_string()));
        }
        if request.amount < 0 {
            return Err(PaymentError::Declined("negative amount".to_string()));
        }

        self.authorized.fetch_add(1, Ordering::SeqCst);
        Ok(Authorization {
            id: format!("mock_auth_{}", request.reference.simple()),
            reference: request.reference,
            amount: request.amount,
            currency: request.currency.clone(),
            status: PaymentStatus::Authorized,
            authorized_at: Utc::now(),
        })
    }

    async fn void(&self, _authorization_id: &str) -> Result<(), PaymentError> {
        self.voided.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
