use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cinema_shared::Masked;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Authorized,
    Voided,
}

/// What the booking flow asks the provider to authorize.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest {
    /// Idempotency reference for the provider (one per booking attempt).
    pub reference: Uuid,
    pub amount: i64,
    pub currency: String,
    pub method: Masked<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Authorization {
    pub id: String, // Provider's ID (e.g., auth_123)
    pub reference: Uuid,
    pub amount: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub authorized_at: DateTime<Utc>,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PaymentError {
    /// The provider answered and said no.
    #[error("Payment declined: {0}")]
    Declined(String),

    /// The provider could not be reached or timed out.
    #[error("Payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Opaque external payment authorization step.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Authorize `amount` against the given payment method.
    async fn authorize(&self, request: &PaymentRequest) -> Result<Authorization, PaymentError>;

    /// Cancel an authorization that will never be captured.
    async fn void(&self, authorization_id: &str) -> Result<(), PaymentError>;
}
