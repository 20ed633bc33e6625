use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

pub mod yookassa;

pub use yookassa::YooKassaGateway;

/// The gateway caps checkout descriptions; longer titles are truncated.
pub const MAX_DESCRIPTION_CHARS: usize = 128;

#[derive(Debug, Clone)]
pub struct CreateCheckoutRequest {
    pub amount_minor: i64,
    /// Where the hosted checkout page sends the payer afterwards.
    pub return_url: String,
    pub description: String,
    /// Unique per attempt so a retried creation request cannot produce a
    /// second charge.
    pub idempotence_key: Uuid,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub external_id: String,
    pub status: String,
    pub confirmation_url: Option<String>,
}

/// A hosted-checkout payment provider. The call goes to an external system
/// and is not retried automatically; the caller decides.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession>;
}
