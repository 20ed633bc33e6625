use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::*;
use crate::error::Result;

pub mod payment_repository;
pub mod pricing_repository;
pub mod purchase_repository;
pub mod user_repository;

pub use payment_repository::SqlitePaymentRepository;
pub use pricing_repository::SqlitePricingRepository;
pub use purchase_repository::SqlitePurchaseRepository;
pub use user_repository::SqliteUserRepository;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    /// Status checks are owner-only; anyone else sees a 404.
    async fn find_owned(&self, id: Uuid, user_id: Uuid) -> Result<Option<Payment>>;
    async fn set_external_id(&self, id: Uuid, external_id: &str) -> Result<()>;
    /// Atomically transition the payment with this gateway id from
    /// `pending` to `succeeded`. Returns None if no pending payment matched
    /// (unknown id, replayed webhook, or a concurrent delivery won the
    /// race); the caller must then treat the notification as a no-op.
    async fn mark_succeeded(&self, external_id: &str) -> Result<Option<Payment>>;
    /// Cancel pending payments created before the cutoff. Returns how many
    /// rows were swept.
    async fn cancel_stale(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn create(&self, purchase: Purchase) -> Result<Purchase>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>>;
    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Purchase>>;
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>>;
    async fn update_status(&self, id: Uuid, status: PurchaseStatus) -> Result<Purchase>;
}

#[async_trait]
pub trait PricingRepository: Send + Sync {
    async fn create(&self, pricing: Pricing) -> Result<Pricing>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pricing>>;
    async fn list(&self) -> Result<Vec<Pricing>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<User>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;
}
