use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A payment attempt against the external gateway. Created `Pending` when a
/// checkout session is requested; moves to `Succeeded` exactly once, driven
/// only by a verified gateway webhook. `Cancelled` is set by the expiry
/// sweep for checkouts the payer abandoned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pricing_id: Uuid,
    /// Gateway-side payment id. None until the checkout session is created.
    pub external_payment_id: Option<String>,
    /// Amount in minor currency units (kopecks/cents).
    pub amount_minor: i64,
    pub title: String,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Cancelled,
}

/// Render a minor-unit amount with fixed-point precision ("1234.56"), the
/// format the gateway expects. Amounts are non-negative throughout.
pub fn format_minor(amount: i64) -> String {
    format!("{}.{:02}", amount / 100, amount % 100)
}
