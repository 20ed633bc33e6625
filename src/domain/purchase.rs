use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The fulfilled transaction. Materialized from a succeeded Payment (then
/// `payment_id` is set and unique), or created directly for manual
/// purchases. Never reversed by the payment flow; status edits are an
/// administrative side-channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Purchase {
    pub id: Uuid,
    pub user_id: Uuid,
    pub pricing_id: Uuid,
    pub payment_id: Option<Uuid>,
    pub title: String,
    pub price_minor: i64,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
}

impl PurchaseStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PurchaseStatus::Pending),
            "completed" => Some(PurchaseStatus::Completed),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }
}
