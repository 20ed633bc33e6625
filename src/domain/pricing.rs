use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A string localized into the three storefront languages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalizedText {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub en: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ru: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hy: Option<String>,
}

impl LocalizedText {
    /// Display fallback used for payment descriptions and receipts:
    /// ru, then en, then hy.
    pub fn preferred(&self) -> &str {
        self.ru
            .as_deref()
            .or(self.en.as_deref())
            .or(self.hy.as_deref())
            .unwrap_or("Plan")
    }
}

/// A pricing plan the storefront sells. Content CRUD lives elsewhere; the
/// payment flow only reads plans.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pricing {
    pub id: Uuid,
    pub title: LocalizedText,
    pub description: LocalizedText,
    pub price_minor: i64,
    pub position: i64,
    pub is_popular: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
