use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{LocalizedText, Pricing},
    error::{AppError, Result},
    repository::PricingRepository,
};

#[derive(FromRow)]
struct PricingRow {
    id: String,
    title: String,
    description: String,
    price_minor: i64,
    position: i64,
    is_popular: bool,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePricingRepository {
    pool: SqlitePool,
}

impl SqlitePricingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // Localized strings are stored as JSON text columns.
    fn row_to_pricing(row: PricingRow) -> Result<Pricing> {
        Ok(Pricing {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            title: Self::parse_localized(&row.title)?,
            description: Self::parse_localized(&row.description)?,
            price_minor: row.price_minor,
            position: row.position,
            is_popular: row.is_popular,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_localized(s: &str) -> Result<LocalizedText> {
        serde_json::from_str(s).map_err(|e| AppError::Database(e.to_string()))
    }

    fn localized_to_json(text: &LocalizedText) -> Result<String> {
        serde_json::to_string(text).map_err(|e| AppError::Database(e.to_string()))
    }
}

#[async_trait]
impl PricingRepository for SqlitePricingRepository {
    async fn create(&self, pricing: Pricing) -> Result<Pricing> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO pricing (
                id, title, description, price_minor, position, is_popular,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(pricing.id.to_string())
        .bind(Self::localized_to_json(&pricing.title)?)
        .bind(Self::localized_to_json(&pricing.description)?)
        .bind(pricing.price_minor)
        .bind(pricing.position)
        .bind(pricing.is_popular)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(pricing.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created pricing plan".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Pricing>> {
        let row = sqlx::query_as::<_, PricingRow>(
            r#"
            SELECT id, title, description, price_minor, position, is_popular,
                   created_at, updated_at
            FROM pricing
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_pricing(r)?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Pricing>> {
        let rows = sqlx::query_as::<_, PricingRow>(
            r#"
            SELECT id, title, description, price_minor, position, is_popular,
                   created_at, updated_at
            FROM pricing
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_pricing).collect()
    }
}
