use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{Purchase, PurchaseStatus},
    error::{AppError, Result},
    repository::PurchaseRepository,
};

#[derive(FromRow)]
struct PurchaseRow {
    id: String,
    user_id: String,
    pricing_id: String,
    payment_id: Option<String>,
    title: String,
    price_minor: i64,
    status: String,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePurchaseRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_purchase(row: PurchaseRow) -> Result<Purchase> {
        let payment_id = match row.payment_id {
            Some(s) => {
                Some(Uuid::parse_str(&s).map_err(|e| AppError::Database(e.to_string()))?)
            }
            None => None,
        };

        Ok(Purchase {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            user_id: Uuid::parse_str(&row.user_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            pricing_id: Uuid::parse_str(&row.pricing_id)
                .map_err(|e| AppError::Database(e.to_string()))?,
            payment_id,
            title: row.title,
            price_minor: row.price_minor,
            status: Self::parse_purchase_status(&row.status)?,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    fn parse_purchase_status(s: &str) -> Result<PurchaseStatus> {
        PurchaseStatus::parse(s)
            .ok_or_else(|| AppError::Database(format!("Invalid purchase status: {}", s)))
    }

    fn purchase_status_to_str(status: &PurchaseStatus) -> &'static str {
        match status {
            PurchaseStatus::Pending => "pending",
            PurchaseStatus::Completed => "completed",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepository {
    async fn create(&self, purchase: Purchase) -> Result<Purchase> {
        let id_str = purchase.id.to_string();
        let status_str = Self::purchase_status_to_str(&purchase.status);
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, user_id, pricing_id, payment_id, title, price_minor,
                status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id_str)
        .bind(purchase.user_id.to_string())
        .bind(purchase.pricing_id.to_string())
        .bind(purchase.payment_id.map(|id| id.to_string()))
        .bind(&purchase.title)
        .bind(purchase.price_minor)
        .bind(status_str)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed") => {
                AppError::Conflict("A purchase already exists for this payment".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        self.find_by_id(purchase.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created purchase".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, pricing_id, payment_id, title, price_minor,
                   status, created_at, updated_at
            FROM purchases
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_purchase(r)?)),
            None => Ok(None),
        }
    }

    async fn find_by_payment(&self, payment_id: Uuid) -> Result<Option<Purchase>> {
        let row = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, pricing_id, payment_id, title, price_minor,
                   status, created_at, updated_at
            FROM purchases
            WHERE payment_id = ?
            "#,
        )
        .bind(payment_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        match row {
            Some(r) => Ok(Some(Self::row_to_purchase(r)?)),
            None => Ok(None),
        }
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"
            SELECT id, user_id, pricing_id, payment_id, title, price_minor,
                   status, created_at, updated_at
            FROM purchases
            WHERE user_id = ?
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter().map(Self::row_to_purchase).collect()
    }

    async fn update_status(&self, id: Uuid, status: PurchaseStatus) -> Result<Purchase> {
        let status_str = Self::purchase_status_to_str(&status);
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(status_str)
        .bind(now)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Purchase not found".to_string()));
        }

        self.find_by_id(id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated purchase".to_string())
        })
    }
}
