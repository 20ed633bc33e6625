use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{Purchase, PurchaseStatus},
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDto {
    id: Uuid,
    user_id: Uuid,
    pricing_id: Uuid,
    payment_id: Option<Uuid>,
    title: String,
    price: i64,
    status: PurchaseStatus,
    created_at: DateTime<Utc>,
}

impl From<Purchase> for PurchaseDto {
    fn from(purchase: Purchase) -> Self {
        Self {
            id: purchase.id,
            user_id: purchase.user_id,
            pricing_id: purchase.pricing_id,
            payment_id: purchase.payment_id,
            title: purchase.title,
            price: purchase.price_minor,
            status: purchase.status,
            created_at: purchase.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseDto {
    pricing_id: Uuid,
}

/// Manual purchase creation, bypassing the gateway.
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(dto): Json<CreatePurchaseDto>,
) -> Result<(StatusCode, Json<PurchaseDto>)> {
    let purchase = state
        .payments
        .create_manual_purchase(&current.user, dto.pricing_id)
        .await?;

    Ok((StatusCode::CREATED, Json(purchase.into())))
}

pub async fn my_purchases(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<Vec<PurchaseDto>>> {
    let purchases = state.payments.purchases_of(current.user.id).await?;
    Ok(Json(purchases.into_iter().map(Into::into).collect()))
}

pub async fn list_by_user(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Vec<PurchaseDto>>> {
    let purchases = state.payments.purchases_of(user_id).await?;
    Ok(Json(purchases.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusDto {
    status: String,
}

pub async fn update_status(
    State(state): State<AppState>,
    Extension(_current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateStatusDto>,
) -> Result<Json<PurchaseDto>> {
    let status = PurchaseStatus::parse(&dto.status).ok_or_else(|| {
        AppError::Validation(
            "Status must be one of: pending, completed, cancelled".to_string(),
        )
    })?;

    let purchase = state.payments.set_purchase_status(id, status).await?;
    Ok(Json(purchase.into()))
}
