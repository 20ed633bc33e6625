use axum::{
    body::Bytes,
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::PaymentStatus,
    error::Result,
    payments::GatewayNotification,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentDto {
    pricing_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    payment_id: Uuid,
    confirmation_url: Option<String>,
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(dto): Json<CreatePaymentDto>,
) -> Result<(StatusCode, Json<CheckoutResponse>)> {
    let checkout = state
        .payments
        .create_checkout(&current.user, dto.pricing_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            payment_id: checkout.payment_id,
            confirmation_url: checkout.confirmation_url,
        }),
    ))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusResponse {
    payment_id: Uuid,
    status: PaymentStatus,
    amount: i64,
    title: String,
}

pub async fn status(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentStatusResponse>> {
    let payment = state.payments.payment_status(current.user.id, id).await?;

    Ok(Json(PaymentStatusResponse {
        payment_id: payment.id,
        status: payment.status,
        amount: payment.amount_minor,
        title: payment.title,
    }))
}

/// Gateway notification endpoint. Always acknowledges with 200: a non-2xx
/// response makes the provider retry indefinitely, and the store-level
/// status guard already makes reprocessing safe. Failures are logged and
/// handled out-of-band.
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> &'static str {
    let notification: GatewayNotification = match serde_json::from_slice(&body) {
        Ok(notification) => notification,
        Err(e) => {
            tracing::debug!("Discarding unparseable webhook payload: {}", e);
            return "ok";
        }
    };

    if let Err(e) = state.payments.process_notification(notification).await {
        tracing::error!("Webhook processing failed: {}", e);
    }

    "ok"
}
