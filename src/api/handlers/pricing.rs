use axum::{extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{LocalizedText, Pricing},
    error::Result,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingDto {
    id: Uuid,
    title: LocalizedText,
    description: LocalizedText,
    price: i64,
    is_popular: bool,
}

impl From<Pricing> for PricingDto {
    fn from(pricing: Pricing) -> Self {
        Self {
            id: pricing.id,
            title: pricing.title,
            description: pricing.description,
            price: pricing.price_minor,
            is_popular: pricing.is_popular,
        }
    }
}

/// Public plan listing so a client can pick what to check out.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<PricingDto>>> {
    let plans = state.payments.pricing_repo().list().await?;
    Ok(Json(plans.into_iter().map(Into::into).collect()))
}
