use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{
    domain::format_minor,
    error::{AppError, Result},
    gateway::{CheckoutSession, CreateCheckoutRequest, PaymentGateway, MAX_DESCRIPTION_CHARS},
};

/// YooKassa payments API client. Authenticates with shop-id/secret-key
/// Basic auth; duplicate-charge protection comes from the Idempotence-Key
/// header the API requires on creation requests.
pub struct YooKassaGateway {
    http: reqwest::Client,
    shop_id: String,
    secret_key: String,
    api_url: String,
    currency: String,
}

impl YooKassaGateway {
    pub fn new(shop_id: String, secret_key: String, api_url: String, currency: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            shop_id,
            secret_key,
            api_url,
            currency,
        }
    }
}

#[derive(Debug, Deserialize)]
struct GatewayResponse {
    id: Option<String>,
    status: Option<String>,
    confirmation: Option<GatewayConfirmation>,
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GatewayConfirmation {
    confirmation_url: Option<String>,
}

#[async_trait]
impl PaymentGateway for YooKassaGateway {
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession> {
        if request.amount_minor < 0 {
            return Err(AppError::Validation(
                "Payment amount must be non-negative".to_string(),
            ));
        }

        let description: String = request.description.chars().take(MAX_DESCRIPTION_CHARS).collect();
        let body = json!({
            "amount": {
                "value": format_minor(request.amount_minor),
                "currency": self.currency,
            },
            "capture": true,
            "confirmation": {
                "type": "redirect",
                "return_url": request.return_url,
            },
            "description": description,
        });

        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", request.idempotence_key.to_string())
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Gateway {
                code: None,
                message: format!("Checkout request failed: {}", e),
            })?;

        let status = response.status();
        let payload: GatewayResponse =
            response.json().await.map_err(|e| AppError::Gateway {
                code: None,
                message: format!("Invalid gateway response: {}", e),
            })?;

        if !status.is_success() {
            return Err(AppError::Gateway {
                code: payload.code,
                message: payload
                    .description
                    .unwrap_or_else(|| format!("Gateway returned {}", status)),
            });
        }

        let external_id = payload.id.ok_or_else(|| AppError::Gateway {
            code: None,
            message: "Gateway response is missing the payment id".to_string(),
        })?;

        Ok(CheckoutSession {
            external_id,
            status: payload.status.unwrap_or_else(|| "pending".to_string()),
            confirmation_url: payload.confirmation.and_then(|c| c.confirmation_url),
        })
    }
}
