use async_trait::async_trait;
use serde_json::json;

use crate::{
    config::TelegramConfig,
    domain::format_minor,
    error::{AppError, Result},
    notify::{NotificationChannel, PurchaseEvent},
};

/// Operational chat notification: posts purchase details to the internal
/// ops chat through the Telegram Bot API.
pub struct TelegramChannel {
    http: reqwest::Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn deliver(&self, event: &PurchaseEvent) -> Result<()> {
        let mut lines = vec!["New purchase".to_string(), String::new()];
        if let Some(name) = &event.user_name {
            lines.push(format!("Name: {}", name));
        }
        lines.push(format!("Email: {}", event.user_email));
        lines.push(format!("Product: {}", event.title));
        lines.push(format!(
            "Amount: {} {}",
            format_minor(event.amount_minor),
            event.currency
        ));
        lines.push(format!("Order ID: {}", event.purchase_id));
        lines.push(format!(
            "Date: {}",
            event.created_at.format("%Y-%m-%d %H:%M UTC")
        ));

        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let response = self
            .http
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": lines.join("\n"),
                "disable_web_page_preview": true,
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Telegram request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!(
                "Telegram sendMessage failed: {} {}",
                status, body
            )));
        }

        Ok(())
    }
}
