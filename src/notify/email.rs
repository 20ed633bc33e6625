use async_trait::async_trait;
use lettre::{
    message::{Mailbox, MultiPart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::SmtpConfig,
    domain::format_minor,
    error::{AppError, Result},
    notify::{NotificationChannel, PurchaseEvent},
};

/// Purchase confirmation email to the purchaser, over async SMTP.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)
            .map_err(|e| AppError::Internal(format!("SMTP transport setup failed: {}", e)))?
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        if let Some(port) = config.port {
            builder = builder.port(port);
        }

        let from_address = config
            .from_email
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid sender address: {}", e)))?;

        Ok(Self {
            transport: builder.build(),
            from: Mailbox::new(Some(config.from_name.clone()), from_address),
        })
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        "email"
    }

    async fn deliver(&self, event: &PurchaseEvent) -> Result<()> {
        let to: Mailbox = event
            .user_email
            .parse()
            .map_err(|e| AppError::Internal(format!("Invalid recipient address: {}", e)))?;

        let greeting = match &event.user_name {
            Some(name) => format!("Hello, {}!", name),
            None => "Hello!".to_string(),
        };
        let amount = format!("{} {}", format_minor(event.amount_minor), event.currency);

        let text = format!(
            "{} Thank you for your purchase. You ordered: {} ({}). \
             Our specialists will contact you shortly.",
            greeting, event.title, amount
        );
        let html = format!(
            r#"<div style="font-family: sans-serif; max-width: 480px; line-height: 1.5;">
  <h2 style="color: #333;">Thank you for your purchase!</h2>
  <p>{}</p>
  <p>You have successfully placed an order:</p>
  <p style="background: #f5f5f5; padding: 12px 16px; border-radius: 8px; margin: 16px 0;">
    <strong>{}</strong><br/>
    <span style="color: #666;">Amount: {}</span>
  </p>
  <p><strong>Our specialists will contact you shortly</strong> to confirm the details.</p>
  <p style="color: #666; font-size: 14px;">Questions? Just reply to this email.</p>
</div>"#,
            greeting, event.title, amount
        );

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Thank you for your purchase!")
            .multipart(MultiPart::alternative_plain_html(text, html))
            .map_err(|e| AppError::Internal(format!("Failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| AppError::Internal(format!("SMTP send failed: {}", e)))?;

        Ok(())
    }
}
