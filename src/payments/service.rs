use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentStatus, Purchase, PurchaseStatus, User},
    error::{AppError, Result},
    gateway::{CreateCheckoutRequest, PaymentGateway},
    notify::{NotificationSink, PurchaseEvent},
    payments::webhook::GatewayNotification,
    realtime::{Broadcaster, PaymentSucceededEvent},
    repository::{PaymentRepository, PricingRepository, PurchaseRepository, UserRepository},
};

#[derive(Debug, Clone)]
pub struct CheckoutCreated {
    pub payment_id: Uuid,
    pub confirmation_url: Option<String>,
}

/// Orchestrates the payment lifecycle: checkout creation against the
/// gateway, webhook-driven reconciliation, purchase materialization, and
/// the notification fan-out.
pub struct PaymentService {
    payments: Arc<dyn PaymentRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    pricing: Arc<dyn PricingRepository>,
    users: Arc<dyn UserRepository>,
    gateway: Option<Arc<dyn PaymentGateway>>,
    notifications: Arc<dyn NotificationSink>,
    broadcaster: Arc<dyn Broadcaster>,
    frontend_url: String,
    currency: String,
}

impl PaymentService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        payments: Arc<dyn PaymentRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        pricing: Arc<dyn PricingRepository>,
        users: Arc<dyn UserRepository>,
        gateway: Option<Arc<dyn PaymentGateway>>,
        notifications: Arc<dyn NotificationSink>,
        broadcaster: Arc<dyn Broadcaster>,
        frontend_url: String,
        currency: String,
    ) -> Self {
        Self {
            payments,
            purchases,
            pricing,
            users,
            gateway,
            notifications,
            broadcaster,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
            currency,
        }
    }

    pub fn pricing_repo(&self) -> &dyn PricingRepository {
        self.pricing.as_ref()
    }

    /// Create a pending payment and a hosted checkout session for it.
    /// Returns the confirmation URL the client redirects the payer to.
    pub async fn create_checkout(&self, user: &User, pricing_id: Uuid) -> Result<CheckoutCreated> {
        let gateway = self
            .gateway
            .as_ref()
            .ok_or(AppError::GatewayUnconfigured)?;

        let pricing = self
            .pricing
            .find_by_id(pricing_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pricing plan not found".to_string()))?;

        let title = pricing.title.preferred().to_string();
        let now = Utc::now();
        let payment = self
            .payments
            .create(Payment {
                id: Uuid::new_v4(),
                user_id: user.id,
                pricing_id: pricing.id,
                external_payment_id: None,
                amount_minor: pricing.price_minor,
                title: title.clone(),
                status: PaymentStatus::Pending,
                created_at: now,
                updated_at: now,
            })
            .await?;

        let return_url = format!(
            "{}/payment/return?paymentId={}",
            self.frontend_url, payment.id
        );
        let session = gateway
            .create_checkout(CreateCheckoutRequest {
                amount_minor: payment.amount_minor,
                return_url,
                description: title,
                idempotence_key: Uuid::new_v4(),
            })
            .await?;

        self.payments
            .set_external_id(payment.id, &session.external_id)
            .await?;

        tracing::info!(
            payment_id = %payment.id,
            external_id = %session.external_id,
            "Checkout session created"
        );

        Ok(CheckoutCreated {
            payment_id: payment.id,
            confirmation_url: session.confirmation_url,
        })
    }

    /// Owner-only status check; the polling fallback for clients without an
    /// open realtime session.
    pub async fn payment_status(&self, user_id: Uuid, payment_id: Uuid) -> Result<Payment> {
        self.payments
            .find_owned(payment_id, user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    /// Consume a gateway notification. Irrelevant events, unknown payment
    /// ids, and replays all resolve to Ok(()): the webhook endpoint must
    /// acknowledge everything, and the status-guarded transition in the
    /// store already decided whether this delivery wins.
    pub async fn process_notification(&self, notification: GatewayNotification) -> Result<()> {
        let Some(external_id) = notification.succeeded_payment_id() else {
            tracing::debug!("Ignoring irrelevant gateway notification");
            return Ok(());
        };

        let Some(payment) = self.payments.mark_succeeded(external_id).await? else {
            tracing::debug!(external_id, "No pending payment for notification, ignoring");
            return Ok(());
        };

        tracing::info!(payment_id = %payment.id, "Payment succeeded");

        let purchase = self.materialize(&payment).await?;
        self.notify_purchase(&purchase).await;

        Ok(())
    }

    /// Create the durable purchase record for a succeeded payment, exactly
    /// once. The unique index on the payment reference backstops the
    /// status-guarded transition: if a racing delivery slipped past it, the
    /// insert collides and we return the row that already exists.
    async fn materialize(&self, payment: &Payment) -> Result<Purchase> {
        let now = Utc::now();
        let created = self
            .purchases
            .create(Purchase {
                id: Uuid::new_v4(),
                user_id: payment.user_id,
                pricing_id: payment.pricing_id,
                payment_id: Some(payment.id),
                title: payment.title.clone(),
                price_minor: payment.amount_minor,
                status: PurchaseStatus::Completed,
                created_at: now,
                updated_at: now,
            })
            .await;

        match created {
            Ok(purchase) => Ok(purchase),
            Err(AppError::Conflict(_)) => self
                .purchases
                .find_by_payment(payment.id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(
                        "Purchase insert conflicted but no existing row was found".to_string(),
                    )
                }),
            Err(e) => Err(e),
        }
    }

    /// Manual purchase creation: no gateway involved, the purchase is
    /// recorded as completed immediately. Email/ops notifications still
    /// fire; there is no realtime push because there was no checkout to
    /// wait on.
    pub async fn create_manual_purchase(&self, user: &User, pricing_id: Uuid) -> Result<Purchase> {
        let pricing = self
            .pricing
            .find_by_id(pricing_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Pricing plan not found".to_string()))?;

        let now = Utc::now();
        let purchase = self
            .purchases
            .create(Purchase {
                id: Uuid::new_v4(),
                user_id: user.id,
                pricing_id: pricing.id,
                payment_id: None,
                title: pricing.title.preferred().to_string(),
                price_minor: pricing.price_minor,
                status: PurchaseStatus::Completed,
                created_at: now,
                updated_at: now,
            })
            .await?;

        self.notify_purchase(&purchase).await;

        Ok(purchase)
    }

    pub async fn purchases_of(&self, user_id: Uuid) -> Result<Vec<Purchase>> {
        self.purchases.list_by_user(user_id).await
    }

    pub async fn set_purchase_status(
        &self,
        id: Uuid,
        status: PurchaseStatus,
    ) -> Result<Purchase> {
        self.purchases.update_status(id, status).await
    }

    /// Best-effort fan-out after a purchase lands. Failures here never
    /// reach the webhook response: the money moved, so the purchase stands
    /// and problems go to the log.
    async fn notify_purchase(&self, purchase: &Purchase) {
        let user = match self.users.find_by_id(purchase.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                tracing::warn!(
                    user_id = %purchase.user_id,
                    "Purchaser no longer exists, skipping notifications"
                );
                return;
            }
            Err(e) => {
                tracing::error!("Failed to load purchaser for notifications: {}", e);
                return;
            }
        };

        self.notifications.dispatch(PurchaseEvent {
            user_email: user.email,
            user_name: user.name,
            title: purchase.title.clone(),
            amount_minor: purchase.price_minor,
            currency: self.currency.clone(),
            purchase_id: purchase.id,
            created_at: purchase.created_at,
        });

        // Only gateway-backed purchases have a browser session waiting on
        // the checkout result.
        if let Some(payment_id) = purchase.payment_id {
            self.broadcaster
                .payment_succeeded(
                    user.id,
                    PaymentSucceededEvent {
                        payment_id,
                        purchase_id: purchase.id,
                    },
                )
                .await;
        }
    }
}
