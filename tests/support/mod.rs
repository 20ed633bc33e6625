//! Shared fixtures for the integration tests: an in-memory database with
//! migrations applied, a fake payment gateway, a recording notification
//! sink, and a fully wired router.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use tower::ServiceExt;
use uuid::Uuid;

use kassa::{
    api::{self, state::AppState},
    auth::AuthTokens,
    error::{AppError, Result},
    gateway::{CheckoutSession, CreateCheckoutRequest, PaymentGateway},
    notify::{NotificationSink, PurchaseEvent},
    payments::PaymentService,
    realtime::RealtimeHub,
    repository::{
        PricingRepository, SqlitePaymentRepository, SqlitePricingRepository,
        SqlitePurchaseRepository, SqliteUserRepository, UserRepository,
    },
};
use kassa::domain::{LocalizedText, Pricing, Role, User};

/// Gateway double: hands out deterministic checkout sessions and records
/// every request it saw.
pub struct FakeGateway {
    counter: AtomicUsize,
    pub calls: Mutex<Vec<CreateCheckoutRequest>>,
}

impl FakeGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_checkout(&self, request: CreateCheckoutRequest) -> Result<CheckoutSession> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        self.calls.lock().unwrap().push(request);
        Ok(CheckoutSession {
            external_id: format!("fake-pay-{}", n),
            status: "pending".to_string(),
            confirmation_url: Some(format!("https://gateway.test/confirm/fake-pay-{}", n)),
        })
    }
}

/// Gateway double that always fails the way a provider outage would.
pub struct BrokenGateway;

#[async_trait]
impl PaymentGateway for BrokenGateway {
    async fn create_checkout(&self, _request: CreateCheckoutRequest) -> Result<CheckoutSession> {
        Err(AppError::Gateway {
            code: Some("internal_server_error".to_string()),
            message: "Provider is down".to_string(),
        })
    }
}

/// Synchronous notification sink so tests can count fan-out events without
/// waiting on a worker task.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<PurchaseEvent>>,
}

impl NotificationSink for RecordingSink {
    fn dispatch(&self, event: PurchaseEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.events.lock().unwrap().len()
    }
}

enum GatewayKind {
    Fake,
    Broken,
    None,
}

pub struct TestApp {
    pub pool: SqlitePool,
    pub router: Router,
    pub service: Arc<PaymentService>,
    pub payments: Arc<SqlitePaymentRepository>,
    pub purchases: Arc<SqlitePurchaseRepository>,
    pub pricing: Arc<SqlitePricingRepository>,
    pub users: Arc<SqliteUserRepository>,
    pub gateway: Arc<FakeGateway>,
    pub sink: Arc<RecordingSink>,
    pub hub: Arc<RealtimeHub>,
    pub tokens: Arc<AuthTokens>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::build(GatewayKind::Fake).await
    }

    /// An app whose gateway credentials are absent, so checkout creation
    /// must answer 503.
    pub async fn spawn_unconfigured() -> Self {
        Self::build(GatewayKind::None).await
    }

    /// An app whose gateway is configured but failing, so checkout
    /// creation must answer 502.
    pub async fn spawn_broken_gateway() -> Self {
        Self::build(GatewayKind::Broken).await
    }

    async fn build(kind: GatewayKind) -> Self {
        // A single connection keeps every query on the same in-memory
        // database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .expect("connect in-memory database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        let payments = Arc::new(SqlitePaymentRepository::new(pool.clone()));
        let purchases = Arc::new(SqlitePurchaseRepository::new(pool.clone()));
        let pricing = Arc::new(SqlitePricingRepository::new(pool.clone()));
        let users = Arc::new(SqliteUserRepository::new(pool.clone()));

        let gateway = Arc::new(FakeGateway::new());
        let sink = Arc::new(RecordingSink::default());
        let hub = Arc::new(RealtimeHub::new());
        let tokens = Arc::new(AuthTokens::new("test-secret", 1));

        let service = Arc::new(PaymentService::new(
            payments.clone(),
            purchases.clone(),
            pricing.clone(),
            users.clone(),
            match kind {
                GatewayKind::Fake => Some(gateway.clone() as Arc<dyn PaymentGateway>),
                GatewayKind::Broken => Some(Arc::new(BrokenGateway)),
                GatewayKind::None => None,
            },
            sink.clone(),
            hub.clone(),
            "https://shop.test".to_string(),
            "RUB".to_string(),
        ));

        let state = AppState::new(service.clone(), users.clone(), tokens.clone(), hub.clone());

        Self {
            pool,
            router: api::create_app(state),
            service,
            payments,
            purchases,
            pricing,
            users,
            gateway,
            sink,
            hub,
            tokens,
        }
    }

    pub async fn create_user(&self, role: Role) -> User {
        let id = Uuid::new_v4();
        self.users
            .create(User {
                id,
                email: format!("user-{}@example.com", id),
                name: Some("Test User".to_string()),
                role,
                created_at: Utc::now(),
            })
            .await
            .expect("create user")
    }

    pub async fn create_pricing(&self, price_minor: i64) -> Pricing {
        let now = Utc::now();
        self.pricing
            .create(Pricing {
                id: Uuid::new_v4(),
                title: LocalizedText {
                    en: Some("Basic".to_string()),
                    ru: Some("Базовый".to_string()),
                    hy: None,
                },
                description: LocalizedText {
                    en: Some("Starter plan".to_string()),
                    ..Default::default()
                },
                price_minor,
                position: 0,
                is_popular: false,
                created_at: now,
                updated_at: now,
            })
            .await
            .expect("create pricing plan")
    }

    pub fn token_for(&self, user: &User) -> String {
        self.tokens.issue(user).expect("issue token")
    }

    /// One-shot request against the router, returning status and parsed
    /// JSON body (Null when the body is not JSON).
    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("route request");

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, json)
    }

    /// The webhook payload the gateway would deliver for a succeeded
    /// payment.
    pub fn succeeded_webhook(external_id: &str) -> Value {
        serde_json::json!({
            "type": "notification",
            "event": "payment.succeeded",
            "object": {
                "id": external_id,
                "status": "succeeded",
            }
        })
    }
}
