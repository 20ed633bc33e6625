use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kassa::{
    api::{self, state::AppState},
    auth::AuthTokens,
    config::Settings,
    gateway::{PaymentGateway, YooKassaGateway},
    notify::{EmailChannel, NotificationChannel, NotificationQueue, TelegramChannel},
    payments::PaymentService,
    realtime::RealtimeHub,
    repository::{
        SqlitePaymentRepository, SqlitePricingRepository, SqlitePurchaseRepository,
        SqliteUserRepository,
    },
    tasks,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kassa=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting kassa server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Initialize repositories
    let payment_repo = Arc::new(SqlitePaymentRepository::new(db_pool.clone()));
    let purchase_repo = Arc::new(SqlitePurchaseRepository::new(db_pool.clone()));
    let pricing_repo = Arc::new(SqlitePricingRepository::new(db_pool.clone()));
    let user_repo = Arc::new(SqliteUserRepository::new(db_pool.clone()));

    // Register notification channels
    let mut channels: Vec<Arc<dyn NotificationChannel>> = Vec::new();
    if let Some(smtp) = &settings.notifications.smtp {
        match EmailChannel::new(smtp) {
            Ok(channel) => {
                tracing::info!("Email notifications enabled");
                channels.push(Arc::new(channel));
            }
            Err(e) => tracing::warn!("Email notifications disabled: {}", e),
        }
    }
    if let Some(telegram) = &settings.notifications.telegram {
        tracing::info!("Telegram ops notifications enabled");
        channels.push(Arc::new(TelegramChannel::new(telegram)));
    }
    let notifications = Arc::new(NotificationQueue::start(channels));

    // Realtime hub for payment_succeeded pushes
    let hub = Arc::new(RealtimeHub::new());

    // Initialize the payment gateway if configured
    let gateway: Option<Arc<dyn PaymentGateway>> = match (
        settings.gateway.shop_id.clone(),
        settings.gateway.secret_key.clone(),
    ) {
        (Some(shop_id), Some(secret_key)) => {
            tracing::info!("Payment gateway enabled");
            Some(Arc::new(YooKassaGateway::new(
                shop_id,
                secret_key,
                settings.gateway.api_url.clone(),
                settings.gateway.currency.clone(),
            )))
        }
        _ => {
            tracing::warn!("Payment gateway credentials missing, checkout disabled");
            None
        }
    };

    let tokens = Arc::new(AuthTokens::new(
        &settings.auth.jwt_secret,
        settings.auth.token_ttl_hours,
    ));

    let payment_service = Arc::new(PaymentService::new(
        payment_repo.clone(),
        purchase_repo,
        pricing_repo,
        user_repo.clone(),
        gateway,
        notifications,
        hub.clone(),
        settings.server.frontend_url.clone(),
        settings.gateway.currency.clone(),
    ));

    // Background jobs
    tasks::spawn_all(payment_repo, &settings.payments);

    let state = AppState::new(payment_service, user_repo, tokens, hub);
    let app = api::create_app(state);

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
