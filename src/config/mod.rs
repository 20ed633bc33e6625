use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Public origin of the storefront; the payer is sent back here after
    /// completing the hosted checkout page.
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    pub shop_id: Option<String>,
    pub secret_key: Option<String>,
    pub api_url: String,
    pub currency: String,
}

impl GatewayConfig {
    pub fn is_configured(&self) -> bool {
        self.shop_id.is_some() && self.secret_key.is_some()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            shop_id: None,
            secret_key: None,
            api_url: "https://api.yookassa.ru/v3/payments".to_string(),
            currency: "RUB".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationConfig {
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub username: String,
    pub password: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    /// Pending payments older than this are swept to `cancelled`.
    pub pending_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            pending_ttl_minutes: 60,
            sweep_interval_secs: 300,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.frontend_url", "http://localhost:5173")?
            .set_default("database.max_connections", 10)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("gateway.api_url", "https://api.yookassa.ru/v3/payments")?
            .set_default("gateway.currency", "RUB")?
            .set_default("payments.pending_ttl_minutes", 60)?
            .set_default("payments.sweep_interval_secs", 300)?
            // Add config file if it exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (with KASSA__ prefix, double underscore separates levels)
            .add_source(Environment::with_prefix("KASSA").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                frontend_url: "http://localhost:5173".to_string(),
            },
            database: DatabaseConfig {
                url: "sqlite://kassa.db".to_string(),
                max_connections: 10,
            },
            auth: AuthConfig {
                jwt_secret: "change-me-in-production".to_string(),
                token_ttl_hours: 24,
            },
            gateway: GatewayConfig::default(),
            notifications: NotificationConfig::default(),
            payments: PaymentsConfig::default(),
        }
    }
}
