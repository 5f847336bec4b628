use crate::core::{AppError, Result};
use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub mod database;
pub mod server;

pub use database::DatabaseConfig;
pub use server::ServerConfig;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub tap: TapConfig,
    pub store: StoreConfig,
    pub installments: InstallmentSettings,
    pub redirects: RedirectConfig,
    pub scheduler: SchedulerConfig,
    pub webhook: WebhookConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: String,
    pub log_level: String,
    /// `json` switches the fmt layer to JSON lines
    pub log_format: String,
    /// Public base URL of this service, used for the webhook `post.url`
    pub site_url: String,
    /// Recipient of the monthly report
    pub admin_email: String,
}

/// Tap payment API credentials and defaults
#[derive(Debug, Clone)]
pub struct TapConfig {
    pub test_mode: bool,
    pub test_secret_key: String,
    pub live_secret_key: String,
    pub merchant_id: String,
    pub base_url: String,
    pub webhook_secret: String,
    pub timeout: Duration,
    pub statement_descriptor: String,
}

impl TapConfig {
    /// Secret key for the active mode
    pub fn secret_key(&self) -> &str {
        if self.test_mode {
            &self.test_secret_key
        } else {
            &self.live_secret_key
        }
    }
}

/// Host store REST API (orders, products, notes)
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub timeout: Duration,
}

/// Merchant-level installment settings
#[derive(Debug, Clone)]
pub struct InstallmentSettings {
    pub enabled: bool,
    pub default_count: u32,
    pub max_count: u32,
    pub min_installment_amount: Decimal,
}

impl Default for InstallmentSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            default_count: 3,
            max_count: 12,
            min_installment_amount: Decimal::TEN,
        }
    }
}

/// Customer landing pages after the hosted payment page
#[derive(Debug, Clone, Default)]
pub struct RedirectConfig {
    pub success_url: String,
    pub failure_url: String,
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// Pause between consecutive invoice API calls in a batch
    pub invoice_delay: Duration,
    /// Reminders go out for installments due within this many days
    pub reminder_days: u32,
    /// Invoice expiry is due date plus this many days
    pub invoice_expiry_days: u32,
    /// How often the runner wakes to check which jobs are due
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            invoice_delay: Duration::from_secs(1),
            reminder_days: 3,
            invoice_expiry_days: 7,
            tick_interval: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub rate_limit_per_hour: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            rate_limit_per_hour: 100,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Argon2 PHC string of the admin API key
    pub admin_api_key_hash: String,
    /// Argon2 PHC string of the key the host store presents on customer routes
    pub host_api_key_hash: String,
}

/// Read an env var, falling back to `default`, and parse it.
fn env_parse<T: FromStr>(key: &str, default: &str) -> Result<T> {
    env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| AppError::Configuration(format!("Invalid {}", key)))
}

fn env_required(key: &str) -> Result<String> {
    env::var(key).map_err(|_| AppError::Configuration(format!("{} not set", key)))
}

/// Host-style truthiness: "yes", "true", "1", "on".
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "yes" | "true" | "1" | "on"
    )
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();

        let test_mode = parse_flag(&env::var("TAP_TEST_MODE").unwrap_or_else(|_| "yes".into()));
        let test_secret_key = env::var("TAP_TEST_SECRET_KEY").unwrap_or_default();
        let live_secret_key = env::var("TAP_LIVE_SECRET_KEY").unwrap_or_default();
        let active_key = if test_mode {
            test_secret_key.clone()
        } else {
            live_secret_key.clone()
        };

        let config = Config {
            app: AppConfig {
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                site_url: env::var("SITE_URL")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string()),
                admin_email: env::var("ADMIN_EMAIL").unwrap_or_default(),
            },
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            tap: TapConfig {
                test_mode,
                test_secret_key,
                live_secret_key,
                merchant_id: env::var("TAP_MERCHANT_ID").unwrap_or_default(),
                base_url: env::var("TAP_BASE_URL")
                    .unwrap_or_else(|_| "https://api.tap.company/v2".to_string()),
                webhook_secret: env::var("TAP_WEBHOOK_SECRET").unwrap_or(active_key),
                timeout: Duration::from_secs(env_parse("TAP_TIMEOUT_SECS", "30")?),
                statement_descriptor: env::var("TAP_STATEMENT_DESCRIPTOR")
                    .unwrap_or_else(|_| "Installment payment".to_string()),
            },
            store: StoreConfig {
                base_url: env_required("STORE_URL")?,
                consumer_key: env::var("STORE_CONSUMER_KEY").unwrap_or_default(),
                consumer_secret: env::var("STORE_CONSUMER_SECRET").unwrap_or_default(),
                timeout: Duration::from_secs(env_parse("STORE_TIMEOUT_SECS", "30")?),
            },
            installments: InstallmentSettings {
                enabled: parse_flag(
                    &env::var("INSTALLMENTS_ENABLED").unwrap_or_else(|_| "yes".into()),
                ),
                default_count: env_parse("DEFAULT_INSTALLMENT_COUNT", "3")?,
                max_count: env_parse("MAX_INSTALLMENT_COUNT", "12")?,
                min_installment_amount: env_parse("MIN_INSTALLMENT_AMOUNT", "10")?,
            },
            redirects: RedirectConfig {
                success_url: env::var("SUCCESS_REDIRECT_URL").unwrap_or_default(),
                failure_url: env::var("FAILURE_REDIRECT_URL").unwrap_or_default(),
            },
            scheduler: SchedulerConfig {
                enabled: parse_flag(
                    &env::var("SCHEDULER_ENABLED").unwrap_or_else(|_| "yes".into()),
                ),
                invoice_delay: Duration::from_millis(env_parse("INVOICE_DELAY_MS", "1000")?),
                reminder_days: env_parse("REMINDER_DAYS", "3")?,
                invoice_expiry_days: env_parse("INVOICE_EXPIRY_DAYS", "7")?,
                tick_interval: Duration::from_secs(env_parse("SCHEDULER_TICK_SECS", "3600")?),
            },
            webhook: WebhookConfig {
                rate_limit_per_hour: env_parse("WEBHOOK_RATE_LIMIT_PER_HOUR", "100")?,
            },
            security: SecurityConfig {
                admin_api_key_hash: env_required("ADMIN_API_KEY_HASH")?,
                host_api_key_hash: env_required("HOST_API_KEY_HASH")?,
            },
        };

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.tap.secret_key().is_empty() {
            return Err(AppError::Configuration(format!(
                "Tap {} secret key is not configured",
                if self.tap.test_mode { "test" } else { "live" }
            )));
        }

        if self.tap.webhook_secret.is_empty() {
            return Err(AppError::Configuration(
                "Webhook secret is not configured".to_string(),
            ));
        }

        self.installments.validate()?;

        if self.webhook.rate_limit_per_hour == 0 {
            return Err(AppError::Configuration(
                "Webhook rate limit must be greater than 0".to_string(),
            ));
        }

        if self.scheduler.tick_interval.is_zero() {
            return Err(AppError::Configuration(
                "Scheduler tick interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl InstallmentSettings {
    pub fn validate(&self) -> Result<()> {
        if self.max_count < 2 {
            return Err(AppError::Configuration(
                "Maximum installment count must be at least 2".to_string(),
            ));
        }
        if self.default_count < 2 || self.default_count > self.max_count {
            return Err(AppError::Configuration(format!(
                "Default installment count must be between 2 and {}",
                self.max_count
            )));
        }
        if self.min_installment_amount < Decimal::ZERO {
            return Err(AppError::Configuration(
                "Minimum installment amount cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}
