use std::{env, sync::Arc};

/// Everything PayTrack reads from the environment at startup.
///
/// Built once in `main` and shared with every worker as
/// `web::Data<Arc<Config>>`.
#[derive(Clone, Debug)]
pub struct Config {
    /// `development` or `production`.
    pub environment: String,
    pub database_url: String,
    pub jwt_config: JwtConfig,
    pub server_host: String,
    pub server_port: u16,
    pub num_workers: usize,
    /// Comma-separated list of dashboard origins.
    pub cors_allowed_origin: String,
    /// Turns on the per-request log line as well as the fern logger.
    pub console_logging_enabled: bool,
    /// Public URL of the web application, used to build invoice links in emails.
    pub app_base_url: String,
    /// Default SMTP transport used when a user has no custom transport.
    pub smtp: SmtpConfig,
    /// Bearer secret required by the cron endpoint. `None` leaves it open.
    pub cron_secret: Option<String>,
    /// Exchange-rate API settings.
    pub currency: CurrencyConfig,
}

#[derive(Clone, Debug)]
pub struct JwtConfig {
    /// Signs session tokens and derives the cookie key, so at least 32 bytes.
    pub secret: String,
    pub expiration_hours: i64,
}

#[derive(Clone, Debug, Default)]
/// Default outbound mail relay.
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Implicit TLS (SMTPS) when true, STARTTLS otherwise.
    pub secure: bool,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Clone, Debug)]
pub struct CurrencyConfig {
    /// Base URL of the rate API; the base currency code is appended as the last path segment.
    pub api_url: String,
    /// How long a fetched rate table stays fresh.
    pub ttl_secs: i64,
    /// Currency all invoice amounts are stored in.
    pub default_currency: String,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        CurrencyConfig {
            api_url: "https://api.exchangerate-api.com/v4/latest".to_string(),
            ttl_secs: 3600,
            default_currency: "USD".to_string(),
        }
    }
}

impl JwtConfig {
    /// Panics when `JWT_SECRET` is missing or shorter than 32 bytes.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");
        assert!(
            secret.len() >= 32,
            "JWT_SECRET must be at least 32 bytes long"
        );

        JwtConfig {
            secret,
            expiration_hours: parsed_or("JWT_EXPIRATION_HOURS", 24),
        }
    }
}

fn string_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn flag_or(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        SmtpConfig {
            host: env::var("SMTP_HOST").unwrap_or_default(),
            port: parsed_or("SMTP_PORT", 587),
            username: env::var("SMTP_USER").unwrap_or_default(),
            password: env::var("SMTP_PASSWORD").unwrap_or_default(),
            secure: flag_or("SMTP_SECURE", false),
            from_email: string_or("SMTP_FROM_EMAIL", "noreply@paytrack.app"),
            from_name: string_or("SMTP_FROM_NAME", "PayTrack"),
        }
    }
}

impl CurrencyConfig {
    pub fn from_env() -> Self {
        let defaults = CurrencyConfig::default();
        CurrencyConfig {
            api_url: env::var("EXCHANGE_RATE_API_URL").unwrap_or(defaults.api_url),
            ttl_secs: parsed_or("EXCHANGE_RATE_TTL_SECS", defaults.ttl_secs),
            default_currency: env::var("DEFAULT_CURRENCY")
                .map(|c| c.to_uppercase())
                .unwrap_or(defaults.default_currency),
        }
    }
}

impl Config {
    /// `ENVIRONMENT`, `DATABASE_URL` and `JWT_SECRET` are required and
    /// panic when missing. Everything else has a development default:
    ///
    /// | variable | default |
    /// |---|---|
    /// | `IP` / `PORT` / `WORKERS` | `127.0.0.1` / `8080` / `4` |
    /// | `CORS_ALLOWED_ORIGIN`, `APP_BASE_URL` | `http://localhost:3000` |
    /// | `ENABLE_CONSOLE_LOGGING` | `true` |
    /// | `CRON_SECRET` | unset |
    ///
    /// Mail and exchange-rate variables are read by [`SmtpConfig::from_env`]
    /// and [`CurrencyConfig::from_env`].
    pub fn from_env() -> Arc<Self> {
        dotenvy::dotenv().ok();

        Arc::new(Config {
            environment: env::var("ENVIRONMENT").expect("ENVIRONMENT must be set"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_config: JwtConfig::from_env(),
            server_host: string_or("IP", "127.0.0.1"),
            server_port: parsed_or("PORT", 8080),
            num_workers: parsed_or("WORKERS", 4),
            cors_allowed_origin: string_or("CORS_ALLOWED_ORIGIN", "http://localhost:3000"),
            console_logging_enabled: flag_or("ENABLE_CONSOLE_LOGGING", true),
            app_base_url: string_or("APP_BASE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            smtp: SmtpConfig::from_env(),
            cron_secret: env::var("CRON_SECRET").ok().filter(|s| !s.is_empty()),
            currency: CurrencyConfig::from_env(),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Minimal configuration for tests and tools that never touch the environment.
    pub fn for_tests() -> Self {
        Config {
            environment: "development".to_string(),
            database_url: "postgres://localhost/paytrack_test".to_string(),
            jwt_config: JwtConfig {
                secret: "test-secret-that-is-at-least-32-bytes-long".to_string(),
                expiration_hours: 1,
            },
            server_host: "127.0.0.1".to_string(),
            server_port: 8080,
            num_workers: 1,
            cors_allowed_origin: "http://localhost:3000".to_string(),
            console_logging_enabled: false,
            app_base_url: "http://localhost:3000".to_string(),
            smtp: SmtpConfig {
                port: 587,
                from_email: "noreply@paytrack.app".to_string(),
                from_name: "PayTrack".to_string(),
                ..Default::default()
            },
            cron_secret: None,
            currency: CurrencyConfig::default(),
        }
    }
}
