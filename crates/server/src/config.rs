//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ECOMSTORE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `PAYPAL_CLIENT_ID` - PayPal REST app client ID
//! - `PAYPAL_CLIENT_SECRET` - PayPal REST app secret (high entropy, not a placeholder)
//!
//! ## Optional
//! - `ECOMSTORE_HOST` - Bind address (default: 127.0.0.1)
//! - `ECOMSTORE_PORT` - Listen port (default: 3000)
//! - `ECOMSTORE_BASE_URL` - Public URL of the API (default: `http://localhost:3000`)
//! - `ECOMSTORE_CORS_ORIGINS` - Comma-separated list of allowed browser origins
//! - `PAYPAL_MODE` - `sandbox` (default) or `live`
//! - `PAYPAL_API_BASE` - Override the PayPal API base URL
//! - `PAYPAL_RETURN_URL` - Buyer redirect after approval (default: `{base}/checkout/capture`)
//! - `PAYPAL_CANCEL_URL` - Buyer redirect after cancelling (default: `{base}/checkout/cancel`)
//! - `PAYPAL_BRAND_NAME` - Brand shown on the PayPal page (default: Niche Store)
//! - `SHIPPING_PRICE` - Flat shipping charge per order (default: 0.00)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Performance trace sample rate (default: 0.0)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;
use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

const PAYPAL_SANDBOX_API: &str = "https://api-m.sandbox.paypal.com";
const PAYPAL_LIVE_API: &str = "https://api-m.paypal.com";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the API, without a trailing slash
    pub base_url: String,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Flat shipping price added to every order
    pub shipping_price: Decimal,
    /// PayPal REST API configuration
    pub paypal: PayPalConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
    /// Fraction of errors sent to Sentry
    pub sentry_sample_rate: f32,
    /// Fraction of transactions traced
    pub sentry_traces_sample_rate: f32,
    /// Emit JSON log lines instead of text
    pub json_logs: bool,
}

/// Which PayPal environment to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalMode {
    Sandbox,
    Live,
}

impl PayPalMode {
    #[must_use]
    pub const fn default_api_base(self) -> &'static str {
        match self {
            Self::Sandbox => PAYPAL_SANDBOX_API,
            Self::Live => PAYPAL_LIVE_API,
        }
    }
}

impl std::str::FromStr for PayPalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sandbox" => Ok(Self::Sandbox),
            "live" => Ok(Self::Live),
            other => Err(format!("expected 'sandbox' or 'live', got '{other}'")),
        }
    }
}

/// PayPal REST API configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct PayPalConfig {
    pub mode: PayPalMode,
    /// API base URL, without a trailing slash
    pub api_base: String,
    pub client_id: String,
    pub client_secret: SecretString,
    /// Where PayPal sends the buyer after approving
    pub return_url: String,
    /// Where PayPal sends the buyer after cancelling
    pub cancel_url: String,
    /// Brand name shown on the PayPal approval page
    pub brand_name: String,
}

impl std::fmt::Debug for PayPalConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalConfig")
            .field("mode", &self.mode)
            .field("api_base", &self.api_base)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("brand_name", &self.brand_name)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ECOMSTORE_DATABASE_URL")?;
        let host = parse_env("ECOMSTORE_HOST", "127.0.0.1")?;
        let port = parse_env("ECOMSTORE_PORT", "3000")?;
        let base_url = get_env_or_default("ECOMSTORE_BASE_URL", "http://localhost:3000")
            .trim_end_matches('/')
            .to_string();
        url::Url::parse(&base_url).map_err(|e| {
            ConfigError::InvalidEnvVar("ECOMSTORE_BASE_URL".to_string(), e.to_string())
        })?;
        let cors_origins = parse_list(&get_env_or_default("ECOMSTORE_CORS_ORIGINS", ""));
        let shipping_price: Decimal = parse_env("SHIPPING_PRICE", "0.00")?;
        if shipping_price.is_sign_negative() {
            return Err(ConfigError::InvalidEnvVar(
                "SHIPPING_PRICE".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let paypal = PayPalConfig::from_env(&base_url)?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            cors_origins,
            shipping_price,
            paypal,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("ENVIRONMENT"),
            sentry_sample_rate: parse_env("SENTRY_SAMPLE_RATE", "1.0")?,
            sentry_traces_sample_rate: parse_env("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
            json_logs: get_optional_env("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` attribute.
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl PayPalConfig {
    fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let mode: PayPalMode = parse_env("PAYPAL_MODE", "sandbox")?;
        let api_base = get_optional_env("PAYPAL_API_BASE")
            .unwrap_or_else(|| mode.default_api_base().to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            mode,
            api_base,
            client_id: get_required_env("PAYPAL_CLIENT_ID")?,
            client_secret: get_validated_secret("PAYPAL_CLIENT_SECRET")?,
            return_url: get_optional_env("PAYPAL_RETURN_URL")
                .unwrap_or_else(|| format!("{base_url}/checkout/capture")),
            cancel_url: get_optional_env("PAYPAL_CANCEL_URL")
                .unwrap_or_else(|| format!("{base_url}/checkout/cancel")),
            brand_name: get_env_or_default("PAYPAL_BRAND_NAME", "Niche Store"),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable, treating empty as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Split a comma-separated list, dropping blanks.
fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the secret issued by PayPal."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod fixtures {
    use super::*;

    /// Sandbox PayPal settings with a dummy secret.
    pub fn paypal_config() -> PayPalConfig {
        PayPalConfig {
            mode: PayPalMode::Sandbox,
            api_base: PAYPAL_SANDBOX_API.to_string(),
            client_id: "client_id_value".to_string(),
            client_secret: SecretString::from("super_secret_client_secret"),
            return_url: "http://localhost:3000/checkout/capture".to_string(),
            cancel_url: "http://localhost:3000/checkout/cancel".to_string(),
            brand_name: "Niche Store".to_string(),
        }
    }

    /// Local configuration for the given base URL.
    pub fn config(base_url: &str) -> Config {
        Config {
            database_url: SecretString::from("postgres://localhost/ecomstore_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: base_url.to_string(),
            cors_origins: Vec::new(),
            shipping_price: Decimal::ZERO,
            paypal: paypal_config(),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
            json_logs: false,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::fixtures::{config, paypal_config};
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-paypal-secret", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("EHk3x9Qz_L2mVb7Tq0Wn-Rf5Yc8Ud1Ai4Gs6Jp", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_paypal_mode_parsing() {
        assert_eq!("Sandbox".parse::<PayPalMode>().unwrap(), PayPalMode::Sandbox);
        assert_eq!("live".parse::<PayPalMode>().unwrap(), PayPalMode::Live);
        assert!("prod".parse::<PayPalMode>().is_err());
        assert_eq!(
            PayPalMode::Live.default_api_base(),
            "https://api-m.paypal.com"
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            parse_list(" http://a.test , ,http://b.test"),
            vec!["http://a.test".to_string(), "http://b.test".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config("http://localhost:3000").socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_https() {
        assert!(!config("http://localhost:3000").is_https());
        assert!(config("https://shop.test").is_https());
    }

    #[test]
    fn test_paypal_config_debug_redacts_secrets() {
        let debug_output = format!("{:?}", paypal_config());

        assert!(debug_output.contains("client_id_value"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_client_secret"));
    }
}
