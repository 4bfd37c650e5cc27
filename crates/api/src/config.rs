//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `EKART_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `EKART_JWT_SECRET` - Bearer token signing secret (min 32 chars, high entropy)
//! - `RAZORPAY_KEY_ID` - Razorpay key id
//! - `RAZORPAY_KEY_SECRET` - Razorpay key secret (also signs payment callbacks)
//!
//! ## Optional
//! - `EKART_HOST` - Bind address (default: 127.0.0.1)
//! - `EKART_PORT` - Listen port (default: 3000)
//! - `EKART_CORS_ORIGINS` - Comma-separated allowed origins (default: `http://localhost:5173`)
//! - `RAZORPAY_API_BASE` - Gateway base URL (default: `https://api.razorpay.com/v1`)
//! - `EKART_RATE_LIMIT_WINDOW_SECS` - Order mutation rate-limit window (default: 60)
//! - `EKART_RATE_LIMIT_MAX` - Requests per window per client address (default: 10)
//! - `EKART_SALES_WINDOW_DAYS` - Trailing days in the sales series (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "put-your",
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

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Browser origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Bearer token signing secret
    pub jwt_secret: SecretString,
    /// Payment gateway credentials
    pub razorpay: RazorpayConfig,
    /// Order mutation rate limit
    pub rate_limit: RateLimitConfig,
    /// Trailing window of the sales series, in days
    pub sales_window_days: u32,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

/// Razorpay credentials.
///
/// Implements `Debug` manually to redact the key secret.
#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: SecretString,
    pub api_base: Url,
}

impl std::fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .field("api_base", &self.api_base.as_str())
            .finish()
    }
}

/// Fixed-window limit for one guarded route group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(60),
            max: 10,
        }
    }
}

/// Sentry client options.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    pub dsn: Option<String>,
    pub environment: Option<String>,
    pub sample_rate: f32,
    pub traces_sample_rate: f32,
}

impl ApiConfig {
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

        let database_url = get_database_url("EKART_DATABASE_URL")?;
        let host = parse_env_or("EKART_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let port = parse_env_or("EKART_PORT", 3000_u16)?;
        let cors_origins = parse_origins(&get_env_or_default(
            "EKART_CORS_ORIGINS",
            "http://localhost:5173",
        ));

        let jwt_secret = get_validated_secret("EKART_JWT_SECRET")?;
        validate_secret_length(&jwt_secret, "EKART_JWT_SECRET")?;

        let razorpay = RazorpayConfig::from_env()?;

        let rate_limit = RateLimitConfig {
            window: Duration::from_secs(parse_env_or("EKART_RATE_LIMIT_WINDOW_SECS", 60_u64)?),
            max: parse_env_or("EKART_RATE_LIMIT_MAX", 10_u64)?,
        };
        if rate_limit.window.is_zero() {
            return Err(ConfigError::InvalidEnvVar(
                "EKART_RATE_LIMIT_WINDOW_SECS".to_owned(),
                "must be greater than zero".to_owned(),
            ));
        }

        let sales_window_days = parse_env_or("EKART_SALES_WINDOW_DAYS", 30_u32)?;

        let sentry = SentryConfig {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or("SENTRY_SAMPLE_RATE", 1.0_f32)?,
            traces_sample_rate: parse_env_or("SENTRY_TRACES_SAMPLE_RATE", 0.0_f32)?,
        };

        Ok(Self {
            database_url,
            host,
            port,
            cors_origins,
            jwt_secret,
            razorpay,
            rate_limit,
            sales_window_days,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl RazorpayConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let api_base = get_env_or_default("RAZORPAY_API_BASE", "https://api.razorpay.com/v1");
        let api_base = Url::parse(&api_base)
            .map_err(|e| ConfigError::InvalidEnvVar("RAZORPAY_API_BASE".to_owned(), e.to_string()))?;

        Ok(Self {
            key_id: get_required_env("RAZORPAY_KEY_ID")?,
            key_secret: get_validated_secret("RAZORPAY_KEY_SECRET")?,
            api_base,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    std::env::var(primary_key)
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar(primary_key.to_owned()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an optional variable, falling back to `default` when unset.
fn parse_env_or<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        None => Ok(default),
    }
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| origin.trim_end_matches('/').to_owned())
        .collect()
}

fn validate_secret_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
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
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Reject placeholders and low-entropy values.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_placeholder_secrets_rejected() {
        for candidate in ["your-razorpay-secret", "changeme123", "PLACEHOLDER_value"] {
            let err = validate_secret_strength(candidate, "TEST_VAR").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)), "{candidate}");
        }
    }

    #[test]
    fn test_low_entropy_secret_rejected() {
        let result = validate_secret_strength(&"ab".repeat(20), "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_strong_secret_accepted() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_secret_length() {
        assert!(validate_secret_length(&SecretString::from("short"), "JWT").is_err());
        assert!(validate_secret_length(&SecretString::from("k".repeat(32)), "JWT").is_ok());
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(
            parse_origins(" http://localhost:5173/ ,https://ekart-store.vercel.app,, "),
            vec![
                "http://localhost:5173".to_owned(),
                "https://ekart-store.vercel.app".to_owned()
            ]
        );
    }

    #[test]
    fn test_razorpay_debug_redacts_secret() {
        let config = RazorpayConfig {
            key_id: "rzp_test_visible".to_owned(),
            key_secret: SecretString::from("super_secret_gateway_key"),
            api_base: Url::parse("https://api.razorpay.com/v1").unwrap(),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("rzp_test_visible"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_gateway_key"));
    }

    #[test]
    fn test_default_rate_limit() {
        let limit = RateLimitConfig::default();
        assert_eq!(limit.window, Duration::from_secs(60));
        assert_eq!(limit.max, 10);
    }
}
