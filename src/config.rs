//! Application configuration loaded from environment variables.
//!
//! Configuration is loaded once at startup and validated before the server starts.
//!
//! ```bash
//! export DATABASE_URL="sqlite://snaplink.db?mode=rwc"
//! export PUBLIC_URL="https://s.example.com"
//! ```
//!
//! ## Optional Variables
//!
//! - `LISTEN` - Bind address (default: `0.0.0.0:3000`)
//! - `RUST_LOG` - Log level (default: `info`)
//! - `LOG_FORMAT` - Log format: `text` or `json` (default: `text`)
//! - `CODE_LENGTH` / `FALLBACK_CODE_LENGTH` - Generated code lengths (default: 6)
//! - `FLUSH_BUFFER_SIZE`, `FLUSH_INTERVAL_MS`, `FLUSH_QUEUE_CAPACITY` - Write-back tuning
//! - `FLUSH_MAX_ATTEMPTS`, `FLUSH_RETRY_DELAY_MS` - Flush retry policy
//! - `EXPIRY_SWEEP_INTERVAL_SECS` - Expiry reaper period (default: 86400)
//! - `ANALYTICS_ENABLED`, `ANALYTICS_WORKERS`, `ANALYTICS_QUEUE_CAPACITY` - Access analytics
//! - `ACCESS_LOG_ENABLED`, `ACCESS_LOG_PATH` - Combined Log Format sink
//! - `WEBHOOK_URL`, `WEBHOOK_TIMEOUT_SECS`, `WEBHOOK_HEADERS` - Webhook sink
//! - `PLAUSIBLE_URL`, `PLAUSIBLE_TIMEOUT_SECS` - Plausible sink
//! - `RATE_LIMIT_PER_SECOND`, `RATE_LIMIT_BURST` - Redirect rate limit per IP

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::application::store::{CacheConfig, FlushConfig, RetryPolicy, StoreConfig};

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub listen_addr: String,
    /// Base of generated short URLs, without trailing slash.
    pub public_url: String,
    pub log_level: String,
    pub log_format: String,

    // ── SqlitePool settings ─────────────────────────────────────────────────
    /// Maximum number of connections in the pool (`DB_MAX_CONNECTIONS`, default: 10).
    pub db_max_connections: u32,
    /// Timeout for acquiring a connection from the pool in seconds
    /// (`DB_CONNECT_TIMEOUT`, default: 30).
    pub db_connect_timeout: u64,
    /// Idle connection lifetime in seconds before it is closed
    /// (`DB_IDLE_TIMEOUT`, default: 600).
    pub db_idle_timeout: u64,
    /// Maximum connection lifetime in seconds (`DB_MAX_LIFETIME`, default: 1800).
    pub db_max_lifetime: u64,

    // ── Store ───────────────────────────────────────────────────────────────
    pub code_length: usize,
    pub fallback_code_length: usize,
    pub flush_buffer_size: usize,
    pub flush_interval_ms: u64,
    pub flush_queue_capacity: usize,
    pub flush_max_attempts: usize,
    pub flush_retry_delay_ms: u64,
    pub expiry_sweep_interval_secs: u64,

    // ── Analytics ───────────────────────────────────────────────────────────
    pub analytics_enabled: bool,
    pub analytics_workers: usize,
    pub analytics_queue_capacity: usize,
    pub access_log_enabled: bool,
    pub access_log_path: Option<String>,
    pub webhook_url: Option<String>,
    pub webhook_timeout_secs: u64,
    /// Extra webhook headers, parsed from `Name: value; Name2: value2`.
    pub webhook_headers: Vec<(String, String)>,
    pub plausible_url: Option<String>,
    pub plausible_timeout_secs: u64,

    // ── Rate limiting ───────────────────────────────────────────────────────
    pub rate_limit_per_second: u32,
    pub rate_limit_burst: u32,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let webhook_headers = match env::var("WEBHOOK_HEADERS") {
            Ok(raw) => parse_headers(&raw).context("Failed to parse WEBHOOK_HEADERS")?,
            Err(_) => Vec::new(),
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://snaplink.db?mode=rwc".to_string()),
            listen_addr: env::var("LISTEN").unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
            public_url: env::var("PUBLIC_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string()),

            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            db_connect_timeout: parse_env("DB_CONNECT_TIMEOUT", 30)?,
            db_idle_timeout: parse_env("DB_IDLE_TIMEOUT", 600)?,
            db_max_lifetime: parse_env("DB_MAX_LIFETIME", 1800)?,

            code_length: parse_env("CODE_LENGTH", 6)?,
            fallback_code_length: parse_env("FALLBACK_CODE_LENGTH", 6)?,
            flush_buffer_size: parse_env("FLUSH_BUFFER_SIZE", 100)?,
            flush_interval_ms: parse_env("FLUSH_INTERVAL_MS", 5000)?,
            flush_queue_capacity: parse_env("FLUSH_QUEUE_CAPACITY", 100)?,
            flush_max_attempts: parse_env("FLUSH_MAX_ATTEMPTS", 3)?,
            flush_retry_delay_ms: parse_env("FLUSH_RETRY_DELAY_MS", 100)?,
            expiry_sweep_interval_secs: parse_env("EXPIRY_SWEEP_INTERVAL_SECS", 86_400)?,

            analytics_enabled: parse_bool_env("ANALYTICS_ENABLED"),
            analytics_workers: parse_env("ANALYTICS_WORKERS", 2)?,
            analytics_queue_capacity: parse_env("ANALYTICS_QUEUE_CAPACITY", 1000)?,
            access_log_enabled: parse_bool_env("ACCESS_LOG_ENABLED"),
            access_log_path: non_empty_env("ACCESS_LOG_PATH"),
            webhook_url: non_empty_env("WEBHOOK_URL"),
            webhook_timeout_secs: parse_env("WEBHOOK_TIMEOUT_SECS", 5)?,
            webhook_headers,
            plausible_url: non_empty_env("PLAUSIBLE_URL"),
            plausible_timeout_secs: parse_env("PLAUSIBLE_TIMEOUT_SECS", 5)?,

            rate_limit_per_second: parse_env("RATE_LIMIT_PER_SECOND", 10)?,
            rate_limit_burst: parse_env("RATE_LIMIT_BURST", 100)?,
        })
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first variable that is out of range.
    pub fn validate(&self) -> Result<()> {
        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!(
                "DATABASE_URL must start with 'sqlite:', got '{}'",
                self.database_url
            );
        }

        if self.log_format != "text" && self.log_format != "json" {
            anyhow::bail!(
                "LOG_FORMAT must be 'text' or 'json', got '{}'",
                self.log_format
            );
        }

        if !self.listen_addr.contains(':') {
            anyhow::bail!(
                "LISTEN must be in format 'host:port', got '{}'",
                self.listen_addr
            );
        }

        if !self.public_url.starts_with("http://") && !self.public_url.starts_with("https://") {
            anyhow::bail!(
                "PUBLIC_URL must start with 'http://' or 'https://', got '{}'",
                self.public_url
            );
        }

        if self.db_max_connections == 0 {
            anyhow::bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        if self.db_connect_timeout == 0 {
            anyhow::bail!("DB_CONNECT_TIMEOUT must be greater than 0");
        }

        if !(4..=32).contains(&self.code_length) {
            anyhow::bail!("CODE_LENGTH must be between 4 and 32, got {}", self.code_length);
        }
        if !(4..=32).contains(&self.fallback_code_length) {
            anyhow::bail!(
                "FALLBACK_CODE_LENGTH must be between 4 and 32, got {}",
                self.fallback_code_length
            );
        }

        if self.flush_buffer_size == 0 {
            anyhow::bail!("FLUSH_BUFFER_SIZE must be at least 1");
        }
        if self.flush_interval_ms < 10 {
            anyhow::bail!(
                "FLUSH_INTERVAL_MS must be at least 10, got {}",
                self.flush_interval_ms
            );
        }
        if self.flush_queue_capacity == 0 {
            anyhow::bail!("FLUSH_QUEUE_CAPACITY must be at least 1");
        }
        if !(1..=10).contains(&self.flush_max_attempts) {
            anyhow::bail!(
                "FLUSH_MAX_ATTEMPTS must be between 1 and 10, got {}",
                self.flush_max_attempts
            );
        }

        if self.expiry_sweep_interval_secs == 0 {
            anyhow::bail!("EXPIRY_SWEEP_INTERVAL_SECS must be greater than 0");
        }

        if !(1..=64).contains(&self.analytics_workers) {
            anyhow::bail!(
                "ANALYTICS_WORKERS must be between 1 and 64, got {}",
                self.analytics_workers
            );
        }
        if self.analytics_queue_capacity == 0 {
            anyhow::bail!("ANALYTICS_QUEUE_CAPACITY must be at least 1");
        }

        for (name, url) in [("WEBHOOK_URL", &self.webhook_url), ("PLAUSIBLE_URL", &self.plausible_url)]
        {
            if let Some(url) = url
                && !url.starts_with("http://")
                && !url.starts_with("https://")
            {
                anyhow::bail!("{name} must start with 'http://' or 'https://', got '{url}'");
            }
        }

        if self.rate_limit_per_second == 0 {
            anyhow::bail!("RATE_LIMIT_PER_SECOND must be at least 1");
        }
        if self.rate_limit_burst == 0 {
            anyhow::bail!("RATE_LIMIT_BURST must be at least 1");
        }

        Ok(())
    }

    /// Store tunables derived from this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            cache: CacheConfig {
                code_length: self.code_length,
                fallback_code_length: self.fallback_code_length,
            },
            flush: FlushConfig {
                buffer_size: self.flush_buffer_size,
                flush_interval: Duration::from_millis(self.flush_interval_ms),
                queue_capacity: self.flush_queue_capacity,
                retry: RetryPolicy::new(
                    self.flush_max_attempts,
                    Duration::from_millis(self.flush_retry_delay_ms),
                ),
            },
            expiry_interval: Duration::from_secs(self.expiry_sweep_interval_secs),
        }
    }

    /// Prints configuration summary (without sensitive data).
    pub fn print_summary(&self) {
        tracing::info!("Configuration loaded:");
        tracing::info!("  Listen address: {}", self.listen_addr);
        tracing::info!("  Public URL: {}", self.public_url);
        tracing::info!("  Database: {}", self.database_url);
        tracing::info!("  Log level: {}", self.log_level);
        tracing::info!("  Log format: {}", self.log_format);
        tracing::info!(
            "  Flush: buffer {} / every {}ms / queue {} / {} attempts",
            self.flush_buffer_size,
            self.flush_interval_ms,
            self.flush_queue_capacity,
            self.flush_max_attempts
        );
        tracing::info!("  Expiry sweep: every {}s", self.expiry_sweep_interval_secs);

        if self.analytics_enabled {
            tracing::info!(
                "  Analytics: enabled ({} workers, queue {}), access log: {}, webhook: {}, plausible: {}",
                self.analytics_workers,
                self.analytics_queue_capacity,
                self.access_log_enabled,
                self.webhook_url.is_some(),
                self.plausible_url.is_some()
            );
        } else {
            tracing::info!("  Analytics: disabled");
        }

        tracing::info!(
            "  Rate limit: {}/s, burst {}",
            self.rate_limit_per_second,
            self.rate_limit_burst
        );
    }
}

/// Parses a numeric variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}

fn parse_bool_env(key: &str) -> bool {
    env::var(key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parses `Name: value; Name2: value2` into header pairs.
fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    raw.split(';')
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair
                .split_once(':')
                .with_context(|| format!("header '{pair}' must be in 'Name: value' form"))?;
            Ok::<_, anyhow::Error>((name.trim().to_string(), value.trim().to_string()))
        })
        .collect()
}

/// Loads and validates configuration from environment variables.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or validation fails.
///
/// # Note
///
/// This function expects environment variables to be already loaded
/// (e.g., via `dotenvy::dotenv()` in `main.rs`).
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
