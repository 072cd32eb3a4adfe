//! Application configuration loaded from environment variables.
//!
//! # Configuration Hierarchy
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `JWT_SECRET`: HS256 signing key for caller tokens (change in production!)
//! - `ADMIN_API_KEY`: When set, enables the administrative endpoints
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins (default: `*` for dev)
//!
//! # Pipeline Tuning
//!
//! - `TOKEN_TTL_MINUTES`: Lifetime of issued caller tokens (default: 15)
//! - `BODY_CACHE_LIMIT_BYTES`: Maximum request body retained for auditing (default: 65536)
//! - `AUDIT_QUEUE_CAPACITY`: Bounded queue between request handling and audit persistence
//!   (default: 1024)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Minimum HS256 key length in bytes. Shorter keys are trivially brute-forced.
const MIN_JWT_SECRET_BYTES: usize = 32;

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 3000)
    pub port: u16,

    // =========================================================================
    // Security Configuration
    // =========================================================================
    /// HS256 signing secret for caller tokens.
    ///
    /// The default is for local development only and must be overridden in
    /// any real deployment.
    pub jwt_secret: String,

    /// Lifetime of issued caller tokens (default: 15 minutes)
    pub token_ttl: Duration,

    /// API key seeded into the stored "Admin" credential at startup.
    ///
    /// The admin guard resolves the key from storage, not from this field.
    /// When unset, no admin credential exists and every admin request is
    /// rejected rather than silently allowed.
    pub admin_api_key: Option<String>,

    /// Comma-separated list of allowed CORS origins
    /// Use "*" to allow all origins (not recommended for production)
    /// Example: `<https://app.example.com>,<https://admin.example.com>`
    pub cors_allowed_origins: Vec<String>,

    // =========================================================================
    // Audit Pipeline Configuration
    // =========================================================================
    /// Maximum request body size retained for audit snapshots (default: 64KB).
    /// Larger bodies still reach the handler but are not snapshotted.
    pub body_cache_limit: usize,

    /// Capacity of the bounded queue feeding the audit writer task (default: 1024).
    /// When full, new entries are dropped and counted rather than blocking requests.
    pub audit_queue_capacity: usize,

    // =========================================================================
    // Observability Configuration
    // =========================================================================
    /// Log level (e.g., "info", "debug", "trace")
    pub log_level: String,

    /// Port for Prometheus metrics endpoint (default: 9090, 0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if any required configuration is invalid
    /// (e.g., non-numeric PORT value, undersized JWT secret).
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            // Server
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 3000)?,

            // Security
            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                "faceMatchAppSecureJWTKeyChangeInProduction123456789".to_string()
            }),
            token_ttl: Duration::from_secs(60 * Self::parse_env("TOKEN_TTL_MINUTES", 15)?),
            admin_api_key: env::var("ADMIN_API_KEY").ok().filter(|k| !k.is_empty()),
            cors_allowed_origins: Self::parse_cors_origins(),

            // Audit pipeline
            body_cache_limit: Self::parse_env("BODY_CACHE_LIMIT_BYTES", 64 * 1024)?,
            audit_queue_capacity: Self::parse_env("AUDIT_QUEUE_CAPACITY", 1024)?,

            // Observability
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            metrics_port: Self::parse_env("METRICS_PORT", 9090)?,
        };

        // Validate configuration before returning
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConfigError` if validation fails.
    fn validate(&self) -> AppResult<()> {
        if self.jwt_secret.len() < MIN_JWT_SECRET_BYTES {
            return Err(AppError::ConfigError(format!(
                "JWT_SECRET must be at least {MIN_JWT_SECRET_BYTES} bytes for HS256"
            )));
        }

        if self.token_ttl.is_zero() {
            return Err(AppError::ConfigError(
                "TOKEN_TTL_MINUTES must be greater than 0".to_string(),
            ));
        }

        if self.body_cache_limit == 0 {
            return Err(AppError::ConfigError(
                "BODY_CACHE_LIMIT_BYTES must be greater than 0".to_string(),
            ));
        }

        if self.audit_queue_capacity == 0 {
            return Err(AppError::ConfigError(
                "AUDIT_QUEUE_CAPACITY must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if an admin API key has been configured.
    ///
    /// Admin routes are always registered; without a configured key every
    /// request to them is rejected.
    pub fn admin_key_configured(&self) -> bool {
        self.admin_api_key.is_some()
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        if self.metrics_enabled() {
            Some(std::net::SocketAddr::from((
                [0, 0, 0, 0],
                self.metrics_port,
            )))
        } else {
            None
        }
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr + ToString,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .parse()
                .map_err(|e| AppError::ConfigError(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    /// Parse CORS allowed origins from environment variable.
    fn parse_cors_origins() -> Vec<String> {
        env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Server
            host: "0.0.0.0".to_string(),
            port: 3000,
            // Security
            jwt_secret: "faceMatchAppSecureJWTKeyChangeInProduction123456789".to_string(),
            token_ttl: Duration::from_secs(15 * 60),
            admin_api_key: None,
            cors_allowed_origins: vec!["*".to_string()],
            // Audit pipeline
            body_cache_limit: 64 * 1024,
            audit_queue_capacity: 1024,
            // Observability
            log_level: "info".to_string(),
            metrics_port: 9090,
        }
    }
}
