//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    pub feed: FeedConfig,
    pub search: SearchConfig,
    #[serde(default)]
    pub debug: DebugConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Public domain (e.g., "murmur.example.com")
    pub domain: String,
    /// Protocol ("http" or "https")
    pub protocol: String,
}

impl ServerConfig {
    /// Get the public base URL
    ///
    /// # Returns
    /// Full URL like "https://murmur.example.com"
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.protocol, self.domain)
    }
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
    /// Connection pool size
    pub max_connections: u32,
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Algorithm of the identity provider's session tokens ("RS256" or "HS256")
    pub session_algorithm: String,
    /// PEM public key for RS256, shared secret (32+ bytes) for HS256
    pub session_key: String,
    /// Expected `iss` claim
    #[serde(default)]
    pub session_issuer: Option<String>,
    /// Accepted clock skew for `exp` and `nbf`
    pub session_leeway_seconds: u64,
}

/// Identity-provider webhook configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    /// Signing secret, `whsec_` followed by base64
    pub signing_secret: Option<String>,
    /// Accepted clock skew for `svix-timestamp`
    pub tolerance_seconds: i64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            tolerance_seconds: 300,
        }
    }
}

/// Identity-provider management API
///
/// Profile image pushes are skipped unless both `api_url` and `secret_key` are set.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub api_url: Option<String>,
    pub secret_key: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            secret_key: None,
            timeout_seconds: 10,
        }
    }
}

/// Feed paging
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl FeedConfig {
    /// Clamp a requested page size
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit)
    }
}

/// User search
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    pub max_results: usize,
}

/// Debug endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DebugConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (MURMUR__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.domain", "localhost")?
            .set_default("server.protocol", "http")?
            .set_default("database.path", "data/murmur.db")?
            .set_default("database.max_connections", 5)?
            .set_default("auth.session_algorithm", "RS256")?
            .set_default("auth.session_leeway_seconds", 30)?
            .set_default("webhook.tolerance_seconds", 300)?
            .set_default("identity.timeout_seconds", 10)?
            .set_default("feed.default_limit", 50)?
            .set_default("feed.max_limit", 100)?
            .set_default("search.max_results", 10)?
            .set_default("debug.enabled", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (MURMUR__*)
            .add_source(
                Environment::with_prefix("MURMUR")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        crate::auth::SessionVerifier::from_config(&self.auth)?;

        if self.feed.max_limit == 0 || self.feed.default_limit > self.feed.max_limit {
            return Err(crate::error::AppError::Config(
                "feed.default_limit must not exceed feed.max_limit (> 0)".to_string(),
            ));
        }

        if self.search.max_results == 0 {
            return Err(crate::error::AppError::Config(
                "search.max_results must be greater than 0".to_string(),
            ));
        }

        if self.webhook.tolerance_seconds <= 0 {
            return Err(crate::error::AppError::Config(
                "webhook.tolerance_seconds must be greater than 0".to_string(),
            ));
        }

        if let Some(api_url) = &self.identity.api_url {
            url::Url::parse(api_url).map_err(|e| {
                crate::error::AppError::Config(format!("identity.api_url is invalid: {}", e))
            })?;
        }

        if self.webhook.signing_secret.is_none() {
            tracing::warn!("webhook.signing_secret is not set; identity webhooks will be rejected");
        }

        if self.debug.enabled {
            tracing::warn!("Debug endpoints are enabled");
        }

        Ok(())
    }
}
