//! Murmur - backend for a small social network
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - Posts, comments, likes, mentions                         │
//! │  - Users, profiles, notifications                           │
//! │  - Identity-provider webhooks                               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Mention extraction and fan-out                           │
//! │  - Notification-creating actions                            │
//! │  - Identity mirroring                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers
//! - `service`: Business logic layer
//! - `identity`: Identity-provider client and webhook verification
//! - `data`: Database layer
//! - `auth`: Session tokens and viewer extractors
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod identity;
pub mod metrics;
pub mod service;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and identity-provider client.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Identity-provider management API
    pub identity: Arc<dyn identity::IdentityProvider>,

    /// Verifier for the identity provider's session tokens
    pub sessions: Arc<auth::SessionVerifier>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database
    /// 2. Build the identity-provider client
    /// 3. Seed gauges from the store
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db = data::Database::connect_with_pool_size(
            &config.database.path,
            config.database.max_connections,
        )
        .await?;
        tracing::info!("Database connected");

        let identity: Arc<dyn identity::IdentityProvider> =
            match identity::HttpIdentityProvider::from_config(&config.identity)? {
                Some(provider) => {
                    tracing::info!("Identity provider API configured");
                    Arc::new(provider)
                }
                None => {
                    tracing::info!("Identity provider API not configured; image pushes disabled");
                    Arc::new(identity::DisabledIdentityProvider)
                }
            };

        metrics::USERS_TOTAL.set(db.count_users().await?);
        metrics::POSTS_TOTAL.set(db.count_posts().await?);

        tracing::info!("Application state initialized successfully");

        Self::from_parts(config, db, identity)
    }

    /// Assemble state from already-built parts
    ///
    /// # Errors
    /// Returns `AppError::Config` if the session key settings are invalid
    pub fn from_parts(
        config: config::AppConfig,
        db: data::Database,
        identity: Arc<dyn identity::IdentityProvider>,
    ) -> Result<Self, error::AppError> {
        let sessions = auth::SessionVerifier::from_config(&config.auth)?;

        Ok(Self {
            config: Arc::new(config),
            db: Arc::new(db),
            identity,
            sessions: Arc::new(sessions),
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, middleware};
    use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

    const MAX_BODY_BYTES: usize = 1024 * 1024;

    let cors_layer = build_cors_layer(&state.config.server);

    let metrics_routes = api::metrics_router().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_auth,
    ));

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .merge(metrics_routes)
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
