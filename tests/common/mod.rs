//! Common test utilities for E2E tests

#![allow(dead_code)]

pub mod schema_validator;

use std::sync::Arc;

use murmur::data::{EntityId, User};
use murmur::identity::{DisabledIdentityProvider, IdentityProvider};
use murmur::{AppState, config};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// base64("murmur-webhook-test-secret")
pub const WEBHOOK_SECRET: &str = "whsec_bXVybXVyLXdlYmhvb2stdGVzdC1zZWNyZXQ=";

pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Identity provider whose API always fails
pub struct FailingIdentityProvider;

#[axum::async_trait]
impl IdentityProvider for FailingIdentityProvider {
    async fn update_profile_image(
        &self,
        _external_id: &str,
        _image_url: &str,
    ) -> Result<(), murmur::error::AppError> {
        Err(murmur::error::AppError::IdentityProvider(
            "image update returned 503 Service Unavailable".to_string(),
        ))
    }
}

pub fn test_config(db_path: std::path::PathBuf) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
        },
        database: config::DatabaseConfig {
            path: db_path,
            max_connections: 5,
        },
        auth: config::AuthConfig {
            session_algorithm: "HS256".to_string(),
            session_key: SESSION_SECRET.to_string(),
            session_issuer: None,
            session_leeway_seconds: 30,
        },
        webhook: config::WebhookConfig {
            signing_secret: Some(WEBHOOK_SECRET.to_string()),
            tolerance_seconds: 300,
        },
        identity: config::IdentityConfig::default(),
        feed: config::FeedConfig {
            default_limit: 50,
            max_limit: 100,
        },
        search: config::SearchConfig { max_results: 10 },
        debug: config::DebugConfig { enabled: true },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_options(|_| {}, Arc::new(DisabledIdentityProvider)).await
    }

    /// Create a test server with a tweaked configuration
    pub async fn with_config(configure: impl FnOnce(&mut config::AppConfig)) -> Self {
        Self::with_options(configure, Arc::new(DisabledIdentityProvider)).await
    }

    /// Create a test server with a specific identity provider
    pub async fn with_identity(identity: Arc<dyn IdentityProvider>) -> Self {
        Self::with_options(|_| {}, identity).await
    }

    async fn with_options(
        configure: impl FnOnce(&mut config::AppConfig),
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        // Create temporary directory for test database
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(temp_dir.path().join("test.db"));
        configure(&mut config);

        let db = murmur::data::Database::connect(&config.database.path)
            .await
            .unwrap();
        let state = AppState::from_parts(config, db, identity).unwrap();

        // Create HTTP client
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = murmur::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait a bit for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        Self {
            addr: addr_str,
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Sign a session token the way the identity provider does
    pub fn session_token(&self, subject: &str, email: &str, username: Option<&str>) -> String {
        use jsonwebtoken::{EncodingKey, Header, encode};
        use murmur::auth::SessionClaims;

        let claims = SessionClaims {
            sub: subject.to_string(),
            exp: (chrono::Utc::now() + chrono::Duration::days(7)).timestamp(),
            nbf: None,
            iss: None,
            email: email.to_string(),
            username: username.map(str::to_string),
            first_name: Some("Test".to_string()),
            last_name: Some("User".to_string()),
            image_url: Some("https://img.example.com/avatar.png".to_string()),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SESSION_SECRET.as_bytes()),
        )
        .expect("Failed to create test token")
    }

    /// Insert a mirrored user and return it with a session token
    pub async fn create_user(&self, username: &str) -> (User, String) {
        let now = chrono::Utc::now();
        let user = User {
            id: EntityId::new().0,
            external_id: format!("user_{}", username),
            email: format!("{}@example.com", username),
            username: username.to_string(),
            name: Some(format!("{} name", username)),
            bio: None,
            image: None,
            location: None,
            website: None,
            created_at: now,
            updated_at: now,
        };
        self.state.db.insert_user(&user).await.unwrap();

        let token = self.session_token(&user.external_id, &user.email, Some(username));
        (user, token)
    }

    /// POST JSON with a bearer token
    pub async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    /// GET with a bearer token
    pub async fn get_authed(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Deliver a webhook body signed with the test secret
    pub async fn send_webhook(&self, body: &serde_json::Value) -> reqwest::Response {
        let body = serde_json::to_vec(body).unwrap();
        let timestamp = chrono::Utc::now().timestamp();
        let msg_id = format!("msg_{}", EntityId::new().0);
        let signature =
            murmur::identity::webhook::sign_payload(WEBHOOK_SECRET, &msg_id, timestamp, &body)
                .unwrap();

        self.client
            .post(self.url("/api/webhooks/identity"))
            .header("svix-id", msg_id)
            .header("svix-timestamp", timestamp.to_string())
            .header("svix-signature", signature)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .unwrap()
    }

    /// Create a post through the API and return its id
    pub async fn create_post(&self, token: &str, content: &str) -> String {
        let response = self
            .post_json("/api/posts", token, serde_json::json!({ "content": content }))
            .await;
        assert_eq!(response.status(), 201);
        let json: serde_json::Value = response.json().await.unwrap();
        json["post"]["id"].as_str().unwrap().to_string()
    }
}
