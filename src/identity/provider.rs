//! Identity provider management API client

use axum::async_trait;
use std::time::Duration;

use crate::config::IdentityConfig;
use crate::error::AppError;

/// Outbound calls to the identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Push a new profile image to the provider's copy of the account
    async fn update_profile_image(&self, external_id: &str, image_url: &str)
    -> Result<(), AppError>;
}

/// Provider client over its HTTP management API
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    api_url: String,
    secret_key: String,
}

impl HttpIdentityProvider {
    pub fn new(client: reqwest::Client, api_url: &str, secret_key: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        }
    }

    /// Build a client from configuration
    ///
    /// # Returns
    /// `None` unless both `identity.api_url` and `identity.secret_key` are set
    pub fn from_config(config: &IdentityConfig) -> Result<Option<Self>, AppError> {
        let (Some(api_url), Some(secret_key)) = (&config.api_url, &config.secret_key) else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .user_agent(concat!("Murmur/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| AppError::Internal(e.into()))?;

        Ok(Some(Self::new(client, api_url, secret_key)))
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn update_profile_image(
        &self,
        external_id: &str,
        image_url: &str,
    ) -> Result<(), AppError> {
        let url = format!("{}/users/{}", self.api_url, external_id);
        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.secret_key)
            .json(&serde_json::json!({ "image_url": image_url }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, external_id, body = %body, "Identity provider rejected image update");
            return Err(AppError::IdentityProvider(format!(
                "image update returned {}",
                status
            )));
        }

        tracing::debug!(external_id, "Profile image pushed to identity provider");
        Ok(())
    }
}

/// Used when the management API is not configured
pub struct DisabledIdentityProvider;

#[async_trait]
impl IdentityProvider for DisabledIdentityProvider {
    async fn update_profile_image(
        &self,
        external_id: &str,
        _image_url: &str,
    ) -> Result<(), AppError> {
        tracing::debug!(external_id, "Identity provider API not configured; skipping image push");
        Ok(())
    }
}
