//! Session verification
//!
//! The identity provider signs a JWT after sign-in. Browsers carry it in the
//! `__session` cookie and API clients send it as a bearer token. The claims
//! hold the account fields mirrored on sync, so the provider's session token
//! template must include `email` and may add `username`, `first_name`,
//! `last_name` and `image_url`.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::error::AppError;

const MIN_SHARED_SECRET_BYTES: usize = 32;

/// Verified identity claims
///
/// The provider's view of the account, which is mirrored into the local
/// `users` table on sync.
#[derive(Debug, Clone)]
pub struct Session {
    /// Identity-provider subject id
    pub subject: String,
    /// Primary email address
    pub email: String,
    /// Provider-side username, if the provider has one
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Avatar URL
    pub image_url: Option<String>,
}

/// Claims of a provider session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl From<SessionClaims> for Session {
    fn from(claims: SessionClaims) -> Self {
        Self {
            subject: claims.sub,
            email: claims.email,
            username: claims.username,
            first_name: claims.first_name,
            last_name: claims.last_name,
            image_url: claims.image_url,
        }
    }
}

/// Verifies provider session tokens against the configured key
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    /// Build a verifier from `auth.*` settings
    ///
    /// # Errors
    /// `AppError::Config` for an unknown algorithm, an unparsable RSA
    /// public key, or an HS256 secret shorter than 32 bytes
    pub fn from_config(config: &AuthConfig) -> Result<Self, AppError> {
        let (algorithm, key) = match config.session_algorithm.to_ascii_uppercase().as_str() {
            "RS256" => {
                let key = DecodingKey::from_rsa_pem(config.session_key.as_bytes()).map_err(
                    |e| AppError::Config(format!("auth.session_key is not an RSA public key: {}", e)),
                )?;
                (Algorithm::RS256, key)
            }
            "HS256" => {
                if config.session_key.len() < MIN_SHARED_SECRET_BYTES {
                    return Err(AppError::Config(format!(
                        "auth.session_key must be at least {} bytes for HS256",
                        MIN_SHARED_SECRET_BYTES
                    )));
                }
                (Algorithm::HS256, DecodingKey::from_secret(config.session_key.as_bytes()))
            }
            other => {
                return Err(AppError::Config(format!(
                    "auth.session_algorithm {} is not supported (RS256 or HS256)",
                    other
                )));
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.leeway = config.session_leeway_seconds;
        validation.validate_nbf = true;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = &config.session_issuer {
            validation.set_issuer(&[issuer]);
        }

        Ok(Self { key, validation })
    }

    /// Verify and decode a session token
    ///
    /// # Errors
    /// `AppError::Unauthorized` if the token is malformed, forged, expired
    /// or from another issuer
    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|error| {
            tracing::debug!(%error, "Session token rejected");
            AppError::Unauthorized
        })?;

        Ok(data.claims.into())
    }
}
