//! Identity webhook verification and parsing
//!
//! Events are signed with the provider's svix scheme:
//! `base64(hmac_sha256(secret, "{id}.{timestamp}.{body}"))`, sent as one
//! or more space-separated `v1,<signature>` entries.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use super::IdentityProfile;
use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

const SECRET_PREFIX: &str = "whsec_";

/// Signature headers of one delivery
#[derive(Debug, Clone, Copy)]
pub struct WebhookHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

/// Verify a delivery against the signing secret
///
/// # Errors
/// - `AppError::Config` if the secret is not valid base64
/// - `AppError::InvalidSignature` if the timestamp is stale or no signature matches
pub fn verify_signature(
    secret: &str,
    headers: &WebhookHeaders<'_>,
    body: &[u8],
    tolerance_seconds: i64,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let key = general_purpose::STANDARD
        .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
        .map_err(|_| AppError::Config("webhook.signing_secret is not valid base64".to_string()))?;

    let timestamp: i64 = headers
        .timestamp
        .trim()
        .parse()
        .map_err(|_| AppError::InvalidSignature)?;
    if now.timestamp().abs_diff(timestamp) > tolerance_seconds.unsigned_abs() {
        tracing::warn!(webhook_id = headers.id, timestamp, "Webhook timestamp outside tolerance");
        return Err(AppError::InvalidSignature);
    }

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| AppError::Config(format!("invalid webhook signing key: {}", e)))?;
    mac.update(headers.id.as_bytes());
    mac.update(b".");
    mac.update(headers.timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);

    let matched = headers
        .signature
        .split_whitespace()
        .filter_map(|entry| entry.strip_prefix("v1,"))
        .filter_map(|encoded| general_purpose::STANDARD.decode(encoded).ok())
        .any(|candidate| mac.clone().verify_slice(&candidate).is_ok());

    if matched {
        Ok(())
    } else {
        Err(AppError::InvalidSignature)
    }
}

/// Sign a payload the way the provider does (`v1,<base64>`)
pub fn sign_payload(
    secret: &str,
    id: &str,
    timestamp: i64,
    body: &[u8],
) -> Result<String, AppError> {
    let key = general_purpose::STANDARD
        .decode(secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret))
        .map_err(|_| AppError::Config("webhook.signing_secret is not valid base64".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| AppError::Config(format!("invalid webhook signing key: {}", e)))?;
    mac.update(format!("{}.{}.", id, timestamp).as_bytes());
    mac.update(body);

    Ok(format!(
        "v1,{}",
        general_purpose::STANDARD.encode(mac.finalize().into_bytes())
    ))
}

/// A verified identity event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    UserCreated(IdentityProfile),
    UserUpdated(IdentityProfile),
    UserDeleted { external_id: String },
    /// Acknowledged and ignored
    Other(String),
}

impl IdentityEvent {
    pub fn event_type(&self) -> &str {
        match self {
            Self::UserCreated(_) => "user.created",
            Self::UserUpdated(_) => "user.updated",
            Self::UserDeleted { .. } => "user.deleted",
            Self::Other(event_type) => event_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct EmailAddress {
    #[serde(default)]
    id: Option<String>,
    email_address: String,
}

#[derive(Debug, Deserialize)]
struct UserData {
    id: String,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    email_addresses: Vec<EmailAddress>,
    #[serde(default)]
    primary_email_address_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeletedData {
    #[serde(default)]
    id: Option<String>,
}

impl TryFrom<UserData> for IdentityProfile {
    type Error = AppError;

    fn try_from(data: UserData) -> Result<Self, Self::Error> {
        let primary = data
            .primary_email_address_id
            .as_deref()
            .and_then(|primary_id| {
                data.email_addresses
                    .iter()
                    .find(|address| address.id.as_deref() == Some(primary_id))
            })
            .or_else(|| data.email_addresses.first())
            .ok_or_else(|| AppError::Validation("user has no email address".to_string()))?;

        Ok(Self {
            email: primary.email_address.clone(),
            external_id: data.id,
            username: data.username.filter(|username| !username.trim().is_empty()),
            first_name: data.first_name,
            last_name: data.last_name,
            image_url: data.image_url,
        })
    }
}

/// Parse a verified webhook body
///
/// # Errors
/// `AppError::Validation` if the body is not a well-formed event
pub fn parse_event(body: &[u8]) -> Result<IdentityEvent, AppError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("invalid webhook payload: {}", e)))?;

    let invalid = |e: serde_json::Error| {
        AppError::Validation(format!("invalid {} payload: {}", envelope.event_type, e))
    };

    match envelope.event_type.as_str() {
        "user.created" | "user.updated" => {
            let data: UserData = serde_json::from_value(envelope.data.clone()).map_err(invalid)?;
            let profile = IdentityProfile::try_from(data)?;
            if envelope.event_type == "user.created" {
                Ok(IdentityEvent::UserCreated(profile))
            } else {
                Ok(IdentityEvent::UserUpdated(profile))
            }
        }
        "user.deleted" => {
            let data: DeletedData = serde_json::from_value(envelope.data.clone()).map_err(invalid)?;
            let external_id = data
                .id
                .ok_or_else(|| AppError::Validation("user.deleted without id".to_string()))?;
            Ok(IdentityEvent::UserDeleted { external_id })
        }
        _ => Ok(IdentityEvent::Other(envelope.event_type.clone())),
    }
}
