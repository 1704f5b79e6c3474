//! Identity provider integration
//!
//! Handles:
//! - Normalized account claims (from sessions and webhooks)
//! - Outbound profile updates to the provider's management API
//! - Signed webhook verification and event parsing

mod provider;
pub mod webhook;

pub use provider::{DisabledIdentityProvider, HttpIdentityProvider, IdentityProvider};
#[cfg(test)]
pub use provider::MockIdentityProvider;
pub use webhook::{IdentityEvent, WebhookHeaders, parse_event, verify_signature};

use crate::auth::Session;

/// Account as the identity provider sees it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
    pub external_id: String,
    pub email: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub image_url: Option<String>,
}

impl IdentityProfile {
    /// Local part of the email, used as the default handle
    pub fn email_local_part(&self) -> &str {
        email_local_part(&self.email)
    }

    /// "first last", trimmed; `None` when both are blank
    pub fn display_name(&self) -> Option<String> {
        let name = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Provider username, falling back to the email local part
    pub fn default_username(&self) -> String {
        self.username
            .as_deref()
            .map(str::trim)
            .filter(|username| !username.is_empty())
            .unwrap_or_else(|| self.email_local_part())
            .to_string()
    }
}

impl From<&Session> for IdentityProfile {
    fn from(session: &Session) -> Self {
        Self {
            external_id: session.subject.clone(),
            email: session.email.clone(),
            username: session.username.clone(),
            first_name: session.first_name.clone(),
            last_name: session.last_name.clone(),
            image_url: session.image_url.clone(),
        }
    }
}

/// Part of an address before the first `@`
pub fn email_local_part(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}
