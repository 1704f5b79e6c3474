//! Identity-provider webhook endpoint

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde_json::{Value, json};

use super::users::build_user_service;
use crate::AppState;
use crate::error::AppError;
use crate::identity::{self, WebhookHeaders};
use crate::metrics::WEBHOOK_EVENTS_TOTAL;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// POST /api/webhooks/identity
///
/// Verifies the delivery signature over the raw body before
/// touching the store.
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let (Some(id), Some(timestamp), Some(signature)) = (
        header(&headers, "svix-id"),
        header(&headers, "svix-timestamp"),
        header(&headers, "svix-signature"),
    ) else {
        return Err(AppError::Validation("Missing svix headers".to_string()));
    };

    let secret = state
        .config
        .webhook
        .signing_secret
        .as_deref()
        .ok_or_else(|| AppError::Config("Missing webhook secret".to_string()))?;

    let delivery = WebhookHeaders {
        id,
        timestamp,
        signature,
    };
    if let Err(error) = identity::verify_signature(
        secret,
        &delivery,
        &body,
        state.config.webhook.tolerance_seconds,
        chrono::Utc::now(),
    ) {
        tracing::warn!(webhook_id = id, %error, "Webhook verification failed");
        WEBHOOK_EVENTS_TOTAL
            .with_label_values(&["unknown", "rejected"])
            .inc();
        return Err(error);
    }

    let event = identity::parse_event(&body)?;
    let event_type = event.event_type().to_string();

    match build_user_service(&state).apply_event(&event).await {
        Ok(outcome) => {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[&event_type, outcome.as_label()])
                .inc();
            tracing::info!(webhook_id = id, event_type = %event_type, outcome = outcome.as_label(), "Webhook processed");
            Ok(Json(json!({ "success": true, "message": outcome.message() })))
        }
        Err(error) => {
            WEBHOOK_EVENTS_TOTAL
                .with_label_values(&[&event_type, "error"])
                .inc();
            Err(error)
        }
    }
}
