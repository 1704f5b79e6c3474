//! Mention service
//!
//! Extracts `@handle` tokens from text and fans out one mention
//! plus one MENTION notification per resolved user.

use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};

use crate::data::{Database, EntityId, Mention, Notification, NotificationKind, UserRef};
use crate::error::AppError;

static HANDLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("Invalid mention regex"));

/// Extract `@handle` tokens (without the `@`) in text order
///
/// Duplicates are kept and matching is case-sensitive.
///
/// ```
/// use murmur::service::extract_handles;
///
/// let handles = extract_handles("hello @alice and @bob, great job @alice");
/// assert_eq!(handles, vec!["alice", "bob", "alice"]);
/// ```
pub fn extract_handles(text: &str) -> Vec<String> {
    HANDLE_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Where a mention occurred
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MentionContext {
    pub post_id: Option<String>,
    pub comment_id: Option<String>,
}

impl MentionContext {
    pub fn post(post_id: &str) -> Self {
        Self {
            post_id: Some(post_id.to_string()),
            comment_id: None,
        }
    }

    pub fn comment(post_id: &str, comment_id: &str) -> Self {
        Self {
            post_id: Some(post_id.to_string()),
            comment_id: Some(comment_id.to_string()),
        }
    }
}

/// Result of a fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MentionOutcome {
    NoMentions,
    NoValidUsers,
    Created {
        mentions: usize,
        notifications: usize,
        /// Handles that appeared more than once in the text
        duplicate_handles: usize,
        #[serde(skip)]
        mentioned: Vec<UserRef>,
    },
}

impl MentionOutcome {
    pub fn message(&self) -> String {
        match self {
            Self::NoMentions => "No mentions found".to_string(),
            Self::NoValidUsers => "No valid users mentioned".to_string(),
            Self::Created { mentions, .. } => {
                format!("Created {} mentions and notifications", mentions)
            }
        }
    }
}

/// Mention service
pub struct MentionService {
    db: Arc<Database>,
}

impl MentionService {
    /// Create new mention service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Extract handles from `content` and notify every mentioned user
    ///
    /// The mentioner never mentions themself and unknown handles are
    /// dropped. All rows are written in one transaction.
    ///
    /// # Errors
    /// `AppError::Validation` if `content` is blank
    pub async fn process(
        &self,
        content: &str,
        mentioner_id: &str,
        context: &MentionContext,
    ) -> Result<MentionOutcome, AppError> {
        if content.trim().is_empty() {
            return Err(AppError::Validation("No content provided".to_string()));
        }

        let handles = extract_handles(content);
        if handles.is_empty() {
            return Ok(MentionOutcome::NoMentions);
        }

        let mut seen = HashSet::new();
        let distinct: Vec<String> = handles
            .iter()
            .filter(|handle| seen.insert(handle.as_str()))
            .cloned()
            .collect();
        let duplicate_handles = handles.len() - distinct.len();

        let users = self.db.find_users_by_usernames(&distinct).await?;
        if users.is_empty() {
            return Ok(MentionOutcome::NoValidUsers);
        }

        let post_id = context.post_id.as_deref();
        let comment_id = context.comment_id.as_deref();
        let now = chrono::Utc::now();

        let mentioned: Vec<UserRef> = users
            .into_iter()
            .filter(|user| user.id != mentioner_id)
            .collect();

        let entries: Vec<(Mention, Notification)> = mentioned
            .iter()
            .map(|user| {
                let mention = Mention {
                    id: EntityId::new().0,
                    user_id: user.id.clone(),
                    mentioner_id: mentioner_id.to_string(),
                    post_id: context.post_id.clone(),
                    comment_id: context.comment_id.clone(),
                    created_at: now,
                };
                let notification = Notification::new(
                    NotificationKind::Mention,
                    &user.id,
                    mentioner_id,
                    post_id,
                    comment_id,
                );
                (mention, notification)
            })
            .collect();

        self.db.insert_mentions_with_notifications(&entries).await?;

        let created = entries.len();
        crate::metrics::MENTIONS_CREATED_TOTAL.inc_by(created as u64);
        crate::metrics::NOTIFICATIONS_CREATED_TOTAL
            .with_label_values(&[NotificationKind::Mention.as_str()])
            .inc_by(created as u64);

        if duplicate_handles > 0 {
            tracing::debug!(
                mentioner_id,
                duplicate_handles,
                "Repeated handles collapsed to one mention per user"
            );
        }
        tracing::info!(
            mentioner_id,
            post_id = ?post_id,
            comment_id = ?comment_id,
            mentions = created,
            "Mentions created"
        );

        Ok(MentionOutcome::Created {
            mentions: created,
            notifications: created,
            duplicate_handles,
            mentioned,
        })
    }

    /// Check that `viewer_id` authored the context a mention request points at
    ///
    /// The comment is checked when given (and must belong to the post when
    /// both are given); otherwise the post is checked.
    ///
    /// # Errors
    /// - `AppError::NotFound` if a referenced post or comment does not exist
    /// - `AppError::Validation` if the comment belongs to a different post
    /// - `AppError::Forbidden` if the viewer is not the author
    pub async fn authorize_context(
        &self,
        viewer_id: &str,
        context: &MentionContext,
    ) -> Result<(), AppError> {
        if let Some(comment_id) = &context.comment_id {
            let comment = self
                .db
                .get_comment(comment_id)
                .await?
                .ok_or(AppError::NotFound)?;

            if let Some(post_id) = &context.post_id {
                if &comment.post_id != post_id {
                    return Err(AppError::Validation(
                        "comment does not belong to post".to_string(),
                    ));
                }
            }

            if comment.author_id != viewer_id {
                return Err(AppError::Forbidden);
            }
            return Ok(());
        }

        if let Some(post_id) = &context.post_id {
            let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
            if post.author_id != viewer_id {
                return Err(AppError::Forbidden);
            }
        }

        Ok(())
    }
}
