//! Notification service

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::data::{Database, NotificationKind, NotificationRow, UserSummary};
use crate::error::AppError;

#[derive(Debug, Clone, Serialize)]
pub struct NotificationPost {
    pub id: String,
    pub content: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationComment {
    pub id: String,
    pub content: String,
}

/// Notification with its creator and referenced content
#[derive(Debug, Clone, Serialize)]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub creator: UserSummary,
    pub post: Option<NotificationPost>,
    pub comment: Option<NotificationComment>,
}

impl From<NotificationRow> for NotificationView {
    fn from(row: NotificationRow) -> Self {
        let post = row.post_id.map(|id| NotificationPost {
            id,
            content: row.post_content,
            image: row.post_image,
        });
        let comment = row
            .comment_id
            .zip(row.comment_content)
            .map(|(id, content)| NotificationComment { id, content });

        Self {
            id: row.id,
            kind: row.kind,
            read: row.read,
            created_at: row.created_at,
            creator: UserSummary {
                id: row.creator_id,
                username: row.creator_username,
                name: row.creator_name,
                image: row.creator_image,
            },
            post,
            comment,
        }
    }
}

/// Notification service
pub struct NotificationService {
    db: Arc<Database>,
}

impl NotificationService {
    /// Create new notification service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// The viewer's notifications, newest first
    pub async fn list(&self, user_id: &str, limit: usize) -> Result<Vec<NotificationView>, AppError> {
        let rows = self.db.get_notification_rows(user_id, limit).await?;
        Ok(rows.into_iter().map(NotificationView::from).collect())
    }

    /// Mark notifications read; ids belonging to other users are ignored
    pub async fn mark_read(&self, user_id: &str, ids: &[String]) -> Result<u64, AppError> {
        let updated = self.db.mark_notifications_read(user_id, ids).await?;
        tracing::debug!(user_id, requested = ids.len(), updated, "Notifications marked read");
        Ok(updated)
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<i64, AppError> {
        self.db.count_unread_notifications(user_id).await
    }
}
