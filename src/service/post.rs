//! Post service
//!
//! Handles post operations: create, delete, like toggling,
//! comments, and feed assembly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::data::{
    Comment, CommentRow, Database, EntityId, Like, Notification, NotificationKind, Post, PostRow,
    UserRef, UserSummary,
};
use crate::error::AppError;

/// Comment with its author
#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: UserSummary,
}

impl From<CommentRow> for CommentView {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            created_at: row.created_at,
            author: UserSummary {
                id: row.author_id,
                username: row.author_username,
                name: row.author_name,
                image: row.author_image,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PostCounts {
    pub likes: usize,
    pub comments: usize,
}

/// Post with author, comments, likers and mentioned users
#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: String,
    pub content: Option<String>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: UserSummary,
    /// Oldest first
    pub comments: Vec<CommentView>,
    /// Ids of users who liked the post
    pub likes: Vec<String>,
    pub mentions: Vec<UserRef>,
    pub counts: PostCounts,
}

impl PostView {
    /// View of a post that was just written, before anyone reacted to it
    pub fn fresh(post: Post, author: UserSummary, mentions: Vec<UserRef>) -> Self {
        Self {
            id: post.id,
            content: post.content,
            image: post.image,
            created_at: post.created_at,
            author,
            comments: vec![],
            likes: vec![],
            mentions,
            counts: PostCounts::default(),
        }
    }
}

/// New like state after a toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LikeToggle {
    pub liked: bool,
    pub likes_count: i64,
}

fn normalize_optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Post service
pub struct PostService {
    db: Arc<Database>,
}

impl PostService {
    /// Create new post service
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a new post
    ///
    /// At least one of `content` and `image` must be non-blank.
    /// Mention fan-out is left to the caller.
    pub async fn create(
        &self,
        author_id: &str,
        content: Option<String>,
        image: Option<String>,
    ) -> Result<Post, AppError> {
        let content = normalize_optional_text(content);
        let image = normalize_optional_text(image);
        if content.is_none() && image.is_none() {
            return Err(AppError::Validation(
                "post content or image is required".to_string(),
            ));
        }

        let post = Post {
            id: EntityId::new().0,
            author_id: author_id.to_string(),
            content,
            image,
            created_at: Utc::now(),
        };
        self.db.insert_post(&post).await?;

        crate::metrics::POSTS_TOTAL.inc();
        tracing::info!(post_id = %post.id, author_id, "Post created");

        Ok(post)
    }

    /// Delete a post authored by `actor_id`
    ///
    /// # Errors
    /// - `AppError::NotFound` if the post does not exist
    /// - `AppError::Forbidden` if the actor is not the author
    pub async fn delete(&self, actor_id: &str, post_id: &str) -> Result<(), AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;
        if post.author_id != actor_id {
            tracing::warn!(post_id, actor_id, "Refused to delete another user's post");
            return Err(AppError::Forbidden);
        }

        if self.db.delete_post(post_id).await? {
            crate::metrics::POSTS_TOTAL.dec();
            tracing::info!(post_id, actor_id, "Post deleted");
        }

        Ok(())
    }

    /// Like the post, or remove the like if present
    ///
    /// Liking someone else's post notifies its author in the same transaction.
    pub async fn toggle_like(&self, actor_id: &str, post_id: &str) -> Result<LikeToggle, AppError> {
        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;

        let liked = if self.db.has_like(actor_id, post_id).await? {
            self.db.delete_like(actor_id, post_id).await?;
            tracing::debug!(post_id, actor_id, "Like removed");
            false
        } else {
            let like = Like {
                id: EntityId::new().0,
                user_id: actor_id.to_string(),
                post_id: post_id.to_string(),
                created_at: Utc::now(),
            };
            let notification = (post.author_id != actor_id).then(|| {
                Notification::new(
                    NotificationKind::Like,
                    &post.author_id,
                    actor_id,
                    Some(post_id),
                    None,
                )
            });

            let inserted = self
                .db
                .insert_like_with_notification(&like, notification.as_ref())
                .await?;
            if inserted && notification.is_some() {
                crate::metrics::record_notification(NotificationKind::Like);
            }
            tracing::debug!(post_id, actor_id, "Like added");
            true
        };

        let likes_count = self.db.count_likes(post_id).await?;
        Ok(LikeToggle { liked, likes_count })
    }

    /// Comment on a post
    ///
    /// Commenting on someone else's post notifies its author in the same transaction.
    /// Mention fan-out is left to the caller.
    pub async fn create_comment(
        &self,
        actor_id: &str,
        post_id: &str,
        content: &str,
    ) -> Result<Comment, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }

        let post = self.db.get_post(post_id).await?.ok_or(AppError::NotFound)?;

        let comment = Comment {
            id: EntityId::new().0,
            author_id: actor_id.to_string(),
            post_id: post_id.to_string(),
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let notification = (post.author_id != actor_id).then(|| {
            Notification::new(
                NotificationKind::Comment,
                &post.author_id,
                actor_id,
                Some(post_id),
                Some(&comment.id),
            )
        });

        self.db
            .insert_comment_with_notification(&comment, notification.as_ref())
            .await?;
        if notification.is_some() {
            crate::metrics::record_notification(NotificationKind::Comment);
        }

        tracing::info!(comment_id = %comment.id, post_id, actor_id, "Comment created");
        Ok(comment)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Feed: all posts newest first
    pub async fn list_feed(
        &self,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<PostView>, AppError> {
        let rows = self.db.get_post_rows(limit, max_id).await?;
        self.hydrate(rows).await
    }

    /// Get a single post
    pub async fn get(&self, post_id: &str) -> Result<PostView, AppError> {
        let row = self
            .db
            .get_post_row(post_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let mut views = self.hydrate(vec![row]).await?;
        views.pop().ok_or(AppError::NotFound)
    }

    /// Posts written by the user with this handle
    pub async fn by_author(&self, username: &str, limit: usize) -> Result<Vec<PostView>, AppError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        let rows = self.db.get_post_rows_by_author(&user.id, limit).await?;
        self.hydrate(rows).await
    }

    /// Posts liked by the user with this handle
    pub async fn liked_by(&self, username: &str, limit: usize) -> Result<Vec<PostView>, AppError> {
        let user = self
            .db
            .get_user_by_username(username)
            .await?
            .ok_or(AppError::NotFound)?;
        let rows = self.db.get_post_rows_liked_by(&user.id, limit).await?;
        self.hydrate(rows).await
    }

    /// Attach comments, likers and mentions to post rows (batch, no N+1)
    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<PostView>, AppError> {
        if rows.is_empty() {
            return Ok(vec![]);
        }

        let post_ids: Vec<String> = rows.iter().map(|row| row.id.clone()).collect();

        let mut comments: HashMap<String, Vec<CommentView>> = HashMap::new();
        for row in self.db.get_comment_rows_for_posts(&post_ids).await? {
            comments
                .entry(row.post_id.clone())
                .or_default()
                .push(CommentView::from(row));
        }

        let mut likes: HashMap<String, Vec<String>> = HashMap::new();
        for (post_id, user_id) in self.db.get_likers_for_posts(&post_ids).await? {
            likes.entry(post_id).or_default().push(user_id);
        }

        let mut mentions: HashMap<String, Vec<UserRef>> = HashMap::new();
        for row in self.db.get_mentions_for_posts(&post_ids).await? {
            let entry = mentions.entry(row.post_id).or_default();
            if !entry.iter().any(|user| user.id == row.user_id) {
                entry.push(UserRef {
                    id: row.user_id,
                    username: row.username,
                });
            }
        }

        let views = rows
            .into_iter()
            .map(|row| {
                let comments = comments.remove(&row.id).unwrap_or_default();
                let likes = likes.remove(&row.id).unwrap_or_default();
                let mentions = mentions.remove(&row.id).unwrap_or_default();
                PostView {
                    counts: PostCounts {
                        likes: likes.len(),
                        comments: comments.len(),
                    },
                    id: row.id,
                    content: row.content,
                    image: row.image,
                    created_at: row.created_at,
                    author: UserSummary {
                        id: row.author_id,
                        username: row.author_username,
                        name: row.author_name,
                        image: row.author_image,
                    },
                    comments,
                    likes,
                    mentions,
                }
            })
            .collect();

        Ok(views)
    }
}
