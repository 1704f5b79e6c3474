//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-bound queries.

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use std::path::Path;

use super::models::*;
use crate::error::AppError;
use crate::metrics::{DB_QUERIES_TOTAL, DB_QUERY_DURATION_SECONDS};

/// SQLite caps bound parameters per statement; batch lookups are chunked.
const IN_CLAUSE_CHUNK: usize = 100;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Count an operation and time it until the returned timer drops
fn query_timer(operation: &str) -> prometheus::HistogramTimer {
    DB_QUERIES_TOTAL.with_label_values(&[operation]).inc();
    DB_QUERY_DURATION_SECONDS
        .with_label_values(&[operation])
        .start_timer()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Escape `%`, `_` and `\` so user input is matched literally by LIKE
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Map unique-key violations on `users` to a readable conflict
fn map_user_write_error(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let message = db_error.message();
            let field = if message.contains("users.username") {
                "username"
            } else if message.contains("users.email") {
                "email"
            } else {
                "user"
            };
            return AppError::Conflict(format!("{} is already taken", field));
        }
    }
    AppError::Database(error)
}

async fn insert_notification_in(
    conn: &mut SqliteConnection,
    notification: &Notification,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO notifications (
            id, user_id, creator_id, kind, post_id, comment_id, read, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&notification.id)
    .bind(&notification.user_id)
    .bind(&notification.creator_id)
    .bind(notification.kind)
    .bind(&notification.post_id)
    .bind(&notification.comment_id)
    .bind(notification.read)
    .bind(notification.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

const POST_ROW_SELECT: &str = r#"
    SELECT p.id, p.content, p.image, p.created_at,
           u.id AS author_id, u.username AS author_username,
           u.name AS author_name, u.image AS author_image
    FROM posts p
    INNER JOIN users u ON u.id = p.author_id
"#;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        Self::connect_with_pool_size(path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Connect with an explicit connection pool size.
    pub async fn connect_with_pool_size(
        path: &Path,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    /// Name of the storage backend, reported by the debug endpoint.
    pub fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    // =========================================================================
    // Users
    // =========================================================================

    /// Insert a new user mirror
    ///
    /// # Errors
    /// `AppError::Conflict` if the username, email or external id is taken
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, external_id, email, username, name, bio, image,
                location, website, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.external_id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.bio)
        .bind(&user.image)
        .bind(&user.location)
        .bind(&user.website)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_user_write_error)?;

        Ok(())
    }

    /// Get user by ID
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by identity-provider subject
    pub async fn get_user_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE external_id = ?")
            .bind(external_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get user by handle
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Get the users whose handle is in `usernames` (batch operation to avoid N+1)
    ///
    /// Unknown handles are simply absent from the result.
    pub async fn find_users_by_usernames(
        &self,
        usernames: &[String],
    ) -> Result<Vec<UserRef>, AppError> {
        if usernames.is_empty() {
            return Ok(vec![]);
        }

        let mut users = Vec::new();
        for chunk in usernames.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "SELECT id, username FROM users WHERE username IN ({})",
                placeholders(chunk.len())
            );

            let mut query_builder = sqlx::query_as::<_, UserRef>(&query);
            for username in chunk {
                query_builder = query_builder.bind(username);
            }

            users.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(users)
    }

    /// Apply identity-provider field changes
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user exists or the patch is empty.
    pub async fn apply_identity_patch(
        &self,
        user_id: &str,
        patch: &IdentityPatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        if patch.is_empty() {
            return Ok(false);
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(email) = &patch.email {
                set.push("email = ").push_bind_unseparated(email.clone());
            }
            if let Some(username) = &patch.username {
                set.push("username = ").push_bind_unseparated(username.clone());
            }
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        builder.push(" WHERE id = ").push_bind(user_id.to_string());

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(map_user_write_error)?;

        Ok(result.rows_affected() == 1)
    }

    /// Patch profile fields by user ID.
    ///
    /// # Returns
    /// `true` if updated, `false` if no matching user row exists.
    pub async fn patch_profile(
        &self,
        user_id: &str,
        patch: &ProfilePatch,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = builder.separated(", ");
            if let Some(name) = &patch.name {
                set.push("name = ").push_bind_unseparated(name.clone());
            }
            if let Some(bio) = &patch.bio {
                set.push("bio = ").push_bind_unseparated(bio.clone());
            }
            if let Some(location) = &patch.location {
                set.push("location = ").push_bind_unseparated(location.clone());
            }
            if let Some(website) = &patch.website {
                set.push("website = ").push_bind_unseparated(website.clone());
            }
            set.push("updated_at = ").push_bind_unseparated(updated_at);
        }
        builder.push(" WHERE id = ").push_bind(user_id.to_string());

        let result = builder.build().execute(&self.pool).await?;

        Ok(result.rows_affected() == 1)
    }

    /// Replace the profile image reference
    pub async fn update_user_image(
        &self,
        user_id: &str,
        image: Option<&str>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET image = ?, updated_at = ? WHERE id = ?")
            .bind(image)
            .bind(updated_at)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Delete a user mirror and everything it owns
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_user_by_external_id(&self, external_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM users WHERE external_id = ?")
            .bind(external_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count users.
    pub async fn count_users(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Count posts.
    pub async fn count_posts(&self) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Get follower / following / post counters for a user
    pub async fn get_user_counts(&self, user_id: &str) -> Result<UserCounts, AppError> {
        let counts = sqlx::query_as::<_, UserCounts>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM follows WHERE following_id = ?) AS followers,
                (SELECT COUNT(*) FROM follows WHERE follower_id = ?) AS following,
                (SELECT COUNT(*) FROM posts WHERE author_id = ?) AS posts
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts)
    }

    /// Sample users with their counters (debug endpoint)
    pub async fn sample_debug_users(&self, limit: usize) -> Result<Vec<DebugUser>, AppError> {
        let users = sqlx::query_as::<_, DebugUser>(
            r#"
            SELECT u.id, u.username, u.name, u.email,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers,
                (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following,
                (SELECT COUNT(*) FROM posts p WHERE p.author_id = u.id) AS posts
            FROM users u
            ORDER BY u.created_at ASC
            LIMIT ?
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Search users by handle or display name
    ///
    /// Case-insensitive for ASCII; wildcard characters in `query` match literally.
    pub async fn search_users(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UserWithFollowers>, AppError> {
        let _timer = query_timer("search_users");
        let pattern = format!("%{}%", escape_like(query));
        let users = sqlx::query_as::<_, UserWithFollowers>(
            r#"
            SELECT u.id, u.username, u.name, u.image,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers_count
            FROM users u
            WHERE u.username LIKE ? ESCAPE '\' OR u.name LIKE ? ESCAPE '\'
            ORDER BY u.username ASC
            LIMIT ?
            "#,
        )
        .bind(&pattern)
        .bind(&pattern)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Random users that `user_id` does not follow yet (excluding themself)
    pub async fn get_suggested_users(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<UserWithFollowers>, AppError> {
        let users = sqlx::query_as::<_, UserWithFollowers>(
            r#"
            SELECT u.id, u.username, u.name, u.image,
                (SELECT COUNT(*) FROM follows f WHERE f.following_id = u.id) AS followers_count
            FROM users u
            WHERE u.id != ?
              AND NOT EXISTS (
                  SELECT 1 FROM follows f
                  WHERE f.follower_id = ? AND f.following_id = u.id
              )
            ORDER BY RANDOM()
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Posts
    // =========================================================================

    /// Insert a new post
    pub async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO posts (id, author_id, content, image, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&post.id)
        .bind(&post.author_id)
        .bind(&post.content)
        .bind(&post.image)
        .bind(post.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get post by ID
    pub async fn get_post(&self, id: &str) -> Result<Option<Post>, AppError> {
        let post = sqlx::query_as::<_, Post>("SELECT * FROM posts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(post)
    }

    /// Delete post (comments, likes, mentions and notifications cascade)
    pub async fn delete_post(&self, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Get a post joined with its author
    pub async fn get_post_row(&self, id: &str) -> Result<Option<PostRow>, AppError> {
        let query = format!("{POST_ROW_SELECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, PostRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Get posts newest first
    ///
    /// ULIDs sort by creation time, so the id is both the order and the cursor.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of posts
    /// * `max_id` - Return posts older than this ID
    pub async fn get_post_rows(
        &self,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<PostRow>, AppError> {
        let _timer = query_timer("feed");
        let rows = match max_id {
            Some(max_id) => {
                let query = format!(
                    "{POST_ROW_SELECT} WHERE p.id < ? ORDER BY p.id DESC LIMIT ?"
                );
                sqlx::query_as::<_, PostRow>(&query)
                    .bind(max_id)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let query =
                    format!("{POST_ROW_SELECT} ORDER BY p.id DESC LIMIT ?");
                sqlx::query_as::<_, PostRow>(&query)
                    .bind(limit as i64)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    /// Get posts written by a user, newest first
    pub async fn get_post_rows_by_author(
        &self,
        author_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRow>, AppError> {
        let query = format!(
            "{POST_ROW_SELECT} WHERE p.author_id = ? ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(author_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Get posts liked by a user, most recently liked first
    pub async fn get_post_rows_liked_by(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRow>, AppError> {
        let query = format!(
            "{POST_ROW_SELECT} INNER JOIN likes l ON l.post_id = p.id \
             WHERE l.user_id = ? ORDER BY l.created_at DESC, l.id DESC LIMIT ?"
        );
        let rows = sqlx::query_as::<_, PostRow>(&query)
            .bind(user_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Get comments (with authors) of several posts, oldest first
    pub async fn get_comment_rows_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<CommentRow>, AppError> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut rows = Vec::new();
        for chunk in post_ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                r#"
                SELECT c.id, c.post_id, c.content, c.created_at,
                       u.id AS author_id, u.username AS author_username,
                       u.name AS author_name, u.image AS author_image
                FROM comments c
                INNER JOIN users u ON u.id = c.author_id
                WHERE c.post_id IN ({})
                ORDER BY c.created_at ASC, c.id ASC
                "#,
                placeholders(chunk.len())
            );

            let mut query_builder = sqlx::query_as::<_, CommentRow>(&query);
            for post_id in chunk {
                query_builder = query_builder.bind(post_id);
            }
            rows.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(rows)
    }

    /// Get `(post_id, user_id)` like pairs of several posts
    pub async fn get_likers_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<(String, String)>, AppError> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut pairs = Vec::new();
        for chunk in post_ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "SELECT post_id, user_id FROM likes WHERE post_id IN ({}) ORDER BY created_at ASC",
                placeholders(chunk.len())
            );

            let mut query_builder = sqlx::query_as::<_, (String, String)>(&query);
            for post_id in chunk {
                query_builder = query_builder.bind(post_id);
            }
            pairs.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(pairs)
    }

    /// Get users mentioned in the body of several posts
    pub async fn get_mentions_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostMentionRow>, AppError> {
        if post_ids.is_empty() {
            return Ok(vec![]);
        }

        let mut rows = Vec::new();
        for chunk in post_ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                r#"
                SELECT m.post_id AS post_id, u.id AS user_id, u.username AS username
                FROM mentions m
                INNER JOIN users u ON u.id = m.user_id
                WHERE m.comment_id IS NULL AND m.post_id IN ({})
                ORDER BY m.created_at ASC
                "#,
                placeholders(chunk.len())
            );

            let mut query_builder = sqlx::query_as::<_, PostMentionRow>(&query);
            for post_id in chunk {
                query_builder = query_builder.bind(post_id);
            }
            rows.extend(query_builder.fetch_all(&self.pool).await?);
        }

        Ok(rows)
    }

    // =========================================================================
    // Comments
    // =========================================================================

    /// Get comment by ID
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(comment)
    }

    /// Insert a comment and its notification atomically
    pub async fn insert_comment_with_notification(
        &self,
        comment: &Comment,
        notification: Option<&Notification>,
    ) -> Result<(), AppError> {
        let _timer = query_timer("insert_comment");
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO comments (id, author_id, post_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.author_id)
        .bind(&comment.post_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .execute(&mut *tx)
        .await?;

        if let Some(notification) = notification {
            insert_notification_in(&mut tx, notification).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    // =========================================================================
    // Likes
    // =========================================================================

    /// Check if user liked post
    pub async fn has_like(&self, user_id: &str, post_id: &str) -> Result<bool, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE user_id = ? AND post_id = ?")
                .bind(user_id)
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count > 0)
    }

    /// Delete like
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_like(&self, user_id: &str, post_id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = ? AND post_id = ?")
            .bind(user_id)
            .bind(post_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a like and its notification atomically
    ///
    /// # Returns
    /// `false` if the like already existed; nothing is written in that case.
    pub async fn insert_like_with_notification(
        &self,
        like: &Like,
        notification: Option<&Notification>,
    ) -> Result<bool, AppError> {
        let _timer = query_timer("insert_like");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO likes (id, user_id, post_id, created_at) VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id, post_id) DO NOTHING
            "#,
        )
        .bind(&like.id)
        .bind(&like.user_id)
        .bind(&like.post_id)
        .bind(like.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        if let Some(notification) = notification {
            insert_notification_in(&mut tx, notification).await?;
        }

        tx.commit().await?;

        Ok(true)
    }

    /// Count likes of a post
    pub async fn count_likes(&self, post_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM likes WHERE post_id = ?")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Follow relationships
    // =========================================================================

    /// Check if `follower_id` follows `following_id`
    pub async fn is_following(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND following_id = ?",
        )
        .bind(follower_id)
        .bind(following_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    /// Delete follow edge
    ///
    /// # Returns
    /// `true` if a row was removed
    pub async fn delete_follow(
        &self,
        follower_id: &str,
        following_id: &str,
    ) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = ? AND following_id = ?")
            .bind(follower_id)
            .bind(following_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Insert a follow edge and its notification atomically
    ///
    /// # Returns
    /// `false` if the edge already existed; nothing is written in that case.
    pub async fn insert_follow_with_notification(
        &self,
        follow: &Follow,
        notification: &Notification,
    ) -> Result<bool, AppError> {
        let _timer = query_timer("insert_follow");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO follows (follower_id, following_id, created_at) VALUES (?, ?, ?)
            ON CONFLICT(follower_id, following_id) DO NOTHING
            "#,
        )
        .bind(&follow.follower_id)
        .bind(&follow.following_id)
        .bind(follow.created_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        insert_notification_in(&mut tx, notification).await?;
        tx.commit().await?;

        Ok(true)
    }

    /// Users following `user_id`, most recent first
    pub async fn get_followers(&self, user_id: &str) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.name, u.image
            FROM follows f
            INNER JOIN users u ON u.id = f.follower_id
            WHERE f.following_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Users followed by `user_id`, most recent first
    pub async fn get_following(&self, user_id: &str) -> Result<Vec<UserSummary>, AppError> {
        let users = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.username, u.name, u.image
            FROM follows f
            INNER JOIN users u ON u.id = f.following_id
            WHERE f.follower_id = ?
            ORDER BY f.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    // =========================================================================
    // Mentions
    // =========================================================================

    /// Insert a batch of mentions with their notifications in one transaction
    pub async fn insert_mentions_with_notifications(
        &self,
        entries: &[(Mention, Notification)],
    ) -> Result<(), AppError> {
        let _timer = query_timer("insert_mentions");
        if entries.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await?;

        for (mention, notification) in entries {
            sqlx::query(
                r#"
                INSERT INTO mentions (
                    id, user_id, mentioner_id, post_id, comment_id, created_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&mention.id)
            .bind(&mention.user_id)
            .bind(&mention.mentioner_id)
            .bind(&mention.post_id)
            .bind(&mention.comment_id)
            .bind(mention.created_at)
            .execute(&mut *tx)
            .await?;

            insert_notification_in(&mut tx, notification).await?;
        }

        tx.commit().await?;

        Ok(())
    }

    /// Count mentions received by a user
    #[cfg(test)]
    pub async fn count_mentions_of(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM mentions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Get a user's notifications with creator and referenced content, newest first
    pub async fn get_notification_rows(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<NotificationRow>, AppError> {
        let _timer = query_timer("list_notifications");
        let rows = sqlx::query_as::<_, NotificationRow>(
            r#"
            SELECT n.id, n.kind, n.read, n.created_at,
                   c.id AS creator_id, c.username AS creator_username,
                   c.name AS creator_name, c.image AS creator_image,
                   n.post_id, p.content AS post_content, p.image AS post_image,
                   n.comment_id, cm.content AS comment_content
            FROM notifications n
            INNER JOIN users c ON c.id = n.creator_id
            LEFT JOIN posts p ON p.id = n.post_id
            LEFT JOIN comments cm ON cm.id = n.comment_id
            WHERE n.user_id = ?
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Mark notifications read; ids owned by other users are ignored
    ///
    /// # Returns
    /// Number of notifications updated
    pub async fn mark_notifications_read(
        &self,
        user_id: &str,
        ids: &[String],
    ) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut updated = 0;
        for chunk in ids.chunks(IN_CLAUSE_CHUNK) {
            let query = format!(
                "UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0 AND id IN ({})",
                placeholders(chunk.len())
            );

            let mut query_builder = sqlx::query(&query).bind(user_id);
            for id in chunk {
                query_builder = query_builder.bind(id);
            }
            updated += query_builder.execute(&self.pool).await?.rows_affected();
        }

        Ok(updated)
    }

    /// Count unread notifications of a user
    pub async fn count_unread_notifications(&self, user_id: &str) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
