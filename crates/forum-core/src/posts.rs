//! Posts, attachments and comments.
//!
//! Every function that returns posts fills in the author's username and the
//! attachment keys. Attachments for a page of posts are fetched with a single
//! `IN (...)` query rather than one query per post.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::info;

use crate::error::PostError;
use crate::models::{AttachmentKind, Comment, NewPost, Post};

/// Number of posts shown on the home page.
pub const HOME_PAGE_LIMIT: i64 = 7;

const POST_COLUMNS: &str = r"SELECT p.id, p.user_id, u.username, p.title, p.content, p.created_at
    FROM posts p JOIN users u ON p.user_id = u.id";

/// SQLite-backed posts and comments.
#[derive(Debug, Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

impl PostStore {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a post and its attachments in one transaction. Returns the post id.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::MissingTitle`] for a blank title, or
    /// [`PostError::Database`] if any insert fails (nothing is committed).
    pub async fn create(&self, post: NewPost) -> Result<i64, PostError> {
        let title = post.title.trim();
        if title.is_empty() {
            return Err(PostError::MissingTitle);
        }

        let mut tx = self.pool.begin().await?;

        let post_id: i64 = sqlx::query_scalar(
            r"INSERT INTO posts (user_id, title, content, created_at)
              VALUES (?, ?, ?, ?)
              RETURNING id",
        )
        .bind(post.user_id)
        .bind(title)
        .bind(&post.content)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        let attachments = post
            .video
            .iter()
            .map(|key| (AttachmentKind::Video, key))
            .chain(post.images.iter().map(|key| (AttachmentKind::Image, key)));

        for (position, (kind, key)) in (0_i64..).zip(attachments) {
            sqlx::query(
                r"INSERT INTO attachments (post_id, kind, media_key, position)
                  VALUES (?, ?, ?, ?)",
            )
            .bind(post_id)
            .bind(kind.as_str())
            .bind(key)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(
            post_id,
            user_id = post.user_id,
            images = post.images.len(),
            video = post.video.is_some(),
            "post created"
        );
        Ok(post_id)
    }

    /// The `limit` most recent posts, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Database`] on storage failure.
    pub async fn latest(&self, limit: i64) -> Result<Vec<Post>, PostError> {
        let mut posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_COLUMNS} ORDER BY p.created_at DESC, p.id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        self.attach_media(&mut posts).await?;
        Ok(posts)
    }

    /// Every post, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Database`] on storage failure.
    pub async fn list(&self) -> Result<Vec<Post>, PostError> {
        let mut posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_COLUMNS} ORDER BY p.created_at DESC, p.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.attach_media(&mut posts).await?;
        Ok(posts)
    }

    /// Posts written by `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::Database`] on storage failure.
    pub async fn by_author(&self, user_id: i64) -> Result<Vec<Post>, PostError> {
        let mut posts = sqlx::query_as::<_, Post>(&format!(
            "{POST_COLUMNS} WHERE p.user_id = ? ORDER BY p.created_at DESC, p.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.attach_media(&mut posts).await?;
        Ok(posts)
    }

    /// One post with its attachments and comments (oldest comment first).
    ///
    /// # Errors
    ///
    /// Returns [`PostError::NotFound`] if the post does not exist.
    pub async fn get(&self, id: i64) -> Result<Post, PostError> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_COLUMNS} WHERE p.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(PostError::NotFound { id })?;

        let mut posts = vec![post];
        self.attach_media(&mut posts).await?;
        let mut post = posts.remove(0);

        post.comments = sqlx::query_as::<_, Comment>(
            r"SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at
              FROM comments c JOIN users u ON c.user_id = u.id
              WHERE c.post_id = ?
              ORDER BY c.created_at, c.id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(post)
    }

    /// Add a comment to a post and return it.
    ///
    /// # Errors
    ///
    /// Returns [`PostError::EmptyComment`] for blank content and
    /// [`PostError::NotFound`] if the post does not exist.
    pub async fn add_comment(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Comment, PostError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(PostError::EmptyComment);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = ?)")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(PostError::NotFound { id: post_id });
        }

        let comment_id: i64 = sqlx::query_scalar(
            r"INSERT INTO comments (post_id, user_id, content, created_at)
              VALUES (?, ?, ?, ?)
              RETURNING id",
        )
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        let comment = sqlx::query_as::<_, Comment>(
            r"SELECT c.id, c.post_id, c.user_id, u.username, c.content, c.created_at
              FROM comments c JOIN users u ON c.user_id = u.id
              WHERE c.id = ?",
        )
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await?;

        info!(post_id, user_id, comment_id, "comment added");
        Ok(comment)
    }

    /// Fill `video` and `images` for every post in one query.
    async fn attach_media(&self, posts: &mut [Post]) -> Result<(), PostError> {
        if posts.is_empty() {
            return Ok(());
        }

        let mut query: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT post_id, kind, media_key FROM attachments WHERE post_id IN (");
        let mut ids = query.separated(", ");
        for post in posts.iter() {
            ids.push_bind(post.id);
        }
        ids.push_unseparated(") ORDER BY post_id, position");

        let rows: Vec<(i64, String, String)> = query.build_query_as().fetch_all(&self.pool).await?;

        let mut by_post: HashMap<i64, Vec<(String, String)>> = HashMap::new();
        for (post_id, kind, key) in rows {
            by_post.entry(post_id).or_default().push((kind, key));
        }

        for post in posts.iter_mut() {
            for (kind, key) in by_post.remove(&post.id).unwrap_or_default() {
                match kind.parse::<AttachmentKind>() {
                    Ok(AttachmentKind::Video) => post.video = Some(key),
                    Ok(AttachmentKind::Image) => post.images.push(key),
                    Err(e) => tracing::warn!(post_id = post.id, error = %e, "skipping attachment"),
                }
            }
        }

        Ok(())
    }
}
