//! Forum data models.
//!
//! Row types for users, posts, comments and attachments. IDs are SQLite
//! integer primary keys. Attachment bytes live in the media backend; rows
//! only hold the media key.

use chrono::{DateTime, Utc};
use serde::Serialize;

// ── Users ────────────────────────────────────────────────────────────

/// A registered account.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// Salted password hash, see [`crate::password`].
    #[serde(skip)]
    pub password: String,
    /// Media key of the profile picture, if one was uploaded.
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for [`crate::accounts::AccountStore::register`].
#[derive(Debug, Clone, Default)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password: String,
}

// ── Attachments ──────────────────────────────────────────────────────

/// What an uploaded file is, decided by its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    Video,
}

impl AttachmentKind {
    /// The value stored in the `attachments.kind` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
        }
    }
}

impl std::fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AttachmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(Self::Image),
            "video" => Ok(Self::Video),
            other => Err(format!("unknown attachment kind: {other}")),
        }
    }
}

// ── Posts & comments ─────────────────────────────────────────────────

/// A post joined with its author, attachments and (on detail pages) comments.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub user_id: i64,
    /// Author's username.
    pub username: String,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Media key of the attached video.
    #[sqlx(skip)]
    pub video: Option<String>,
    /// Media keys of attached images, in upload order.
    #[sqlx(skip)]
    pub images: Vec<String>,
    /// Comments, oldest first. Only filled by [`crate::posts::PostStore::get`].
    #[sqlx(skip)]
    pub comments: Vec<Comment>,
}

/// Input for [`crate::posts::PostStore::create`].
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    /// Media key of the video, if any.
    pub video: Option<String>,
    /// Media keys of the images, in upload order.
    pub images: Vec<String>,
}

/// A comment joined with its author's username.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub username: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
