//! Shared application state for the forum server.
//!
//! A single [`AppState`] is constructed at startup and shared across all
//! Axum handlers via `Arc`.

use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;

use forum_core::accounts::AccountStore;
use forum_core::media::MediaLibrary;
use forum_core::posts::PostStore;
use forum_core::session::SessionStore;
use forum_storage::MediaBackend;

use crate::config::ServerConfig;
use crate::templates::Templates;

/// Shared application state passed to all HTTP handlers.
pub struct AppState {
    /// Registered accounts.
    pub accounts: AccountStore,
    /// Posts, attachments and comments.
    pub posts: PostStore,
    /// Login sessions.
    pub sessions: Arc<SessionStore>,
    /// Uploaded images and videos.
    pub media: MediaLibrary,
    /// Compiled page templates.
    pub templates: Templates,
    /// Whether cookies are marked `Secure`.
    pub cookie_secure: bool,
    /// Body limit for upload routes.
    pub max_upload_bytes: usize,
    /// Upload requests processed at once.
    pub max_concurrent_uploads: usize,
    /// Served under `/static`.
    pub static_dir: PathBuf,
    /// Served under `/images`.
    pub images_dir: PathBuf,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("cookie_secure", &self.cookie_secure)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("static_dir", &self.static_dir)
            .field("images_dir", &self.images_dir)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble the state from an initialized pool and a media backend.
    ///
    /// # Errors
    ///
    /// Returns a `minijinja` error if a page template fails to compile.
    pub fn new(
        config: &ServerConfig,
        pool: SqlitePool,
        media: Arc<dyn MediaBackend>,
    ) -> Result<Self, minijinja::Error> {
        Ok(Self {
            accounts: AccountStore::new(pool.clone()),
            posts: PostStore::new(pool),
            sessions: Arc::new(SessionStore::new(config.session_ttl())),
            media: MediaLibrary::new(media),
            templates: Templates::new()?,
            cookie_secure: config.cookie_secure,
            max_upload_bytes: config.max_upload_bytes,
            max_concurrent_uploads: config.max_concurrent_uploads,
            static_dir: config.static_dir.clone(),
            images_dir: config.images_dir.clone(),
        })
    }

    /// `Max-Age` for the session cookie, matching the session lifetime.
    #[must_use]
    pub fn session_cookie_max_age(&self) -> Option<i64> {
        self.sessions.ttl().map(|ttl| ttl.num_seconds())
    }
}
