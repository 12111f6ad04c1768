//! SQLite connection and schema bootstrap.
//!
//! The schema is created with `CREATE ... IF NOT EXISTS` on every start, so a
//! fresh database file is usable immediately and an existing one is left
//! untouched.

use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use tracing::info;

/// Schema statements, executed in order.
const SCHEMA: &[&str] = &[
    r"CREATE TABLE IF NOT EXISTS users (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        email           TEXT NOT NULL UNIQUE,
        username        TEXT NOT NULL UNIQUE,
        password        TEXT NOT NULL,
        profile_picture TEXT,
        created_at      TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS posts (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id    INTEGER NOT NULL REFERENCES users(id),
        title      TEXT NOT NULL,
        content    TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS attachments (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id   INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        kind      TEXT NOT NULL CHECK (kind IN ('image', 'video')),
        media_key TEXT NOT NULL,
        position  INTEGER NOT NULL
    )",
    r"CREATE TABLE IF NOT EXISTS comments (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        post_id    INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
        user_id    INTEGER NOT NULL REFERENCES users(id),
        content    TEXT NOT NULL,
        created_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_posts_created_at ON posts(created_at)",
    "CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_attachments_post_id ON attachments(post_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_post_id ON comments(post_id)",
];

/// Open a SQLite pool for `database_url`, creating the file if missing.
///
/// The parent directory of a file database is created as well.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if the URL is invalid or the
/// database cannot be opened.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
}

/// Open a private in-memory database (tests and throwaway instances).
///
/// Uses a single connection that is never recycled, since every SQLite
/// in-memory connection is its own database.
///
/// # Errors
///
/// Returns the underlying `sqlx::Error` if SQLite cannot be opened.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
}

/// Create all tables and indexes that do not exist yet.
///
/// # Errors
///
/// Returns the first `sqlx::Error` raised by a schema statement.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!(tables = 4, "database schema ready");
    Ok(())
}
