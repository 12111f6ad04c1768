//! Account registration, login and lookup.
//!
//! Registration checks run in a fixed order (missing fields, email format,
//! username taken, email taken) so the first problem is the one reported.
//! The `UNIQUE` constraints on `users` back up the explicit checks when two
//! registrations race.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::AccountError;
use crate::models::{NewAccount, User};
use crate::password::{hash_password, verify_password};

#[allow(clippy::expect_used)]
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex should be valid")
});

/// Whether `email` has the `local@domain.tld` shape accepted at registration.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// SQLite-backed user accounts.
#[derive(Debug, Clone)]
pub struct AccountStore {
    pool: SqlitePool,
}

impl AccountStore {
    /// Create a store over an initialized pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a new account and return it.
    ///
    /// # Errors
    ///
    /// Returns a validation variant of [`AccountError`] describing the first
    /// problem found, or [`AccountError::Database`] on storage failure.
    pub async fn register(&self, account: NewAccount) -> Result<User, AccountError> {
        let email = account.email.trim();
        let username = account.username.trim();

        if email.is_empty() || username.is_empty() || account.password.is_empty() {
            return Err(AccountError::MissingFields);
        }
        if !is_valid_email(email) {
            return Err(AccountError::InvalidEmail);
        }
        if self.username_exists(username).await? {
            return Err(AccountError::UsernameTaken);
        }
        if self.email_exists(email).await? {
            return Err(AccountError::EmailTaken);
        }

        let user = sqlx::query_as::<_, User>(
            r"INSERT INTO users (email, username, password, created_at)
              VALUES (?, ?, ?, ?)
              RETURNING *",
        )
        .bind(email)
        .bind(username)
        .bind(hash_password(&account.password))
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(unique_violation_to_taken)?;

        info!(user_id = user.id, username = %user.username, "account registered");
        Ok(user)
    }

    /// Check an email/password pair and return the matching account.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::MissingFields`], [`AccountError::UnknownEmail`]
    /// or [`AccountError::WrongPassword`] when the credentials are rejected.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AccountError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(AccountError::MissingFields);
        }

        let Some(user) = self.find_by_email(email).await? else {
            return Err(AccountError::UnknownEmail);
        };

        if !verify_password(password, &user.password) {
            warn!(user_id = user.id, "login rejected: wrong password");
            return Err(AccountError::WrongPassword);
        }

        Ok(user)
    }

    /// Look up an account by id.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Database`] on storage failure.
    pub async fn find_by_id(&self, id: i64) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Look up an account by email.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Database`] on storage failure.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Look up an account by username.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::Database`] on storage failure.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<User>, AccountError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Point the account's profile picture at `media_key`.
    ///
    /// # Errors
    ///
    /// Returns [`AccountError::NotFound`] if the account does not exist.
    pub async fn set_profile_picture(&self, user_id: i64, media_key: &str) -> Result<(), AccountError> {
        let result = sqlx::query("UPDATE users SET profile_picture = ? WHERE id = ?")
            .bind(media_key)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AccountError::NotFound);
        }
        info!(user_id, media_key, "profile picture updated");
        Ok(())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, AccountError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE username = ?)")
            .bind(username)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, AccountError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = ?)")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

/// Map a `UNIQUE` violation from a racing registration to the matching error.
fn unique_violation_to_taken(err: sqlx::Error) -> AccountError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return if db_err.message().contains("users.username") {
                AccountError::UsernameTaken
            } else {
                AccountError::EmailTaken
            };
        }
    }
    AccountError::Database(err)
}
