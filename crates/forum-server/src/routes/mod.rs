//! HTTP route modules.
//!
//! Each module exposes a `router()` merged by [`crate::build_router`]. HTML
//! routes answer unmatched methods with the plain 404 page, like unknown
//! paths.

pub mod api;
pub mod auth;
pub mod home;
pub mod media;
pub mod pages;
pub mod posts;
pub mod profile;

use crate::error::AppError;

/// Fallback for unknown paths and unsupported methods.
pub async fn not_found() -> AppError {
    AppError::NotFound("page not found".to_owned())
}
