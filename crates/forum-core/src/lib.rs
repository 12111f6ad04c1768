//! Core library for the forum.
//!
//! Contains the relational schema, account registration and login, password
//! hashing, the in-memory session store, posts with attachments, comments,
//! and the media library that sits on top of `forum-storage`. Nothing here
//! knows about HTTP; `forum-server` wires these pieces to routes.

pub mod accounts;
pub mod db;
pub mod error;
pub mod media;
pub mod models;
pub mod password;
pub mod posts;
pub mod session;
