//! Server configuration.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Every setting can be overridden via a `FORUM_*` variable.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// `SQLite` connection URL.
    pub database_url: String,
    /// Directory holding uploaded images and videos.
    pub media_dir: PathBuf,
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Directory served under `/images`.
    pub images_dir: PathBuf,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Session lifetime in seconds. `0` keeps sessions until logout.
    pub session_ttl_secs: u64,
    /// Seconds between expired-session sweeps.
    pub session_sweep_interval_secs: u64,
    /// Largest accepted request body for upload routes.
    pub max_upload_bytes: usize,
    /// Upload requests processed at once.
    pub max_concurrent_uploads: usize,
    /// Whether the session cookie carries the `Secure` attribute.
    pub cookie_secure: bool,
}

const DEFAULT_PORT: u16 = 6969;
const DEFAULT_SESSION_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const DEFAULT_SWEEP_SECS: u64 = 300;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;
const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 16;

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0`
    /// - `FORUM_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:6969`)
    /// - `FORUM_DATABASE_URL`: `SQLite` URL (default: `sqlite://./data/forum.db`)
    /// - `FORUM_MEDIA_DIR`: upload directory (default: `./img_video`)
    /// - `FORUM_STATIC_DIR`: stylesheet and script directory (default: `./static`)
    /// - `FORUM_IMAGES_DIR`: site images directory (default: `./images`)
    /// - `FORUM_LOG_LEVEL`: log filter (default: `info`)
    /// - `FORUM_SESSION_TTL_SECS`: session lifetime, `0` for none (default: one week)
    /// - `FORUM_SESSION_SWEEP_SECS`: seconds between sweeps (default: `300`)
    /// - `FORUM_MAX_UPLOAD_BYTES`: upload body limit (default: 20 MiB)
    /// - `FORUM_MAX_CONCURRENT_UPLOADS`: concurrent upload requests (default: `16`)
    /// - `FORUM_COOKIE_SECURE`: mark the session cookie `Secure` (default: `false`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));

        // Priority: FORUM_BIND_ADDR > PORT > default
        let bind_addr = if let Some(addr) = lookup("FORUM_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = lookup("PORT") {
            port.parse::<u16>()
                .map_or(default_addr, |p| SocketAddr::from(([0, 0, 0, 0], p)))
        } else {
            default_addr
        };

        let string_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_owned());
        let path_or = |key: &str, default: &str| PathBuf::from(string_or(key, default));

        Self {
            bind_addr,
            database_url: string_or("FORUM_DATABASE_URL", "sqlite://./data/forum.db"),
            media_dir: path_or("FORUM_MEDIA_DIR", "./img_video"),
            static_dir: path_or("FORUM_STATIC_DIR", "./static"),
            images_dir: path_or("FORUM_IMAGES_DIR", "./images"),
            log_level: string_or("FORUM_LOG_LEVEL", "info"),
            session_ttl_secs: lookup("FORUM_SESSION_TTL_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_SESSION_TTL_SECS),
            session_sweep_interval_secs: lookup("FORUM_SESSION_SWEEP_SECS")
                .and_then(|v| v.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_SWEEP_SECS),
            max_upload_bytes: lookup("FORUM_MAX_UPLOAD_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_concurrent_uploads: lookup("FORUM_MAX_CONCURRENT_UPLOADS")
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONCURRENT_UPLOADS),
            cookie_secure: lookup("FORUM_COOKIE_SECURE")
                .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes")),
        }
    }

    /// Session lifetime, `None` when sessions never expire.
    #[must_use]
    pub fn session_ttl(&self) -> Option<chrono::Duration> {
        if self.session_ttl_secs == 0 {
            return None;
        }
        i64::try_from(self.session_ttl_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 6969)));
        assert_eq!(cfg.database_url, "sqlite://./data/forum.db");
        assert_eq!(cfg.media_dir, PathBuf::from("./img_video"));
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.max_upload_bytes, 20 * 1024 * 1024);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.session_ttl(), Some(chrono::Duration::days(7)));
    }

    #[test]
    fn bind_addr_beats_port() {
        let cfg = config(&[("FORUM_BIND_ADDR", "10.0.0.1:80"), ("PORT", "9000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([10, 0, 0, 1], 80)));

        let cfg = config(&[("PORT", "9000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 9000)));
    }

    #[test]
    fn unparsable_values_fall_back() {
        let cfg = config(&[
            ("FORUM_BIND_ADDR", "nowhere"),
            ("FORUM_SESSION_SWEEP_SECS", "0"),
            ("FORUM_MAX_UPLOAD_BYTES", "lots"),
        ]);
        assert_eq!(cfg.bind_addr.port(), 6969);
        assert_eq!(cfg.session_sweep_interval_secs, 300);
        assert_eq!(cfg.max_upload_bytes, 20 * 1024 * 1024);
    }

    #[test]
    fn zero_ttl_disables_expiry() {
        let cfg = config(&[("FORUM_SESSION_TTL_SECS", "0"), ("FORUM_COOKIE_SECURE", "TRUE")]);
        assert_eq!(cfg.session_ttl(), None);
        assert!(cfg.cookie_secure);
    }
}
