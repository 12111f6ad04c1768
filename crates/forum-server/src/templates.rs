//! HTML templates.
//!
//! Templates are compiled into the binary and rendered with `minijinja`.
//! Names end in `.html`, so every interpolated value is HTML-escaped.

use axum::response::Html;
use chrono::DateTime;
use minijinja::{Environment, Value};
use serde::Serialize;

use forum_core::media::media_url;

use crate::error::AppError;

const TEMPLATES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("new_post.html", include_str!("../templates/new_post.html")),
    ("posts.html", include_str!("../templates/posts.html")),
    ("post_detail.html", include_str!("../templates/post_detail.html")),
    ("error.html", include_str!("../templates/error.html")),
    ("profile.html", include_str!("../templates/profile.html")),
    ("profile_other.html", include_str!("../templates/profile_other.html")),
    ("_post_card.html", include_str!("../templates/_post_card.html")),
];

/// Compiled page templates.
pub struct Templates {
    env: Environment<'static>,
}

impl std::fmt::Debug for Templates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Templates")
            .field("count", &TEMPLATES.len())
            .finish()
    }
}

impl Templates {
    /// Compile every page template.
    ///
    /// # Errors
    ///
    /// Returns a `minijinja` error if a template fails to parse.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }
        // Stored keys only contain `[A-Za-z0-9._-]`.
        env.add_filter("media_url", |key: String| Value::from_safe_string(media_url(&key)));
        env.add_filter("short_date", short_date);
        Ok(Self { env })
    }

    /// Render `name` with `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Internal`] if the template is missing or fails.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, AppError> {
        let template = self.env.get_template(name)?;
        Ok(Html(template.render(ctx)?))
    }
}

/// `2024-05-01T18:30:00Z` → `01/05/2024 18:30`. Unparsable input is shown as is.
fn short_date(value: String) -> String {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_compile() {
        let templates = Templates::new().unwrap();
        for (name, _) in TEMPLATES {
            assert!(templates.env.get_template(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn values_are_escaped() {
        let templates = Templates::new().unwrap();
        let Html(page) = templates
            .render(
                "error.html",
                serde_json::json!({ "message": "<script>alert(1)</script>" }),
            )
            .unwrap();
        assert!(page.contains("&lt;script&gt;"));
        assert!(!page.contains("<script>alert"));
    }

    #[test]
    fn short_date_formats_rfc3339() {
        assert_eq!(short_date("2024-05-01T18:30:12Z".to_owned()), "01/05/2024 18:30");
        assert_eq!(short_date("yesterday".to_owned()), "yesterday");
    }
}
