//! HTTP integration tests driving the full router with `oneshot`.
//!
//! Each test gets a fresh in-memory database, an in-memory media backend and
//! a temporary static directory.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

use forum_core::db;
use forum_server::build_router;
use forum_server::config::ServerConfig;
use forum_server::state::AppState;
use forum_storage::MemoryBackend;

const BOUNDARY: &str = "forum-test-boundary";

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    _static_dir: TempDir,
}

async fn setup_app() -> TestApp {
    setup_app_with(&[]).await
}

async fn setup_app_with(vars: &[(&str, &str)]) -> TestApp {
    let static_dir = tempfile::tempdir().unwrap();
    std::fs::write(static_dir.path().join("style.css"), "body { margin: 0; }").unwrap();

    let mut env: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    env.insert(
        "FORUM_STATIC_DIR".to_owned(),
        static_dir.path().to_string_lossy().into_owned(),
    );
    let config = ServerConfig::from_lookup(|key| env.get(key).cloned());

    let pool = db::connect_in_memory().await.unwrap();
    db::init_schema(&pool).await.unwrap();
    let state = Arc::new(AppState::new(&config, pool, Arc::new(MemoryBackend::new())).unwrap());

    TestApp {
        router: build_router(Arc::clone(&state)),
        state,
        _static_dir: static_dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Register and log in, returning the session token.
    async fn sign_up(&self, email: &str, username: &str) -> String {
        let response = self
            .send(form("/register", &format!("email={email}&username={username}&password=pw")))
            .await;
        assert_eq!(location(&response), "/login");

        let response = self
            .send(form("/login", &format!("email={email}&password=pw")))
            .await;
        assert_eq!(location(&response), "/");
        set_cookie(&response, "session_id").unwrap()
    }

    async fn publish(&self, token: &str, parts: &[Part<'_>]) -> Response<Body> {
        self.send(with_session(multipart("/newpost", parts), token)).await
    }
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn form(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn json_post(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_session(mut request: Request<Body>, token: &str) -> Request<Body> {
    request
        .headers_mut()
        .insert(COOKIE, format!("session_id={token}").parse().unwrap());
    request
}

enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

fn multipart(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(LOCATION)
        .map(|v| v.to_str().unwrap().to_owned())
        .unwrap_or_default()
}

/// Value of the `name` cookie set by `response`, if any.
fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_owned())
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ── Pages ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_reports_ok() {
    let app = setup_app().await;
    let response = app.send(get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn home_page_for_anonymous_visitor() {
    let app = setup_app().await;
    let response = app.send(get("/")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-content-type-options"], "nosniff");
    let html = body_text(response).await;
    assert!(html.contains("You are not logged in"));
    assert!(html.contains("No posts yet."));
}

#[tokio::test]
async fn post_to_home_redirects_to_register() {
    let app = setup_app().await;
    let response = app.send(form("/", "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
}

#[tokio::test]
async fn unknown_paths_and_methods_are_not_found() {
    let app = setup_app().await;

    let response = app.send(get("/nowhere")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri("/login")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn static_assets_are_served() {
    let app = setup_app().await;
    let response = app.send(get("/static/style.css")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("margin"));
}

// ── Accounts ─────────────────────────────────────────────────────────

#[tokio::test]
async fn register_login_and_home_shows_user() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let html = body_text(app.send(with_session(get("/"), &token)).await).await;
    assert!(html.contains("Welcome back, alice."));
}

#[tokio::test]
async fn duplicate_username_flashes_error_once() {
    let app = setup_app().await;
    app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .send(form("/register", "email=other%40example.com&username=alice&password=pw"))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/register");
    let flash = set_cookie(&response, "error").unwrap();

    let mut request = get("/register");
    request
        .headers_mut()
        .insert(COOKIE, format!("error={flash}").parse().unwrap());
    let response = app.send(request).await;

    assert_eq!(set_cookie(&response, "error").as_deref(), Some(""));
    let html = body_text(response).await;
    assert!(html.contains("username already taken"));
}

#[tokio::test]
async fn invalid_email_is_rejected() {
    let app = setup_app().await;
    let response = app
        .send(form("/register", "email=nope&username=bob&password=pw"))
        .await;
    assert_eq!(location(&response), "/register");
    assert!(set_cookie(&response, "error").is_some());
    assert!(app.state.accounts.find_by_username("bob").await.unwrap().is_none());
}

#[tokio::test]
async fn wrong_password_flashes_and_sets_no_session() {
    let app = setup_app().await;
    app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .send(form("/login", "email=alice%40example.com&password=wrong"))
        .await;
    assert_eq!(location(&response), "/login");
    assert!(set_cookie(&response, "session_id").is_none());
    let flash = set_cookie(&response, "error").unwrap();
    assert_eq!(urlencoding::decode(&flash).unwrap(), "incorrect password");
}

#[tokio::test]
async fn logout_revokes_session() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app.send(with_session(form("/logout", ""), &token)).await;
    assert_eq!(location(&response), "/");
    assert_eq!(set_cookie(&response, "session_id").as_deref(), Some(""));

    let html = body_text(app.send(with_session(get("/"), &token)).await).await;
    assert!(html.contains("You are not logged in"));
}

#[tokio::test]
async fn logout_everywhere_revokes_all_sessions() {
    let app = setup_app().await;
    let first = app.sign_up("alice%40example.com", "alice").await;
    let response = app
        .send(form("/login", "email=alice%40example.com&password=pw"))
        .await;
    let second = set_cookie(&response, "session_id").unwrap();

    app.send(with_session(form("/logout?everywhere=true", ""), &first))
        .await;

    assert!(app.state.sessions.lookup(&second).await.is_err());
    assert!(app.state.sessions.is_empty().await);
}

// ── Posts ────────────────────────────────────────────────────────────

#[tokio::test]
async fn new_post_requires_login() {
    let app = setup_app().await;
    let response = app
        .send(multipart("/newpost", &[Part::Text("title", "Hello")]))
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn publish_post_with_attachments_then_comment() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .publish(
            &token,
            &[
                Part::Text("title", "Holiday"),
                Part::Text("content", "Look at this <b>view</b>"),
                Part::File("all", "beach.png", b"\x89PNG fake"),
                Part::File("all", "waves.mp4", b"fake mp4"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let target = location(&response);
    let post_id: i64 = target.strip_prefix("/?postID=").unwrap().parse().unwrap();

    let post = app.state.posts.get(post_id).await.unwrap();
    assert_eq!(post.images.len(), 1);
    assert!(post.video.is_some());

    let response = app.send(get(&format!("/details/{post_id}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Holiday"));
    assert!(html.contains("&lt;b&gt;view"));
    assert!(!html.contains("<b>view"));
    assert!(html.contains(&format!("/img_video/{}", post.images[0])));

    let response = app
        .send(get(&format!("/img_video/{}", post.images[0])))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/png");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"\x89PNG fake");

    let response = app
        .send(with_session(
            form(&format!("/details/{post_id}"), "comment=Nice+shot"),
            &token,
        ))
        .await;
    assert_eq!(location(&response), format!("/details/{post_id}"));

    let html = body_text(app.send(get(&format!("/details/{post_id}"))).await).await;
    assert!(html.contains("Nice shot"));
    assert!(html.contains("Comments (1)"));
}

#[tokio::test]
async fn highlighted_post_on_home_page() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;
    let response = app.publish(&token, &[Part::Text("title", "Fresh")]).await;

    let html = body_text(app.send(get(&location(&response))).await).await;
    assert!(html.contains("post highlight"));
    assert!(html.contains("Fresh"));
}

#[tokio::test]
async fn unsupported_attachment_is_bad_request() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .publish(
            &token,
            &[
                Part::Text("title", "Notes"),
                Part::File("all", "notes.txt", b"plain text"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(app.state.posts.list().await.unwrap().is_empty());
    assert!(app.state.media.keys("").await.unwrap().is_empty());
}

#[tokio::test]
async fn second_video_is_bad_request() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .publish(
            &token,
            &[
                Part::Text("title", "Clips"),
                Part::File("all", "a.mp4", b"one"),
                Part::File("all", "b.mov", b"two"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_title_flashes_back_to_form() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app.publish(&token, &[Part::Text("content", "no title")]).await;
    assert_eq!(location(&response), "/newpost");
    assert!(set_cookie(&response, "error").is_some());
}

#[tokio::test]
async fn oversized_upload_is_rejected() {
    let app = setup_app_with(&[("FORUM_MAX_UPLOAD_BYTES", "1024")]).await;
    let token = app.sign_up("alice%40example.com", "alice").await;
    let big = vec![0_u8; 8 * 1024];

    let response = app
        .publish(
            &token,
            &[
                Part::Text("title", "Big"),
                Part::File("all", "big.png", &big),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn empty_comment_is_flashed() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;
    let response = app.publish(&token, &[Part::Text("title", "Quiet")]).await;
    let post_id = location(&response).trim_start_matches("/?postID=").to_owned();

    let response = app
        .send(with_session(
            form(&format!("/details/{post_id}"), "comment=+++"),
            &token,
        ))
        .await;
    assert_eq!(location(&response), format!("/details/{post_id}"));
    assert!(set_cookie(&response, "error").is_some());
}

#[tokio::test]
async fn detail_page_errors() {
    let app = setup_app().await;

    assert_eq!(app.send(get("/details/999")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.send(get("/details/abc")).await.status(), StatusCode::BAD_REQUEST);

    let response = app.send(get("/details/")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_text(response).await.contains("missing post id"));
}

#[tokio::test]
async fn unknown_media_is_not_found() {
    let app = setup_app().await;
    assert_eq!(
        app.send(get("/img_video/deadbeef-none.png")).await.status(),
        StatusCode::NOT_FOUND
    );
}

// ── Profiles ─────────────────────────────────────────────────────────

#[tokio::test]
async fn own_profile_requires_login() {
    let app = setup_app().await;
    let response = app.send(get("/profil")).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn profile_picture_upload() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .send(with_session(
            multipart("/profil", &[Part::File("picture", "me.png", b"png")]),
            &token,
        ))
        .await;
    assert_eq!(location(&response), "/profil");
    assert!(set_cookie(&response, "error").is_none());

    let user = app.state.accounts.find_by_username("alice").await.unwrap().unwrap();
    let key = user.profile_picture.unwrap();
    assert!(key.ends_with("-me.png"));

    let html = body_text(app.send(with_session(get("/profil"), &token)).await).await;
    assert!(html.contains(&format!("/img_video/{key}")));
}

#[tokio::test]
async fn profile_picture_must_be_an_image() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;

    let response = app
        .send(with_session(
            multipart("/profil", &[Part::File("picture", "me.mp4", b"mp4")]),
            &token,
        ))
        .await;
    assert_eq!(location(&response), "/profil");
    assert!(set_cookie(&response, "error").is_some());

    let user = app.state.accounts.find_by_username("alice").await.unwrap().unwrap();
    assert!(user.profile_picture.is_none());
}

#[tokio::test]
async fn other_profiles() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;
    app.publish(&token, &[Part::Text("title", "By Alice")]).await;

    assert_eq!(app.send(get("/profilOther")).await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        app.send(get("/profilOther?username=nobody")).await.status(),
        StatusCode::NOT_FOUND
    );

    let response = app.send(get("/profilOther?username=alice")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Posts by alice"));
    assert!(html.contains("By Alice"));
    assert!(!html.contains("alice@example.com"));
}

#[tokio::test]
async fn error_page_shows_flash() {
    let app = setup_app().await;
    let mut request = get("/erreur");
    request
        .headers_mut()
        .insert(COOKIE, "error=upload%20failed".parse().unwrap());
    let html = body_text(app.send(request).await).await;
    assert!(html.contains("upload failed"));
}

// ── JSON API ─────────────────────────────────────────────────────────

#[tokio::test]
async fn api_register_login_me() {
    let app = setup_app().await;

    let response = app
        .send(json_post(
            "/api/v1/register",
            &serde_json::json!({"email": "bob@example.com", "username": "bob", "password": "pw"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["username"], "bob");
    assert!(user.get("password").is_none());

    let response = app
        .send(json_post(
            "/api/v1/login",
            &serde_json::json!({"email": "bob@example.com", "password": "pw"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_json(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_owned();

    let mut request = get("/api/v1/me");
    request
        .headers_mut()
        .insert(AUTHORIZATION, format!("Bearer {token}").parse().unwrap());
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "bob@example.com");
}

#[tokio::test]
async fn api_errors_are_json() {
    let app = setup_app().await;

    let response = app.send(get("/api/v1/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "unauthorized");

    app.sign_up("alice%40example.com", "alice").await;
    let response = app
        .send(json_post(
            "/api/v1/register",
            &serde_json::json!({"email": "alice@example.com", "username": "alice2", "password": "pw"}),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app.send(get("/api/v1/posts/42")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "not_found");
}

#[tokio::test]
async fn api_malformed_bodies_are_json_errors() {
    let app = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{email: nope"))
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "bad_request");
    assert!(body["message"].is_string());

    let response = app
        .send(json_post("/api/v1/register", &serde_json::json!({"email": "a@b.co"})))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");

    let response = app.send(form("/api/v1/login", "email=a&password=b")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "bad_request");
}

#[tokio::test]
async fn api_lists_posts() {
    let app = setup_app().await;
    let token = app.sign_up("alice%40example.com", "alice").await;
    app.publish(&token, &[Part::Text("title", "First")]).await;
    app.publish(&token, &[Part::Text("title", "Second")]).await;

    let body = body_json(app.send(get("/api/v1/posts")).await).await;
    let titles: Vec<&str> = body["posts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"First"));
    assert!(titles.contains(&"Second"));
}
