//! Common test utilities and helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderValue, Request, Response};
use axum::Router;
use axum_extra::extract::cookie::Cookie;
use chrono::{Duration, Utc};
use drumbeat::db::{self, DbPool, Project, UserProfile};
use drumbeat::flash::{self, FLASH_COOKIE_NAME};
use drumbeat::middleware::SESSION_COOKIE_NAME;
use drumbeat::services::ImageStorage;
use drumbeat::{api, AppState};
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

/// Largest image accepted by the test app.
pub const TEST_MAX_IMAGE_SIZE: usize = 64 * 1024;

/// A router over an in-memory database and a scratch images directory.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub state: AppState,
    /// Keeps the images directory alive for the duration of the test.
    pub images: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = setup_test_db().await;
        let images = TempDir::new().expect("Failed to create images dir");
        let state = AppState::from_parts(
            pool.clone(),
            ImageStorage::new(images.path(), TEST_MAX_IMAGE_SIZE),
        );
        let router = build_router(state.clone());

        Self {
            router,
            pool,
            state,
            images,
        }
    }

    /// Send a request through a fresh clone of the router.
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router is infallible")
    }
}

/// Build the application router the way the server does.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::routes(state.clone()))
        .with_state(state)
}

/// Create a test database with the schema applied
pub async fn setup_test_db() -> DbPool {
    let pool = db::init_pool(":memory:")
        .await
        .expect("Failed to create test database");
    db::initialize_schema(&pool)
        .await
        .expect("Failed to initialize schema");
    pool
}

/// Create a user whose display name is derived from the username.
pub async fn create_test_user(pool: &DbPool, username: &str) -> UserProfile {
    db::create_user(
        pool,
        db::CreateUser {
            id: nanoid::nanoid!(),
            username: username.to_string(),
            display_name: format!("{} Display", username),
            email: Some(format!("{}@example.org", username)),
        },
    )
    .await
    .expect("Failed to create test user")
}

/// Open a session for the user and return the cookie header value.
pub async fn login(pool: &DbPool, user: &UserProfile) -> HeaderValue {
    let session = db::create_session(
        pool,
        db::CreateSession {
            id: nanoid::nanoid!(32),
            user_id: user.id.clone(),
            expires_at: Utc::now() + Duration::days(14),
        },
    )
    .await
    .expect("Failed to create session");

    session_cookie(&session.id)
}

pub fn session_cookie(session_id: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("{}={}", SESSION_COOKIE_NAME, session_id)).unwrap()
}

/// Create a project owned by `owner` through the query layer.
pub async fn create_test_project(pool: &DbPool, owner: &UserProfile, name: &str) -> Project {
    db::create_project(
        pool,
        db::CreateProject {
            id: nanoid::nanoid!(),
            name: name.to_string(),
            short_description: format!("Test project: {}", name),
            long_description: String::new(),
            created_by: owner.id.clone(),
        },
    )
    .await
    .expect("Failed to create test project")
}

// ============================================================================
// Requests
// ============================================================================

/// Create a GET request, optionally with a session cookie
pub fn get_request(uri: &str, cookie: Option<&HeaderValue>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

/// Create a POST request with a urlencoded form body
pub fn post_form(uri: &str, cookie: Option<&HeaderValue>, fields: &[(&str, &str)]) -> Request<Body> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(fields)
        .finish();

    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

/// Create a POST request carrying a single multipart file field named `image`
pub fn post_image(
    uri: &str,
    cookie: &HeaderValue,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let boundary = "drumbeat-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .header(header::COOKIE, cookie)
        .body(Body::from(body))
        .unwrap()
}

// ============================================================================
// Responses
// ============================================================================

/// Extract JSON body from response
pub async fn extract_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
}

/// The `Location` header of a redirect.
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Flash messages queued by a response.
pub fn flash_messages(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| Cookie::parse(v.to_string()).ok())
        .filter(|c| c.name() == FLASH_COOKIE_NAME)
        .flat_map(|c| flash::decode(c.value()))
        .map(|m| m.message)
        .collect()
}
