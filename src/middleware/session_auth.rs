//! Session-based authentication middleware.
//!
//! Validates the session cookie set by the site's login flow and resolves it
//! to a user profile.
//!
//! # Session Flow
//!
//! 1. The wider site authenticates the user and writes a row to `sessions`
//! 2. The browser sends the `drumbeat_session` cookie with every request
//! 3. This middleware loads the session and its user
//! 4. Sessions past their expiry are rejected and deleted; sessions past
//!    half their lifetime are extended

use axum::{
    body::Body,
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use tracing::debug;

use crate::{config, db, error::Error, AppState};

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "drumbeat_session";

/// User context injected into request extensions after successful session validation.
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub profile: db::UserProfile,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.profile.id
    }
}

/// Middleware that requires a valid session.
///
/// Extracts session ID from cookie, validates it against the database,
/// and injects `CurrentUser` into request extensions.
///
/// # Errors
///
/// Returns 401 Unauthorized if:
/// - No session cookie present
/// - Session not found in database
/// - Session is expired
/// - User not found
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    let session_id = jar
        .get(SESSION_COOKIE_NAME)
        .map(|c| c.value().to_string())
        .ok_or(Error::Unauthenticated)?;

    let profile = validate_session(&state, &session_id).await?;

    debug!(user_id = %profile.id, "Session validated");

    req.extensions_mut().insert(CurrentUser { profile });

    Ok(next.run(req).await)
}

/// Validate a session ID and return the session's user.
async fn validate_session(state: &AppState, session_id: &str) -> Result<db::UserProfile, Error> {
    let session = db::get_session(&state.db, session_id)
        .await?
        .ok_or(Error::Unauthenticated)?;

    if session.is_expired() {
        let pool = state.db.clone();
        let sid = session_id.to_string();
        tokio::spawn(async move {
            let _ = db::delete_session(&pool, &sid).await;
        });
        return Err(Error::Unauthenticated);
    }

    let profile = db::find_user(&state.db, &session.user_id)
        .await?
        .ok_or(Error::Unauthenticated)?;

    // Extend the session once it is more than halfway through its lifetime
    let max_age_seconds = state.session_max_age_seconds.min(config::MAX_SESSION_AGE_SECONDS);
    let max_age = chrono::Duration::seconds(max_age_seconds as i64);
    if session.expires_at < Utc::now() + (max_age / 2) {
        db::extend_session(&state.db, session_id, Utc::now() + max_age).await?;
    }

    Ok(profile)
}
