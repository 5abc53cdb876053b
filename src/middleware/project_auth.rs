//! Ownership guard for project mutations.
//!
//! Only a project's creator may change it. The guard resolves the project
//! named by the `:slug` path segment and rejects everyone else before the
//! handler runs.

use axum::{
    body::Body,
    extract::{Path, Request, State},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::{db, error::Error, middleware::CurrentUser, AppState};

/// The project resolved by the ownership guard.
///
/// Present in request extensions only when the current user owns it.
#[derive(Clone, Debug)]
pub struct OwnedProject(pub db::Project);

/// Extract the project slug from path parameters.
#[derive(Debug, Deserialize)]
pub struct ProjectSlugParams {
    pub slug: String,
}

/// Middleware that requires the current user to own the project in the path.
///
/// Must run after [`require_session`](super::require_session).
///
/// # Errors
///
/// Returns 401 if no user was authenticated, 404 if the slug is unknown and
/// 403 if the user is not the project's creator.
pub async fn require_project_owner(
    State(state): State<AppState>,
    Path(params): Path<ProjectSlugParams>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, Error> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .cloned()
        .ok_or(Error::Unauthenticated)?;

    let project = db::get_project_by_slug(&state.db, &params.slug).await?;

    if !project.is_owned_by(user.id()) {
        warn!(
            user_id = %user.id(),
            slug = %project.slug,
            "Access denied: user does not own project"
        );
        return Err(Error::Forbidden);
    }

    debug!(slug = %project.slug, user_id = %user.id(), "Project owner access granted");

    req.extensions_mut().insert(OwnedProject(project));
    Ok(next.run(req).await)
}
