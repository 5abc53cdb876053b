//! HTTP routes for drumbeat.
//!
//! This module combines all routes into a single router.
//! Routes are grouped by the access they require.

mod followers;
mod links;
mod projects;
pub mod status;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;

use crate::middleware::{require_project_owner, require_session};
use crate::AppState;

/// Room for multipart framing around the largest accepted image.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Build the complete router.
///
/// Route structure:
/// - /health - Health check (public)
/// - /projects, /projects/:slug - Gallery and project page (public)
/// - /projects/create, /projects/:slug/contact - Session required
/// - /projects/:slug/edit/* - Session and project ownership required
///
/// Request bodies are capped just above the largest accepted image.
pub fn routes(state: AppState) -> Router<AppState> {
    let body_limit = state.images.max_size() + MULTIPART_OVERHEAD;

    Router::new()
        .merge(status::routes())
        .nest("/projects", project_routes(state))
        .layer(DefaultBodyLimit::max(body_limit))
}

fn project_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(public_routes())
        .merge(authenticated_routes(state.clone()))
        .merge(owner_routes(state))
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(projects::list))
        .route("/:slug", get(projects::show))
}

fn authenticated_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/create", get(projects::create_form).post(projects::create))
        .route(
            "/:slug/contact",
            get(projects::contact_followers_form).post(projects::contact_followers),
        )
        .route_layer(from_fn_with_state(state, require_session))
}

fn owner_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/:slug/edit", get(projects::edit_form).post(projects::edit))
        .route(
            "/:slug/edit/image",
            get(projects::edit_image_form).post(projects::edit_image),
        )
        .route("/:slug/edit/image/async", post(projects::edit_image_async))
        .route(
            "/:slug/edit/status",
            get(projects::edit_preparation_status_form).post(projects::edit_preparation_status),
        )
        .route(
            "/:slug/edit/links",
            get(links::edit_links).post(links::add_link),
        )
        .route("/:slug/edit/links/:link/delete", post(links::delete_link))
        .route("/:slug/edit/followers", get(followers::edit_followers))
        .route("/:slug/edit/followers/add", post(followers::add_follower))
        .route("/:slug/edit/followers/delete", post(followers::delete_follower))
        // Layers run bottom-up: the session is resolved before ownership is checked
        .route_layer(from_fn_with_state(state.clone(), require_project_owner))
        .route_layer(from_fn_with_state(state, require_session))
}
