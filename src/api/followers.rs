//! Follower Routes
//!
//! The owner's follower list. Adding someone here makes that user follow
//! the project; removing drops their follow edge.
//!
//! Routes:
//! - GET /projects/:slug/edit/followers - List followers
//! - POST /projects/:slug/edit/followers/add - Add a follower by username
//! - POST /projects/:slug/edit/followers/delete - Remove a follower by id

use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Response,
    Extension, Form,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::db::{self, Project, UserProfile, Verb};
use crate::flash::Flash;
use crate::forms::{AddFollowerForm, DeleteFollowerForm};
use crate::middleware::OwnedProject;
use crate::views::{redirect, urls, Page};
use crate::{AppState, Error, Result};

#[derive(Debug, Serialize)]
struct FollowersContext {
    project: Project,
    followers: Vec<UserProfile>,
}

/// Follower list.
///
/// GET /projects/:slug/edit/followers
#[axum::debug_handler]
pub async fn edit_followers(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
) -> Result<Response> {
    let followers = db::list_followers(&state.db, &project.id).await?;
    let context = FollowersContext { project, followers };
    Ok(Page::new("project_edit_followers", context).render(flash))
}

/// Make a user follow the project.
///
/// POST /projects/:slug/edit/followers/add
///
/// Redirects back to the page the form was posted from.
#[axum::debug_handler]
pub async fn add_follower(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    headers: HeaderMap,
    flash: Flash,
    Form(form): Form<AddFollowerForm>,
) -> Result<Response> {
    let back = referer_path(&headers).unwrap_or_else(|| urls::edit_followers(&project.slug));

    let Some(username) = form
        .username
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        return Ok(redirect(flash, &back));
    };

    let Some(user) = db::find_user_by_username(&state.db, username).await? else {
        let flash = flash.error(format!("Username {} does not exist", username));
        return Ok(redirect(flash, &back));
    };

    let flash = match db::create_relationship(&state.db, &user.id, &project.id).await {
        Ok(_) => {
            db::record_activity(&state.db, &user.id, &project.id, Verb::Followed, None).await?;
            info!(slug = %project.slug, user_id = %user.id, "Follower added");
            flash
        }
        Err(Error::AlreadyExists(_)) => {
            debug!(slug = %project.slug, user_id = %user.id, "Follower already present");
            flash.error("You are already following this course")
        }
        Err(e) => return Err(e),
    };

    Ok(redirect(flash, &back))
}

/// Drop a user's follow edge.
///
/// POST /projects/:slug/edit/followers/delete
#[axum::debug_handler]
pub async fn delete_follower(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
    Form(form): Form<DeleteFollowerForm>,
) -> Result<Response> {
    let back = urls::edit_followers(&project.slug);

    let follower = match form.follower_id.as_deref().map(str::trim) {
        Some(id) if !id.is_empty() => db::find_user(&state.db, id).await?,
        _ => None,
    };
    let Some(follower) = follower else {
        let flash = flash.error("There was an error removing the user.");
        return Ok(redirect(flash, &back));
    };

    if project.is_owned_by(&follower.id) {
        let flash = flash.error("You cannot unfollow your own course");
        return Ok(redirect(flash, &back));
    }

    let flash = if db::delete_relationship(&state.db, &follower.id, &project.id).await? {
        info!(slug = %project.slug, user_id = %follower.id, "Follower removed");
        flash.success(format!(
            "The follower {} has been removed.",
            follower.display_name
        ))
    } else {
        flash.error("The user is not following this course")
    };

    Ok(redirect(flash, &back))
}

/// Local path and query of the `Referer` header.
///
/// Only the path is kept so the redirect cannot leave the site.
fn referer_path(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::REFERER)?.to_str().ok()?;

    if value.starts_with('/') && !value.starts_with("//") {
        return Some(value.to_string());
    }

    let parsed = url::Url::parse(value).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }

    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}
