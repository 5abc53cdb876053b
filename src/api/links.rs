//! Link Routes
//!
//! External links shown on a project page. Links belong to the project's
//! creator whoever submits them.
//!
//! Routes:
//! - GET /projects/:slug/edit/links - List links with an empty form
//! - POST /projects/:slug/edit/links - Add a link
//! - POST /projects/:slug/edit/links/:link/delete - Delete a link

use axum::{
    extract::{Path, State},
    response::Response,
    Extension, Form,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::db::{self, Link, Project, Verb};
use crate::flash::Flash;
use crate::forms::{FormErrors, ProjectLinksForm};
use crate::middleware::{CurrentUser, OwnedProject};
use crate::views::{redirect, urls, Page};
use crate::{AppState, Error, Result};

/// Path parameters for link deletion.
#[derive(Debug, Deserialize)]
pub struct LinkPathParams {
    pub slug: String,
    pub link: String,
}

#[derive(Debug, Serialize)]
struct LinksContext {
    project: Project,
    links: Vec<Link>,
    form: ProjectLinksForm,
    errors: FormErrors,
}

/// Link list and form.
///
/// GET /projects/:slug/edit/links
#[axum::debug_handler]
pub async fn edit_links(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
) -> Result<Response> {
    let links = db::list_project_links(&state.db, &project.id).await?;
    let context = LinksContext {
        project,
        links,
        form: ProjectLinksForm::default(),
        errors: FormErrors::default(),
    };
    Ok(Page::new("project_edit_links", context).render(flash))
}

/// Add a link.
///
/// POST /projects/:slug/edit/links
#[axum::debug_handler]
pub async fn add_link(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Extension(current): Extension<CurrentUser>,
    flash: Flash,
    Form(form): Form<ProjectLinksForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        let links = db::list_project_links(&state.db, &project.id).await?;
        let context = LinksContext {
            project,
            links,
            form,
            errors,
        };
        return Ok(Page::invalid(
            "project_edit_links",
            context,
            "There was an error adding your link.",
        )
        .render(flash));
    }

    let link = db::create_link(
        &state.db,
        db::CreateLink {
            id: db::new_id(),
            project_id: project.id.clone(),
            user_id: project.created_by.clone(),
            name: form.name.trim().to_string(),
            url: form.url.trim().to_string(),
        },
    )
    .await?;
    db::record_activity(
        &state.db,
        current.id(),
        &project.id,
        Verb::LinkAdded,
        Some(&link.url),
    )
    .await?;

    info!(slug = %project.slug, link_id = %link.id, "Link added");

    let flash = flash.success("Link added.");
    Ok(redirect(flash, &urls::edit_links(&project.slug)))
}

/// Delete a link belonging to the project.
///
/// POST /projects/:slug/edit/links/:link/delete
///
/// # Errors
///
/// Returns 404 for an unknown link and 403 if the link belongs to another
/// project.
#[axum::debug_handler]
pub async fn delete_link(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Path(params): Path<LinkPathParams>,
    flash: Flash,
) -> Result<Response> {
    let link = db::get_link(&state.db, &params.link).await?;

    if link.project_id != project.id {
        warn!(
            slug = %project.slug,
            link_id = %link.id,
            "Access denied: link belongs to another project"
        );
        return Err(Error::Forbidden);
    }

    db::delete_link(&state.db, &link.id).await?;

    info!(slug = %project.slug, link_id = %link.id, "Link deleted");

    let flash = flash.success("The link was deleted");
    Ok(redirect(flash, &urls::edit_links(&project.slug)))
}
