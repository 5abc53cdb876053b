//! Project Routes
//!
//! Gallery, project page, creation and the owner's summary, image and
//! preparation status editors, plus messaging followers.
//!
//! Routes:
//! - GET /projects - Gallery
//! - GET/POST /projects/create - Create a project
//! - GET /projects/:slug - Project page
//! - GET/POST /projects/:slug/edit - Edit name and descriptions
//! - GET/POST /projects/:slug/edit/image - Replace the project image
//! - POST /projects/:slug/edit/image/async - Replace the image, JSON reply
//! - GET/POST /projects/:slug/edit/status - Change preparation status
//! - GET/POST /projects/:slug/contact - Message followers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Form, Json,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::db::{
    self, Activity, Link, Page as DescriptionPage, PreparationStatus, Project,
    ProjectWithFollowers, Verb,
};
use crate::flash::Flash;
use crate::forms::{
    image_read_errors, missing_image_errors, FormErrors, ProjectContactUsersForm, ProjectForm,
    ProjectImageForm, ProjectPreparationStatusForm,
};
use crate::middleware::{CurrentUser, OwnedProject, ProjectSlugParams};
use crate::services::ContactMessage;
use crate::views::{redirect, urls, Page};
use crate::{AppState, Error, Result};

/// Number of projects shown in each of the "new" and "active" gallery rows.
pub const GALLERY_ROW_SIZE: i64 = 4;

/// Number of activities shown on a project page.
pub const RECENT_ACTIVITY_LIMIT: i64 = 10;

// ============================================================================
// Page Contexts
// ============================================================================

#[derive(Debug, Serialize)]
struct GalleryContext {
    featured: Vec<ProjectWithFollowers>,
    new: Vec<ProjectWithFollowers>,
    active: Vec<ProjectWithFollowers>,
}

#[derive(Debug, Serialize)]
struct ShowContext {
    project: Project,
    detailed_description: Option<DescriptionPage>,
    links: Vec<Link>,
    followers_count: i64,
    activities: Vec<Activity>,
}

#[derive(Debug, Serialize)]
struct SummaryFormContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<Project>,
    form: ProjectForm,
    errors: FormErrors,
}

#[derive(Debug, Serialize)]
struct ImageFormContext {
    project: Project,
    errors: FormErrors,
}

#[derive(Debug, Serialize)]
struct StatusFormContext {
    project: Project,
    choices: [PreparationStatus; 3],
    form: ProjectPreparationStatusForm,
    errors: FormErrors,
}

#[derive(Debug, Serialize)]
struct ContactFormContext {
    project: Project,
    form: ProjectContactUsersForm,
    errors: FormErrors,
}

// ============================================================================
// Public
// ============================================================================

/// Project gallery.
///
/// GET /projects
#[axum::debug_handler]
pub async fn list(State(state): State<AppState>, flash: Flash) -> Result<Response> {
    let context = GalleryContext {
        featured: db::list_featured_projects(&state.db).await?,
        new: db::list_newest_projects(&state.db, GALLERY_ROW_SIZE).await?,
        active: db::list_popular_projects(&state.db, GALLERY_ROW_SIZE).await?,
    };

    Ok(Page::new("project_list", context).render(flash))
}

/// Project page.
///
/// GET /projects/:slug
#[axum::debug_handler]
pub async fn show(
    State(state): State<AppState>,
    Path(params): Path<ProjectSlugParams>,
    flash: Flash,
) -> Result<Response> {
    let project = db::get_project_by_slug(&state.db, &params.slug).await?;

    let detailed_description = match project.detailed_description_id.as_deref() {
        Some(page_id) => Some(db::get_page(&state.db, page_id).await?),
        None => None,
    };

    let context = ShowContext {
        links: db::list_project_links(&state.db, &project.id).await?,
        followers_count: db::count_followers(&state.db, &project.id).await?,
        activities: db::list_recent_activities(&state.db, &project.id, RECENT_ACTIVITY_LIMIT)
            .await?,
        detailed_description,
        project,
    };

    Ok(Page::new("project_show", context).render(flash))
}

// ============================================================================
// Creation
// ============================================================================

/// Empty creation form.
///
/// GET /projects/create
#[axum::debug_handler]
pub async fn create_form(flash: Flash) -> Response {
    let context = SummaryFormContext {
        project: None,
        form: ProjectForm::default(),
        errors: FormErrors::default(),
    };
    Page::new("project_create", context).render(flash)
}

/// Create a project owned by the current user.
///
/// POST /projects/create
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    flash: Flash,
    Form(form): Form<ProjectForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        let context = SummaryFormContext {
            project: None,
            form,
            errors,
        };
        return Ok(Page::invalid(
            "project_create",
            context,
            "There was a problem creating your course.",
        )
        .render(flash));
    }

    let summary = form.into_update();
    let project = db::create_project(
        &state.db,
        db::CreateProject {
            id: db::new_id(),
            name: summary.name,
            short_description: summary.short_description,
            long_description: summary.long_description,
            created_by: current.id().to_string(),
        },
    )
    .await?;

    info!(slug = %project.slug, user_id = %current.id(), "Project created");

    let flash = flash.success("Your new course has been created.");
    Ok(redirect(flash, &urls::show(&project.slug)))
}

// ============================================================================
// Summary
// ============================================================================

/// Summary editor prefilled from the project.
///
/// GET /projects/:slug/edit
#[axum::debug_handler]
pub async fn edit_form(
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
) -> Response {
    let context = SummaryFormContext {
        form: ProjectForm::from_project(&project),
        project: Some(project),
        errors: FormErrors::default(),
    };
    Page::new("project_edit_summary", context).render(flash)
}

/// Save name and descriptions.
///
/// POST /projects/:slug/edit
#[axum::debug_handler]
pub async fn edit(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Extension(current): Extension<CurrentUser>,
    flash: Flash,
    Form(form): Form<ProjectForm>,
) -> Result<Response> {
    if let Err(errors) = form.validate() {
        let context = SummaryFormContext {
            project: Some(project),
            form,
            errors,
        };
        return Ok(Page::new("project_edit_summary", context)
            .with_status(StatusCode::UNPROCESSABLE_ENTITY)
            .render(flash));
    }

    let project = db::update_project_summary(&state.db, &project.id, form.into_update()).await?;
    db::record_activity(&state.db, current.id(), &project.id, Verb::Updated, Some("summary"))
        .await?;

    info!(slug = %project.slug, "Project summary updated");

    let flash = flash.success("Course updated!");
    Ok(redirect(flash, &urls::edit(&project.slug)))
}

// ============================================================================
// Image
// ============================================================================

/// Image upload form.
///
/// GET /projects/:slug/edit/image
#[axum::debug_handler]
pub async fn edit_image_form(
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
) -> Response {
    let context = ImageFormContext {
        project,
        errors: FormErrors::default(),
    };
    Page::new("project_edit_image", context).render(flash)
}

/// Replace the project image.
///
/// POST /projects/:slug/edit/image
#[axum::debug_handler]
pub async fn edit_image(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Extension(current): Extension<CurrentUser>,
    flash: Flash,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let outcome = match read_upload(&state, multipart).await? {
        Ok(upload) => Ok(store_image(&state, &project, &current, upload).await?),
        Err(errors) => Err(errors),
    };

    match outcome {
        Ok(project) => {
            let flash = flash.success("Image updated");
            Ok(redirect(flash, &urls::show(&project.slug)))
        }
        Err(errors) => {
            warn!(slug = %project.slug, ?errors, "Rejected image upload");
            let context = ImageFormContext { project, errors };
            Ok(Page::invalid(
                "project_edit_image",
                context,
                "There was an error uploading your image",
            )
            .render(flash))
        }
    }
}

/// Replace the project image from a script.
///
/// POST /projects/:slug/edit/image/async
///
/// Always answers 200; failures are reported in the body.
#[axum::debug_handler]
pub async fn edit_image_async(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Extension(current): Extension<CurrentUser>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Response {
    let filename = match read_upload(&state, multipart).await {
        Ok(Ok(upload)) => store_image(&state, &project, &current, upload)
            .await
            .map(|project| project.image),
        Ok(Err(errors)) => {
            warn!(slug = %project.slug, ?errors, "Rejected image upload");
            return upload_failed();
        }
        Err(e) => Err(e),
    };

    match filename {
        Ok(filename) => Json(json!({ "filename": filename })).into_response(),
        Err(e) => {
            warn!(slug = %project.slug, error = %e, "Image upload failed");
            upload_failed()
        }
    }
}

fn upload_failed() -> Response {
    Json(json!({ "error": "There was an error uploading your image." })).into_response()
}

/// Read and validate the `image` field of an upload.
///
/// The outer result carries failures unrelated to the upload; the inner
/// one carries problems with the upload itself.
async fn read_upload(
    state: &AppState,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<std::result::Result<ProjectImageForm, FormErrors>> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                Error::FileTooLarge {
                    max_size: state.images.max_size(),
                }
            } else {
                Error::InvalidInput(rejection.body_text())
            };
            return image_read_errors(err).map(Err);
        }
    };

    let max_size = state.images.max_size();
    let upload = match ProjectImageForm::from_multipart(&mut multipart, max_size).await {
        Ok(Some(upload)) => upload,
        Ok(None) => return Ok(Err(missing_image_errors())),
        Err(e) => return image_read_errors(e).map(Err),
    };

    Ok(upload.validate(max_size).map(|()| upload))
}

/// Store an image and attach it to the project.
async fn store_image(
    state: &AppState,
    project: &Project,
    current: &CurrentUser,
    upload: ProjectImageForm,
) -> Result<Project> {
    let name = state.images.store(&upload).await?;
    let project = db::update_project_image(&state.db, &project.id, &name).await?;
    db::record_activity(&state.db, current.id(), &project.id, Verb::Updated, Some("image"))
        .await?;

    info!(slug = %project.slug, image = %name, "Project image updated");

    Ok(project)
}

// ============================================================================
// Preparation status
// ============================================================================

/// Preparation status form.
///
/// GET /projects/:slug/edit/status
#[axum::debug_handler]
pub async fn edit_preparation_status_form(
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    flash: Flash,
) -> Response {
    let context = StatusFormContext {
        form: ProjectPreparationStatusForm::from_status(project.status()),
        choices: PreparationStatus::ALL,
        project,
        errors: FormErrors::default(),
    };
    Page::new("project_edit_status", context).render(flash)
}

/// Change the preparation status.
///
/// POST /projects/:slug/edit/status
#[axum::debug_handler]
pub async fn edit_preparation_status(
    State(state): State<AppState>,
    Extension(OwnedProject(project)): Extension<OwnedProject>,
    Extension(current): Extension<CurrentUser>,
    flash: Flash,
    Form(form): Form<ProjectPreparationStatusForm>,
) -> Result<Response> {
    let status = match form.validate() {
        Ok(status) => status,
        Err(errors) => {
            let context = StatusFormContext {
                project,
                choices: PreparationStatus::ALL,
                form,
                errors,
            };
            return Ok(Page::invalid(
                "project_edit_status",
                context,
                "There was a problem saving the preparation status.",
            )
            .render(flash));
        }
    };

    let project = db::update_preparation_status(&state.db, &project.id, status).await?;
    db::record_activity(
        &state.db,
        current.id(),
        &project.id,
        Verb::Updated,
        Some("preparation_status"),
    )
    .await?;

    info!(slug = %project.slug, status = status.as_str(), "Preparation status changed");

    Ok(redirect(flash, &urls::show(&project.slug)))
}

// ============================================================================
// Contact followers
// ============================================================================

/// Load a project and check that the current user created it.
async fn load_own_project(state: &AppState, slug: &str, current: &CurrentUser) -> Result<Project> {
    let project = db::get_project_by_slug(&state.db, slug).await?;
    if !project.is_owned_by(current.id()) {
        warn!(
            user_id = %current.id(),
            slug = %project.slug,
            "Access denied: only the owner may contact followers"
        );
        return Err(Error::Forbidden);
    }
    Ok(project)
}

/// Message composer.
///
/// GET /projects/:slug/contact
#[axum::debug_handler]
pub async fn contact_followers_form(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(params): Path<ProjectSlugParams>,
    flash: Flash,
) -> Result<Response> {
    let project = load_own_project(&state, &params.slug, &current).await?;
    let context = ContactFormContext {
        project,
        form: ProjectContactUsersForm::default(),
        errors: FormErrors::default(),
    };
    Ok(Page::new("project_contact_followers", context).render(flash))
}

/// Send a message to every follower except the sender.
///
/// POST /projects/:slug/contact
#[axum::debug_handler]
pub async fn contact_followers(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(params): Path<ProjectSlugParams>,
    flash: Flash,
    Form(form): Form<ProjectContactUsersForm>,
) -> Result<Response> {
    let project = load_own_project(&state, &params.slug, &current).await?;

    if let Err(errors) = form.validate() {
        let context = ContactFormContext {
            project,
            form,
            errors,
        };
        return Ok(Page::new("project_contact_followers", context)
            .with_status(StatusCode::UNPROCESSABLE_ENTITY)
            .render(flash));
    }

    let recipients: Vec<_> = db::list_followers(&state.db, &project.id)
        .await?
        .into_iter()
        .filter(|follower| follower.id != current.id())
        .collect();

    state
        .messenger
        .send(ContactMessage {
            sender: &current.profile,
            project: &project,
            subject: form.subject.trim(),
            body: form.message.trim(),
            recipients: &recipients,
        })
        .await?;

    let flash = flash.info("Message successfully sent.");
    Ok(redirect(flash, &urls::show(&project.slug)))
}
