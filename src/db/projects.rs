//! Project database queries.
//!
//! Projects (courses) are addressed by slug and owned by their creator.

use crate::slug;
use crate::{Error, Result};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tracing::debug;

use super::{CreatePage, DbPool, Verb};

// ============================================================================
// Types
// ============================================================================

/// How far along a course is in its preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreparationStatus {
    #[default]
    Preparing,
    Open,
    Closed,
}

impl PreparationStatus {
    pub const ALL: [PreparationStatus; 3] = [Self::Preparing, Self::Open, Self::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preparing => "preparing",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::str::FromStr for PreparationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "preparing" => Ok(Self::Preparing),
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("Unknown preparation status: {}", s)),
        }
    }
}

/// Project record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub short_description: String,
    pub long_description: String,
    pub created_by: String,
    pub featured: bool,
    pub image: Option<String>,
    pub preparation_status: String,
    pub detailed_description_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Project {
    /// Parsed preparation status; unknown values read as `Preparing`.
    pub fn status(&self) -> PreparationStatus {
        self.preparation_status.parse().unwrap_or_default()
    }

    /// Whether `user_id` created this project.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.created_by == user_id
    }
}

/// A project annotated with its follower count, as shown in listings.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ProjectWithFollowers {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub project: Project,
    pub followers_count: i64,
}

/// Input for creating a new project.
#[derive(Debug, Clone)]
pub struct CreateProject {
    pub id: String,
    pub name: String,
    pub short_description: String,
    pub long_description: String,
    pub created_by: String,
}

/// Input for updating a project's summary.
#[derive(Debug, Clone)]
pub struct UpdateProjectSummary {
    pub name: String,
    pub short_description: String,
    pub long_description: String,
}

/// Window used to rank projects by recent activity.
pub const POPULAR_WINDOW_DAYS: i64 = 30;

const FOLLOWERS_COUNT_COLUMN: &str =
    "(SELECT COUNT(*) FROM relationships r WHERE r.target_project_id = p.id) AS followers_count";

// ============================================================================
// Queries
// ============================================================================

/// Create a new project together with its owner's follow edge and its
/// placeholder description page.
///
/// All writes happen in one transaction: either the project comes back
/// fully initialised (with `detailed_description_id` set) or nothing is
/// stored. A concurrent create that takes the chosen slug first, or writes
/// after this transaction's snapshot, makes the attempt start over with a
/// fresh slug.
pub async fn create_project(pool: &DbPool, input: CreateProject) -> Result<Project> {
    let mut attempt = 1;
    loop {
        match try_create_project(pool, &input).await {
            Err(e) if attempt < CREATE_ATTEMPTS && is_write_conflict(&e) => {
                debug!(attempt, error = %e, name = %input.name, "Retrying project creation");
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Attempts made by [`create_project`] before giving up on conflicts.
const CREATE_ATTEMPTS: usize = 5;

/// Whether an error came from racing another writer.
fn is_write_conflict(err: &Error) -> bool {
    match err {
        Error::AlreadyExists(_) => true,
        // SQLITE_BUSY and SQLITE_BUSY_SNAPSHOT
        Error::Database(sqlx::Error::Database(db_err)) => {
            matches!(db_err.code().as_deref(), Some("5") | Some("517"))
        }
        _ => false,
    }
}

async fn try_create_project(pool: &DbPool, input: &CreateProject) -> Result<Project> {
    let mut tx = pool.begin().await?;

    let base = slug::slugify(&input.name);
    let taken: Vec<String> =
        sqlx::query_scalar("SELECT slug FROM projects WHERE slug = ? OR slug LIKE ? || '-%'")
            .bind(&base)
            .bind(&base)
            .fetch_all(&mut *tx)
            .await?;
    let slug = slug::first_free(&base, &taken);

    sqlx::query(
        r#"
        INSERT INTO projects (id, slug, name, short_description, long_description, created_by)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.id)
    .bind(&slug)
    .bind(&input.name)
    .bind(&input.short_description)
    .bind(&input.long_description)
    .bind(&input.created_by)
    .execute(&mut *tx)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(format!("Project with slug '{}' already exists", slug))
        }
        _ => Error::Database(e),
    })?;

    super::create_relationship(&mut *tx, &input.created_by, &input.id).await?;

    let page = super::create_page(
        &mut *tx,
        CreatePage::detailed_description(&input.created_by, &input.id),
    )
    .await?;

    let project = sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects SET detailed_description_id = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&page.id)
    .bind(&input.id)
    .fetch_one(&mut *tx)
    .await?;

    super::record_activity(&mut *tx, &input.created_by, &input.id, Verb::Created, None).await?;

    tx.commit().await?;

    debug!(project_id = %project.id, slug = %project.slug, "Project created");

    Ok(project)
}

/// Get a project by ID.
pub async fn get_project(pool: &DbPool, id: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
}

/// Get a project by slug, returning None if absent.
pub async fn find_project_by_slug(pool: &DbPool, slug: &str) -> Result<Option<Project>> {
    sqlx::query_as::<_, Project>("SELECT * FROM projects WHERE slug = ?")
        .bind(slug)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Get a project by slug.
pub async fn get_project_by_slug(pool: &DbPool, slug: &str) -> Result<Project> {
    find_project_by_slug(pool, slug)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project not found: {}", slug)))
}

/// Update the editable summary fields of a project.
///
/// The slug is fixed at creation and does not follow the name.
pub async fn update_project_summary(
    pool: &DbPool,
    id: &str,
    input: UpdateProjectSummary,
) -> Result<Project> {
    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects SET
            name = ?,
            short_description = ?,
            long_description = ?,
            updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.short_description)
    .bind(&input.long_description)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
}

/// Point a project at a newly stored image.
pub async fn update_project_image(pool: &DbPool, id: &str, image: &str) -> Result<Project> {
    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects SET
            image = ?,
            updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(image)
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
}

/// Change a project's preparation status.
pub async fn update_preparation_status(
    pool: &DbPool,
    id: &str,
    status: PreparationStatus,
) -> Result<Project> {
    sqlx::query_as::<_, Project>(
        r#"
        UPDATE projects SET
            preparation_status = ?,
            updated_at = strftime('%Y-%m-%d %H:%M:%f', 'now')
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(status.as_str())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
}

/// Mark or unmark a project as featured in the gallery.
pub async fn set_project_featured(pool: &DbPool, id: &str, featured: bool) -> Result<Project> {
    sqlx::query_as::<_, Project>("UPDATE projects SET featured = ? WHERE id = ? RETURNING *")
        .bind(featured)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Project not found: {}", id)))
}

/// All featured projects with follower counts, newest first.
pub async fn list_featured_projects(pool: &DbPool) -> Result<Vec<ProjectWithFollowers>> {
    let query = format!(
        "SELECT p.*, {} FROM projects p WHERE p.featured = 1 ORDER BY p.created_at DESC, p.rowid DESC",
        FOLLOWERS_COUNT_COLUMN
    );
    sqlx::query_as::<_, ProjectWithFollowers>(&query)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// The `limit` most recently created projects with follower counts.
pub async fn list_newest_projects(pool: &DbPool, limit: i64) -> Result<Vec<ProjectWithFollowers>> {
    let query = format!(
        "SELECT p.*, {} FROM projects p ORDER BY p.created_at DESC, p.rowid DESC LIMIT ?",
        FOLLOWERS_COUNT_COLUMN
    );
    sqlx::query_as::<_, ProjectWithFollowers>(&query)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// The `limit` most popular projects with follower counts.
///
/// Popularity is the number of activities in the last
/// [`POPULAR_WINDOW_DAYS`] days, then follower count, then recency.
pub async fn list_popular_projects(
    pool: &DbPool,
    limit: i64,
) -> Result<Vec<ProjectWithFollowers>> {
    let since = (Utc::now() - Duration::days(POPULAR_WINDOW_DAYS))
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string();

    let query = format!(
        r#"
        SELECT p.*, {},
            (SELECT COUNT(*) FROM activities a
             WHERE a.project_id = p.id AND a.created_at >= ?) AS recent_activity
        FROM projects p
        ORDER BY recent_activity DESC, followers_count DESC, p.created_at DESC, p.rowid DESC
        LIMIT ?
        "#,
        FOLLOWERS_COUNT_COLUMN
    );
    sqlx::query_as::<_, ProjectWithFollowers>(&query)
        .bind(since)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(Error::Database)
}

/// Count all projects.
pub async fn count_projects(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM projects")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
