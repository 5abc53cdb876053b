//! Wiki-style pages attached to projects.
//!
//! Every project gets an unlisted "detailed description" page at creation.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::FromRow;

use super::DbPool;

/// Title of the placeholder description page.
pub const DETAILED_DESCRIPTION_TITLE: &str = "Full Description";

/// Content of the placeholder description page.
pub const DETAILED_DESCRIPTION_CONTENT: &str = "<p>Please fill out.</p>";

/// Page record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub content: String,
    pub listed: bool,
    pub author_id: String,
    pub project_id: String,
    pub created_at: String,
}

/// Input for creating a page.
#[derive(Debug, Clone)]
pub struct CreatePage {
    pub id: String,
    pub title: String,
    pub content: String,
    pub listed: bool,
    pub author_id: String,
    pub project_id: String,
}

impl CreatePage {
    /// The unlisted placeholder description for a freshly created project.
    pub fn detailed_description(author_id: &str, project_id: &str) -> Self {
        Self {
            id: super::new_id(),
            title: DETAILED_DESCRIPTION_TITLE.to_string(),
            content: DETAILED_DESCRIPTION_CONTENT.to_string(),
            listed: false,
            author_id: author_id.to_string(),
            project_id: project_id.to_string(),
        }
    }
}

/// Create a page.
pub async fn create_page<'e, E>(executor: E, input: CreatePage) -> Result<Page>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Page>(
        r#"
        INSERT INTO pages (id, title, content, listed, author_id, project_id)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.title)
    .bind(&input.content)
    .bind(input.listed)
    .bind(&input.author_id)
    .bind(&input.project_id)
    .fetch_one(executor)
    .await
    .map_err(Error::Database)
}

/// Get a page by ID.
pub async fn get_page(pool: &DbPool, id: &str) -> Result<Page> {
    sqlx::query_as::<_, Page>("SELECT * FROM pages WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Page not found: {}", id)))
}

