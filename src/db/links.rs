//! External links attached to projects.
//!
//! Links are always attributed to the project's creator, whoever submits them.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DbPool;

/// Link record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Link {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
    pub created_at: String,
}

/// Input for creating a link.
#[derive(Debug, Clone)]
pub struct CreateLink {
    pub id: String,
    pub project_id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
}

/// Create a link.
pub async fn create_link(pool: &DbPool, input: CreateLink) -> Result<Link> {
    sqlx::query_as::<_, Link>(
        r#"
        INSERT INTO links (id, project_id, user_id, name, url)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.project_id)
    .bind(&input.user_id)
    .bind(&input.name)
    .bind(&input.url)
    .fetch_one(pool)
    .await
    .map_err(Error::Database)
}

/// Get a link by ID.
pub async fn get_link(pool: &DbPool, id: &str) -> Result<Link> {
    sqlx::query_as::<_, Link>("SELECT * FROM links WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Link not found: {}", id)))
}

/// Delete a link.
pub async fn delete_link(pool: &DbPool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM links WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("Link not found: {}", id)));
    }

    Ok(())
}

/// List the links of a project in the order they were added.
pub async fn list_project_links(pool: &DbPool, project_id: &str) -> Result<Vec<Link>> {
    sqlx::query_as::<_, Link>(
        "SELECT * FROM links WHERE project_id = ? ORDER BY created_at ASC, rowid ASC",
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}
