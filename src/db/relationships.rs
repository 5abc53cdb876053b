//! Follow edges between users and projects.
//!
//! The `(source_id, target_project_id)` pair is unique at the schema level;
//! inserting a duplicate surfaces as `Error::AlreadyExists`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::FromRow;

use super::{DbPool, UserProfile};

/// Relationship record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_id: String,
    pub target_project_id: String,
    pub created_at: String,
}

/// Create a follow edge from a user to a project.
pub async fn create_relationship<'e, E>(
    executor: E,
    source_id: &str,
    project_id: &str,
) -> Result<Relationship>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query_as::<_, Relationship>(
        r#"
        INSERT INTO relationships (id, source_id, target_project_id)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(super::new_id())
    .bind(source_id)
    .bind(project_id)
    .fetch_one(executor)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(format!(
                "User {} already follows project {}",
                source_id, project_id
            ))
        }
        _ => Error::Database(e),
    })
}

/// Get the edge from a user to a project, if any.
pub async fn get_relationship(
    pool: &DbPool,
    source_id: &str,
    project_id: &str,
) -> Result<Option<Relationship>> {
    sqlx::query_as::<_, Relationship>(
        "SELECT * FROM relationships WHERE source_id = ? AND target_project_id = ?",
    )
    .bind(source_id)
    .bind(project_id)
    .fetch_optional(pool)
    .await
    .map_err(Error::Database)
}

/// Delete the edge from a user to a project.
///
/// Returns whether an edge was removed.
pub async fn delete_relationship(pool: &DbPool, source_id: &str, project_id: &str) -> Result<bool> {
    let result =
        sqlx::query("DELETE FROM relationships WHERE source_id = ? AND target_project_id = ?")
            .bind(source_id)
            .bind(project_id)
            .execute(pool)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// List the users following a project, oldest edge first.
pub async fn list_followers(pool: &DbPool, project_id: &str) -> Result<Vec<UserProfile>> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        SELECT u.* FROM users u
        INNER JOIN relationships r ON r.source_id = u.id
        WHERE r.target_project_id = ?
        ORDER BY r.created_at ASC, r.rowid ASC
        "#,
    )
    .bind(project_id)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}

/// Count the edges targeting a project.
pub async fn count_followers(pool: &DbPool, project_id: &str) -> Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM relationships WHERE target_project_id = ?")
            .bind(project_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
