//! Project activity stream.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteExecutor;
use sqlx::FromRow;

use super::DbPool;

/// What happened in an activity entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Created,
    Followed,
    LinkAdded,
    Updated,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Followed => "followed",
            Self::LinkAdded => "link_added",
            Self::Updated => "updated",
        }
    }
}

/// Activity record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub actor_id: String,
    pub project_id: String,
    pub verb: String,
    pub object: Option<String>,
    pub created_at: String,
}

/// Append an entry to a project's activity stream.
pub async fn record_activity<'e, E>(
    executor: E,
    actor_id: &str,
    project_id: &str,
    verb: Verb,
    object: Option<&str>,
) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO activities (id, actor_id, project_id, verb, object)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(super::new_id())
    .bind(actor_id)
    .bind(project_id)
    .bind(verb.as_str())
    .bind(object)
    .execute(executor)
    .await?;
    Ok(())
}

/// Most recent activities for a project, newest first.
pub async fn list_recent_activities(
    pool: &DbPool,
    project_id: &str,
    limit: i64,
) -> Result<Vec<Activity>> {
    sqlx::query_as::<_, Activity>(
        r#"
        SELECT * FROM activities
        WHERE project_id = ?
        ORDER BY created_at DESC, rowid DESC
        LIMIT ?
        "#,
    )
    .bind(project_id)
    .bind(limit)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}
