//! User profile and session database queries.
//!
//! Profiles are owned by the wider site; this module only needs to look
//! them up by id or username and to resolve session cookies.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DbPool;

// ============================================================================
// User Types
// ============================================================================

/// User profile record from the database.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
    pub created_at: String,
}

/// Input for creating a new user profile.
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub id: String,
    pub username: String,
    pub display_name: String,
    pub email: Option<String>,
}

// ============================================================================
// Session Types
// ============================================================================

/// Web session record.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: String,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

/// Input for creating a session.
#[derive(Debug, Clone)]
pub struct CreateSession {
    pub id: String,
    pub user_id: String,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// User Queries
// ============================================================================

/// Create a new user profile.
pub async fn create_user(pool: &DbPool, input: CreateUser) -> Result<UserProfile> {
    sqlx::query_as::<_, UserProfile>(
        r#"
        INSERT INTO users (id, username, display_name, email)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.username)
    .bind(&input.display_name)
    .bind(&input.email)
    .fetch_one(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(format!("Username '{}' is taken", input.username))
        }
        _ => Error::Database(e),
    })
}

/// Get a user profile by ID.
pub async fn get_user(pool: &DbPool, id: &str) -> Result<UserProfile> {
    find_user(pool, id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("User not found: {}", id)))
}

/// Get a user profile by ID, returning None if absent.
pub async fn find_user(pool: &DbPool, id: &str) -> Result<Option<UserProfile>> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Get a user profile by username, returning None if absent.
pub async fn find_user_by_username(pool: &DbPool, username: &str) -> Result<Option<UserProfile>> {
    sqlx::query_as::<_, UserProfile>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

// ============================================================================
// Session Queries
// ============================================================================

/// Create a new web session.
pub async fn create_session(pool: &DbPool, input: CreateSession) -> Result<Session> {
    sqlx::query_as::<_, Session>(
        r#"
        INSERT INTO sessions (id, user_id, expires_at)
        VALUES (?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&input.id)
    .bind(&input.user_id)
    .bind(input.expires_at)
    .fetch_one(pool)
    .await
    .map_err(Error::Database)
}

/// Look up a session by ID.
pub async fn get_session(pool: &DbPool, id: &str) -> Result<Option<Session>> {
    sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(Error::Database)
}

/// Push a session's expiry forward.
pub async fn extend_session(pool: &DbPool, id: &str, expires_at: DateTime<Utc>) -> Result<()> {
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
        .bind(expires_at)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Delete a session.
pub async fn delete_session(pool: &DbPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}
