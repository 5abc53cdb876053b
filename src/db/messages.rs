//! Outbox of messages sent from project owners to their followers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::DbPool;

/// Message record from the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub project_id: String,
    pub subject: String,
    pub body: String,
    pub created_at: String,
}

/// Input for queueing a message to several recipients.
#[derive(Debug, Clone)]
pub struct CreateMessages<'a> {
    pub sender_id: &'a str,
    pub project_id: &'a str,
    pub subject: &'a str,
    pub body: &'a str,
    pub recipient_ids: &'a [String],
}

/// Queue one message per recipient in a single transaction.
///
/// Returns the number of messages written.
pub async fn create_messages(pool: &DbPool, input: CreateMessages<'_>) -> Result<usize> {
    let mut tx = pool.begin().await?;

    for recipient_id in input.recipient_ids {
        sqlx::query(
            r#"
            INSERT INTO messages (id, sender_id, recipient_id, project_id, subject, body)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(super::new_id())
        .bind(input.sender_id)
        .bind(recipient_id)
        .bind(input.project_id)
        .bind(input.subject)
        .bind(input.body)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(input.recipient_ids.len())
}

/// List the messages received by a user, newest first.
pub async fn list_inbox(pool: &DbPool, recipient_id: &str) -> Result<Vec<Message>> {
    sqlx::query_as::<_, Message>(
        "SELECT * FROM messages WHERE recipient_id = ? ORDER BY created_at DESC, rowid DESC",
    )
    .bind(recipient_id)
    .fetch_all(pool)
    .await
    .map_err(Error::Database)
}
