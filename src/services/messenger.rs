//! Delivery of messages from a project owner to the project's followers.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::db::{self, DbPool, Project, UserProfile};
use crate::Result;

/// A message addressed to some of a project's followers.
#[derive(Debug, Clone, Copy)]
pub struct ContactMessage<'a> {
    pub sender: &'a UserProfile,
    pub project: &'a Project,
    pub subject: &'a str,
    pub body: &'a str,
    pub recipients: &'a [UserProfile],
}

/// Sends contact messages. Implementations decide the transport.
#[async_trait]
pub trait FollowerMessenger: Send + Sync {
    /// Deliver the message and return how many recipients it reached.
    async fn send(&self, message: ContactMessage<'_>) -> Result<usize>;
}

/// Writes one row per recipient to the `messages` outbox.
#[derive(Clone)]
pub struct OutboxMessenger {
    db: DbPool,
}

impl OutboxMessenger {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn shared(db: DbPool) -> Arc<dyn FollowerMessenger> {
        Arc::new(Self::new(db))
    }
}

#[async_trait]
impl FollowerMessenger for OutboxMessenger {
    async fn send(&self, message: ContactMessage<'_>) -> Result<usize> {
        let recipient_ids: Vec<String> = message.recipients.iter().map(|u| u.id.clone()).collect();

        let sent = db::create_messages(
            &self.db,
            db::CreateMessages {
                sender_id: &message.sender.id,
                project_id: &message.project.id,
                subject: message.subject,
                body: message.body,
                recipient_ids: &recipient_ids,
            },
        )
        .await?;

        info!(
            project_id = %message.project.id,
            sender_id = %message.sender.id,
            recipients = sent,
            "Contact message queued"
        );

        Ok(sent)
    }
}
