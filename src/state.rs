//! Application state for drumbeat.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;

use crate::db::DbPool;
use crate::services::{FollowerMessenger, ImageStorage, OutboxMessenger};
use crate::{config, Result};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: DbPool,
    /// Storage for uploaded project images.
    pub images: Arc<ImageStorage>,
    /// Delivery of owner messages to followers.
    pub messenger: Arc<dyn FollowerMessenger>,
    /// Lifetime of newly created sessions, in seconds.
    pub session_max_age_seconds: u64,
}

impl AppState {
    /// Create a new application state from the global configuration.
    pub async fn new() -> Result<Self> {
        let config = config::config();

        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        let images = ImageStorage::new(&config.storage.images_path, config.storage.max_image_size);

        Ok(Self::from_parts(db, images)
            .with_session_max_age(config.session.max_age_seconds))
    }

    /// Assemble state from an open pool and image storage, delivering
    /// messages through the database outbox.
    pub fn from_parts(db: DbPool, images: ImageStorage) -> Self {
        let messenger = OutboxMessenger::shared(db.clone());
        Self {
            db,
            images: Arc::new(images),
            messenger,
            session_max_age_seconds: 1_209_600,
        }
    }

    /// Replace the follower messenger.
    pub fn with_messenger(mut self, messenger: Arc<dyn FollowerMessenger>) -> Self {
        self.messenger = messenger;
        self
    }

    /// Set the session lifetime, capped at [`config::MAX_SESSION_AGE_SECONDS`].
    pub fn with_session_max_age(mut self, seconds: u64) -> Self {
        self.session_max_age_seconds = seconds.min(config::MAX_SESSION_AGE_SECONDS);
        self
    }
}
