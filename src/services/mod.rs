//! Service layer for drumbeat.
//!
//! - Images (content-addressed storage for project pictures)
//! - Messenger (delivery of owner messages to project followers)

mod images;
mod messenger;

pub use images::ImageStorage;
pub use messenger::{ContactMessage, FollowerMessenger, OutboxMessenger};
