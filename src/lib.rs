//! drumbeat - course projects for a social learning site
//!
//! Library exports for the server binary and integration tests.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod flash;
pub mod forms;
pub mod middleware;
pub mod services;
pub mod slug;
pub mod state;
pub mod views;

pub use config::config;
pub use error::{Error, Result};
pub use state::AppState;
