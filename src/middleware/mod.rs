//! Middleware for drumbeat.
//!
//! - `session_auth` - session cookie validation; injects [`CurrentUser`]
//! - `project_auth` - ownership guard for project mutations; injects [`OwnedProject`]

mod project_auth;
mod session_auth;

pub use project_auth::{require_project_owner, OwnedProject, ProjectSlugParams};
pub use session_auth::{require_session, CurrentUser, SESSION_COOKIE_NAME};
