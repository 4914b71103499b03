use axum::response::{IntoResponse, Redirect, Response};

mod manager;
pub mod persistence;

pub use manager::SessionManager;
pub use persistence::{FileSessionStore, MemorySessionStore, SessionPersistence};

use crate::auth::repo_types::Role;

/// Unauthenticated entry point.
pub const LOGIN_PATH: &str = "/login";
pub const HOME_PATH: &str = "/home";
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Full navigation to `to`, dropping any state the client derived from the old session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullReload {
    pub to: &'static str,
}

impl IntoResponse for FullReload {
    fn into_response(self) -> Response {
        Redirect::to(self.to).into_response()
    }
}

/// Where a freshly authenticated principal lands.
pub fn landing_path(role: Role) -> &'static str {
    if role.is_clinician() {
        DASHBOARD_PATH
    } else {
        HOME_PATH
    }
}
