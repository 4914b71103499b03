use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::{debug, warn};

use crate::auth::repo_types::{Principal, Role};
use crate::session::LOGIN_PATH;
use crate::state::AppState;

/// Roles allowed on clinician-only routes.
pub const CLINICIANS: &[Role] = &[Role::Admin, Role::Doctor];

/// What a route requires of the session.
#[derive(Debug, Clone, Copy)]
pub enum Access {
    Authenticated,
    Roles(&'static [Role]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    RedirectToLogin,
    Deny,
}

/// Decides from the cached session role alone; the store is not consulted.
pub fn authorize(session: Option<&Principal>, access: Access) -> Decision {
    let Some(principal) = session else {
        return Decision::RedirectToLogin;
    };
    match access {
        Access::Authenticated => Decision::Allow,
        Access::Roles(roles) if roles.contains(&principal.role) => Decision::Allow,
        Access::Roles(_) => Decision::Deny,
    }
}

/// Route layer for admin/doctor pages. Evaluated on every request.
///
/// A denied role is sent to the login entry point as well, same as an
/// unknown route would be.
pub async fn require_clinician(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let session = state.sessions.current();
    match authorize(session.as_ref(), Access::Roles(CLINICIANS)) {
        Decision::Allow => next.run(req).await,
        Decision::RedirectToLogin => {
            debug!(uri = %req.uri(), "no session; redirecting to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Decision::Deny => {
            if let Some(p) = &session {
                warn!(user_id = %p.id, role = %p.role, uri = %req.uri(), "role denied");
            }
            Redirect::to(LOGIN_PATH).into_response()
        }
    }
}
