use axum::{async_trait, extract::FromRequestParts, http::request::Parts, response::Redirect};
use tracing::debug;

use super::guard::{authorize, Access, Decision};
use super::repo_types::Principal;
use crate::session::LOGIN_PATH;
use crate::state::AppState;

/// The signed-in principal. Requests without a session are redirected to login.
pub struct CurrentUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = Redirect;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = state.sessions.current();
        match (authorize(session.as_ref(), Access::Authenticated), session) {
            (Decision::Allow, Some(principal)) => Ok(CurrentUser(principal)),
            _ => {
                debug!(uri = %parts.uri, "no session; redirecting to login");
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}
