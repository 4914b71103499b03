use crate::state::AppState;
use axum::Router;

pub mod dto;
pub mod extractors;
pub mod guard;
pub mod handlers;
pub mod password;
pub mod repo;
pub mod repo_types;
pub(crate) mod validation;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::session_routes())
}
