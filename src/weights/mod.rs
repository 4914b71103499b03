mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod trend;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::weight_routes()
}
