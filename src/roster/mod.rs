pub mod handlers;
pub mod service;

use crate::state::AppState;
use axum::Router;

pub fn router(state: AppState) -> Router<AppState> {
    handlers::roster_routes(state)
}
