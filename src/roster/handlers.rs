use axum::{
    extract::{Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::{error, instrument};

use super::service::{build_roster, RosterEntry};
use crate::{
    auth::{extractors::CurrentUser, guard::require_clinician},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RosterQuery {
    #[serde(default)]
    pub search: Option<String>,
}

pub fn roster_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route_layer(middleware::from_fn_with_state(state, require_clinician))
}

#[instrument(skip(state, viewer), fields(viewer_id = %viewer.id, role = %viewer.role))]
pub async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Query(q): Query<RosterQuery>,
) -> Result<Json<Vec<RosterEntry>>, (StatusCode, String)> {
    let rows = state
        .weights
        .list_users_with_weight_records()
        .await
        .map_err(|e| {
            error!(error = %e, "list_users_with_weight_records failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not fetch users".to_string(),
            )
        })?;
    Ok(Json(build_roster(viewer.role, rows, q.search.as_deref())))
}
