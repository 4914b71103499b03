use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::dto::{NewWeightRequest, WeightLogResponse};
use super::repo_types::WeightRecord;
use super::trend::{sort_by_date, TrendSummary};
use crate::{
    auth::{extractors::CurrentUser, repo_types::Principal},
    state::AppState,
};

pub fn weight_routes() -> Router<AppState> {
    Router::new()
        .route("/weights", get(list_own).post(add_entry))
        .route("/users/:id/weights", get(list_for_user))
}

async fn load_log(
    state: &AppState,
    user: Principal,
) -> Result<WeightLogResponse, (StatusCode, String)> {
    let mut records = state
        .weights
        .list_weight_records(user.id)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.id, "list_weight_records failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not fetch weight entries".to_string(),
            )
        })?;
    sort_by_date(&mut records);
    let summary = TrendSummary::from_sorted(&records);
    Ok(WeightLogResponse {
        user,
        records,
        summary,
    })
}

#[instrument(skip(state, principal), fields(user_id = %principal.id))]
pub async fn list_own(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<WeightLogResponse>, (StatusCode, String)> {
    Ok(Json(load_log(&state, principal).await?))
}

/// Another user's log, as opened from the roster. Any signed-in principal may
/// call this; there is no per-patient check.
#[instrument(skip(state, _viewer))]
pub async fn list_for_user(
    State(state): State<AppState>,
    CurrentUser(_viewer): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<WeightLogResponse>, (StatusCode, String)> {
    let user = match state.users.find_user_by_id(id).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err((StatusCode::NOT_FOUND, "User not found".into())),
        Err(e) => {
            error!(error = %e, %id, "find_user_by_id failed");
            return Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not fetch user details".into(),
            ));
        }
    };
    Ok(Json(load_log(&state, Principal::from(&user)).await?))
}

#[instrument(skip(state, principal, body), fields(user_id = %principal.id))]
pub async fn add_entry(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(body): Json<NewWeightRequest>,
) -> Result<(StatusCode, Json<WeightRecord>), (StatusCode, String)> {
    if !body.weight.is_finite() || body.weight <= 0.0 {
        warn!(weight = body.weight, "rejected weight entry");
        return Err((
            StatusCode::BAD_REQUEST,
            "Weight must be a positive number".into(),
        ));
    }
    let record = state
        .weights
        .insert_weight_record(WeightRecord {
            user_id: principal.id,
            date: body.date,
            weight: body.weight,
        })
        .await
        .map_err(|e| {
            error!(error = %e, "insert_weight_record failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Could not add a new entry".to_string(),
            )
        })?;
    info!(date = %record.date, weight = record.weight, "weight entry added");
    Ok((StatusCode::CREATED, Json(record)))
}
