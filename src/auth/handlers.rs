use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{
            AuthResponse, LoginRequest, PasswordResetRequest, RegisterRequest,
            UpdatePasswordRequest,
        },
        repo_types::Principal,
        validation::require_credentials,
    },
    session::{landing_path, FullReload, LOGIN_PATH},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/password-reset", post(password_reset))
        .route("/auth/update-password", post(update_password))
}

pub fn session_routes() -> Router<AppState> {
    Router::new().route("/session", get(get_session))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, String)> {
    let user = state.sessions.register(payload).await?;
    let signed_in = state.sessions.current().is_some_and(|p| p.id == user.id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            redirect_to: if signed_in {
                landing_path(user.role)
            } else {
                LOGIN_PATH
            },
            user: Principal::from(&user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    require_credentials(&payload.email, &payload.password)?;
    let user = state
        .sessions
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(AuthResponse {
        redirect_to: landing_path(user.role),
        user: Principal::from(&user),
    }))
}

#[instrument(skip(state))]
pub async fn logout(State(state): State<AppState>) -> Result<FullReload, (StatusCode, String)> {
    Ok(state.sessions.sign_out().await?)
}

#[instrument(skip(state, payload), fields(email = %payload.email))]
pub async fn password_reset(
    State(state): State<AppState>,
    Json(payload): Json<PasswordResetRequest>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .sessions
        .request_password_reset(&payload.email, &payload.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<FullReload, (StatusCode, String)> {
    Ok(state.sessions.update_password(&payload.new_password).await?)
}

#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
) -> Result<Json<Principal>, (StatusCode, String)> {
    match state.sessions.current() {
        Some(p) => Ok(Json(p)),
        None => {
            info!("session requested while signed out");
            Err((StatusCode::UNAUTHORIZED, "Not signed in".into()))
        }
    }
}
