use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    adapters::http::{app_state::AppState, extract::CurrentUser},
    app_error::AppResult,
    application::{jwt, use_cases::user::RegisterInput},
};

#[derive(Deserialize)]
struct LoginPayload {
    username: String,
    password: String,
}

#[derive(Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me))
}

async fn register(
    State(app_state): State<AppState>,
    Json(payload): Json<RegisterInput>,
) -> AppResult<impl IntoResponse> {
    let profile = app_state.user_use_cases.register(payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(
    State(app_state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> AppResult<impl IntoResponse> {
    let user = app_state
        .user_use_cases
        .authenticate(&payload.username, &payload.password)
        .await?;
    let access_token = jwt::issue(
        user.id,
        &user.username,
        user.is_admin,
        &app_state.config.jwt_secret,
        app_state.config.access_token_ttl,
    )?;
    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

async fn me(user: CurrentUser) -> AppResult<impl IntoResponse> {
    Ok(Json(user.0))
}
