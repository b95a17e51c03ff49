use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        extract::{AdminUser, CurrentUser},
    },
    app_error::AppResult,
    application::use_cases::plan::{CreatePlanInput, UpdatePlanInput},
};

#[derive(Deserialize)]
struct ListPlansParams {
    #[serde(default = "default_true")]
    active_only: bool,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

fn default_true() -> bool {
    true
}

fn default_limit() -> i64 {
    100
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route(
            "/{id}",
            get(get_plan).put(update_plan).delete(delete_plan),
        )
}

async fn list_plans(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Query(params): Query<ListPlansParams>,
) -> AppResult<impl IntoResponse> {
    let plans = app_state
        .plan_use_cases
        .list(params.active_only, params.skip, params.limit)
        .await?;
    Ok(Json(plans))
}

async fn get_plan(
    State(app_state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.get(id).await?;
    Ok(Json(plan))
}

async fn create_plan(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Json(input): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.create(admin.actor(), input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn update_plan(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state
        .plan_use_cases
        .update(admin.actor(), id, input)
        .await?;
    Ok(Json(plan))
}

async fn delete_plan(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    app_state.plan_use_cases.delete(admin.actor(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
