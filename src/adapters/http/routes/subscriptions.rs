use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    adapters::http::{
        app_state::AppState,
        extract::{AdminUser, CurrentUser},
    },
    app_error::AppResult,
    domain::entities::subscription::SubscriptionStatus,
};

#[derive(Deserialize)]
struct CreateSubscriptionPayload {
    user_id: Uuid,
    plan_id: Uuid,
}

#[derive(Deserialize)]
struct ChangePlanPayload {
    plan_id: Uuid,
}

#[derive(Deserialize)]
struct ListParams {
    status: Option<SubscriptionStatus>,
    #[serde(default)]
    skip: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

#[derive(Deserialize)]
struct StatusParam {
    status: Option<SubscriptionStatus>,
}

#[derive(Serialize)]
struct ExpiryCheckResponse {
    expired: u64,
}

fn default_limit() -> i64 {
    100
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_subscription).get(list_subscriptions))
        .route("/check-expired", post(check_expired))
        .route("/user/{user_id}", get(list_user_subscriptions))
        .route("/user/{user_id}/active", get(get_active_subscription))
        .route(
            "/{id}",
            get(get_subscription)
                .put(change_plan)
                .delete(cancel_subscription),
        )
}

async fn create_subscription(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<CreateSubscriptionPayload>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .create(user.actor(), payload.user_id, payload.plan_id)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

/// Admin-only view over every subscription, newest first.
async fn list_subscriptions(
    State(app_state): State<AppState>,
    admin: AdminUser,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state
        .subscription_use_cases
        .list_all(admin.actor(), params.status, params.skip, params.limit)
        .await?;
    Ok(Json(subscriptions))
}

async fn list_user_subscriptions(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
    Query(params): Query<StatusParam>,
) -> AppResult<impl IntoResponse> {
    let subscriptions = app_state
        .subscription_use_cases
        .list_for_user(user.actor(), user_id, params.status)
        .await?;
    Ok(Json(subscriptions))
}

async fn get_active_subscription(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(user_id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .get_active(user.actor(), user_id)
        .await?;
    Ok(Json(subscription))
}

async fn get_subscription(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .get(user.actor(), id)
        .await?;
    Ok(Json(subscription))
}

/// Upgrade/downgrade: the current subscription is cancelled and a new one
/// starts on the requested plan.
async fn change_plan(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangePlanPayload>,
) -> AppResult<impl IntoResponse> {
    let subscription = app_state
        .subscription_use_cases
        .change_plan(user.actor(), id, payload.plan_id)
        .await?;
    Ok(Json(subscription))
}

async fn cancel_subscription(
    State(app_state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    app_state
        .subscription_use_cases
        .cancel(user.actor(), id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_expired(
    State(app_state): State<AppState>,
    _admin: AdminUser,
) -> AppResult<impl IntoResponse> {
    let expired = app_state.subscription_use_cases.check_expired().await?;
    Ok(Json(ExpiryCheckResponse { expired }))
}
