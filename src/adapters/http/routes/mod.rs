pub mod auth;
pub mod plans;
pub mod subscriptions;

use axum::Router;

use crate::adapters::http::app_state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/plans", plans::router())
        .nest("/subscriptions", subscriptions::router())
}
