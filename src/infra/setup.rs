use std::fs::File;
use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::http::app_state::AppState,
    application::use_cases::{
        plan::{PlanRepo, PlanUseCases},
        subscription::{SubscriptionRepo, SubscriptionUseCases},
        user::{UserRepo, UserUseCases},
    },
    infra::{config::AppConfig, postgres_persistence},
};

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let config = AppConfig::from_env();

    let postgres_arc = Arc::new(postgres_persistence(&config.database_url).await?);

    let user_repo_arc = postgres_arc.clone() as Arc<dyn UserRepo>;
    let plan_repo_arc = postgres_arc.clone() as Arc<dyn PlanRepo>;
    let subscription_repo_arc = postgres_arc.clone() as Arc<dyn SubscriptionRepo>;

    let user_use_cases = UserUseCases::new(user_repo_arc.clone());
    let plan_use_cases = PlanUseCases::new(plan_repo_arc.clone());
    let subscription_use_cases = SubscriptionUseCases::new(
        subscription_repo_arc,
        plan_repo_arc,
        user_repo_arc,
    );

    Ok(AppState {
        config: Arc::new(config),
        user_use_cases: Arc::new(user_use_cases),
        plan_use_cases: Arc::new(plan_use_cases),
        subscription_use_cases: Arc::new(subscription_use_cases),
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "subscription_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
