use std::sync::Arc;

use crate::{
    application::use_cases::{
        plan::PlanUseCases, subscription::SubscriptionUseCases, user::UserUseCases,
    },
    infra::config::AppConfig,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub user_use_cases: Arc<UserUseCases>,
    pub plan_use_cases: Arc<PlanUseCases>,
    pub subscription_use_cases: Arc<SubscriptionUseCases>,
}
