//! Test app state builder for HTTP-level integration testing.
//!
//! `TestAppStateBuilder` creates a minimal `AppState` backed by the
//! in-memory mocks, so route handlers can be exercised with
//! `axum_test::TestServer` and no database.

use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use time::Duration;

use crate::{
    adapters::http::{app_state::AppState, routes},
    application::{
        jwt,
        use_cases::{
            plan::{PlanProfile, PlanUseCases},
            subscription::{SubscriptionProfile, SubscriptionUseCases},
            user::{UserProfile, UserUseCases},
        },
    },
    infra::config::AppConfig,
    test_utils::{InMemoryPlanRepo, InMemorySubscriptionRepo, InMemoryUserRepo},
};

/// JWT secret shared between test config and `bearer_token_for`.
pub const TEST_JWT_SECRET: &str = "test_jwt_secret";

/// Issue a bearer token the test server will accept for this user.
pub fn bearer_token_for(user: &UserProfile) -> String {
    jwt::issue(
        user.id,
        &user.username,
        user.is_admin,
        &SecretString::new(TEST_JWT_SECRET.into()),
        Duration::hours(24),
    )
    .expect("Failed to issue test token")
}

/// The production route tree mounted under `/api/v1`, ready for `TestServer`.
pub fn test_router(app_state: AppState) -> axum::Router {
    axum::Router::new()
        .nest("/api/v1", routes::router())
        .with_state(app_state)
}

/// Builder for creating `AppState` with in-memory mocks.
///
/// # Example
///
/// ```ignore
/// let user = create_test_user(|u| u.username = "alice".to_string());
/// let plan = create_test_plan(|p| p.duration_days = 30);
///
/// let app_state = TestAppStateBuilder::new()
///     .with_user(user)
///     .with_plan(plan)
///     .build();
/// ```
#[derive(Default)]
pub struct TestAppStateBuilder {
    users: Vec<UserProfile>,
    plans: Vec<PlanProfile>,
    subscriptions: Vec<SubscriptionProfile>,
}

impl TestAppStateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: UserProfile) -> Self {
        self.users.push(user);
        self
    }

    pub fn with_plan(mut self, plan: PlanProfile) -> Self {
        self.plans.push(plan);
        self
    }

    pub fn with_subscription(mut self, subscription: SubscriptionProfile) -> Self {
        self.subscriptions.push(subscription);
        self
    }

    /// Build the AppState with all configured fixtures.
    pub fn build(self) -> AppState {
        let user_repo = Arc::new(InMemoryUserRepo::with_users(self.users));
        let plan_repo = Arc::new(InMemoryPlanRepo::with_plans(self.plans));
        let subscription_repo = Arc::new(InMemorySubscriptionRepo::new(
            plan_repo.clone(),
            user_repo.clone(),
        ));
        for subscription in self.subscriptions {
            subscription_repo.insert(subscription);
        }

        let user_use_cases = Arc::new(UserUseCases::new(user_repo.clone()));
        let plan_use_cases = Arc::new(PlanUseCases::new(plan_repo.clone()));
        let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
            subscription_repo,
            plan_repo,
            user_repo,
        ));

        let config = Arc::new(AppConfig {
            jwt_secret: SecretString::new(TEST_JWT_SECRET.into()),
            access_token_ttl: Duration::hours(24),
            cors_origin: HeaderValue::from_static("http://localhost:3000"),
            bind_addr: "127.0.0.1:8000".parse().unwrap(),
            database_url: String::new(),
            expiry_sweep_secs: 3_600,
        });

        AppState {
            config,
            user_use_cases,
            plan_use_cases,
            subscription_use_cases,
        }
    }
}
