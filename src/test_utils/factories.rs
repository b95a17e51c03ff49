//! Test data factories for creating valid test fixtures.
//!
//! Each factory function creates a complete, valid object with sensible
//! defaults. Use the closure parameter to override specific fields as needed.

use std::sync::OnceLock;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    application::use_cases::{
        Actor, plan::PlanProfile, subscription::SubscriptionProfile, user::UserProfile,
    },
    domain::entities::subscription::SubscriptionStatus,
    infra::password,
};

/// Every factory-made user authenticates with this password.
pub const TEST_PASSWORD: &str = "password123";

/// Hashing is deliberately slow, so the default credential hash is computed
/// once per test binary.
pub fn test_password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| password::hash_password(TEST_PASSWORD).expect("test hash"))
}

/// Create a test user with sensible defaults. Email and username are unique
/// per call so multiple users can coexist in one fixture.
pub fn create_test_user(overrides: impl FnOnce(&mut UserProfile)) -> UserProfile {
    let now = Utc::now().naive_utc();
    let tag = Uuid::new_v4().simple().to_string();
    let mut user = UserProfile {
        id: Uuid::new_v4(),
        email: format!("user-{}@example.com", &tag[..8]),
        username: format!("user_{}", &tag[..8]),
        is_admin: false,
        is_active: true,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut user);
    user
}

/// Create a test plan with sensible defaults.
pub fn create_test_plan(overrides: impl FnOnce(&mut PlanProfile)) -> PlanProfile {
    let now = Utc::now().naive_utc();
    let mut plan = PlanProfile {
        id: Uuid::new_v4(),
        name: "Basic Plan".to_string(),
        description: Some("A basic subscription plan".to_string()),
        price_cents: 999,
        currency: "usd".to_string(),
        duration_days: 30,
        features: vec!["Feature 1".to_string(), "Feature 2".to_string()],
        is_active: true,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut plan);
    plan
}

/// Create a test subscription with sensible defaults: active, started now,
/// running for 30 days.
pub fn create_test_subscription(
    user_id: Uuid,
    plan_id: Uuid,
    overrides: impl FnOnce(&mut SubscriptionProfile),
) -> SubscriptionProfile {
    let now = Utc::now().naive_utc();
    let mut subscription = SubscriptionProfile {
        id: Uuid::new_v4(),
        user_id,
        plan_id,
        start_date: now,
        end_date: now + Duration::days(30),
        status: SubscriptionStatus::Active,
        cancelled_at: None,
        created_at: Some(now),
        updated_at: Some(now),
    };
    overrides(&mut subscription);
    subscription
}

pub fn admin_actor() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        is_admin: true,
    }
}

pub fn user_actor() -> Actor {
    Actor {
        id: Uuid::new_v4(),
        is_admin: false,
    }
}
