//! In-memory mock implementations of the repository traits.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        plan::{CreatePlanInput, PlanProfile, PlanRepo, UpdatePlanInput},
        subscription::{SubscriptionProfile, SubscriptionRepo, SubscriptionWithPlan},
        user::{UserCredentials, UserProfile, UserRepo},
    },
    domain::entities::subscription::SubscriptionStatus,
    test_utils::factories::test_password_hash,
};

// ============================================================================
// InMemoryUserRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryUserRepo {
    pub users: Mutex<HashMap<Uuid, UserCredentials>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed users; each gets the default test password hash.
    pub fn with_users(users: Vec<UserProfile>) -> Self {
        let map: HashMap<Uuid, UserCredentials> = users
            .into_iter()
            .map(|user| {
                (
                    user.id,
                    UserCredentials {
                        user,
                        password_hash: test_password_hash().to_string(),
                    },
                )
            })
            .collect();
        Self {
            users: Mutex::new(map),
        }
    }

    pub fn insert(&self, user: UserProfile) {
        self.users.lock().unwrap().insert(
            user.id,
            UserCredentials {
                user,
                password_hash: test_password_hash().to_string(),
            },
        );
    }
}

#[async_trait]
impl UserRepo for InMemoryUserRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .get(&id)
            .map(|c| c.user.clone()))
    }

    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|c| c.user.email == email)
            .map(|c| c.user.clone()))
    }

    async fn get_by_username(&self, username: &str) -> AppResult<Option<UserProfile>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|c| c.user.username == username)
            .map(|c| c.user.clone()))
    }

    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> AppResult<Option<UserCredentials>> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .find(|c| c.user.username == username)
            .cloned())
    }

    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserProfile> {
        let now = Utc::now().naive_utc();
        let user = UserProfile {
            id: Uuid::new_v4(),
            email: email.to_string(),
            username: username.to_string(),
            is_admin: false,
            is_active: true,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.users.lock().unwrap().insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: password_hash.to_string(),
            },
        );
        Ok(user)
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    pub plans: Mutex<HashMap<Uuid, PlanProfile>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plans(plans: Vec<PlanProfile>) -> Self {
        let map: HashMap<Uuid, PlanProfile> = plans.into_iter().map(|p| (p.id, p)).collect();
        Self {
            plans: Mutex::new(map),
        }
    }

    pub fn insert(&self, plan: PlanProfile) {
        self.plans.lock().unwrap().insert(plan.id, plan);
    }
}

#[async_trait]
impl PlanRepo for InMemoryPlanRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .find(|p| p.name == name)
            .cloned())
    }

    async fn list(&self, active_only: bool, skip: i64, limit: i64) -> AppResult<Vec<PlanProfile>> {
        let plans = self.plans.lock().unwrap();
        let mut result: Vec<_> = plans
            .values()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect();
        result.sort_by_key(|p| p.created_at);
        Ok(result
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile> {
        let now = Utc::now().naive_utc();
        let plan = PlanProfile {
            id: Uuid::new_v4(),
            name: input.name.clone(),
            description: input.description.clone(),
            price_cents: input.price_cents,
            currency: input.currency.clone(),
            duration_days: input.duration_days,
            features: input.features.clone(),
            is_active: input.is_active,
            created_at: Some(now),
            updated_at: Some(now),
        };
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(name) = &input.name {
            plan.name = name.clone();
        }
        if let Some(description) = &input.description {
            plan.description = Some(description.clone());
        }
        if let Some(price_cents) = input.price_cents {
            plan.price_cents = price_cents;
        }
        if let Some(currency) = &input.currency {
            plan.currency = currency.clone();
        }
        if let Some(duration_days) = input.duration_days {
            plan.duration_days = duration_days;
        }
        if let Some(features) = &input.features {
            plan.features = features.clone();
        }
        if let Some(is_active) = input.is_active {
            plan.is_active = is_active;
        }
        plan.updated_at = Some(Utc::now().naive_utc());
        Ok(plan.clone())
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.plans.lock().unwrap().remove(&id);
        Ok(())
    }
}

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

/// Holds references to the plan and user mocks so the joined listing can be
/// served the way the SQL adapter joins tables.
pub struct InMemorySubscriptionRepo {
    pub subscriptions: Mutex<HashMap<Uuid, SubscriptionProfile>>,
    plan_repo: Arc<InMemoryPlanRepo>,
    user_repo: Arc<InMemoryUserRepo>,
}

impl InMemorySubscriptionRepo {
    pub fn new(plan_repo: Arc<InMemoryPlanRepo>, user_repo: Arc<InMemoryUserRepo>) -> Self {
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            plan_repo,
            user_repo,
        }
    }

    pub fn insert(&self, subscription: SubscriptionProfile) {
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription);
    }

    pub fn all(&self) -> Vec<SubscriptionProfile> {
        self.subscriptions.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl SubscriptionRepo for InMemorySubscriptionRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self.subscriptions.lock().unwrap().get(&id).cloned())
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        Ok(self
            .subscriptions
            .lock()
            .unwrap()
            .values()
            .find(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
            .cloned())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Vec<SubscriptionProfile>> {
        let subscriptions = self.subscriptions.lock().unwrap();
        let mut result: Vec<_> = subscriptions
            .values()
            .filter(|s| s.user_id == user_id && status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        result.sort_by_key(|s| std::cmp::Reverse(s.created_at));
        Ok(result)
    }

    async fn list_with_plan(
        &self,
        status: Option<SubscriptionStatus>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionWithPlan>> {
        let subscriptions = self.subscriptions.lock().unwrap();
        let plans = self.plan_repo.plans.lock().unwrap();
        let users = self.user_repo.users.lock().unwrap();

        let mut rows: Vec<_> = subscriptions
            .values()
            .filter(|s| status.is_none_or(|st| s.status == st))
            .cloned()
            .collect();
        rows.sort_by_key(|s| std::cmp::Reverse(s.created_at));

        Ok(rows
            .into_iter()
            .skip(skip.max(0) as usize)
            .take(limit.max(0) as usize)
            // Inner join: rows without a matching plan or user are dropped.
            .filter_map(|subscription| {
                let plan = plans.get(&subscription.plan_id)?.clone();
                let user = users.get(&subscription.user_id)?;
                Some(SubscriptionWithPlan {
                    subscription,
                    plan,
                    user_email: user.user.email.clone(),
                })
            })
            .collect())
    }

    async fn create(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> AppResult<SubscriptionProfile> {
        let subscription = SubscriptionProfile {
            id: Uuid::new_v4(),
            user_id,
            plan_id,
            start_date,
            end_date,
            status: SubscriptionStatus::Active,
            cancelled_at: None,
            created_at: Some(start_date),
            updated_at: Some(start_date),
        };
        self.subscriptions
            .lock()
            .unwrap()
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    async fn cancel(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Option<SubscriptionProfile>> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        match subscriptions.get_mut(&id) {
            Some(s) if s.status == SubscriptionStatus::Active => {
                s.status = SubscriptionStatus::Cancelled;
                s.cancelled_at = Some(now);
                s.updated_at = Some(now);
                Ok(Some(s.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn replace_active(
        &self,
        old_id: Uuid,
        new_plan_id: Uuid,
        now: NaiveDateTime,
        new_end_date: NaiveDateTime,
    ) -> AppResult<(SubscriptionProfile, SubscriptionProfile)> {
        // One lock for the whole swap keeps it atomic, like the SQL
        // transaction in the Postgres adapter.
        let mut subscriptions = self.subscriptions.lock().unwrap();

        let old = match subscriptions.get_mut(&old_id) {
            Some(s) if s.status == SubscriptionStatus::Active => {
                s.status = SubscriptionStatus::Cancelled;
                s.cancelled_at = Some(now);
                s.updated_at = Some(now);
                s.clone()
            }
            _ => {
                return Err(AppError::Conflict(
                    "subscription is no longer active".into(),
                ));
            }
        };

        let replacement = SubscriptionProfile {
            id: Uuid::new_v4(),
            user_id: old.user_id,
            plan_id: new_plan_id,
            start_date: now,
            end_date: new_end_date,
            status: SubscriptionStatus::Active,
            cancelled_at: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        subscriptions.insert(replacement.id, replacement.clone());
        Ok((old, replacement))
    }

    async fn mark_expired(&self, now: NaiveDateTime) -> AppResult<u64> {
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let mut count = 0;
        for s in subscriptions.values_mut() {
            if s.status == SubscriptionStatus::Active && s.end_date <= now {
                s.status = SubscriptionStatus::Expired;
                s.updated_at = Some(now);
                count += 1;
            }
        }
        Ok(count)
    }
}
