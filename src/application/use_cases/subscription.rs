use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::use_cases::{
        Actor,
        plan::{PlanProfile, PlanRepo},
        user::UserRepo,
    },
    domain::entities::subscription::SubscriptionStatus,
};

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub status: SubscriptionStatus,
    pub cancelled_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionWithPlan {
    pub subscription: SubscriptionProfile,
    pub plan: PlanProfile,
    pub user_email: String,
}

#[async_trait]
pub trait SubscriptionRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>>;
    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>>;
    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Vec<SubscriptionProfile>>;
    async fn list_with_plan(
        &self,
        status: Option<SubscriptionStatus>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionWithPlan>>;
    async fn create(
        &self,
        user_id: Uuid,
        plan_id: Uuid,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> AppResult<SubscriptionProfile>;
    /// Flip an active row to cancelled. Returns `None` when the row is gone
    /// or no longer active, so a terminal status is never overwritten.
    async fn cancel(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Option<SubscriptionProfile>>;
    /// Cancel `old_id` and insert a fresh active row on `new_plan_id` in one
    /// transaction. Fails without side effects when the old row is not
    /// active anymore.
    async fn replace_active(
        &self,
        old_id: Uuid,
        new_plan_id: Uuid,
        now: NaiveDateTime,
        new_end_date: NaiveDateTime,
    ) -> AppResult<(SubscriptionProfile, SubscriptionProfile)>;
    /// Expire every active row whose end date has passed. Returns the number
    /// of rows updated; already-terminal rows are never touched.
    async fn mark_expired(&self, now: NaiveDateTime) -> AppResult<u64>;
}

#[derive(Clone)]
pub struct SubscriptionUseCases {
    subscriptions: Arc<dyn SubscriptionRepo>,
    plans: Arc<dyn PlanRepo>,
    users: Arc<dyn UserRepo>,
}

impl SubscriptionUseCases {
    pub fn new(
        subscriptions: Arc<dyn SubscriptionRepo>,
        plans: Arc<dyn PlanRepo>,
        users: Arc<dyn UserRepo>,
    ) -> Self {
        Self {
            subscriptions,
            plans,
            users,
        }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor: Actor,
        user_id: Uuid,
        plan_id: Uuid,
    ) -> AppResult<SubscriptionProfile> {
        actor.require_owner_or_admin(user_id)?;

        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let plan = self
            .plans
            .get_by_id(plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !plan.is_active {
            return Err(AppError::InvalidInput("plan is not active".into()));
        }

        if self
            .subscriptions
            .get_active_by_user(user_id)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "user already has an active subscription".into(),
            ));
        }

        let now = Utc::now().naive_utc();
        let end_date = now + Duration::days(plan.duration_days as i64);
        self.subscriptions.create(user_id, plan_id, now, end_date).await
    }

    /// Upgrade or downgrade: cancel the current subscription and start a new
    /// one on `new_plan_id`, atomically. No proration; the new subscription
    /// runs the full plan duration from now.
    #[instrument(skip(self))]
    pub async fn change_plan(
        &self,
        actor: Actor,
        id: Uuid,
        new_plan_id: Uuid,
    ) -> AppResult<SubscriptionProfile> {
        let subscription = self
            .subscriptions
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(subscription.user_id)?;

        if subscription.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "subscription is already {}",
                subscription.status.as_str()
            )));
        }

        let plan = self
            .plans
            .get_by_id(new_plan_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if !plan.is_active {
            return Err(AppError::InvalidInput("plan is not active".into()));
        }

        let now = Utc::now().naive_utc();
        let end_date = now + Duration::days(plan.duration_days as i64);
        let (_, replacement) = self
            .subscriptions
            .replace_active(id, new_plan_id, now, end_date)
            .await?;
        Ok(replacement)
    }

    #[instrument(skip(self))]
    pub async fn cancel(&self, actor: Actor, id: Uuid) -> AppResult<SubscriptionProfile> {
        let subscription = self
            .subscriptions
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(subscription.user_id)?;

        if subscription.status.is_terminal() {
            return Err(AppError::Conflict(format!(
                "subscription is already {}",
                subscription.status.as_str()
            )));
        }

        let now = Utc::now().naive_utc();
        // The guarded update can still miss if the sweeper got there first.
        self.subscriptions
            .cancel(id, now)
            .await?
            .ok_or_else(|| AppError::Conflict("subscription is no longer active".into()))
    }

    /// Expire all overdue subscriptions. Safe to run any number of times;
    /// callers decide the schedule (sweeper loop or admin endpoint).
    #[instrument(skip(self))]
    pub async fn check_expired(&self) -> AppResult<u64> {
        let now = Utc::now().naive_utc();
        let count = self.subscriptions.mark_expired(now).await?;
        if count > 0 {
            info!(count, "Marked subscriptions as expired");
        }
        Ok(count)
    }

    pub async fn get_active(&self, actor: Actor, user_id: Uuid) -> AppResult<SubscriptionWithPlan> {
        let user = self
            .users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(user_id)?;

        let subscription = self
            .subscriptions
            .get_active_by_user(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.with_plan(subscription, user.email).await
    }

    pub async fn get(&self, actor: Actor, id: Uuid) -> AppResult<SubscriptionWithPlan> {
        let subscription = self
            .subscriptions
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(subscription.user_id)?;

        let user = self
            .users
            .get_by_id(subscription.user_id)
            .await?
            .ok_or_else(|| AppError::Internal("subscription references missing user".into()))?;
        self.with_plan(subscription, user.email).await
    }

    pub async fn list_for_user(
        &self,
        actor: Actor,
        user_id: Uuid,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Vec<SubscriptionProfile>> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        actor.require_owner_or_admin(user_id)?;
        self.subscriptions.list_by_user(user_id, status).await
    }

    pub async fn list_all(
        &self,
        actor: Actor,
        status: Option<SubscriptionStatus>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionWithPlan>> {
        actor.require_admin()?;
        self.subscriptions.list_with_plan(status, skip, limit).await
    }

    async fn with_plan(
        &self,
        subscription: SubscriptionProfile,
        user_email: String,
    ) -> AppResult<SubscriptionWithPlan> {
        let plan = self
            .plans
            .get_by_id(subscription.plan_id)
            .await?
            .ok_or_else(|| AppError::Internal("subscription references missing plan".into()))?;
        Ok(SubscriptionWithPlan {
            subscription,
            plan,
            user_email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        InMemoryPlanRepo, InMemorySubscriptionRepo, InMemoryUserRepo, admin_actor,
        create_test_plan, create_test_subscription, create_test_user,
    };

    struct Fixture {
        use_cases: SubscriptionUseCases,
        users: Arc<InMemoryUserRepo>,
        plans: Arc<InMemoryPlanRepo>,
        subscriptions: Arc<InMemorySubscriptionRepo>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepo::new());
        let plans = Arc::new(InMemoryPlanRepo::new());
        let subscriptions = Arc::new(InMemorySubscriptionRepo::new(plans.clone(), users.clone()));
        let use_cases = SubscriptionUseCases::new(
            subscriptions.clone(),
            plans.clone(),
            users.clone(),
        );
        Fixture {
            use_cases,
            users,
            plans,
            subscriptions,
        }
    }

    impl Fixture {
        fn seed_user(&self) -> Actor {
            let user = create_test_user(|_| {});
            let actor = Actor {
                id: user.id,
                is_admin: false,
            };
            self.users.insert(user);
            actor
        }

        fn seed_plan(&self, duration_days: i32) -> Uuid {
            let plan = create_test_plan(|p| {
                p.name = format!("Plan {}", Uuid::new_v4().simple());
                p.duration_days = duration_days;
            });
            let id = plan.id;
            self.plans.insert(plan);
            id
        }

        fn active_count_for(&self, user_id: Uuid) -> usize {
            self.subscriptions
                .all()
                .into_iter()
                .filter(|s| s.user_id == user_id && s.status == SubscriptionStatus::Active)
                .count()
        }
    }

    #[tokio::test]
    async fn create_sets_active_status_and_duration_dates() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);

        let sub = f.use_cases.create(actor, actor.id, plan_id).await.unwrap();

        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.end_date - sub.start_date, Duration::days(30));
        assert!(sub.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn create_rejects_unknown_user_and_plan() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);

        let err = f
            .use_cases
            .create(admin_actor(), Uuid::new_v4(), plan_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let err = f
            .use_cases
            .create(actor, actor.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn create_rejects_inactive_plan() {
        let f = fixture();
        let actor = f.seed_user();
        let plan = create_test_plan(|p| p.is_active = false);
        let plan_id = plan.id;
        f.plans.insert(plan);

        let err = f
            .use_cases
            .create(actor, actor.id, plan_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn create_rejects_second_active_subscription() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);

        f.use_cases.create(actor, actor.id, plan_id).await.unwrap();
        let err = f
            .use_cases
            .create(actor, actor.id, plan_id)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(f.active_count_for(actor.id), 1);
    }

    #[tokio::test]
    async fn create_for_other_user_needs_admin() {
        let f = fixture();
        let owner = f.seed_user();
        let stranger = f.seed_user();
        let plan_id = f.seed_plan(30);

        let err = f
            .use_cases
            .create(stranger, owner.id, plan_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        f.use_cases
            .create(admin_actor(), owner.id, plan_id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn cancel_sets_cancelled_at_exactly_once() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);
        let sub = f.use_cases.create(actor, actor.id, plan_id).await.unwrap();

        let cancelled = f.use_cases.cancel(actor, sub.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
        let first_cancelled_at = cancelled.cancelled_at.expect("cancelled_at must be set");
        let elapsed = Utc::now().naive_utc() - first_cancelled_at;
        assert!(elapsed < Duration::seconds(5));

        // Second cancel is rejected and must not move cancelled_at.
        let err = f.use_cases.cancel(actor, sub.id).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let stored = f.subscriptions.get_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.cancelled_at, Some(first_cancelled_at));
    }

    #[tokio::test]
    async fn cancel_of_foreign_subscription_is_forbidden_and_harmless() {
        let f = fixture();
        let owner = f.seed_user();
        let stranger = f.seed_user();
        let plan_id = f.seed_plan(30);
        let sub = f.use_cases.create(owner, owner.id, plan_id).await.unwrap();

        let err = f.use_cases.cancel(stranger, sub.id).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let stored = f.subscriptions.get_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert!(stored.cancelled_at.is_none());
    }

    #[tokio::test]
    async fn cancel_by_admin_is_allowed() {
        let f = fixture();
        let owner = f.seed_user();
        let plan_id = f.seed_plan(30);
        let sub = f.use_cases.create(owner, owner.id, plan_id).await.unwrap();

        let cancelled = f.use_cases.cancel(admin_actor(), sub.id).await.unwrap();
        assert_eq!(cancelled.status, SubscriptionStatus::Cancelled);
    }

    #[tokio::test]
    async fn cancel_unknown_subscription_is_not_found() {
        let f = fixture();
        let err = f
            .use_cases
            .cancel(admin_actor(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn change_plan_replaces_active_subscription_atomically() {
        let f = fixture();
        let actor = f.seed_user();
        let old_plan = f.seed_plan(30);
        let new_plan = f.seed_plan(365);
        let sub = f.use_cases.create(actor, actor.id, old_plan).await.unwrap();

        let replacement = f
            .use_cases
            .change_plan(actor, sub.id, new_plan)
            .await
            .unwrap();

        assert_eq!(replacement.plan_id, new_plan);
        assert_eq!(replacement.status, SubscriptionStatus::Active);
        assert_eq!(
            replacement.end_date - replacement.start_date,
            Duration::days(365)
        );

        let old = f.subscriptions.get_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(old.status, SubscriptionStatus::Cancelled);
        assert!(old.cancelled_at.is_some());
        assert_eq!(f.active_count_for(actor.id), 1);
    }

    #[tokio::test]
    async fn change_plan_failure_leaves_everything_untouched() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);
        let sub = f.use_cases.create(actor, actor.id, plan_id).await.unwrap();
        let before = f.subscriptions.all();

        // Unknown target plan.
        let err = f
            .use_cases
            .change_plan(actor, sub.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        // Inactive target plan.
        let retired = create_test_plan(|p| {
            p.name = "Retired".to_string();
            p.is_active = false;
        });
        let retired_id = retired.id;
        f.plans.insert(retired);
        let err = f
            .use_cases
            .change_plan(actor, sub.id, retired_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let after = f.subscriptions.all();
        assert_eq!(before.len(), after.len());
        let stored = f.subscriptions.get_by_id(sub.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
        assert_eq!(f.active_count_for(actor.id), 1);
    }

    #[tokio::test]
    async fn change_plan_on_terminal_subscription_is_a_conflict() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);
        let other_plan = f.seed_plan(90);
        let sub = f.use_cases.create(actor, actor.id, plan_id).await.unwrap();
        f.use_cases.cancel(actor, sub.id).await.unwrap();

        let err = f
            .use_cases
            .change_plan(actor, sub.id, other_plan)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn check_expired_flips_only_overdue_active_rows() {
        let f = fixture();
        let user = create_test_user(|_| {});
        let user_id = user.id;
        f.users.insert(user);
        let plan_id = f.seed_plan(30);
        let now = Utc::now().naive_utc();

        let overdue = create_test_subscription(user_id, plan_id, |s| {
            s.start_date = now - Duration::days(31);
            s.end_date = now - Duration::seconds(1);
        });
        let overdue_id = overdue.id;
        f.subscriptions.insert(overdue);

        let current = create_test_subscription(Uuid::new_v4(), plan_id, |s| {
            s.end_date = now + Duration::hours(1);
        });
        let current_id = current.id;
        f.subscriptions.insert(current);

        let count = f.use_cases.check_expired().await.unwrap();
        assert_eq!(count, 1);

        let expired = f.subscriptions.get_by_id(overdue_id).await.unwrap().unwrap();
        assert_eq!(expired.status, SubscriptionStatus::Expired);

        let still_active = f.subscriptions.get_by_id(current_id).await.unwrap().unwrap();
        assert_eq!(still_active.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn check_expired_is_idempotent() {
        let f = fixture();
        let plan_id = f.seed_plan(30);
        let now = Utc::now().naive_utc();

        for _ in 0..3 {
            let sub = create_test_subscription(Uuid::new_v4(), plan_id, |s| {
                s.end_date = now - Duration::days(1);
            });
            f.subscriptions.insert(sub);
        }

        let first = f.use_cases.check_expired().await.unwrap();
        assert_eq!(first, 3);
        let snapshot = f.subscriptions.all();

        let second = f.use_cases.check_expired().await.unwrap();
        assert_eq!(second, 0);
        let resnapshot = f.subscriptions.all();
        assert_eq!(snapshot.len(), resnapshot.len());
        for sub in resnapshot {
            assert_eq!(sub.status, SubscriptionStatus::Expired);
        }
    }

    #[tokio::test]
    async fn check_expired_never_touches_terminal_rows() {
        let f = fixture();
        let plan_id = f.seed_plan(30);
        let now = Utc::now().naive_utc();
        let cancelled_at = now - Duration::days(2);

        let cancelled = create_test_subscription(Uuid::new_v4(), plan_id, |s| {
            s.status = SubscriptionStatus::Cancelled;
            s.cancelled_at = Some(cancelled_at);
            s.end_date = now - Duration::days(1);
        });
        let cancelled_id = cancelled.id;
        f.subscriptions.insert(cancelled);

        let count = f.use_cases.check_expired().await.unwrap();
        assert_eq!(count, 0);

        let stored = f
            .subscriptions
            .get_by_id(cancelled_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
        assert_eq!(stored.cancelled_at, Some(cancelled_at));
    }

    #[tokio::test]
    async fn expiry_respects_the_end_date_boundary() {
        let f = fixture();
        let plan_id = f.seed_plan(30);
        let now = Utc::now().naive_utc();

        let not_yet_due = create_test_subscription(Uuid::new_v4(), plan_id, |s| {
            s.end_date = now + Duration::minutes(5);
        });
        let not_yet_due_id = not_yet_due.id;
        f.subscriptions.insert(not_yet_due);

        let count = f.use_cases.check_expired().await.unwrap();
        assert_eq!(count, 0);
        let stored = f
            .subscriptions
            .get_by_id(not_yet_due_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn get_active_returns_the_single_active_subscription() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_id = f.seed_plan(30);

        let err = f.use_cases.get_active(actor, actor.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        let sub = f.use_cases.create(actor, actor.id, plan_id).await.unwrap();
        let detail = f.use_cases.get_active(actor, actor.id).await.unwrap();
        assert_eq!(detail.subscription.id, sub.id);
        assert_eq!(detail.plan.id, plan_id);
    }

    #[tokio::test]
    async fn list_for_user_filters_by_status() {
        let f = fixture();
        let actor = f.seed_user();
        let plan_a = f.seed_plan(30);
        let plan_b = f.seed_plan(90);

        let first = f.use_cases.create(actor, actor.id, plan_a).await.unwrap();
        f.use_cases.cancel(actor, first.id).await.unwrap();
        f.use_cases.create(actor, actor.id, plan_b).await.unwrap();

        let all = f
            .use_cases
            .list_for_user(actor, actor.id, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let cancelled = f
            .use_cases
            .list_for_user(actor, actor.id, Some(SubscriptionStatus::Cancelled))
            .await
            .unwrap();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].id, first.id);
    }

    #[tokio::test]
    async fn list_all_requires_admin() {
        let f = fixture();
        let actor = f.seed_user();

        let err = f
            .use_cases
            .list_all(actor, None, 0, 100)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        let rows = f
            .use_cases
            .list_all(admin_actor(), None, 0, 100)
            .await
            .unwrap();
        assert!(rows.is_empty());
    }
}
