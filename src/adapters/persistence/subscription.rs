use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan::PlanProfile,
    application::use_cases::subscription::{
        SubscriptionProfile, SubscriptionRepo, SubscriptionWithPlan,
    },
    domain::entities::subscription::SubscriptionStatus,
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> SubscriptionProfile {
    SubscriptionProfile {
        id: row.get("id"),
        user_id: row.get("user_id"),
        plan_id: row.get("plan_id"),
        start_date: row.get("start_date"),
        end_date: row.get("end_date"),
        status: row.get("status"),
        cancelled_at: row.get("cancelled_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, user_id, plan_id, start_date, end_date, status, cancelled_at,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_active_by_user(&self, user_id: Uuid) -> AppResult<Option<SubscriptionProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE user_id = $1 AND status = 'active'",
            SELECT_COLS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        status: Option<SubscriptionStatus>,
    ) -> AppResult<Vec<SubscriptionProfile>> {
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                "SELECT {} FROM subscriptions WHERE user_id = $1 AND status = $2 ORDER BY created_at DESC",
                SELECT_COLS
            ))
            .bind(user_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(&format!(
                "SELECT {} FROM subscriptions WHERE user_id = $1 ORDER BY created_at DESC",
                SELECT_COLS
            ))
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn list_with_plan(
        &self,
        status: Option<SubscriptionStatus>,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionWithPlan>> {
        const JOINED_COLS: &str = r#"
            s.id, s.user_id, s.plan_id, s.start_date, s.end_date, s.status,
            s.cancelled_at, s.created_at, s.updated_at,
            p.id as p_id, p.name as p_name, p.description as p_description,
            p.price_cents as p_price_cents, p.currency as p_currency,
            p.duration_days as p_duration_days, p.features as p_features,
            p.is_active as p_is_active, p.created_at as p_created_at,
            p.updated_at as p_updated_at,
            u.email as user_email
        "#;
        let rows = if let Some(status) = status {
            sqlx::query(&format!(
                r#"
                SELECT {}
                FROM subscriptions s
                JOIN plans p ON s.plan_id = p.id
                JOIN users u ON s.user_id = u.id
                WHERE s.status = $1
                ORDER BY s.created_at DESC
                LIMIT $2 OFFSET $3
                "#,
                JOINED_COLS
            ))
            .bind(status)
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query(&format!(
                r#"
                SELECT {}
                FROM subscriptions s
                JOIN plans p ON s.plan_id = p.id
                JOIN users u ON s.user_id = u.id
                ORDER BY s.created_at DESC
                LIMIT $1 OFFSET $2
                "#,
                JOINED_COLS
            ))
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await
        }
        .map_err(AppError::from)?;

        Ok(rows
            .iter()
            .map(|row| {
                let features_json: serde_json::Value = row.get("p_features");
                let features: Vec<String> =
                    serde_json::from_value(features_json).unwrap_or_default();

                SubscriptionWithPlan {
                    subscription: row_to_profile(row),
                    plan: PlanProfile {
                        id: row.get("p_id"),
                        name: row.get("p_name"),
                        description: row.get("p_description"),
                        price_cents: row.get("p_price_cents"),
                        currency: row.get("p_currency"),
                        duration_days: row.get("p_duration_days"),
                        features,
                        is_active: row.get("p_is_active"),
                        created_at: row.get("p_created_at"),
                        updated_at: row.get("p_updated_at"),
                    },
                    user_email: row.get("user_email"),
                }
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
        let id = Uuid::new_v4();
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(user_id)
        .bind(plan_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn cancel(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Option<SubscriptionProfile>> {
        // Guarded on status so a concurrent expiry sweep cannot be undone.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = $2,
                updated_at = $2
            WHERE id = $1 AND status = 'active'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn replace_active(
        &self,
        old_id: Uuid,
        new_plan_id: Uuid,
        now: NaiveDateTime,
        new_end_date: NaiveDateTime,
    ) -> AppResult<(SubscriptionProfile, SubscriptionProfile)> {
        let mut tx = self.pool.begin().await.map_err(AppError::from)?;

        let cancelled_row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions SET
                status = 'cancelled',
                cancelled_at = $2,
                updated_at = $2
            WHERE id = $1 AND status = 'active'
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(old_id)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::Conflict("subscription is no longer active".into()))?;
        let cancelled = row_to_profile(&cancelled_row);

        let replacement_row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (id, user_id, plan_id, start_date, end_date, status)
            VALUES ($1, $2, $3, $4, $5, 'active')
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(Uuid::new_v4())
        .bind(cancelled.user_id)
        .bind(new_plan_id)
        .bind(now)
        .bind(new_end_date)
        .fetch_one(&mut *tx)
        .await
        .map_err(AppError::from)?;
        let replacement = row_to_profile(&replacement_row);

        tx.commit().await.map_err(AppError::from)?;
        Ok((cancelled, replacement))
    }

    async fn mark_expired(&self, now: NaiveDateTime) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                status = 'expired',
                updated_at = $1
            WHERE status = 'active' AND end_date <= $1
            "#,
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(result.rows_affected())
    }
}
