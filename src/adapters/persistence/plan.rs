use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::plan::{CreatePlanInput, PlanProfile, PlanRepo, UpdatePlanInput},
};

fn row_to_profile(row: &sqlx::postgres::PgRow) -> PlanProfile {
    let features_json: serde_json::Value = row.get("features");
    let features: Vec<String> = serde_json::from_value(features_json).unwrap_or_default();

    PlanProfile {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        duration_days: row.get("duration_days"),
        features,
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, name, description, price_cents, currency, duration_days,
    features, is_active, created_at, updated_at
"#;

#[async_trait]
impl PlanRepo for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>> {
        let row = sqlx::query(&format!("SELECT {} FROM plans WHERE id = $1", SELECT_COLS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM plans WHERE name = $1",
            SELECT_COLS
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_profile))
    }

    async fn list(&self, active_only: bool, skip: i64, limit: i64) -> AppResult<Vec<PlanProfile>> {
        let query = if active_only {
            format!(
                "SELECT {} FROM plans WHERE is_active = true ORDER BY created_at LIMIT $1 OFFSET $2",
                SELECT_COLS
            )
        } else {
            format!(
                "SELECT {} FROM plans ORDER BY created_at LIMIT $1 OFFSET $2",
                SELECT_COLS
            )
        };
        let rows = sqlx::query(&query)
            .bind(limit)
            .bind(skip)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_profile).collect())
    }

    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile> {
        let id = Uuid::new_v4();
        let features = serde_json::to_value(&input.features)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO plans
                (id, name, description, price_cents, currency, duration_days, features, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(&input.currency)
        .bind(input.duration_days)
        .bind(features)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile> {
        let features = input
            .features
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE plans SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                price_cents = COALESCE($4, price_cents),
                currency = COALESCE($5, currency),
                duration_days = COALESCE($6, duration_days),
                features = COALESCE($7, features),
                is_active = COALESCE($8, is_active),
                updated_at = CURRENT_TIMESTAMP
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(&input.name)
        .bind(&input.description)
        .bind(input.price_cents)
        .bind(&input.currency)
        .bind(input.duration_days)
        .bind(features)
        .bind(input.is_active)
        .fetch_one(&self.pool)
        .await
        .map_err(AppError::from)?;
        Ok(row_to_profile(&row))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM plans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::from)?;
        Ok(())
    }
}
