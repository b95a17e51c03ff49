use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{use_cases::Actor, validators},
};

#[derive(Debug, Clone, Serialize)]
pub struct PlanProfile {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    pub currency: String,
    pub duration_days: i32,
    pub features: Vec<String>,
    pub is_active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePlanInput {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i32,
    #[serde(default = "default_currency")]
    pub currency: String,
    pub duration_days: i32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatePlanInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i32>,
    pub currency: Option<String>,
    pub duration_days: Option<i32>,
    pub features: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

fn default_currency() -> String {
    "usd".to_string()
}

fn default_true() -> bool {
    true
}

#[async_trait]
pub trait PlanRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<PlanProfile>>;
    async fn get_by_name(&self, name: &str) -> AppResult<Option<PlanProfile>>;
    async fn list(&self, active_only: bool, skip: i64, limit: i64) -> AppResult<Vec<PlanProfile>>;
    async fn create(&self, input: &CreatePlanInput) -> AppResult<PlanProfile>;
    async fn update(&self, id: Uuid, input: &UpdatePlanInput) -> AppResult<PlanProfile>;
    async fn delete(&self, id: Uuid) -> AppResult<()>;
}

#[derive(Clone)]
pub struct PlanUseCases {
    repo: Arc<dyn PlanRepo>,
}

impl PlanUseCases {
    pub fn new(repo: Arc<dyn PlanRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(
        &self,
        active_only: bool,
        skip: i64,
        limit: i64,
    ) -> AppResult<Vec<PlanProfile>> {
        self.repo.list(active_only, skip, limit).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<PlanProfile> {
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)
    }

    #[instrument(skip(self, input))]
    pub async fn create(&self, actor: Actor, input: CreatePlanInput) -> AppResult<PlanProfile> {
        actor.require_admin()?;
        validate_plan_fields(&input.name, input.price_cents, input.duration_days)?;

        if self.repo.get_by_name(&input.name).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "a plan named '{}' already exists",
                input.name
            )));
        }

        self.repo.create(&input).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        actor: Actor,
        id: Uuid,
        input: UpdatePlanInput,
    ) -> AppResult<PlanProfile> {
        actor.require_admin()?;

        let existing = self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;

        if let Some(name) = &input.name {
            if !validators::is_valid_plan_name(name) {
                return Err(AppError::InvalidInput("plan name is not valid".into()));
            }
            if *name != existing.name && self.repo.get_by_name(name).await?.is_some() {
                return Err(AppError::Conflict(format!(
                    "a plan named '{}' already exists",
                    name
                )));
            }
        }
        if let Some(price_cents) = input.price_cents
            && price_cents <= 0
        {
            return Err(AppError::InvalidInput("price must be positive".into()));
        }
        if let Some(duration_days) = input.duration_days
            && duration_days <= 0
        {
            return Err(AppError::InvalidInput("duration must be positive".into()));
        }

        self.repo.update(id, &input).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, actor: Actor, id: Uuid) -> AppResult<()> {
        actor.require_admin()?;
        self.repo.get_by_id(id).await?.ok_or(AppError::NotFound)?;
        self.repo.delete(id).await
    }
}

fn validate_plan_fields(name: &str, price_cents: i32, duration_days: i32) -> AppResult<()> {
    if !validators::is_valid_plan_name(name) {
        return Err(AppError::InvalidInput("plan name is not valid".into()));
    }
    if price_cents <= 0 {
        return Err(AppError::InvalidInput("price must be positive".into()));
    }
    if duration_days <= 0 {
        return Err(AppError::InvalidInput("duration must be positive".into()));
    }
    Ok(())
}
