use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::validators,
    infra::password,
};

#[derive(Debug, Clone, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub is_admin: bool,
    pub is_active: bool,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Profile plus stored hash, only surfaced to the login path.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: UserProfile,
    pub password_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>>;
    async fn get_by_email(&self, email: &str) -> AppResult<Option<UserProfile>>;
    async fn get_by_username(&self, username: &str) -> AppResult<Option<UserProfile>>;
    async fn get_credentials_by_username(
        &self,
        username: &str,
    ) -> AppResult<Option<UserCredentials>>;
    async fn create(
        &self,
        email: &str,
        username: &str,
        password_hash: &str,
    ) -> AppResult<UserProfile>;
}

#[derive(Clone)]
pub struct UserUseCases {
    repo: Arc<dyn UserRepo>,
}

impl UserUseCases {
    pub fn new(repo: Arc<dyn UserRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self, input))]
    pub async fn register(&self, input: RegisterInput) -> AppResult<UserProfile> {
        let email = input.email.trim().to_lowercase();
        if !validators::is_valid_email(&email) {
            return Err(AppError::InvalidInput("email is not valid".into()));
        }
        if !validators::is_valid_username(&input.username) {
            return Err(AppError::InvalidInput(
                "username must be 3-50 characters (letters, numbers, '-', '_', '.')".into(),
            ));
        }
        if !validators::is_valid_password(&input.password) {
            return Err(AppError::InvalidInput(
                "password must be 8-128 characters".into(),
            ));
        }

        if self.repo.get_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict("email is already registered".into()));
        }
        if self.repo.get_by_username(&input.username).await?.is_some() {
            return Err(AppError::Conflict("username is already taken".into()));
        }

        let password_hash = password::hash_password(&input.password)?;
        self.repo.create(&email, &input.username, &password_hash).await
    }

    /// Verify username/password. Unknown users, wrong passwords and
    /// deactivated accounts are indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<UserProfile> {
        let Some(credentials) = self.repo.get_credentials_by_username(username).await? else {
            return Err(AppError::InvalidCredentials);
        };
        if !password::verify_password(password, &credentials.password_hash) {
            return Err(AppError::InvalidCredentials);
        }
        if !credentials.user.is_active {
            return Err(AppError::InvalidCredentials);
        }
        Ok(credentials.user)
    }

    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Option<UserProfile>> {
        self.repo.get_by_id(id).await
    }
}
