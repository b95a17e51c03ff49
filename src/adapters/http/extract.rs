use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::{jwt, use_cases::Actor, use_cases::user::UserProfile},
};

/// The authenticated caller, resolved from the bearer token.
///
/// Verifies the JWT, then loads the account so revoked or deactivated users
/// are rejected even while their token is still within its lifetime.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserProfile);

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.0.id,
            is_admin: self.0.is_admin,
        }
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::InvalidCredentials)?;

        let claims = jwt::verify(bearer.token(), &state.config.jwt_secret)?;
        let user_id =
            Uuid::parse_str(&claims.sub).map_err(|_| AppError::InvalidCredentials)?;

        let user = state
            .user_use_cases
            .get_by_id(user_id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;
        if !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        Ok(CurrentUser(user))
    }
}

/// A `CurrentUser` that must carry the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub UserProfile);

impl AdminUser {
    pub fn actor(&self) -> Actor {
        Actor {
            id: self.0.id,
            is_admin: true,
        }
    }
}

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}
