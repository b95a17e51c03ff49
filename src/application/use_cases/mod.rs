pub mod plan;
pub mod subscription;
pub mod user;

use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// The authenticated caller of a use case.
///
/// All role and ownership decisions go through this one type: non-admins may
/// only touch resources they own, admins may touch anything.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
    pub id: Uuid,
    pub is_admin: bool,
}

impl Actor {
    pub fn require_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn require_owner_or_admin(&self, owner_id: Uuid) -> AppResult<()> {
        if self.is_admin || self.id == owner_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }
}
