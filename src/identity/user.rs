use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::role::{Action, Role};

/// An authenticated identity. `role` is `None` for accounts that were never
/// given a role; such users hold no permissions at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub handle: String,
    pub name: String,
    pub role: Option<Role>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Why an actor was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Denial {
    #[error("account has no role assigned")]
    NoRole,
    #[error("role {role} does not grant {action}")]
    MissingPermission { role: Role, action: Action },
    #[error("work order is assigned to another operator")]
    NotAssignedOperator,
}

/// The single permission predicate every component consults.
pub fn has_permission(user: &User, action: Action) -> bool {
    user.role.is_some_and(|role| role.grants(action))
}

/// Like [`has_permission`] but reports the reason for a refusal.
pub fn authorize(user: &User, action: Action) -> Result<(), Denial> {
    match user.role {
        None => Err(Denial::NoRole),
        Some(role) if role.grants(action) => Ok(()),
        Some(role) => Err(Denial::MissingPermission { role, action }),
    }
}

impl User {
    pub fn can(&self, action: Action) -> bool {
        has_permission(self, action)
    }
}
