use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use super::password::{hash_password, verify_password};
use super::role::Role;
use super::user::User;
use crate::errors::{TrackerError, ValidationErrors};
use crate::store::{StoreError, WorkOrderStore};

const MAX_FIELD_LENGTH: usize = 255;
const MIN_PASSWORD_LENGTH: usize = 8;

/// Registration form.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub handle: String,
    pub name: String,
    pub role: Option<Role>,
    pub password: String,
}

/// User accounts: registration, credential checks and lookups.
#[derive(Clone)]
pub struct UserDirectory {
    store: Arc<dyn WorkOrderStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn WorkOrderStore>) -> Self {
        Self { store }
    }

    pub async fn register(&self, input: NewUser) -> Result<User, TrackerError> {
        let mut errors = ValidationErrors::new();
        let handle = input.handle.trim().to_string();
        let name = input.name.trim().to_string();

        if handle.is_empty() {
            errors.add("handle", "is required");
        } else if handle.chars().count() > MAX_FIELD_LENGTH {
            errors.add("handle", format!("must be at most {MAX_FIELD_LENGTH} characters"));
        } else if handle.chars().any(char::is_whitespace) {
            errors.add("handle", "must not contain spaces");
        }
        if name.is_empty() {
            errors.add("name", "is required");
        } else if name.chars().count() > MAX_FIELD_LENGTH {
            errors.add("name", format!("must be at most {MAX_FIELD_LENGTH} characters"));
        }
        if input.password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.add("password", format!("must be at least {MIN_PASSWORD_LENGTH} characters"));
        }
        if !errors.has("handle") && self.store.find_user_by_handle(&handle).await?.is_some() {
            errors.add("handle", "has already been taken");
        }
        errors.into_result(())?;

        let password_hash = hash_password(&input.password).map_err(TrackerError::PasswordHash)?;

        let user = User {
            id: Uuid::new_v4(),
            handle,
            name,
            role: input.role,
            password_hash,
            created_at: Utc::now(),
        };

        match self.store.insert_user(user.clone()).await {
            Ok(()) => {}
            Err(StoreError::DuplicateHandle { .. }) => {
                return Err(TrackerError::Validation(ValidationErrors::single(
                    "handle",
                    "has already been taken",
                )))
            }
            Err(e) => return Err(e.into()),
        }

        info!(user_id = %user.id, handle = %user.handle, role = ?user.role, "User registered");
        Ok(user)
    }

    /// Resolve an actor from credentials.
    pub async fn authenticate(&self, handle: &str, password: &str) -> Result<User, TrackerError> {
        match self.store.find_user_by_handle(handle.trim()).await? {
            Some(user) if verify_password(password, &user.password_hash) => Ok(user),
            _ => {
                warn!(handle = %handle, "Rejected credentials");
                Err(TrackerError::InvalidCredentials)
            }
        }
    }

    pub async fn find_by_handle(&self, handle: &str) -> Result<Option<User>, TrackerError> {
        Ok(self.store.find_user_by_handle(handle).await?)
    }

    /// Users who can be assigned work orders, sorted by name.
    pub async fn operators(&self) -> Result<Vec<User>, TrackerError> {
        Ok(self.store.users_with_role(Role::Operator).await?)
    }
}
