use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use crate::identity::Denial;
use crate::store::StoreError;
use crate::work_orders::WorkOrderStatus;

/// One failing input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All failing fields of one request, in the order they were checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f.field == field)
    }

    /// `Ok(value)` when nothing was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, TrackerError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(TrackerError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

/// Errors returned by every core operation.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("not permitted: {denial}")]
    Authorization { actor_id: Uuid, denial: Denial },

    #[error("invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: WorkOrderStatus,
        to: WorkOrderStatus,
    },

    #[error("work order {id} not found")]
    NotFound { id: Uuid },

    #[error("work order {id} changed since it was read (expected version {expected_version})")]
    Conflict { id: Uuid, expected_version: u64 },

    #[error("no work order numbers left for {date}")]
    SequenceExhausted { date: NaiveDate },

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("password hashing failed: {0}")]
    PasswordHash(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl TrackerError {
    pub fn forbidden(actor_id: Uuid, denial: Denial) -> Self {
        TrackerError::Authorization { actor_id, denial }
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, TrackerError::Authorization { .. })
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, TrackerError::InvalidTransition { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, TrackerError::Conflict { .. })
    }

    /// Map a failed compare-and-set save onto the core taxonomy.
    pub(crate) fn from_save(error: StoreError) -> Self {
        match error {
            StoreError::VersionMismatch { id, expected, .. } => TrackerError::Conflict {
                id,
                expected_version: expected,
            },
            StoreError::WorkOrderNotFound { id } => TrackerError::NotFound { id },
            other => TrackerError::Storage(other),
        }
    }
}
