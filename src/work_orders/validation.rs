use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::WorkOrderStatus;
use crate::errors::ValidationErrors;

const MAX_PRODUCT_NAME_LENGTH: usize = 255;

/// Raw create/edit form as submitted by the presentation layer.
///
/// Fields stay loosely typed so every problem can be reported at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkOrderInput {
    pub product_name: String,
    pub quantity: i64,
    /// `YYYY-MM-DD`; a trailing time component is accepted and ignored.
    pub deadline: String,
    pub status: String,
    pub operator_id: Uuid,
    #[serde(default)]
    pub notes: Option<String>,
}

/// A form that passed every field check. Operator existence is checked
/// against the store separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidWorkOrder {
    pub product_name: String,
    pub quantity: u32,
    pub deadline: NaiveDate,
    pub status: WorkOrderStatus,
    pub operator_id: Uuid,
    pub notes: Option<String>,
}

impl WorkOrderInput {
    pub fn validate(&self) -> Result<ValidWorkOrder, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let product_name = self.product_name.trim().to_string();
        if product_name.is_empty() {
            errors.add("product_name", "is required");
        } else if product_name.chars().count() > MAX_PRODUCT_NAME_LENGTH {
            errors.add(
                "product_name",
                format!("must be at most {MAX_PRODUCT_NAME_LENGTH} characters"),
            );
        }

        let quantity = if self.quantity < 1 {
            errors.add("quantity", "must be at least 1");
            None
        } else {
            match u32::try_from(self.quantity) {
                Ok(q) => Some(q),
                Err(_) => {
                    errors.add("quantity", format!("must be at most {}", u32::MAX));
                    None
                }
            }
        };

        let deadline = match parse_date(&self.deadline) {
            Some(date) => Some(date),
            None => {
                errors.add("deadline", "is not a valid date");
                None
            }
        };

        let status = match self.status.parse::<WorkOrderStatus>() {
            Ok(status) => Some(status),
            Err(message) => {
                errors.add("status", message);
                None
            }
        };

        match (quantity, deadline, status) {
            (Some(quantity), Some(deadline), Some(status)) if errors.is_empty() => Ok(ValidWorkOrder {
                product_name,
                quantity,
                deadline,
                status,
                operator_id: self.operator_id,
                notes: self.notes.clone(),
            }),
            _ => Err(errors),
        }
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time (`T…` or ` …`).
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Operator-supplied quantity on a status transition; zero is allowed.
pub fn validate_quantity_change(quantity_change: i64) -> Result<u32, ValidationErrors> {
    if quantity_change < 0 {
        return Err(ValidationErrors::single("quantity_change", "must be at least 0"));
    }
    u32::try_from(quantity_change)
        .map_err(|_| ValidationErrors::single("quantity_change", format!("must be at most {}", u32::MAX)))
}
