use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles a user can hold. Assigned at registration and not editable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "Production Manager")]
    ProductionManager,
    #[serde(rename = "Operator")]
    Operator,
}

/// Actions gated by the permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    CreateWorkOrder,
    UpdateWorkOrder,
    ViewWorkOrders,
    /// Granted with the permission table but not checked by listing: filters
    /// are accepted from every viewer and operators stay scoped to their own
    /// assignments whatever they filter on.
    FilterWorkOrders,
    AssignOperator,
    ViewAssignedWorkOrders,
    UpdateWorkOrderStatus,
}

const PRODUCTION_MANAGER_ACTIONS: &[Action] = &[
    Action::CreateWorkOrder,
    Action::UpdateWorkOrder,
    Action::ViewWorkOrders,
    Action::FilterWorkOrders,
    Action::AssignOperator,
];

const OPERATOR_ACTIONS: &[Action] = &[
    Action::ViewAssignedWorkOrders,
    Action::UpdateWorkOrderStatus,
];

impl Role {
    pub const ALL: [Role; 2] = [Role::ProductionManager, Role::Operator];

    /// Every action this role is allowed to perform.
    pub fn permissions(&self) -> &'static [Action] {
        match self {
            Role::ProductionManager => PRODUCTION_MANAGER_ACTIONS,
            Role::Operator => OPERATOR_ACTIONS,
        }
    }

    pub fn grants(&self, action: Action) -> bool {
        self.permissions().contains(&action)
    }

    /// Stable key used as the `user_roles.id` column.
    pub fn id(&self) -> &'static str {
        match self {
            Role::ProductionManager => "production-manager",
            Role::Operator => "operator",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Role::ProductionManager => "Production Manager",
            Role::Operator => "Operator",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Role::ALL.into_iter().find(|role| role.id() == id)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Role::from_id(&normalized)
            .or_else(|| (normalized == "manager" || normalized == "pm").then_some(Role::ProductionManager))
            .ok_or_else(|| format!("unknown role '{s}' (expected 'production-manager' or 'operator')"))
    }
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::CreateWorkOrder => "create-work-order",
            Action::UpdateWorkOrder => "update-work-order",
            Action::ViewWorkOrders => "view-work-orders",
            Action::FilterWorkOrders => "filter-work-orders",
            Action::AssignOperator => "assign-operator",
            Action::ViewAssignedWorkOrders => "view-assigned-work-orders",
            Action::UpdateWorkOrderStatus => "update-work-order-status",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_table_is_disjoint() {
        for action in Role::ProductionManager.permissions() {
            assert!(!Role::Operator.grants(*action), "{action} granted to both roles");
        }
    }

    #[test]
    fn test_operator_permissions() {
        assert!(Role::Operator.grants(Action::UpdateWorkOrderStatus));
        assert!(Role::Operator.grants(Action::ViewAssignedWorkOrders));
        assert!(!Role::Operator.grants(Action::CreateWorkOrder));
        assert!(!Role::Operator.grants(Action::AssignOperator));
        assert!(!Role::Operator.grants(Action::FilterWorkOrders));
        assert!(Role::ProductionManager.grants(Action::FilterWorkOrders));
    }

    #[test]
    fn test_role_parsing_accepts_common_spellings() {
        assert_eq!("Production Manager".parse::<Role>().unwrap(), Role::ProductionManager);
        assert_eq!("production_manager".parse::<Role>().unwrap(), Role::ProductionManager);
        assert_eq!("operator".parse::<Role>().unwrap(), Role::Operator);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn test_role_id_roundtrip() {
        for role in Role::ALL {
            assert_eq!(Role::from_id(role.id()), Some(role));
        }
    }
}
