//! Named permissions derived from the full role set.

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// Named capability, finer-grained than the primary role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    ManageUsers,
    CollectPayments,
    AccessSystem,
    ViewAudit,
    ManageCollectors,
}

/// Boolean capability set derived from a subject's roles.
///
/// Each field is a pure function of the **full** role set, not only the
/// primary role: a subject holding several assignments receives the union of
/// everything those roles imply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSet {
    pub can_manage_users: bool,
    pub can_collect_payments: bool,
    pub can_access_system: bool,
    pub can_view_audit: bool,
    pub can_manage_collectors: bool,
}

impl PermissionSet {
    /// Derive the capability union for a role set.
    pub fn from_roles(roles: &[Role]) -> Self {
        let is_admin = roles.contains(&Role::Admin);
        let is_collector = roles.contains(&Role::Collector);

        Self {
            can_manage_users: is_admin || is_collector,
            can_collect_payments: is_admin || is_collector,
            can_access_system: is_admin,
            can_view_audit: is_admin,
            can_manage_collectors: is_admin,
        }
    }

    /// Empty set: no capabilities (unauthenticated / fail-closed default).
    pub fn none() -> Self {
        Self::default()
    }

    pub fn grants(&self, permission: Permission) -> bool {
        match permission {
            Permission::ManageUsers => self.can_manage_users,
            Permission::CollectPayments => self.can_collect_payments,
            Permission::AccessSystem => self.can_access_system,
            Permission::ViewAudit => self.can_view_audit,
            Permission::ManageCollectors => self.can_manage_collectors,
        }
    }
}
