//! Resolved permission snapshot.

use serde::{Deserialize, Serialize};

use crate::permissions::{Permission, PermissionSet};
use crate::role::{primary_role, Role};

/// The latest resolved view of "what may the signed-in subject do".
///
/// Snapshots are derived wholesale from a role-assignment fetch and replaced
/// atomically in the [`PermissionStore`](crate::PermissionStore); individual
/// fields are never patched. `primary_role` and `permissions` are pure
/// functions of `roles` and cannot drift from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSnapshot {
    pub primary_role: Option<Role>,
    pub roles: Vec<Role>,
    pub permissions: PermissionSet,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl PermissionSnapshot {
    /// Snapshot for an unauthenticated (or roleless) subject: deny all.
    pub fn unauthenticated() -> Self {
        Self {
            primary_role: None,
            roles: Vec::new(),
            permissions: PermissionSet::none(),
            is_loading: false,
            last_error: None,
        }
    }

    /// Snapshot published while a resolution is in flight.
    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::unauthenticated()
        }
    }

    /// Snapshot derived from a successful role fetch.
    pub fn resolved(roles: Vec<Role>) -> Self {
        Self {
            primary_role: primary_role(&roles),
            permissions: PermissionSet::from_roles(&roles),
            roles,
            is_loading: false,
            last_error: None,
        }
    }

    /// Fail-closed snapshot for a failed role fetch: deny all, carry the error.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            last_error: Some(error.into()),
            ..Self::unauthenticated()
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.iter().any(|r| self.has_role(*r))
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        self.permissions.grants(permission)
    }
}

impl Default for PermissionSnapshot {
    fn default() -> Self {
        Self::unauthenticated()
    }
}
