//! Role model and primary-role derivation.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use memberdesk_core::{DomainError, SubjectId};

/// Application role.
///
/// Exactly three roles exist; there is no hierarchy beyond the fixed
/// precedence used for primary-role derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Collector,
    Member,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Collector => "collector",
            Role::Member => "member",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "collector" => Ok(Role::Collector),
            "member" => Ok(Role::Member),
            other => Err(DomainError::validation(format!("unknown role: {other}"))),
        }
    }
}

/// A role granted to a subject.
///
/// A subject may hold zero, one, or several assignments. Uniqueness per
/// (subject, role) pair is assumed to be enforced by the data store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub subject: SubjectId,
    pub role: Role,
}

/// Derive the primary role from a subject's full role set.
///
/// Total order, first match wins: admin > collector > member. An empty set
/// (or a set containing none of the known roles) has no primary role.
/// Deterministic and order-independent over the input.
pub fn primary_role(roles: &[Role]) -> Option<Role> {
    for candidate in [Role::Admin, Role::Collector, Role::Member] {
        if roles.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}
