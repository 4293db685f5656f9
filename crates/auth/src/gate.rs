//! Access gate: pure allow/deny decisions for dashboard surfaces.
//!
//! Decisions are synchronous and side-effect-free. Surfacing an
//! "access denied" notice on a user-initiated navigation is the caller's
//! responsibility, not the gate's.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use memberdesk_core::DomainError;

use crate::role::Role;

/// Protected dashboard surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    Dashboard,
    Users,
    Collectors,
    Audit,
    System,
    Financials,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Dashboard => "dashboard",
            Tab::Users => "users",
            Tab::Collectors => "collectors",
            Tab::Audit => "audit",
            Tab::System => "system",
            Tab::Financials => "financials",
        }
    }
}

impl core::fmt::Display for Tab {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dashboard" => Ok(Tab::Dashboard),
            "users" => Ok(Tab::Users),
            "collectors" => Ok(Tab::Collectors),
            "audit" => Ok(Tab::Audit),
            "system" => Ok(Tab::System),
            "financials" => Ok(Tab::Financials),
            other => Err(DomainError::validation(format!("unknown tab: {other}"))),
        }
    }
}

/// Decide whether a primary role may open a tab.
///
/// Policy table:
/// - admin     → dashboard, users, collectors, audit, system, financials
/// - collector → dashboard, users
/// - member    → dashboard
/// - no role   → deny all
pub fn can_access(primary_role: Option<Role>, tab: Tab) -> bool {
    match primary_role {
        Some(Role::Admin) => true,
        Some(Role::Collector) => matches!(tab, Tab::Dashboard | Tab::Users),
        Some(Role::Member) => matches!(tab, Tab::Dashboard),
        None => false,
    }
}
