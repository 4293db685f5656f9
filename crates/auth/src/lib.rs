//! `memberdesk-auth` — roles, derived permissions, and access decisions.
//!
//! This crate is pure policy: no IO, no provider calls. The session crate
//! resolves role assignments and writes [`PermissionSnapshot`]s into the
//! [`PermissionStore`]; everything here is deterministic over that data.

pub mod gate;
pub mod permissions;
pub mod role;
pub mod snapshot;
pub mod store;

pub use gate::{can_access, Tab};
pub use permissions::{Permission, PermissionSet};
pub use role::{primary_role, Role, RoleAssignment};
pub use snapshot::PermissionSnapshot;
pub use store::PermissionStore;
