//! Data-store boundary for member and role-assignment reads.

use async_trait::async_trait;
use thiserror::Error;

use memberdesk_auth::RoleAssignment;
use memberdesk_core::{MemberId, MemberNumber, SubjectId};

use crate::member::Member;

/// Failure at the data-store boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The backing store rejected or failed the request.
    #[error("data store error: {0}")]
    Backend(String),

    /// An update would violate a store-side invariant.
    #[error("data store conflict: {0}")]
    Conflict(String),
}

impl DirectoryError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Read/update access to member records and role assignments.
///
/// Implementations wrap the remote data store, which also enforces its own
/// row-level access rules; this trait only names the operations the session
/// flows consume.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Exact lookup by normalized member number.
    async fn find_by_number(
        &self,
        number: &MemberNumber,
    ) -> Result<Option<Member>, DirectoryError>;

    /// Fallback lookup: case-insensitive substring match on the number.
    async fn find_by_number_fuzzy(
        &self,
        number: &MemberNumber,
    ) -> Result<Option<Member>, DirectoryError>;

    /// Populate `auth_user_id` on a member record (one-shot link-back).
    async fn link_auth_user(
        &self,
        member: MemberId,
        subject: SubjectId,
    ) -> Result<(), DirectoryError>;

    /// All role assignments held by a subject.
    async fn roles_for(&self, subject: SubjectId) -> Result<Vec<RoleAssignment>, DirectoryError>;
}
