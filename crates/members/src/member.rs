//! Member record.

use serde::{Deserialize, Serialize};

use memberdesk_core::{DomainError, DomainResult, Entity, MemberId, MemberNumber, SubjectId};

/// A member of the organisation, keyed by a human-assigned member number.
///
/// Records are created by administrative onboarding. `auth_user_id` starts
/// empty and is populated at most once, by the login flow, when a sign-up
/// first provisions an identity for this member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub member_number: MemberNumber,
    pub auth_user_id: Option<SubjectId>,
}

impl Member {
    pub fn new(id: MemberId, member_number: MemberNumber) -> Self {
        Self {
            id,
            member_number,
            auth_user_id: None,
        }
    }

    /// Whether this record has been linked to a provider identity yet.
    pub fn is_linked(&self) -> bool {
        self.auth_user_id.is_some()
    }

    /// Link this record to a provider identity.
    ///
    /// One-shot: linking an already-linked record to a *different* subject is
    /// a conflict. Re-linking the same subject is a no-op (idempotent).
    pub fn link_auth_user(&mut self, subject: SubjectId) -> DomainResult<()> {
        match self.auth_user_id {
            None => {
                self.auth_user_id = Some(subject);
                Ok(())
            }
            Some(existing) if existing == subject => Ok(()),
            Some(existing) => Err(DomainError::conflict(format!(
                "member {} already linked to {existing}",
                self.member_number
            ))),
        }
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
