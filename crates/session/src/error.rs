//! Error taxonomy for the session flows.
//!
//! Two families: [`AuthError`] for the monitor/resolver, which always recover
//! locally into a safe denied state, and [`LoginError`] for the login flow,
//! which recovers only after its bounded retry budget is spent.

use thiserror::Error;

use memberdesk_core::DomainError;
use memberdesk_members::DirectoryError;

use crate::provider::ProviderError;

/// Failure in routine session/role maintenance.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The initial session probe failed. Recoverable variants trigger local
    /// cleanup and land in the unauthenticated state.
    #[error("session probe failed: {0}")]
    SessionProbeFailed(#[source] ProviderError),

    /// Role assignments could not be fetched. Fail-closed: the permission
    /// snapshot is emptied, the error surfaced, and no automatic retry runs.
    #[error("role fetch failed: {0}")]
    RoleFetchFailed(#[source] DirectoryError),
}

/// Terminal or per-attempt failure in the member-number login flow.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Input did not normalize into a member number.
    #[error("invalid member number: {0}")]
    InvalidMemberNumber(DomainError),

    /// No member record matched the normalized number, exactly or fuzzily.
    #[error("member {0} not found in our records; check the number or contact support")]
    MemberNotFound(String),

    /// Sign-in failed for a reason other than "no such credential".
    #[error("sign-in rejected: {0}")]
    CredentialConflict(#[source] ProviderError),

    /// Provider call failed during the attempt (sign-up, verification probe).
    #[error("identity provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Data-store failure during lookup or link-back.
    #[error("member lookup failed: {0}")]
    Directory(#[from] DirectoryError),

    /// Auth succeeded but no session was visible on re-probe.
    #[error("failed to establish session")]
    SessionEstablishmentFailed,

    /// All attempts spent; carries the final attempt's failure.
    #[error("login failed after {attempts} attempts: {last}")]
    ExhaustedRetries { attempts: u32, last: Box<LoginError> },
}

impl LoginError {
    /// The message shown to the user for a terminal failure.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::ExhaustedRetries { last, .. } => last.user_message(),
            LoginError::MemberNotFound(_) | LoginError::InvalidMemberNumber(_) => self.to_string(),
            _ => "Please try again later. If the problem persists, contact support.".to_string(),
        }
    }
}
