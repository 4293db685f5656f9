//! Identity-provider boundary: sessions, auth events, and the provider trait.
//!
//! The provider's token issuance and storage are its own concern; this module
//! only names the operations the session flows consume and the typed event
//! stream they subscribe to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

use memberdesk_core::{MemberNumber, SubjectId};

/// Live provider credential handle for an authenticated subject.
///
/// Owned exclusively by the session monitor and always replaced as a whole
/// value; nothing mutates a `Session` in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Stable identity of the signed-in subject.
    pub subject: SubjectId,
    /// Opaque bearer token for data-store requests.
    pub access_token: String,
    /// Expiry instant after which the token is no longer valid.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Sign-in credential derived from a member number.
///
/// There is no password UX: the business identifier is authoritative, so the
/// provider account uses the derived email and the number itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn for_member(number: &MemberNumber) -> Self {
        Self {
            email: number.derived_email(),
            password: number.as_str().to_string(),
        }
    }
}

/// Provider state-change notification.
///
/// Delivered in provider order; the monitor applies them last-writer-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// A subject signed in; carries the new session. Identity changed.
    SignedIn(Session),
    /// The subject signed out (or the session was revoked).
    SignedOut,
    /// The token was renewed for the same identity.
    TokenRefreshed(Session),
    /// Profile data changed; the session object should be re-probed.
    UserUpdated,
}

/// A subscription to the provider's auth-event stream.
///
/// Dropping the subscription ends delivery; there is no other cancellation
/// token. Results that arrive after the consumer shut down are dropped by
/// the monitor's liveness flag, not here.
#[derive(Debug)]
pub struct EventSubscription {
    receiver: mpsc::UnboundedReceiver<AuthEvent>,
}

impl EventSubscription {
    pub fn new(receiver: mpsc::UnboundedReceiver<AuthEvent>) -> Self {
        Self { receiver }
    }

    /// Wait for the next event; `None` once the provider hangs up.
    pub async fn recv(&mut self) -> Option<AuthEvent> {
        self.receiver.recv().await
    }

    /// Non-blocking poll, mainly for tests.
    pub fn try_recv(&mut self) -> Option<AuthEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Failure reported by the identity provider.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Sign-in rejected because no account matches the credential.
    #[error("invalid login credentials")]
    InvalidCredentials,

    /// The network round trip itself failed.
    #[error("network failure: {0}")]
    Network(String),

    /// The provider no longer knows the session.
    #[error("session not found")]
    SessionNotFound,

    /// The access token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The refresh token was rejected.
    #[error("invalid refresh token")]
    InvalidRefreshToken,

    /// Any other provider-side rejection.
    #[error("provider rejected request: {0}")]
    Rejected(String),
}

impl ProviderError {
    /// Whether this failure means "the stored session is unusable but the
    /// user can simply sign in again" — the class the monitor recovers from
    /// by clearing local state and signing out.
    pub fn is_recoverable_auth_failure(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::SessionNotFound
                | ProviderError::TokenExpired
                | ProviderError::InvalidRefreshToken
        )
    }

    pub fn is_invalid_credentials(&self) -> bool {
        matches!(self, ProviderError::InvalidCredentials)
    }
}

/// External identity provider.
///
/// Implementations wrap the real provider SDK. All calls are non-blocking;
/// timeouts are the transport's concern.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Current session, if one is stored client-side.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;

    /// Liveness re-check: ask the provider who the stored session belongs to.
    ///
    /// Used after a successful [`current_session`](Self::current_session) to
    /// catch sessions the provider has since revoked.
    async fn current_user(&self) -> Result<SubjectId, ProviderError>;

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError>;

    /// Provision a new account, attaching the member number as identity
    /// metadata.
    async fn sign_up_with_password(
        &self,
        credentials: &Credentials,
        member_number: &MemberNumber,
    ) -> Result<Session, ProviderError>;

    /// Destroy the stored session. Idempotent: signing out while signed out
    /// succeeds.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Subscribe to auth state changes.
    fn subscribe(&self) -> EventSubscription;
}
