//! Member-number login/sign-up handshake.
//!
//! The flow is retryable and idempotent: every attempt runs the same
//! lookup → credential → sign-in-or-provision → link-back → verify sequence,
//! and every failure path ends in a clean signed-out state. Only the final
//! attempt's failure is surfaced to the user.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use memberdesk_core::{MemberId, MemberNumber};
use memberdesk_members::{Member, MemberDirectory};

use crate::error::LoginError;
use crate::hooks::{Notice, NoticeSink, QueryCache};
use crate::provider::{Credentials, IdentityProvider, Session};

/// Bounded retry schedule: `attempts` tries with the delay doubling after
/// each failure (base, 2×base, …).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: NonZeroU32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: NonZeroU32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// Delay to wait after the given (1-based) failed attempt.
    fn backoff_after(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        const DEFAULT_ATTEMPTS: NonZeroU32 = NonZeroU32::new(3).unwrap();
        Self {
            // 3 attempts, 1s/2s between them.
            attempts: DEFAULT_ATTEMPTS,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Outcome of a verified login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSuccess {
    pub session: Session,
    pub member_id: MemberId,
    /// Whether this login provisioned a brand-new provider identity.
    pub provisioned: bool,
}

/// Orchestrates the member-number handshake against the provider and the
/// member directory.
pub struct LoginFlow {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn MemberDirectory>,
    cache: Arc<dyn QueryCache>,
    notices: Arc<dyn NoticeSink>,
    policy: RetryPolicy,
}

impl LoginFlow {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn MemberDirectory>,
        cache: Arc<dyn QueryCache>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self::with_policy(provider, directory, cache, notices, RetryPolicy::default())
    }

    pub fn with_policy(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn MemberDirectory>,
        cache: Arc<dyn QueryCache>,
        notices: Arc<dyn NoticeSink>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            directory,
            cache,
            notices,
            policy,
        }
    }

    /// Run the full login flow for raw member-number input.
    ///
    /// On success the query cache has been reset for the fresh identity and
    /// the caller should navigate to the main application. On terminal
    /// failure the provider session has been cleared.
    pub async fn login(&self, raw_member_number: &str) -> Result<LoginSuccess, LoginError> {
        let number =
            MemberNumber::parse(raw_member_number).map_err(LoginError::InvalidMemberNumber)?;

        // Never let an attempt silently reuse credentials tied to a
        // different identity.
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(error = %err, "pre-login sign-out failed");
        }

        let attempts = self.policy.attempts.get();
        let mut last_error: Option<LoginError> = None;

        for attempt in 1..=attempts {
            match self.attempt(&number).await {
                Ok(success) => {
                    tracing::info!(
                        member = %number,
                        subject = %success.session.subject,
                        provisioned = success.provisioned,
                        "login verified"
                    );
                    self.cache.reset_all();
                    self.notices
                        .notify(Notice::info("Login successful", "Welcome back!"));
                    return Ok(success);
                }
                Err(err) => {
                    tracing::warn!(member = %number, attempt, error = %err, "login attempt failed");
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.policy.backoff_after(attempt)).await;
                    }
                }
            }
        }

        // Idempotent cleanup: a terminal failure must never leave a
        // half-established session behind.
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(error = %err, "post-failure sign-out failed");
        }

        let last = last_error.unwrap_or(LoginError::SessionEstablishmentFailed);
        let terminal = LoginError::ExhaustedRetries {
            attempts,
            last: Box::new(last),
        };
        self.notices
            .notify(Notice::error("Login failed", terminal.user_message()));
        Err(terminal)
    }

    /// One attempt of steps: lookup, credential, sign-in-or-provision,
    /// link-back, verify.
    async fn attempt(&self, number: &MemberNumber) -> Result<LoginSuccess, LoginError> {
        let member = self.find_member(number).await?;
        let credentials = Credentials::for_member(number);

        let (session, provisioned) = match self.provider.sign_in_with_password(&credentials).await {
            Ok(session) => (session, false),
            Err(err) if err.is_invalid_credentials() => {
                // First-time use: provision an identity with the member
                // number attached as metadata.
                tracing::info!(member = %number, "no existing credential, signing up");
                let session = self
                    .provider
                    .sign_up_with_password(&credentials, number)
                    .await?;
                (session, true)
            }
            Err(err) => return Err(LoginError::CredentialConflict(err)),
        };

        // Link-back runs exactly once, on the sign-up that created the
        // identity; an already-linked record is left alone.
        if provisioned && !member.is_linked() {
            self.directory
                .link_auth_user(member.id, session.subject)
                .await?;
            tracing::info!(member = %number, subject = %session.subject, "member linked to identity");
        }

        // Defensive re-probe: the provider accepting the credential does not
        // guarantee a stored session.
        let verified = self.provider.current_session().await?;
        if verified.is_none() {
            return Err(LoginError::SessionEstablishmentFailed);
        }

        Ok(LoginSuccess {
            session,
            member_id: member.id,
            provisioned,
        })
    }

    async fn find_member(&self, number: &MemberNumber) -> Result<Member, LoginError> {
        if let Some(member) = self.directory.find_by_number(number).await? {
            return Ok(member);
        }
        tracing::debug!(member = %number, "exact lookup missed, trying fuzzy match");
        self.directory
            .find_by_number_fuzzy(number)
            .await?
            .ok_or_else(|| LoginError::MemberNotFound(number.to_string()))
    }
}
