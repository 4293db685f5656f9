//! Session lifecycle monitor.
//!
//! Owns the one authoritative answer to "who is signed in". Construction
//! starts in the initializing state; [`SessionMonitor::initialize`] probes
//! the provider for an existing session, and provider notifications are then
//! applied last-writer-wins. The published state is always replaced as a
//! whole value, and `loading` is cleared on every exit path so the UI can
//! never hang on an error.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::error::AuthError;
use crate::hooks::{LocalStorage, Notice, NoticeSink, QueryCache};
use crate::provider::{AuthEvent, EventSubscription, IdentityProvider, ProviderError, Session};

/// Published session view: `{session, loading}` plus the last recorded error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub session: Option<Session>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl SessionState {
    /// State at construction: probing, nothing known yet.
    pub fn initializing() -> Self {
        Self {
            session: None,
            loading: true,
            last_error: None,
        }
    }

    pub fn authenticated(session: Session) -> Self {
        Self {
            session: Some(session),
            loading: false,
            last_error: None,
        }
    }

    pub fn unauthenticated() -> Self {
        Self {
            session: None,
            loading: false,
            last_error: None,
        }
    }

    fn with_error(session: Option<Session>, error: impl Into<String>) -> Self {
        Self {
            session,
            loading: false,
            last_error: Some(error.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::initializing()
    }
}

/// Finite state machine over the provider's session lifecycle.
pub struct SessionMonitor {
    provider: Arc<dyn IdentityProvider>,
    cache: Arc<dyn QueryCache>,
    storage: Arc<dyn LocalStorage>,
    notices: Arc<dyn NoticeSink>,
    state: watch::Sender<SessionState>,
    alive: AtomicBool,
}

impl SessionMonitor {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        cache: Arc<dyn QueryCache>,
        storage: Arc<dyn LocalStorage>,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::initializing());
        Self {
            provider,
            cache,
            storage,
            notices,
            state,
            alive: AtomicBool::new(true),
        }
    }

    /// Current state (cloned out of the watch slot).
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Stop applying events. In-flight results arriving afterwards are
    /// dropped silently; this is the sole cancellation mechanism.
    pub fn shutdown(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Probe the provider for an existing session.
    ///
    /// Every path through here ends with a published state whose `loading`
    /// is false, including the failure paths.
    pub async fn initialize(&self) -> SessionState {
        self.begin_processing();
        tracing::info!("checking for existing session");

        let state = match self.probe().await {
            Ok(Some(session)) => {
                tracing::info!(subject = %session.subject, "found existing session");
                SessionState::authenticated(session)
            }
            Ok(None) => {
                tracing::info!("no existing session");
                SessionState::unauthenticated()
            }
            Err(err) if err.is_recoverable_auth_failure() => {
                tracing::warn!(error = %err, "session unusable, signing out");
                self.recover_auth_failure().await;
                SessionState::unauthenticated()
            }
            Err(err) => {
                // Not an auth problem; record it and stay signed out. Any
                // redirect is the caller's responsibility.
                let err = AuthError::SessionProbeFailed(err);
                tracing::error!(error = %err, "session probe failed");
                SessionState::with_error(None, err.to_string())
            }
        };

        self.state.send_replace(state.clone());
        state
    }

    /// Apply one provider notification. Later notifications always win.
    pub async fn handle_event(&self, event: AuthEvent) {
        if !self.is_alive() {
            tracing::debug!(?event, "monitor shut down, dropping event");
            return;
        }

        self.begin_processing();

        let state = match event {
            AuthEvent::SignedOut => {
                tracing::info!("signed out, clearing cached state");
                self.cache.reset_all();
                self.storage.clear();
                SessionState::unauthenticated()
            }
            AuthEvent::SignedIn(session) => {
                // Identity changed: the only trigger that forces a full
                // cache reset.
                tracing::info!(subject = %session.subject, "signed in");
                self.cache.reset_all();
                SessionState::authenticated(session)
            }
            AuthEvent::TokenRefreshed(session) => {
                // Same identity, fresh token: no cache reset.
                tracing::debug!(subject = %session.subject, "token refreshed");
                SessionState::authenticated(session)
            }
            AuthEvent::UserUpdated => match self.provider.current_session().await {
                Ok(Some(session)) => SessionState::authenticated(session),
                Ok(None) => SessionState::unauthenticated(),
                Err(err) => {
                    let err = AuthError::SessionProbeFailed(err);
                    tracing::warn!(error = %err, "re-probe after user update failed");
                    let previous = self.state.borrow().session.clone();
                    SessionState::with_error(previous, err.to_string())
                }
            },
        };

        self.state.send_replace(state);
    }

    /// Consume the subscription until it closes or the monitor shuts down.
    pub async fn run(&self, mut subscription: EventSubscription) {
        while let Some(event) = subscription.recv().await {
            if !self.is_alive() {
                break;
            }
            self.handle_event(event).await;
        }
    }

    fn begin_processing(&self) {
        self.state.send_modify(|s| s.loading = true);
    }

    async fn probe(&self) -> Result<Option<Session>, ProviderError> {
        let Some(session) = self.provider.current_session().await? else {
            return Ok(None);
        };
        if !session.is_live(Utc::now()) {
            return Err(ProviderError::TokenExpired);
        }
        // The stored session can have been revoked server-side; re-check
        // before trusting it.
        self.provider.current_user().await?;
        Ok(Some(session))
    }

    async fn recover_auth_failure(&self) {
        self.cache.reset_all();
        self.storage.clear();
        if let Err(err) = self.provider.sign_out().await {
            tracing::warn!(error = %err, "sign-out during recovery failed");
        }
        self.notices
            .notify(Notice::error("Session expired", "Please sign in again"));
    }
}
