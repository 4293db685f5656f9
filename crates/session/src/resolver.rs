//! Role resolution: identity → permission snapshot.

use std::sync::Arc;

use memberdesk_auth::{PermissionSnapshot, PermissionStore};
use memberdesk_members::MemberDirectory;

use crate::error::AuthError;
use crate::hooks::{Notice, NoticeSink};
use crate::provider::IdentityProvider;

/// Fetches role assignments for the current identity and replaces the
/// [`PermissionStore`] snapshot wholesale.
///
/// Resolution never retries on its own; the retry budget belongs to the
/// login flow, not to routine role polling. Failures are fail-closed: the
/// store ends up with an error-bearing deny-all snapshot, never with a stale
/// grant.
pub struct RoleResolver {
    provider: Arc<dyn IdentityProvider>,
    directory: Arc<dyn MemberDirectory>,
    store: PermissionStore,
    notices: Arc<dyn NoticeSink>,
}

impl RoleResolver {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        directory: Arc<dyn MemberDirectory>,
        store: PermissionStore,
        notices: Arc<dyn NoticeSink>,
    ) -> Self {
        Self {
            provider,
            directory,
            store,
            notices,
        }
    }

    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    /// Resolve the current identity into a fresh snapshot.
    ///
    /// No authenticated subject is not an error: it resolves to the deny-all
    /// unauthenticated snapshot.
    pub async fn resolve(&self) -> Result<(), AuthError> {
        self.store.replace(PermissionSnapshot::loading());

        let session = match self.provider.current_session().await {
            Ok(session) => session,
            Err(err) => {
                let err = AuthError::SessionProbeFailed(err);
                tracing::warn!(error = %err, "role resolution could not read the session");
                self.store.replace(PermissionSnapshot::failed(err.to_string()));
                return Err(err);
            }
        };

        let Some(session) = session else {
            tracing::debug!("no authenticated subject, resolving to empty role set");
            self.store.replace(PermissionSnapshot::unauthenticated());
            return Ok(());
        };

        match self.directory.roles_for(session.subject).await {
            Ok(assignments) => {
                let roles: Vec<_> = assignments.iter().map(|a| a.role).collect();
                tracing::info!(subject = %session.subject, ?roles, "roles resolved");
                self.store.replace(PermissionSnapshot::resolved(roles));
                Ok(())
            }
            Err(err) => {
                tracing::error!(subject = %session.subject, error = %err, "role fetch failed");
                self.store.replace(PermissionSnapshot::failed(err.to_string()));
                self.notices
                    .notify(Notice::error("Error fetching roles", err.to_string()));
                Err(AuthError::RoleFetchFailed(err))
            }
        }
    }

    /// Force a re-resolution, e.g. after an administrator changed a
    /// subject's role assignments.
    pub async fn invalidate(&self) -> Result<(), AuthError> {
        tracing::debug!("explicit role invalidation requested");
        self.resolve().await
    }
}
