//! Composition of the authorization core.
//!
//! Data flow: login establishes a session → the monitor observes the
//! provider event → the resolver repopulates the permission store → the
//! access gate evaluates navigation against it. `AuthRuntime` owns the
//! middle of that chain.

use std::sync::Arc;

use memberdesk_auth::PermissionStore;

use crate::monitor::SessionMonitor;
use crate::provider::{AuthEvent, EventSubscription};
use crate::resolver::RoleResolver;

/// Owns the session monitor and role resolver and drives them from the
/// provider's event subscription.
pub struct AuthRuntime {
    monitor: Arc<SessionMonitor>,
    resolver: Arc<RoleResolver>,
    store: PermissionStore,
}

impl AuthRuntime {
    pub fn new(
        monitor: Arc<SessionMonitor>,
        resolver: Arc<RoleResolver>,
        store: PermissionStore,
    ) -> Self {
        Self {
            monitor,
            resolver,
            store,
        }
    }

    pub fn monitor(&self) -> &Arc<SessionMonitor> {
        &self.monitor
    }

    pub fn resolver(&self) -> &Arc<RoleResolver> {
        &self.resolver
    }

    pub fn store(&self) -> &PermissionStore {
        &self.store
    }

    /// Initial probe; resolves roles if a session already exists.
    pub async fn start(&self) {
        let state = self.monitor.initialize().await;
        if state.is_authenticated() {
            if let Err(err) = self.resolver.resolve().await {
                tracing::warn!(error = %err, "initial role resolution failed");
            }
        }
    }

    /// Consume provider events until the stream closes or the monitor shuts
    /// down. Roles re-resolve on every identity change; sign-out empties the
    /// permission snapshot.
    pub async fn run(&self, mut subscription: EventSubscription) {
        while let Some(event) = subscription.recv().await {
            if !self.monitor.is_alive() {
                break;
            }

            let identity_changed = matches!(event, AuthEvent::SignedIn(_));
            let signed_out = matches!(event, AuthEvent::SignedOut);

            self.monitor.handle_event(event).await;

            if identity_changed {
                if let Err(err) = self.resolver.resolve().await {
                    tracing::warn!(error = %err, "role resolution after sign-in failed");
                }
            } else if signed_out {
                self.store.clear();
            }
        }
    }

    /// Spawn `start` + `run` as a background task.
    pub fn spawn(self: Arc<Self>, subscription: EventSubscription) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.start().await;
            self.run(subscription).await;
        })
    }

    /// Stop applying events; in-flight results are dropped.
    pub fn shutdown(&self) {
        self.monitor.shutdown();
    }
}
