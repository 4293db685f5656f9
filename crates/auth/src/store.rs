//! Process-wide permission snapshot store.

use std::sync::{Arc, RwLock};

use crate::snapshot::PermissionSnapshot;

/// Single source of truth for the latest [`PermissionSnapshot`].
///
/// The store owns the snapshot exclusively: consumers read it, but only the
/// role resolver replaces it, and always as a whole value. Replacing an
/// `Arc` under a short-lived lock means readers either see the complete old
/// snapshot or the complete new one, never a partial update.
///
/// Cheap to clone; clones share the same snapshot.
#[derive(Debug, Clone)]
pub struct PermissionStore {
    inner: Arc<RwLock<Arc<PermissionSnapshot>>>,
}

impl PermissionStore {
    /// Create a store holding the deny-all unauthenticated snapshot.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Arc::new(PermissionSnapshot::unauthenticated()))),
        }
    }

    /// Read the current snapshot.
    pub fn load(&self) -> Arc<PermissionSnapshot> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock means a writer panicked mid-swap; the stored
            // Arc itself is still a complete snapshot, so keep serving it.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the snapshot atomically (whole-value swap).
    pub fn replace(&self, snapshot: PermissionSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.inner.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Reset to the deny-all unauthenticated snapshot.
    pub fn clear(&self) {
        self.replace(PermissionSnapshot::unauthenticated());
    }
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self::new()
    }
}
