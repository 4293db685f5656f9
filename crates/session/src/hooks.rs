//! Client-side collaborator hooks: query cache, local storage, notices.
//!
//! These are the side-effect surfaces the session flows touch on identity
//! changes. The embedding application supplies real implementations; the
//! in-memory ones here are for tests/dev.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Cached query results keyed by the current identity.
///
/// The core only needs wholesale semantics: a full reset when identity
/// changes, an invalidation sweep after login.
pub trait QueryCache: Send + Sync {
    /// Drop all cached results (identity changed; nothing may survive).
    fn reset_all(&self);

    /// Mark everything stale for refetch without dropping it.
    fn invalidate_all(&self);
}

/// Persisted client-side key/value area, cleared on sign-out so stale
/// authorization data cannot bleed into a subsequent different identity.
pub trait LocalStorage: Send + Sync {
    fn clear(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeSeverity {
    Info,
    Error,
}

/// User-visible notice. Delivery (toast, banner, log line) is the embedding
/// application's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: NoticeSeverity,
    pub title: String,
    pub body: String,
}

impl Notice {
    pub fn info(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Info,
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn error(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity: NoticeSeverity::Error,
            title: title.into(),
            body: body.into(),
        }
    }
}

/// Sink for user-visible notices.
pub trait NoticeSink: Send + Sync {
    fn notify(&self, notice: Notice);
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory implementations (tests/dev)
// ─────────────────────────────────────────────────────────────────────────────

/// Counting cache: records how often each operation ran.
#[derive(Debug, Default)]
pub struct InMemoryQueryCache {
    resets: AtomicUsize,
    invalidations: AtomicUsize,
}

impl InMemoryQueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets(&self) -> usize {
        self.resets.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl QueryCache for InMemoryQueryCache {
    fn reset_all(&self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn invalidate_all(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counting storage area.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    clears: AtomicUsize,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

impl LocalStorage for InMemoryStorage {
    fn clear(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }
}

/// Notice sink that records everything it is handed.
#[derive(Debug, Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notice> {
        match self.notices.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl NoticeSink for RecordingNotices {
    fn notify(&self, notice: Notice) {
        if let Ok(mut guard) = self.notices.lock() {
            guard.push(notice);
        }
    }
}

/// Notice sink that forwards to the tracing pipeline (headless/dev use).
#[derive(Debug, Default)]
pub struct TracingNotices;

impl NoticeSink for TracingNotices {
    fn notify(&self, notice: Notice) {
        match notice.severity {
            NoticeSeverity::Info => tracing::info!(title = %notice.title, "{}", notice.body),
            NoticeSeverity::Error => tracing::warn!(title = %notice.title, "{}", notice.body),
        }
    }
}
