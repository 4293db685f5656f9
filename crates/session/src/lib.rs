//! `memberdesk-session` — session lifecycle, role resolution, login flow.
//!
//! The asynchronous heart of the authorization core. [`SessionMonitor`]
//! reconciles identity-provider notifications into one authoritative session
//! view; [`RoleResolver`] turns that identity into a [`PermissionSnapshot`];
//! [`LoginFlow`] runs the member-number sign-in/sign-up handshake; and
//! [`AuthRuntime`] wires the three together over the provider's event
//! subscription.
//!
//! [`PermissionSnapshot`]: memberdesk_auth::PermissionSnapshot

pub mod error;
pub mod hooks;
pub mod login;
pub mod monitor;
pub mod provider;
pub mod resolver;
pub mod runtime;

pub use error::{AuthError, LoginError};
pub use hooks::{
    InMemoryQueryCache, InMemoryStorage, LocalStorage, Notice, NoticeSeverity, NoticeSink,
    QueryCache, RecordingNotices, TracingNotices,
};
pub use login::{LoginFlow, LoginSuccess, RetryPolicy};
pub use monitor::{SessionMonitor, SessionState};
pub use provider::{AuthEvent, Credentials, EventSubscription, IdentityProvider, ProviderError, Session};
pub use resolver::RoleResolver;
pub use runtime::AuthRuntime;
