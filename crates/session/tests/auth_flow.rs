//! End-to-end tests for the authorization core, against scripted in-memory
//! implementations of the identity provider and member directory.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;

use memberdesk_auth::{can_access, PermissionStore, Role, RoleAssignment, Tab};
use memberdesk_core::{MemberId, MemberNumber, SubjectId};
use memberdesk_members::{DirectoryError, Member, MemberDirectory};
use memberdesk_session::{
    AuthEvent, AuthRuntime, Credentials, EventSubscription, IdentityProvider, InMemoryQueryCache,
    InMemoryStorage, LoginError, LoginFlow, NoticeSeverity, ProviderError, RecordingNotices,
    RetryPolicy, RoleResolver, Session, SessionMonitor,
};

fn init_tracing() {
    memberdesk_observability::init();
}

// ─────────────────────────────────────────────────────────────────────────────
// Scripted fakes
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeProvider {
    /// email → (password, subject)
    accounts: Mutex<HashMap<String, (String, SubjectId)>>,
    stored_session: Mutex<Option<Session>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AuthEvent>>>,
    /// When set, sign-in always fails with this error.
    sign_in_failure: Mutex<Option<ProviderError>>,
    sign_in_calls: AtomicUsize,
    sign_up_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl FakeProvider {
    fn new() -> Self {
        Self::default()
    }

    fn with_account(self, number: &MemberNumber, subject: SubjectId) -> Self {
        let creds = Credentials::for_member(number);
        self.accounts
            .lock()
            .unwrap()
            .insert(creds.email, (creds.password, subject));
        self
    }

    fn session_for(subject: SubjectId) -> Session {
        Session {
            subject,
            access_token: format!("tok-{subject}"),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        }
    }

    fn set_session(&self, session: Option<Session>) {
        *self.stored_session.lock().unwrap() = session;
    }

    fn fail_sign_in_with(&self, err: ProviderError) {
        *self.sign_in_failure.lock().unwrap() = Some(err);
    }

    fn emit(&self, event: AuthEvent) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Close every subscription so `run` loops drain and return.
    fn close_subscriptions(&self) {
        self.subscribers.lock().unwrap().clear();
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        Ok(self.stored_session.lock().unwrap().clone())
    }

    async fn current_user(&self) -> Result<SubjectId, ProviderError> {
        self.stored_session
            .lock()
            .unwrap()
            .as_ref()
            .map(|s| s.subject)
            .ok_or(ProviderError::SessionNotFound)
    }

    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.sign_in_failure.lock().unwrap().clone() {
            return Err(err);
        }
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(&credentials.email) {
            Some((password, subject)) if *password == credentials.password => {
                let session = Self::session_for(*subject);
                *self.stored_session.lock().unwrap() = Some(session.clone());
                Ok(session)
            }
            _ => Err(ProviderError::InvalidCredentials),
        }
    }

    async fn sign_up_with_password(
        &self,
        credentials: &Credentials,
        _member_number: &MemberNumber,
    ) -> Result<Session, ProviderError> {
        self.sign_up_calls.fetch_add(1, Ordering::SeqCst);
        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(&credentials.email) {
            return Err(ProviderError::Rejected("already registered".into()));
        }
        let subject = SubjectId::new();
        accounts.insert(
            credentials.email.clone(),
            (credentials.password.clone(), subject),
        );
        let session = Self::session_for(subject);
        *self.stored_session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.stored_session.lock().unwrap() = None;
        Ok(())
    }

    fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().unwrap().push(tx);
        EventSubscription::new(rx)
    }
}

#[derive(Default)]
struct FakeDirectory {
    members: Mutex<Vec<Member>>,
    roles: Mutex<HashMap<SubjectId, Vec<Role>>>,
    roles_failure: Mutex<Option<DirectoryError>>,
    link_calls: AtomicUsize,
}

impl FakeDirectory {
    fn new() -> Self {
        Self::default()
    }

    fn with_member(self, member: Member) -> Self {
        self.members.lock().unwrap().push(member);
        self
    }

    fn with_roles(self, subject: SubjectId, roles: Vec<Role>) -> Self {
        self.roles.lock().unwrap().insert(subject, roles);
        self
    }

    fn grant(&self, subject: SubjectId, roles: Vec<Role>) {
        self.roles.lock().unwrap().insert(subject, roles);
    }

    fn fail_roles_with(&self, err: DirectoryError) {
        *self.roles_failure.lock().unwrap() = Some(err);
    }

    fn member(&self, id: MemberId) -> Option<Member> {
        self.members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    fn links(&self) -> usize {
        self.link_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MemberDirectory for FakeDirectory {
    async fn find_by_number(
        &self,
        number: &MemberNumber,
    ) -> Result<Option<Member>, DirectoryError> {
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.member_number == *number)
            .cloned())
    }

    async fn find_by_number_fuzzy(
        &self,
        number: &MemberNumber,
    ) -> Result<Option<Member>, DirectoryError> {
        let needle = number.as_str().to_uppercase();
        Ok(self
            .members
            .lock()
            .unwrap()
            .iter()
            .find(|m| m.member_number.as_str().contains(&needle))
            .cloned())
    }

    async fn link_auth_user(
        &self,
        member: MemberId,
        subject: SubjectId,
    ) -> Result<(), DirectoryError> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        let mut members = self.members.lock().unwrap();
        let record = members
            .iter_mut()
            .find(|m| m.id == member)
            .ok_or_else(|| DirectoryError::backend("no such member"))?;
        record
            .link_auth_user(subject)
            .map_err(|e| DirectoryError::Conflict(e.to_string()))
    }

    async fn roles_for(&self, subject: SubjectId) -> Result<Vec<RoleAssignment>, DirectoryError> {
        if let Some(err) = self.roles_failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .roles
            .lock()
            .unwrap()
            .get(&subject)
            .map(|roles| {
                roles
                    .iter()
                    .map(|role| RoleAssignment {
                        subject,
                        role: *role,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Harness
// ─────────────────────────────────────────────────────────────────────────────

struct Harness {
    provider: Arc<FakeProvider>,
    directory: Arc<FakeDirectory>,
    cache: Arc<InMemoryQueryCache>,
    storage: Arc<InMemoryStorage>,
    notices: Arc<RecordingNotices>,
}

impl Harness {
    fn new(provider: FakeProvider, directory: FakeDirectory) -> Self {
        Self {
            provider: Arc::new(provider),
            directory: Arc::new(directory),
            cache: Arc::new(InMemoryQueryCache::new()),
            storage: Arc::new(InMemoryStorage::new()),
            notices: Arc::new(RecordingNotices::new()),
        }
    }

    fn login_flow(&self) -> LoginFlow {
        // Zero backoff keeps retry tests instant.
        let policy = RetryPolicy::new(NonZeroU32::new(3).unwrap(), Duration::ZERO);
        LoginFlow::with_policy(
            self.provider.clone(),
            self.directory.clone(),
            self.cache.clone(),
            self.notices.clone(),
            policy,
        )
    }

    fn runtime(&self) -> (AuthRuntime, PermissionStore) {
        let store = PermissionStore::new();
        let monitor = Arc::new(SessionMonitor::new(
            self.provider.clone(),
            self.cache.clone(),
            self.storage.clone(),
            self.notices.clone(),
        ));
        let resolver = Arc::new(RoleResolver::new(
            self.provider.clone(),
            self.directory.clone(),
            store.clone(),
            self.notices.clone(),
        ));
        (AuthRuntime::new(monitor, resolver, store.clone()), store)
    }
}

fn member(number: &str) -> Member {
    Member::new(MemberId::new(), MemberNumber::parse(number).unwrap())
}

// ─────────────────────────────────────────────────────────────────────────────
// Login flow
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn first_login_provisions_identity_and_links_member_once() {
    init_tracing();
    let record = member("A1234");
    let member_id = record.id;
    let harness = Harness::new(FakeProvider::new(), FakeDirectory::new().with_member(record));
    let flow = harness.login_flow();

    let success = flow.login("A1234").await.unwrap();
    assert!(success.provisioned);
    assert_eq!(success.member_id, member_id);

    // Sign-in was attempted first, failed with invalid credentials, then
    // sign-up provisioned the identity and linked it back exactly once.
    assert_eq!(harness.provider.sign_in_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.provider.sign_up_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.directory.links(), 1);

    let linked = harness.directory.member(member_id).unwrap();
    assert_eq!(linked.auth_user_id, Some(success.session.subject));

    // Fresh identity: the query cache was reset.
    assert!(harness.cache.resets() >= 1);

    // Second login for the same member signs in only; no further link update.
    let again = flow.login(" a1234 ").await.unwrap();
    assert!(!again.provisioned);
    assert_eq!(again.session.subject, success.session.subject);
    assert_eq!(harness.provider.sign_up_calls.load(Ordering::SeqCst), 1);
    assert_eq!(harness.directory.links(), 1);
}

#[tokio::test]
async fn login_normalizes_input_before_lookup() {
    let record = member("A1234");
    let subject = SubjectId::new();
    let mut linked = record.clone();
    linked.link_auth_user(subject).unwrap();

    let harness = Harness::new(
        FakeProvider::new().with_account(&linked.member_number, subject),
        FakeDirectory::new().with_member(linked),
    );

    let success = harness.login_flow().login(" a1234 ").await.unwrap();
    assert_eq!(success.session.subject, subject);
    // Already linked: no link-back call at all.
    assert_eq!(harness.directory.links(), 0);
}

#[tokio::test]
async fn fuzzy_lookup_is_used_when_exact_match_misses() {
    let record = member("TMA1234X");
    let member_id = record.id;
    let harness = Harness::new(FakeProvider::new(), FakeDirectory::new().with_member(record));

    let success = harness.login_flow().login("a1234").await.unwrap();
    assert_eq!(success.member_id, member_id);
}

#[tokio::test]
async fn unknown_member_exhausts_retries_and_ends_signed_out() {
    let harness = Harness::new(FakeProvider::new(), FakeDirectory::new());
    let flow = harness.login_flow();

    let err = flow.login("Z9999").await.unwrap_err();
    let LoginError::ExhaustedRetries { attempts, last } = err else {
        panic!("expected ExhaustedRetries, got {err:?}");
    };
    assert_eq!(attempts, 3);
    assert!(matches!(*last, LoginError::MemberNotFound(ref n) if n == "Z9999"));

    // Clean signed-out state: the pre-login clear plus the terminal cleanup.
    assert!(harness.provider.sign_out_calls.load(Ordering::SeqCst) >= 2);
    assert_eq!(
        harness.provider.current_session().await.unwrap(),
        None,
        "terminal failure must not leave a session behind"
    );

    // Exactly one terminal error notice reached the user.
    let errors: Vec<_> = harness
        .notices
        .drain()
        .into_iter()
        .filter(|n| n.severity == NoticeSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Login failed");
}

#[tokio::test]
async fn provider_rejection_is_a_credential_conflict_not_a_signup() {
    let record = member("A1234");
    let provider = FakeProvider::new();
    provider.fail_sign_in_with(ProviderError::Rejected("server error".into()));
    let harness = Harness::new(provider, FakeDirectory::new().with_member(record));

    let err = harness.login_flow().login("A1234").await.unwrap_err();
    let LoginError::ExhaustedRetries { last, .. } = err else {
        panic!("expected ExhaustedRetries, got {err:?}");
    };
    assert!(matches!(*last, LoginError::CredentialConflict(_)));
    // Rejections other than invalid-credentials never fall through to
    // sign-up.
    assert_eq!(harness.provider.sign_up_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_member_number_is_rejected_before_any_call() {
    let harness = Harness::new(FakeProvider::new(), FakeDirectory::new());

    let err = harness.login_flow().login("   ").await.unwrap_err();
    assert!(matches!(err, LoginError::InvalidMemberNumber(_)));
    assert_eq!(harness.provider.sign_in_calls.load(Ordering::SeqCst), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime: monitor + resolver + store
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn signed_in_event_resolves_roles_into_the_store() {
    init_tracing();
    let subject = SubjectId::new();
    let harness = Harness::new(
        FakeProvider::new(),
        FakeDirectory::new().with_roles(subject, vec![Role::Member, Role::Admin]),
    );
    let (runtime, store) = harness.runtime();

    let subscription = harness.provider.subscribe();
    let session = FakeProvider::session_for(subject);
    harness.provider.set_session(Some(session.clone()));
    harness.provider.emit(AuthEvent::SignedIn(session));
    harness.provider.close_subscriptions();

    runtime.run(subscription).await;

    let snapshot = store.load();
    assert_eq!(snapshot.primary_role, Some(Role::Admin));
    assert!(can_access(snapshot.primary_role, Tab::System));
    assert!(!snapshot.is_loading);
    assert!(snapshot.last_error.is_none());
}

#[tokio::test]
async fn signed_out_event_empties_the_snapshot_and_local_state() {
    let subject = SubjectId::new();
    let harness = Harness::new(
        FakeProvider::new(),
        FakeDirectory::new().with_roles(subject, vec![Role::Admin]),
    );
    let (runtime, store) = harness.runtime();

    let subscription = harness.provider.subscribe();
    let session = FakeProvider::session_for(subject);
    harness.provider.set_session(Some(session.clone()));
    harness.provider.emit(AuthEvent::SignedIn(session));
    harness.provider.emit(AuthEvent::SignedOut);
    harness.provider.close_subscriptions();

    runtime.run(subscription).await;

    let snapshot = store.load();
    assert_eq!(snapshot.primary_role, None);
    assert!(snapshot.roles.is_empty());
    assert!(!can_access(snapshot.primary_role, Tab::Dashboard));
    assert_eq!(harness.storage.clears(), 1);
    assert!(!runtime.monitor().state().is_authenticated());
}

#[tokio::test]
async fn start_resolves_roles_for_an_existing_session() {
    let subject = SubjectId::new();
    let harness = Harness::new(
        FakeProvider::new(),
        FakeDirectory::new().with_roles(subject, vec![Role::Collector]),
    );
    let (runtime, store) = harness.runtime();
    harness
        .provider
        .set_session(Some(FakeProvider::session_for(subject)));

    runtime.start().await;

    let snapshot = store.load();
    assert_eq!(snapshot.primary_role, Some(Role::Collector));
    assert!(can_access(snapshot.primary_role, Tab::Users));
    assert!(!can_access(snapshot.primary_role, Tab::Audit));
}

#[tokio::test]
async fn role_fetch_failure_fails_closed() {
    let subject = SubjectId::new();
    let directory = FakeDirectory::new();
    directory.grant(subject, vec![Role::Admin]);
    directory.fail_roles_with(DirectoryError::backend("permission denied by policy"));
    let harness = Harness::new(FakeProvider::new(), directory);
    let (runtime, store) = harness.runtime();
    harness
        .provider
        .set_session(Some(FakeProvider::session_for(subject)));

    runtime.start().await;

    let snapshot = store.load();
    assert_eq!(snapshot.primary_role, None, "fail closed, never fail open");
    assert!(snapshot.roles.is_empty());
    assert!(snapshot.last_error.is_some());
    assert!(!snapshot.is_loading);

    let errors: Vec<_> = harness
        .notices
        .drain()
        .into_iter()
        .filter(|n| n.severity == NoticeSeverity::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].title, "Error fetching roles");
}

#[tokio::test]
async fn explicit_invalidation_picks_up_changed_roles() {
    let subject = SubjectId::new();
    let harness = Harness::new(
        FakeProvider::new(),
        FakeDirectory::new().with_roles(subject, vec![Role::Member]),
    );
    let (runtime, store) = harness.runtime();
    harness
        .provider
        .set_session(Some(FakeProvider::session_for(subject)));

    runtime.start().await;
    assert_eq!(store.load().primary_role, Some(Role::Member));

    // An administrator promotes the subject; the UI requests invalidation.
    harness
        .directory
        .grant(subject, vec![Role::Member, Role::Collector]);
    runtime.resolver().invalidate().await.unwrap();

    let snapshot = store.load();
    assert_eq!(snapshot.primary_role, Some(Role::Collector));
    assert!(snapshot.permissions.can_collect_payments);
}

#[tokio::test]
async fn shutdown_drops_in_flight_events() {
    let harness = Harness::new(FakeProvider::new(), FakeDirectory::new());
    let (runtime, store) = harness.runtime();

    let subscription = harness.provider.subscribe();
    let session = FakeProvider::session_for(SubjectId::new());
    harness.provider.emit(AuthEvent::SignedIn(session));
    harness.provider.close_subscriptions();

    runtime.shutdown();
    runtime.run(subscription).await;

    assert!(!runtime.monitor().state().is_authenticated());
    assert_eq!(store.load().primary_role, None);
}
