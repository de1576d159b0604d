//! Session state machine and role router.
//!
//! A [`Session`] follows the identity provider, loads the profile of whoever
//! is signed in, mounts the matching view and feeds live query snapshots
//! into its [`ViewModel`]. Everything runs on the task that calls
//! [`Session::next_update`]; there are no locks around view state.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeZone};
use field_view::{RenderedView, Slot, TimeRange, ViewMode, ViewModel};
use record_store::{
    Collection, CollectionDocument, DocumentStore, Fields, Role, StoreError, UserProfile,
};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::dispatcher::Actor;
use crate::error::SessionError;
use crate::identity::Identity;
use crate::subscriptions::{plan_for, LiveEvent, LiveQueries, LiveUpdate};

/// Where the session is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    SignedOut,
    /// Signed in without a profile; registration is next.
    NeedsProfile(Identity),
    /// The store refused the profile or a live query. Nothing is open.
    PermissionDenied { identity: Identity, reason: String },
    /// The profile could not be loaded for a network-class reason.
    Unavailable { identity: Identity, reason: String },
    Active {
        identity: Identity,
        profile: UserProfile,
        view: ViewMode,
    },
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::SignedOut => None,
            SessionState::NeedsProfile(identity)
            | SessionState::PermissionDenied { identity, .. }
            | SessionState::Unavailable { identity, .. }
            | SessionState::Active { identity, .. } => Some(identity),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active { .. })
    }
}

/// What processing one event did.
#[derive(Debug)]
pub enum SessionUpdate {
    /// The session state changed; see [`Session::state`].
    Routed,
    /// A slot took a newer snapshot; re-render.
    ViewChanged(Slot),
    /// The event belonged to a torn-down query or held nothing new.
    Stale,
    /// A snapshot failed to decode; the slot kept its previous data.
    Rejected { slot: Slot, error: StoreError },
    /// A live query reported a network-class failure and keeps retrying.
    Transient { slot: Slot, error: StoreError },
    /// The store closed a live query.
    Ended(Slot),
}

enum Wake {
    Identity(Option<Identity>),
    IdentityClosed,
    Live(LiveEvent),
}

/// One signed-in client: identity, profile, open queries and view state.
pub struct Session {
    store: Arc<dyn DocumentStore>,
    config: SyncConfig,
    clock: Arc<dyn Clock>,
    identity_rx: watch::Receiver<Option<Identity>>,
    identity_open: bool,
    state: SessionState,
    live: LiveQueries,
    model: ViewModel,
}

impl Session {
    /// Create a signed-out session.
    ///
    /// Call [`start`](Self::start) to route whatever identity `identity_rx`
    /// already holds.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity_rx: watch::Receiver<Option<Identity>>,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            live: LiveQueries::new(Arc::clone(&store)),
            store,
            config,
            clock,
            identity_rx,
            identity_open: true,
            state: SessionState::SignedOut,
            model: ViewModel::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn model(&self) -> &ViewModel {
        &self.model
    }

    /// Filter selections live in the model; changing them needs no store
    /// round trip.
    pub fn model_mut(&mut self) -> &mut ViewModel {
        &mut self.model
    }

    /// Open live query count.
    pub fn open_queries(&self) -> usize {
        self.live.len()
    }

    /// The acting identity and profile, when active.
    pub fn actor(&self) -> Option<Actor> {
        match &self.state {
            SessionState::Active {
                identity, profile, ..
            } => Some(Actor {
                identity: identity.clone(),
                profile: profile.clone(),
            }),
            _ => None,
        }
    }

    /// Route the identity currently held by the provider.
    pub async fn start(&mut self) -> SessionUpdate {
        let identity = self.identity_rx.borrow_and_update().clone();
        self.on_identity(identity).await
    }

    /// Handle a sign-in, sign-out or identity switch.
    pub async fn on_identity(&mut self, identity: Option<Identity>) -> SessionUpdate {
        self.live.teardown();
        self.model = ViewModel::default();
        match identity {
            None => {
                info!("Session signed out");
                self.state = SessionState::SignedOut;
            }
            Some(identity) => self.route(identity).await,
        }
        SessionUpdate::Routed
    }

    /// Re-run routing for the current identity, after a permission or
    /// network failure or after registration.
    pub async fn retry(&mut self) -> SessionUpdate {
        let identity = self.state.identity().cloned();
        self.on_identity(identity).await
    }

    /// Mount another view. Only supervisors can mount the supervisor view.
    pub async fn switch_view(&mut self, view: ViewMode) -> Result<SessionUpdate, SessionError> {
        let (identity, profile) = match &self.state {
            SessionState::Active {
                identity, profile, ..
            } => (identity.clone(), profile.clone()),
            _ => return Err(SessionError::NotActive),
        };
        if view == ViewMode::Supervisor && !profile.is_supervisor() {
            return Err(SessionError::NotSupervisor(profile.uid));
        }

        self.live.teardown();
        self.activate(identity, profile, view).await;
        Ok(SessionUpdate::Routed)
    }

    /// Wait for the next identity change or live query event and process it.
    ///
    /// Returns `None` once the identity provider is gone and no query is
    /// open.
    pub async fn next_update(&mut self) -> Option<SessionUpdate> {
        let wake = {
            let live_open = !self.live.is_empty();
            tokio::select! {
                changed = self.identity_rx.changed(), if self.identity_open => match changed {
                    Ok(()) => Wake::Identity(self.identity_rx.borrow_and_update().clone()),
                    Err(_) => Wake::IdentityClosed,
                },
                Some(event) = self.live.next_event(), if live_open => Wake::Live(event),
                else => return None,
            }
        };

        Some(match wake {
            Wake::Identity(identity) => self.on_identity(identity).await,
            Wake::IdentityClosed => {
                debug!("Identity provider closed");
                self.identity_open = false;
                SessionUpdate::Stale
            }
            Wake::Live(event) => self.handle_event(event),
        })
    }

    /// Apply one live query event.
    pub fn handle_event(&mut self, event: LiveEvent) -> SessionUpdate {
        if !self.live.is_current(&event) {
            debug!(slot = %event.slot, generation = event.generation, "Dropping stale event");
            return SessionUpdate::Stale;
        }

        let slot = event.slot;
        match event.update {
            LiveUpdate::Snapshot(snapshot) => match self.model.apply(slot, &snapshot) {
                Ok(true) => {
                    debug!(%slot, sequence = snapshot.sequence, docs = snapshot.docs.len(), "View updated");
                    SessionUpdate::ViewChanged(slot)
                }
                Ok(false) => SessionUpdate::Stale,
                Err(error) => SessionUpdate::Rejected { slot, error },
            },
            LiveUpdate::Failed(err) if err.is_permission_denied() => {
                error!(%slot, error = %err, "Live query denied");
                self.deny(err.to_string());
                SessionUpdate::Routed
            }
            LiveUpdate::Failed(error) => {
                warn!(%slot, error = %error, "Live query failed");
                SessionUpdate::Transient { slot, error }
            }
            LiveUpdate::Ended => SessionUpdate::Ended(slot),
        }
    }

    /// Render the mounted view at the clock's current local time.
    pub fn render(&self) -> Option<RenderedView> {
        self.render_at(&self.clock.now().with_timezone(&Local))
    }

    /// Render the mounted view at `now`.
    pub fn render_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<RenderedView> {
        match self.state {
            SessionState::Active { .. } => Some(self.model.render(now)),
            _ => None,
        }
    }

    fn deny(&mut self, reason: String) {
        self.live.teardown();
        self.model = ViewModel::default();
        if let Some(identity) = self.state.identity().cloned() {
            self.state = SessionState::PermissionDenied { identity, reason };
        }
    }

    async fn route(&mut self, identity: Identity) {
        let raw = match self.store.get(Collection::Users, &identity.uid).await {
            Ok(raw) => raw,
            Err(err) if err.is_permission_denied() => {
                error!(uid = %identity.uid, error = %err, "Profile read denied");
                self.state = SessionState::PermissionDenied {
                    identity,
                    reason: err.to_string(),
                };
                return;
            }
            Err(err) => {
                warn!(uid = %identity.uid, error = %err, "Profile unavailable");
                self.state = SessionState::Unavailable {
                    identity,
                    reason: err.to_string(),
                };
                return;
            }
        };

        let raw = match raw {
            Some(raw) => raw,
            None => {
                info!(uid = %identity.uid, "No profile, registration required");
                self.state = SessionState::NeedsProfile(identity);
                return;
            }
        };

        let profile = match UserProfile::decode(&raw) {
            Ok(profile) => profile,
            Err(err) => {
                warn!(uid = %identity.uid, error = %err, "Profile unreadable");
                self.state = SessionState::Unavailable {
                    identity,
                    reason: err.to_string(),
                };
                return;
            }
        };

        if !raw.fields.contains_key("role") {
            self.backfill_role(&profile.uid).await;
        }

        let view = if profile.is_supervisor() {
            ViewMode::Supervisor
        } else {
            ViewMode::Field
        };
        self.activate(identity, profile, view).await;
    }

    /// Legacy profiles have no role. They read as agents; persisting the
    /// default is best effort.
    async fn backfill_role(&self, uid: &str) {
        let mut fields = Fields::new();
        fields.insert("role".to_string(), Value::String(Role::Dsr.as_str().to_string()));
        match self.store.update(Collection::Users, uid, fields).await {
            Ok(()) => info!(uid = %uid, "Backfilled profile role"),
            Err(err) => warn!(uid = %uid, error = %err, "Role backfill failed"),
        }
    }

    async fn activate(&mut self, identity: Identity, profile: UserProfile, view: ViewMode) {
        let mut model = ViewModel::new(view);
        if view == ViewMode::Supervisor {
            model.set_range(TimeRange::Month);
        }
        self.model = model;

        let plan = plan_for(&profile, view, &self.config);
        let opened = self.live.apply_plan(&plan).await;
        for slot in &opened {
            self.model.reset(*slot);
        }
        info!(
            uid = %identity.uid,
            role = %profile.role,
            team = %profile.team,
            view = ?view,
            queries = opened.len(),
            "Session active"
        );
        self.state = SessionState::Active {
            identity,
            profile,
            view,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use record_store::{InstallationRecord, JobStatus, MemoryStore};
    use serde_json::json;

    fn body(value: serde_json::Value) -> Fields {
        value.as_object().cloned().unwrap_or_default()
    }

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
        }
    }

    fn session(store: Arc<MemoryStore>) -> (watch::Sender<Option<Identity>>, Session) {
        let (tx, rx) = watch::channel(None);
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 16, 9, 0, 0).unwrap()));
        let session = Session::new(store, rx, SyncConfig::default(), clock);
        (tx, session)
    }

    #[tokio::test]
    async fn test_missing_profile_needs_registration() {
        let store = Arc::new(MemoryStore::new());
        let (_tx, mut session) = session(store);

        session.on_identity(Some(identity("u1"))).await;
        assert_eq!(session.state(), &SessionState::NeedsProfile(identity("u1")));
        assert!(session.render().is_none());
        assert_eq!(session.open_queries(), 0);
    }

    #[tokio::test]
    async fn test_legacy_profile_is_backfilled() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                Collection::Users,
                "u1",
                body(json!({"displayName": "Old Agent", "team": "Julia"})),
            )
            .await
            .unwrap();
        let (_tx, mut session) = session(store.clone());

        session.on_identity(Some(identity("u1"))).await;
        match session.state() {
            SessionState::Active { profile, view, .. } => {
                assert_eq!(profile.role, Role::Dsr);
                assert_eq!(*view, ViewMode::Field);
            }
            other => panic!("unexpected {:?}", other),
        }

        let stored = store.get(Collection::Users, "u1").await.unwrap().unwrap();
        assert_eq!(stored.fields["role"], json!("dsr"));
    }

    #[tokio::test]
    async fn test_supervisor_routing_and_switch() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                Collection::Users,
                "s1",
                body(json!({"displayName": "Sup", "team": "Julia", "role": "supervisor"})),
            )
            .await
            .unwrap();
        let (_tx, mut session) = session(store);

        session.on_identity(Some(identity("s1"))).await;
        assert!(matches!(
            session.state(),
            SessionState::Active { view: ViewMode::Supervisor, .. }
        ));
        assert_eq!(session.model().filters().range, TimeRange::Month);
        assert_eq!(session.open_queries(), 4);

        session.switch_view(ViewMode::Field).await.unwrap();
        assert!(matches!(
            session.state(),
            SessionState::Active { view: ViewMode::Field, .. }
        ));
        assert_eq!(session.open_queries(), 5);
    }

    #[tokio::test]
    async fn test_supervisor_month_follows_clock() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                Collection::Users,
                "s1",
                body(json!({"displayName": "Sup", "team": "Julia", "role": "supervisor"})),
            )
            .await
            .unwrap();
        let leads = [
            ("May lead", Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()),
            ("April lead", Utc.with_ymd_and_hms(2024, 4, 20, 12, 0, 0).unwrap()),
        ];
        for (name, when) in leads {
            let record = InstallationRecord {
                name: name.to_string(),
                contact: "0712345678".to_string(),
                job_status: JobStatus::Pending,
                created_by_uid: "u1".to_string(),
                team: "Julia".to_string(),
                created_at: when,
                updated_at: when,
                ..Default::default()
            };
            store
                .add(Collection::Installations, record.to_fields().unwrap())
                .await
                .unwrap();
        }
        let (_tx, mut session) = session(store);
        session.on_identity(Some(identity("s1"))).await;
        while let Ok(Some(_)) =
            tokio::time::timeout(std::time::Duration::from_millis(50), session.next_update()).await
        {}

        let now = Utc.with_ymd_and_hms(2024, 5, 16, 9, 0, 0).unwrap();
        match session.render_at(&now) {
            Some(RenderedView::Supervisor(view)) => {
                let names: Vec<&str> = view.records.iter().map(|r| r.name.as_str()).collect();
                assert_eq!(names, vec!["May lead"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_agent_cannot_mount_supervisor_view() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                Collection::Users,
                "u1",
                body(json!({"displayName": "Agent", "team": "Julia", "role": "dsr"})),
            )
            .await
            .unwrap();
        let (_tx, mut session) = session(store);
        session.on_identity(Some(identity("u1"))).await;

        assert!(matches!(
            session.switch_view(ViewMode::Supervisor).await,
            Err(SessionError::NotSupervisor(_))
        ));
        assert_eq!(session.open_queries(), 5);
    }

    #[tokio::test]
    async fn test_profile_denied_then_retry() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                Collection::Users,
                "u1",
                body(json!({"displayName": "Agent", "team": "Julia", "role": "dsr"})),
            )
            .await
            .unwrap();
        store.deny(Collection::Users).await;
        let (_tx, mut session) = session(store.clone());

        session.on_identity(Some(identity("u1"))).await;
        assert!(matches!(session.state(), SessionState::PermissionDenied { .. }));

        store.allow(Collection::Users).await;
        session.retry().await;
        assert!(session.state().is_active());
    }
}
