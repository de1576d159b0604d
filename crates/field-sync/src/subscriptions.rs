//! Live query planning and multiplexing.
//!
//! [`plan_for`] decides which queries a mounted view needs, one per [`Slot`].
//! [`LiveQueries`] owns the open subscriptions and merges them into a single
//! event stream keyed by slot. Every event carries the generation it was
//! opened under; [`LiveQueries::teardown`] drops every subscription and bumps
//! the generation, so nothing opened before the teardown is ever applied.

use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;

use field_view::{Slot, ViewMode};
use futures::stream::{self, Stream, StreamExt};
use record_store::{Collection, DocumentStore, Query, Snapshot, StoreError, UserProfile};
use tokio_stream::StreamMap;
use tracing::{debug, info};

use crate::config::SyncConfig;

/// Queries needed by one mounted view, keyed by slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Plan {
    queries: BTreeMap<Slot, Query>,
}

impl Plan {
    pub fn get(&self, slot: Slot) -> Option<&Query> {
        self.queries.get(&slot)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &Query)> {
        self.queries.iter().map(|(slot, query)| (*slot, query))
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn with(mut self, slot: Slot, query: Query) -> Self {
        self.queries.insert(slot, query);
        self
    }
}

fn inbox_query(uid: &str, config: &SyncConfig) -> Query {
    Query::new(Collection::Messages)
        .where_eq("recipientUid", uid)
        .where_eq("read", false)
        .limit(config.inbox_limit)
}

/// Build the query plan for `profile` viewing `mode`.
///
/// The field view is scoped to the profile's own records and notes, its
/// team's announcements and supervisor, and its unread inbox. The supervisor
/// view is scoped to the team, or to everything when the team is HQ.
pub fn plan_for(profile: &UserProfile, mode: ViewMode, config: &SyncConfig) -> Plan {
    let uid = profile.uid.as_str();
    let team = profile.team.as_str();

    match mode {
        ViewMode::Field => Plan::default()
            .with(
                Slot::Records,
                Query::new(Collection::Installations).where_eq("createdByUid", uid),
            )
            .with(
                Slot::Notes,
                Query::new(Collection::Notes).where_eq("createdByUid", uid),
            )
            .with(
                Slot::Announcements,
                Query::new(Collection::Announcements).where_eq("team", team),
            )
            .with(Slot::Inbox, inbox_query(uid, config))
            .with(
                Slot::SupervisorContact,
                Query::new(Collection::Users)
                    .where_eq("team", team)
                    .where_eq("role", "supervisor")
                    .limit(1),
            ),
        ViewMode::Supervisor => {
            let mut records = Query::new(Collection::Installations);
            let mut agents = Query::new(Collection::Users).where_eq("role", "dsr");
            let mut announcements = Query::new(Collection::Announcements);
            if !config.is_hq(team) {
                records = records.where_eq("Team", team);
                agents = agents.where_eq("team", team);
                announcements = announcements.where_eq("team", team);
            }
            Plan::default()
                .with(Slot::Records, records)
                .with(Slot::TeamAgents, agents)
                .with(Slot::Announcements, announcements)
                .with(Slot::Inbox, inbox_query(uid, config))
        }
    }
}

/// What a live query reported.
#[derive(Debug)]
pub enum LiveUpdate {
    /// A full result set superseding the previous one.
    Snapshot(Snapshot),
    /// The store refused or failed the query.
    Failed(StoreError),
    /// The store closed the subscription.
    Ended,
}

/// One event from a live query, tagged with the generation it belongs to.
#[derive(Debug)]
pub struct LiveEvent {
    pub slot: Slot,
    pub generation: u64,
    pub update: LiveUpdate,
}

type EventStream = Pin<Box<dyn Stream<Item = (u64, LiveUpdate)> + Send>>;

/// The set of open subscriptions for the mounted view.
pub struct LiveQueries {
    store: Arc<dyn DocumentStore>,
    streams: StreamMap<Slot, EventStream>,
    queries: BTreeMap<Slot, Query>,
    generation: u64,
}

impl LiveQueries {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            streams: StreamMap::new(),
            queries: BTreeMap::new(),
            generation: 0,
        }
    }

    /// Current generation. Events from older generations are stale.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Query currently open in `slot`.
    pub fn query(&self, slot: Slot) -> Option<&Query> {
        self.queries.get(&slot)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn is_current(&self, event: &LiveEvent) -> bool {
        event.generation == self.generation && self.queries.contains_key(&event.slot)
    }

    /// Bring the open subscriptions in line with `plan`.
    ///
    /// Slots whose query is unchanged stay open. A slot with a changed query
    /// is closed before its replacement opens. Returns the slots that were
    /// (re)opened and need their view state reset.
    pub async fn apply_plan(&mut self, plan: &Plan) -> Vec<Slot> {
        let obsolete: Vec<Slot> = self
            .queries
            .keys()
            .copied()
            .filter(|slot| plan.get(*slot).is_none())
            .collect();
        for slot in obsolete {
            self.close(slot);
        }

        let mut opened = Vec::new();
        for (slot, query) in plan.iter() {
            if self.queries.get(&slot) == Some(query) {
                continue;
            }
            self.close(slot);
            self.open(slot, query.clone()).await;
            opened.push(slot);
        }
        opened
    }

    /// Close every subscription and start a new generation.
    pub fn teardown(&mut self) {
        let open = self.streams.len();
        self.streams.clear();
        self.queries.clear();
        self.generation += 1;
        info!(generation = self.generation, closed = open, "Live queries torn down");
    }

    /// Wait for the next event from any open subscription.
    ///
    /// Returns `None` when nothing is open.
    pub async fn next_event(&mut self) -> Option<LiveEvent> {
        let (slot, (generation, update)) = self.streams.next().await?;
        if matches!(update, LiveUpdate::Ended) && generation == self.generation {
            debug!(%slot, "Subscription ended by store");
            self.queries.remove(&slot);
        }
        Some(LiveEvent {
            slot,
            generation,
            update,
        })
    }

    fn close(&mut self, slot: Slot) {
        if self.streams.remove(&slot).is_some() {
            debug!(%slot, "Closed live query");
        }
        self.queries.remove(&slot);
    }

    async fn open(&mut self, slot: Slot, query: Query) {
        debug!(%slot, query = %query, "Opening live query");
        let generation = self.generation;
        let subscription = self.store.subscribe(query.clone()).await;
        let events = subscription
            .map(move |result| {
                let update = match result {
                    Ok(snapshot) => LiveUpdate::Snapshot(snapshot),
                    Err(err) => LiveUpdate::Failed(err),
                };
                (generation, update)
            })
            .chain(stream::once(async move { (generation, LiveUpdate::Ended) }));
        self.streams.insert(slot, Box::pin(events));
        self.queries.insert(slot, query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_store::{MemoryStore, Role};
    use serde_json::json;

    fn profile(uid: &str, team: &str, role: Role) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            display_name: format!("User {}", uid),
            phone_number: "0712345678".to_string(),
            team: team.to_string(),
            email: format!("{}@example.com", uid),
            role,
        }
    }

    #[test]
    fn test_field_plan() {
        let config = SyncConfig::default();
        let plan = plan_for(&profile("u1", "Julia", Role::Dsr), ViewMode::Field, &config);

        assert_eq!(plan.len(), 5);
        assert_eq!(
            plan.get(Slot::Records).unwrap().to_string(),
            r#"installations where createdByUid == "u1""#
        );
        assert_eq!(
            plan.get(Slot::Inbox).unwrap().to_string(),
            r#"messages where read == false and recipientUid == "u1" limit 5"#
        );
        assert_eq!(
            plan.get(Slot::SupervisorContact).unwrap().to_string(),
            r#"users where role == "supervisor" and team == "Julia" limit 1"#
        );
        assert!(plan.get(Slot::TeamAgents).is_none());
    }

    #[test]
    fn test_supervisor_plan_scoping() {
        let config = SyncConfig::default();

        let team = plan_for(&profile("s1", "Julia", Role::Supervisor), ViewMode::Supervisor, &config);
        assert_eq!(
            team.get(Slot::Records).unwrap().to_string(),
            r#"installations where Team == "Julia""#
        );
        assert_eq!(
            team.get(Slot::TeamAgents).unwrap().to_string(),
            r#"users where role == "dsr" and team == "Julia""#
        );
        assert!(team.get(Slot::Notes).is_none());

        let hq = plan_for(&profile("s0", "HQ", Role::Supervisor), ViewMode::Supervisor, &config);
        assert_eq!(hq.get(Slot::Records).unwrap().to_string(), "installations");
        assert_eq!(
            hq.get(Slot::TeamAgents).unwrap().to_string(),
            r#"users where role == "dsr""#
        );
        assert_eq!(hq.get(Slot::Announcements).unwrap().to_string(), "announcements");
    }

    #[tokio::test]
    async fn test_apply_plan_reuses_unchanged_slots() {
        let store = Arc::new(MemoryStore::new());
        let mut live = LiveQueries::new(store.clone());
        let config = SyncConfig::default();

        let plan = plan_for(&profile("u1", "Julia", Role::Dsr), ViewMode::Field, &config);
        let opened = live.apply_plan(&plan).await;
        assert_eq!(opened.len(), 5);
        assert_eq!(store.active_subscriptions(), 5);

        assert!(live.apply_plan(&plan).await.is_empty());
        assert_eq!(store.active_subscriptions(), 5);

        // Team change reopens only team-scoped slots.
        let moved = plan_for(&profile("u1", "BigTex", Role::Dsr), ViewMode::Field, &config);
        let opened = live.apply_plan(&moved).await;
        assert_eq!(opened, vec![Slot::Announcements, Slot::SupervisorContact]);
        assert_eq!(store.active_subscriptions(), 5);
    }

    #[tokio::test]
    async fn test_teardown_closes_everything() {
        let store = Arc::new(MemoryStore::new());
        let mut live = LiveQueries::new(store.clone());
        let plan = plan_for(
            &profile("s1", "Julia", Role::Supervisor),
            ViewMode::Supervisor,
            &SyncConfig::default(),
        );
        live.apply_plan(&plan).await;

        let first = live.next_event().await.unwrap();
        assert!(live.is_current(&first));
        assert!(matches!(first.update, LiveUpdate::Snapshot(_)));

        live.teardown();
        assert!(live.is_empty());
        assert_eq!(live.generation(), 1);
        assert!(!live.is_current(&first));
        assert_eq!(store.active_subscriptions(), 0);
        assert!(live.next_event().await.is_none());
    }

    #[tokio::test]
    async fn test_events_follow_writes() {
        let store = Arc::new(MemoryStore::new());
        let mut live = LiveQueries::new(store.clone());
        let plan = Plan::default().with(
            Slot::Notes,
            Query::new(Collection::Notes).where_eq("createdByUid", "u1"),
        );
        live.apply_plan(&plan).await;

        let initial = live.next_event().await.unwrap();
        match initial.update {
            LiveUpdate::Snapshot(s) => assert!(s.docs.is_empty()),
            other => panic!("unexpected {:?}", other),
        }

        let body = json!({
            "content": "call back",
            "createdAt": "2024-05-16T09:00:00.000Z",
            "createdByUid": "u1"
        });
        store
            .add(Collection::Notes, body.as_object().unwrap().clone())
            .await
            .unwrap();

        let event = live.next_event().await.unwrap();
        assert_eq!(event.slot, Slot::Notes);
        match event.update {
            LiveUpdate::Snapshot(s) => {
                assert_eq!(s.sequence, 2);
                assert_eq!(s.docs.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
