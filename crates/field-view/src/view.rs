//! The view model: latest snapshot per live query plus filter selections.
//!
//! [`ViewModel::apply`] is the only way data gets in. Each slot remembers the
//! sequence number of the snapshot it holds and ignores anything that is not
//! newer, so a late or duplicated delivery can never roll the view back.
//! [`ViewModel::render`] derives everything else on each call.

use std::fmt;

use chrono::{DateTime, TimeZone};
use record_store::{
    Announcement, CollectionDocument, DirectMessage, InstallationRecord, Note, Snapshot,
    StoreError, UserProfile,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::filter::{StatusFilter, TimeRange, ViewFilters};
use crate::leaderboard::{activity, AgentActivity, Leaderboard};
use crate::sort::{newest_first, sorted};
use crate::stats::StatusCounts;

/// Which dashboard is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// The agent's own records, notes and inbox.
    #[default]
    Field,
    /// Team-wide overview.
    Supervisor,
}

/// A named live query feeding the view model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Records,
    Notes,
    Announcements,
    Inbox,
    /// The agent's team supervisor.
    SupervisorContact,
    /// Agents of the supervised team.
    TeamAgents,
}

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Records => "records",
            Slot::Notes => "notes",
            Slot::Announcements => "announcements",
            Slot::Inbox => "inbox",
            Slot::SupervisorContact => "supervisor_contact",
            Slot::TeamAgents => "team_agents",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct SlotState<T> {
    sequence: u64,
    items: Vec<T>,
}

impl<T> Default for SlotState<T> {
    fn default() -> Self {
        Self {
            sequence: 0,
            items: Vec::new(),
        }
    }
}

impl<T: CollectionDocument> SlotState<T> {
    fn apply(&mut self, slot: Slot, snapshot: &Snapshot) -> Result<bool, StoreError> {
        if snapshot.sequence <= self.sequence {
            debug!(%slot, sequence = snapshot.sequence, held = self.sequence, "Ignoring stale snapshot");
            return Ok(false);
        }
        match snapshot.decode::<T>() {
            Ok(items) => {
                self.sequence = snapshot.sequence;
                self.items = items;
                Ok(true)
            }
            Err(err) => {
                warn!(%slot, sequence = snapshot.sequence, error = %err, "Keeping previous state");
                Err(err)
            }
        }
    }
}

/// Raw per-slot data and filter selections of the mounted view.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    mode: ViewMode,
    filters: ViewFilters,
    records: SlotState<InstallationRecord>,
    notes: SlotState<Note>,
    announcements: SlotState<Announcement>,
    inbox: SlotState<DirectMessage>,
    supervisor: SlotState<UserProfile>,
    agents: SlotState<UserProfile>,
}

impl ViewModel {
    pub fn new(mode: ViewMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    /// Take in a snapshot for `slot`.
    ///
    /// Returns `Ok(true)` when the slot changed, `Ok(false)` for a stale
    /// snapshot. A snapshot that fails to decode leaves the slot untouched.
    pub fn apply(&mut self, slot: Slot, snapshot: &Snapshot) -> Result<bool, StoreError> {
        match slot {
            Slot::Records => self.records.apply(slot, snapshot),
            Slot::Notes => self.notes.apply(slot, snapshot),
            Slot::Announcements => self.announcements.apply(slot, snapshot),
            Slot::Inbox => self.inbox.apply(slot, snapshot),
            Slot::SupervisorContact => self.supervisor.apply(slot, snapshot),
            Slot::TeamAgents => self.agents.apply(slot, snapshot),
        }
    }

    /// Forget a slot's data, for when its query is replaced.
    pub fn reset(&mut self, slot: Slot) {
        match slot {
            Slot::Records => self.records = SlotState::default(),
            Slot::Notes => self.notes = SlotState::default(),
            Slot::Announcements => self.announcements = SlotState::default(),
            Slot::Inbox => self.inbox = SlotState::default(),
            Slot::SupervisorContact => self.supervisor = SlotState::default(),
            Slot::TeamAgents => self.agents = SlotState::default(),
        }
    }

    /// Sequence number held for `slot`; zero before the first snapshot.
    pub fn sequence(&self, slot: Slot) -> u64 {
        match slot {
            Slot::Records => self.records.sequence,
            Slot::Notes => self.notes.sequence,
            Slot::Announcements => self.announcements.sequence,
            Slot::Inbox => self.inbox.sequence,
            Slot::SupervisorContact => self.supervisor.sequence,
            Slot::TeamAgents => self.agents.sequence,
        }
    }

    pub fn filters(&self) -> &ViewFilters {
        &self.filters
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.filters.status = status;
    }

    pub fn set_range(&mut self, range: TimeRange) {
        self.filters.range = range;
    }

    /// Drill down to one agent, or clear the drill-down with `None`.
    pub fn select_agent(&mut self, uid: Option<String>) {
        self.filters.agent = uid;
    }

    pub fn record(&self, id: &str) -> Option<&InstallationRecord> {
        self.records.items.iter().find(|r| r.id == id)
    }

    pub fn note(&self, id: &str) -> Option<&Note> {
        self.notes.items.iter().find(|n| n.id == id)
    }

    pub fn message(&self, id: &str) -> Option<&DirectMessage> {
        self.inbox.items.iter().find(|m| m.id == id)
    }

    /// A team agent by uid.
    pub fn agent(&self, uid: &str) -> Option<&UserProfile> {
        self.agents.items.iter().find(|a| a.uid == uid)
    }

    pub fn supervisor_contact(&self) -> Option<&UserProfile> {
        self.supervisor.items.first()
    }

    /// Derive the mounted view at `now`.
    pub fn render<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> RenderedView {
        match self.mode {
            ViewMode::Field => RenderedView::Field(self.render_field(now)),
            ViewMode::Supervisor => RenderedView::Supervisor(self.render_supervisor(now)),
        }
    }

    fn filtered_records<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Vec<InstallationRecord> {
        let mut records: Vec<InstallationRecord> = self
            .records
            .items
            .iter()
            .filter(|r| self.filters.matches(r, now))
            .cloned()
            .collect();
        newest_first(&mut records);
        records
    }

    fn render_field<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> AgentView {
        let announcements = sorted(&self.announcements.items);
        AgentView {
            records: self.filtered_records(now),
            stats: StatusCounts::tally(
                self.records
                    .items
                    .iter()
                    .filter(|r| self.filters.in_scope(r, now)),
            ),
            latest_announcement: announcements.into_iter().next(),
            inbox: sorted(&self.inbox.items),
            supervisor: self.supervisor_contact().cloned(),
            notes: sorted(&self.notes.items),
            filters: self.filters.clone(),
        }
    }

    fn render_supervisor<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> SupervisorView {
        let in_range: Vec<&InstallationRecord> = self
            .records
            .items
            .iter()
            .filter(|r| self.filters.range.contains(&r.updated_at, now))
            .collect();

        SupervisorView {
            stats: StatusCounts::tally(
                in_range
                    .iter()
                    .copied()
                    .filter(|r| self.filters.in_scope(r, now)),
            ),
            leaderboard: Leaderboard::rank(&self.agents.items, in_range.iter().copied()),
            activity: activity(&self.agents.items, in_range.iter().copied(), &self.records.items),
            records: self.filtered_records(now),
            agents: self.agents.items.clone(),
            announcements: sorted(&self.announcements.items),
            inbox: sorted(&self.inbox.items),
            filters: self.filters.clone(),
        }
    }
}

/// Output of [`ViewModel::render`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "view", rename_all = "lowercase")]
pub enum RenderedView {
    Field(AgentView),
    Supervisor(SupervisorView),
}

/// The agent dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentView {
    /// Own records after every filter, newest first.
    pub records: Vec<InstallationRecord>,
    /// Counts over the time range, before status and search filters.
    pub stats: StatusCounts,
    pub latest_announcement: Option<Announcement>,
    pub inbox: Vec<DirectMessage>,
    pub supervisor: Option<UserProfile>,
    pub notes: Vec<Note>,
    pub filters: ViewFilters,
}

/// The supervisor overview.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupervisorView {
    /// KPIs over the time range and agent drill-down.
    pub stats: StatusCounts,
    pub leaderboard: Leaderboard,
    pub activity: Vec<AgentActivity>,
    /// Drill-down list, newest first.
    pub records: Vec<InstallationRecord>,
    pub agents: Vec<UserProfile>,
    pub announcements: Vec<Announcement>,
    pub inbox: Vec<DirectMessage>,
    pub filters: ViewFilters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{agent, record};
    use chrono::{Duration, TimeZone, Utc};
    use record_store::{JobStatus, RawDocument};
    use serde_json::Value;

    fn snapshot<T: CollectionDocument>(sequence: u64, docs: &[T]) -> Snapshot {
        Snapshot {
            sequence,
            docs: docs
                .iter()
                .map(|d| RawDocument::new(d.doc_id(), d.to_fields().unwrap()))
                .collect(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap()
    }

    fn field_view(model: &ViewModel) -> AgentView {
        match model.render(&now()) {
            RenderedView::Field(view) => view,
            other => panic!("expected field view, got {other:?}"),
        }
    }

    fn supervisor_view(model: &ViewModel) -> SupervisorView {
        match model.render(&now()) {
            RenderedView::Supervisor(view) => view,
            other => panic!("expected supervisor view, got {other:?}"),
        }
    }

    #[test]
    fn test_records_sorted_newest_first() {
        let mut model = ViewModel::new(ViewMode::Field);
        let records = vec![
            record("old", "u1", JobStatus::Pending, now() - Duration::hours(5)),
            record("new", "u1", JobStatus::Pending, now() - Duration::hours(1)),
        ];
        assert!(model.apply(Slot::Records, &snapshot(1, &records)).unwrap());

        let ids: Vec<String> = field_view(&model).records.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
    }

    #[test]
    fn test_stale_snapshot_is_ignored() {
        let mut model = ViewModel::new(ViewMode::Field);
        let first = vec![record("a", "u1", JobStatus::Pending, now())];
        let second = vec![
            record("a", "u1", JobStatus::Pending, now()),
            record("b", "u1", JobStatus::Lead, now()),
        ];

        assert!(model.apply(Slot::Records, &snapshot(2, &second)).unwrap());
        assert!(!model.apply(Slot::Records, &snapshot(1, &first)).unwrap());
        assert!(!model.apply(Slot::Records, &snapshot(2, &first)).unwrap());
        assert_eq!(field_view(&model).records.len(), 2);
    }

    #[test]
    fn test_identical_redelivery_renders_identically() {
        let records = vec![
            record("a", "u1", JobStatus::Pending, now() - Duration::hours(1)),
            record("b", "u1", JobStatus::Installed, now() - Duration::hours(1)),
        ];
        let mut model = ViewModel::new(ViewMode::Field);
        model.apply(Slot::Records, &snapshot(1, &records)).unwrap();
        let before = model.render(&now());

        model.apply(Slot::Records, &snapshot(2, &records)).unwrap();
        assert_eq!(model.render(&now()), before);
    }

    #[test]
    fn test_malformed_snapshot_keeps_previous_state() {
        let mut model = ViewModel::new(ViewMode::Field);
        let records = vec![record("a", "u1", JobStatus::Pending, now())];
        model.apply(Slot::Records, &snapshot(1, &records)).unwrap();

        let mut broken = snapshot(2, &records);
        broken.docs[0]
            .fields
            .insert("updatedAt".into(), Value::String("not a date".into()));
        let err = model.apply(Slot::Records, &broken).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { .. }));

        assert_eq!(model.sequence(Slot::Records), 1);
        assert_eq!(field_view(&model).records.len(), 1);
    }

    #[test]
    fn test_reset_accepts_restarted_sequence() {
        let mut model = ViewModel::new(ViewMode::Field);
        let records = vec![record("a", "u1", JobStatus::Pending, now())];
        model.apply(Slot::Records, &snapshot(3, &records)).unwrap();

        model.reset(Slot::Records);
        assert_eq!(model.sequence(Slot::Records), 0);
        assert!(model.apply(Slot::Records, &snapshot(1, &records)).unwrap());
    }

    #[test]
    fn test_field_view_stats_ignore_status_and_search() {
        let mut model = ViewModel::new(ViewMode::Field);
        let records = vec![
            record("a", "u1", JobStatus::Installed, now() - Duration::hours(1)),
            record("b", "u1", JobStatus::Pending, now() - Duration::hours(2)),
        ];
        model.apply(Slot::Records, &snapshot(1, &records)).unwrap();
        model.set_status(StatusFilter::Only(JobStatus::Installed));

        let view = field_view(&model);
        assert_eq!(view.records.len(), 1);
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.stats.installed, 1);
    }

    #[test]
    fn test_latest_announcement_only() {
        let mut model = ViewModel::new(ViewMode::Field);
        let make = |id: &str, hours: i64| Announcement {
            id: id.into(),
            title: id.into(),
            content: "c".into(),
            team: "Julia".into(),
            created_at: now() - Duration::hours(hours),
            created_by: "Sup".into(),
        };
        let announcements = vec![make("older", 5), make("newest", 1), make("oldest", 9)];
        model
            .apply(Slot::Announcements, &snapshot(1, &announcements))
            .unwrap();

        let view = field_view(&model);
        assert_eq!(view.latest_announcement.unwrap().id, "newest");
    }

    #[test]
    fn test_supervisor_drill_down_composes() {
        let mut model = ViewModel::new(ViewMode::Supervisor);
        let agents = vec![agent("u1"), agent("u2")];
        let records = vec![
            record("a", "u1", JobStatus::Installed, now() - Duration::hours(1)),
            record("b", "u1", JobStatus::Pending, now() - Duration::hours(2)),
            record("c", "u2", JobStatus::Installed, now() - Duration::hours(3)),
            record("d", "u2", JobStatus::Installed, now() - Duration::days(40)),
        ];
        model.apply(Slot::TeamAgents, &snapshot(1, &agents)).unwrap();
        model.apply(Slot::Records, &snapshot(1, &records)).unwrap();
        model.set_range(TimeRange::Month);

        let view = supervisor_view(&model);
        assert_eq!(view.stats.total, 3);
        assert_eq!(view.leaderboard.podium[0].uid, "u1");
        assert_eq!(view.leaderboard.podium[0].score, 12);
        assert_eq!(view.activity[1].all_time, 2);
        assert_eq!(view.activity[1].in_range, 1);

        model.select_agent(Some("u1".into()));
        model.set_status(StatusFilter::Only(JobStatus::Installed));
        let view = supervisor_view(&model);
        let ids: Vec<String> = view.records.into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a"]);
        assert_eq!(view.stats.total, 2);

        // Clearing the agent keeps the status filter.
        model.select_agent(None);
        let ids: Vec<String> = supervisor_view(&model)
            .records
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }
}
