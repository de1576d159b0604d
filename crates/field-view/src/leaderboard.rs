//! Team leaderboard and per-agent activity.

use std::collections::HashMap;

use indexmap::IndexMap;
use record_store::{InstallationRecord, JobStatus, UserProfile};
use serde::Serialize;

/// Points per installed record.
pub const INSTALL_WEIGHT: usize = 10;

/// Number of places on the podium.
pub const PODIUM_SIZE: usize = 3;

/// One agent's position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// 1-based.
    pub rank: usize,
    pub uid: String,
    pub name: String,
    pub installs: usize,
    pub total: usize,
    pub score: usize,
}

/// Ranked agents, split into the podium and everyone else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    /// Ranks 1 to 3.
    pub podium: Vec<Standing>,
    /// Ranks from 4 on.
    pub rest: Vec<Standing>,
}

impl Leaderboard {
    /// Rank `agents` by `installs * 10 + total` over `records`.
    ///
    /// Agents without records still appear with a zero score. Equal scores
    /// keep the order of `agents`.
    pub fn rank<'a, I>(agents: &[UserProfile], records: I) -> Self
    where
        I: IntoIterator<Item = &'a InstallationRecord>,
    {
        let mut tallies: HashMap<&str, (usize, usize)> = HashMap::new();
        for record in records {
            let entry = tallies.entry(record.created_by_uid.as_str()).or_default();
            if record.job_status == JobStatus::Installed {
                entry.0 += 1;
            }
            entry.1 += 1;
        }

        let mut standings: Vec<Standing> = agents
            .iter()
            .map(|agent| {
                let (installs, total) = tallies.get(agent.uid.as_str()).copied().unwrap_or_default();
                Standing {
                    rank: 0,
                    uid: agent.uid.clone(),
                    name: agent.display_name.clone(),
                    installs,
                    total,
                    score: installs * INSTALL_WEIGHT + total,
                }
            })
            .collect();

        standings.sort_by(|a, b| b.score.cmp(&a.score));
        for (i, standing) in standings.iter_mut().enumerate() {
            standing.rank = i + 1;
        }

        let rest = standings.split_off(standings.len().min(PODIUM_SIZE));
        Leaderboard {
            podium: standings,
            rest,
        }
    }

    /// Every standing in rank order.
    pub fn iter(&self) -> impl Iterator<Item = &Standing> {
        self.podium.iter().chain(self.rest.iter())
    }

    pub fn len(&self) -> usize {
        self.podium.len() + self.rest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.podium.is_empty()
    }
}

/// Submission counts for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentActivity {
    pub uid: String,
    pub name: String,
    /// Records in the selected range.
    pub in_range: usize,
    /// Records of all time.
    pub all_time: usize,
    /// `in_range` relative to the busiest agent, from 0.0 to 1.0.
    pub share: f64,
}

/// Per-agent submissions, in agent list order.
pub fn activity<'a, 'b, R, A>(agents: &[UserProfile], in_range: R, all_time: A) -> Vec<AgentActivity>
where
    R: IntoIterator<Item = &'a InstallationRecord>,
    A: IntoIterator<Item = &'b InstallationRecord>,
{
    let mut counts: IndexMap<&str, (usize, usize)> = agents
        .iter()
        .map(|a| (a.uid.as_str(), (0, 0)))
        .collect();
    for record in in_range {
        if let Some(entry) = counts.get_mut(record.created_by_uid.as_str()) {
            entry.0 += 1;
        }
    }
    for record in all_time {
        if let Some(entry) = counts.get_mut(record.created_by_uid.as_str()) {
            entry.1 += 1;
        }
    }

    let busiest = counts.values().map(|c| c.0).max().unwrap_or(0).max(1);
    agents
        .iter()
        .map(|agent| {
            let (in_range, all_time) = counts.get(agent.uid.as_str()).copied().unwrap_or_default();
            AgentActivity {
                uid: agent.uid.clone(),
                name: agent.display_name.clone(),
                in_range,
                all_time,
                share: in_range as f64 / busiest as f64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{agent, record};
    use chrono::Utc;

    fn records_for(uid: &str, installs: usize, total: usize) -> Vec<InstallationRecord> {
        (0..total)
            .map(|i| {
                let status = if i < installs {
                    JobStatus::Installed
                } else {
                    JobStatus::Pending
                };
                record(&format!("{uid}-{i}"), uid, status, Utc::now())
            })
            .collect()
    }

    #[test]
    fn test_scores_and_rank_order() {
        let agents = vec![agent("agent1"), agent("agent2"), agent("agent3")];
        let mut records = records_for("agent1", 5, 8);
        records.extend(records_for("agent2", 3, 10));
        records.extend(records_for("agent3", 5, 5));

        let board = Leaderboard::rank(&agents, &records);
        let order: Vec<(&str, usize, usize)> = board
            .iter()
            .map(|s| (s.uid.as_str(), s.score, s.rank))
            .collect();
        assert_eq!(
            order,
            vec![("agent1", 58, 1), ("agent3", 55, 2), ("agent2", 40, 3)]
        );
        assert!(board.rest.is_empty());
    }

    #[test]
    fn test_rest_starts_at_rank_four() {
        let agents: Vec<_> = (1..=5).map(|i| agent(&format!("a{i}"))).collect();
        let mut records = Vec::new();
        for (i, a) in agents.iter().enumerate() {
            records.extend(records_for(&a.uid, 0, 5 - i));
        }

        let board = Leaderboard::rank(&agents, &records);
        assert_eq!(board.podium.len(), 3);
        assert_eq!(board.rest.len(), 2);
        assert_eq!(board.rest[0].rank, 4);
        assert_eq!(board.rest[0].uid, "a4");
        assert_eq!(board.len(), 5);
    }

    #[test]
    fn test_ties_keep_agent_order_and_idle_agents_listed() {
        let agents = vec![agent("x"), agent("y"), agent("idle")];
        let mut records = records_for("y", 1, 1);
        records.extend(records_for("x", 1, 1));
        // Records from someone outside the team are ignored.
        records.extend(records_for("stranger", 9, 9));

        let board = Leaderboard::rank(&agents, &records);
        let uids: Vec<&str> = board.iter().map(|s| s.uid.as_str()).collect();
        assert_eq!(uids, vec!["x", "y", "idle"]);
        assert_eq!(board.podium[2].score, 0);
    }

    #[test]
    fn test_activity_share() {
        let agents = vec![agent("a"), agent("b")];
        let mut records = records_for("a", 0, 4);
        records.extend(records_for("b", 0, 2));

        let rows = activity(&agents, records.iter().take(5), &records);
        assert_eq!(rows[0].in_range, 4);
        assert_eq!(rows[1].in_range, 1);
        assert_eq!(rows[1].all_time, 2);
        assert!((rows[0].share - 1.0).abs() < f64::EPSILON);
        assert!((rows[1].share - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_activity_without_records() {
        let agents = vec![agent("a")];
        let none = std::iter::empty::<&InstallationRecord>;
        let rows = activity(&agents, none(), none());
        assert_eq!(rows[0].share, 0.0);
    }
}
