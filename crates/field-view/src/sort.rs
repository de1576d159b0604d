//! Client-side ordering.
//!
//! Queries never request an order, so every list is sorted here, newest
//! first, with a stable sort so equal timestamps keep snapshot order.

use chrono::{DateTime, Utc};
use record_store::{Announcement, DirectMessage, InstallationRecord, Note};

/// A document with a timestamp it is listed by.
pub trait Timeline {
    fn timeline_at(&self) -> DateTime<Utc>;
}

impl Timeline for InstallationRecord {
    fn timeline_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Timeline for Note {
    fn timeline_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timeline for Announcement {
    fn timeline_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Timeline for DirectMessage {
    fn timeline_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sort newest first in place.
pub fn newest_first<T: Timeline>(items: &mut [T]) {
    items.sort_by(|a, b| b.timeline_at().cmp(&a.timeline_at()));
}

/// Sorted copy.
pub fn sorted<T: Timeline + Clone>(items: &[T]) -> Vec<T> {
    let mut out = items.to_vec();
    newest_first(&mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;
    use chrono::{Duration, TimeZone};
    use record_store::JobStatus;

    #[test]
    fn test_newest_first_is_stable() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let mut records = vec![
            record("old", "u1", JobStatus::Pending, t0),
            record("tie-a", "u1", JobStatus::Pending, t0 + Duration::hours(1)),
            record("new", "u1", JobStatus::Pending, t0 + Duration::hours(2)),
            record("tie-b", "u1", JobStatus::Pending, t0 + Duration::hours(1)),
        ];
        newest_first(&mut records);
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "tie-a", "tie-b", "old"]);
    }
}
