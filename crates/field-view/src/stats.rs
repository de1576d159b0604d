//! Per-status counts.

use record_store::{InstallationRecord, JobStatus};
use serde::Serialize;

/// Record counts by status, gathered in a single pass.
///
/// Every status including the empty one has a bucket, so the buckets always
/// sum to `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub forwarded: usize,
    pub pending: usize,
    pub installed: usize,
    pub rejected: usize,
    pub lead: usize,
    pub unset: usize,
    pub total: usize,
    /// Records not yet confirmed by the backend.
    pub unsynced: usize,
}

impl StatusCounts {
    pub fn tally<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a InstallationRecord>,
    {
        let mut counts = StatusCounts::default();
        for record in records {
            *counts.bucket_mut(record.job_status) += 1;
            counts.total += 1;
            if !record.synced {
                counts.unsynced += 1;
            }
        }
        counts
    }

    pub fn count(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Forwarded => self.forwarded,
            JobStatus::Pending => self.pending,
            JobStatus::Installed => self.installed,
            JobStatus::Rejected => self.rejected,
            JobStatus::Lead => self.lead,
            JobStatus::Unset => self.unset,
        }
    }

    fn bucket_mut(&mut self, status: JobStatus) -> &mut usize {
        match status {
            JobStatus::Forwarded => &mut self.forwarded,
            JobStatus::Pending => &mut self.pending,
            JobStatus::Installed => &mut self.installed,
            JobStatus::Rejected => &mut self.rejected,
            JobStatus::Lead => &mut self.lead,
            JobStatus::Unset => &mut self.unset,
        }
    }

    /// Sum of the per-status buckets.
    pub fn status_sum(&self) -> usize {
        JobStatus::ALL.into_iter().map(|s| self.count(s)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{StatusFilter, TimeRange, ViewFilters};
    use crate::testing::record;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn test_tally() {
        let now = Utc::now();
        let mut records = vec![
            record("a", "u1", JobStatus::Installed, now),
            record("b", "u1", JobStatus::Installed, now),
            record("c", "u1", JobStatus::Pending, now),
            record("d", "u1", JobStatus::Unset, now),
        ];
        records[3].synced = false;

        let counts = StatusCounts::tally(&records);
        assert_eq!(counts.installed, 2);
        assert_eq!(counts.pending, 1);
        assert_eq!(counts.unset, 1);
        assert_eq!(counts.total, 4);
        assert_eq!(counts.unsynced, 1);
    }

    #[test]
    fn test_buckets_sum_to_total_for_every_selection() {
        let now = Utc.with_ymd_and_hms(2024, 5, 16, 12, 0, 0).unwrap();
        let records: Vec<_> = JobStatus::ALL
            .into_iter()
            .cycle()
            .take(40)
            .enumerate()
            .map(|(i, status)| {
                record(
                    &format!("r{}", i),
                    "u1",
                    status,
                    now - Duration::hours(i as i64 * 13),
                )
            })
            .collect();

        let statuses = std::iter::once(StatusFilter::All)
            .chain(JobStatus::ALL.into_iter().map(StatusFilter::Only));
        for status in statuses {
            for range in TimeRange::ALL {
                let filters = ViewFilters {
                    status,
                    range,
                    ..Default::default()
                };
                let counts =
                    StatusCounts::tally(records.iter().filter(|r| filters.matches(*r, &now)));
                assert_eq!(counts.status_sum(), counts.total, "{status} / {range}");
            }
        }
    }
}
