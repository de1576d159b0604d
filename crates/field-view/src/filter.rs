//! Filter selections: status, time range, text search and agent drill-down.
//!
//! Every filter is a plain predicate over one record. They compose by
//! logical AND in [`ViewFilters::matches`], so clearing one selection never
//! disturbs the others.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use record_store::{InstallationRecord, JobStatus};
use serde::{Deserialize, Serialize};

/// Status selection: a single status or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StatusFilter {
    #[default]
    All,
    Only(JobStatus),
}

impl StatusFilter {
    pub fn matches(&self, record: &InstallationRecord) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(status) => record.job_status == *status,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            return Ok(StatusFilter::All);
        }
        JobStatus::parse(s)
            .map(StatusFilter::Only)
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}

impl fmt::Display for StatusFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusFilter::All => f.write_str("All"),
            StatusFilter::Only(JobStatus::Unset) => f.write_str("(unset)"),
            StatusFilter::Only(status) => write!(f, "{}", status),
        }
    }
}

/// Calendar window over `updatedAt`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    Today,
    Week,
    Month,
    #[default]
    All,
}

impl TimeRange {
    pub const ALL: [TimeRange; 4] = [
        TimeRange::Today,
        TimeRange::Week,
        TimeRange::Month,
        TimeRange::All,
    ];

    /// Start of the window in the zone of `now`, or `None` for [`TimeRange::All`].
    ///
    /// Today starts at local midnight, the week at midnight of the most
    /// recent Sunday, the month at midnight of its first day.
    pub fn window_start<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let first_day = match self {
            TimeRange::Today => today,
            TimeRange::Week => {
                let back = u64::from(today.weekday().num_days_from_sunday());
                today.checked_sub_days(Days::new(back)).unwrap_or(today)
            }
            TimeRange::Month => today.with_day(1).unwrap_or(today),
            TimeRange::All => return None,
        };
        Some(local_midnight(&now.timezone(), first_day))
    }

    /// Whether `ts` falls in `[start, now)`. [`TimeRange::All`] keeps everything.
    pub fn contains<Tz: TimeZone>(&self, ts: &DateTime<Utc>, now: &DateTime<Tz>) -> bool {
        match self.window_start(now) {
            Some(start) => start <= *ts && *ts < now.with_timezone(&Utc),
            None => true,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::Week => "week",
            TimeRange::Month => "month",
            TimeRange::All => "all",
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        TimeRange::ALL
            .into_iter()
            .find(|r| r.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown time range '{}'", s))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Midnight can be skipped by a DST transition; the first valid instant of
// the day is used then.
fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    (0..24)
        .filter_map(|hour| day.and_hms_opt(hour, 0, 0))
        .find_map(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&day.and_time(NaiveTime::default())))
}

/// Case-insensitive substring search over name, contact, road and address.
///
/// An empty or blank query matches everything.
pub fn matches_search(record: &InstallationRecord, query: &str) -> bool {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [
        &record.name,
        &record.contact,
        &record.road_name,
        &record.address,
    ]
    .into_iter()
    .any(|haystack| haystack.to_lowercase().contains(&needle))
}

/// The filter selections of one view.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewFilters {
    pub search: String,
    pub status: StatusFilter,
    pub range: TimeRange,
    /// Drill-down to one agent uid.
    pub agent: Option<String>,
}

impl ViewFilters {
    /// Time range and agent only. Stats and the leaderboard use this set.
    pub fn in_scope<Tz: TimeZone>(&self, record: &InstallationRecord, now: &DateTime<Tz>) -> bool {
        self.range.contains(&record.updated_at, now)
            && self
                .agent
                .as_deref()
                .map_or(true, |uid| record.created_by_uid == uid)
    }

    /// Every selection combined.
    pub fn matches<Tz: TimeZone>(&self, record: &InstallationRecord, now: &DateTime<Tz>) -> bool {
        self.in_scope(record, now)
            && self.status.matches(record)
            && matches_search(record, &self.search)
    }

    /// Reset everything but the time range.
    pub fn clear_drill_down(&mut self) {
        self.agent = None;
        self.status = StatusFilter::All;
        self.search.clear();
    }
}
