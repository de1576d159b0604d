//! View derivation for FieldTrack.
//!
//! Everything in this crate is a pure function of raw snapshot data, the
//! current filter selections and `now`. Nothing here talks to the store:
//!
//! - [`ViewModel`] - latest snapshot per live query, and [`ViewModel::render`]
//! - [`filter`] - status, time range, search and agent drill-down
//! - [`StatusCounts`] / [`Leaderboard`] - aggregates over the filtered set
//! - [`import`] - pasted lead messages to a reviewable draft
//! - [`share`] / [`export`] - outbound chat text and CSV
//!
//! # Example
//!
//! ```rust
//! use chrono::Utc;
//! use field_view::{RenderedView, ViewMode, ViewModel};
//!
//! let model = ViewModel::new(ViewMode::Field);
//! match model.render(&Utc::now()) {
//!     RenderedView::Field(view) => assert!(view.records.is_empty()),
//!     RenderedView::Supervisor(_) => unreachable!(),
//! }
//! ```

pub mod export;
pub mod filter;
pub mod import;
pub mod leaderboard;
pub mod share;
pub mod sort;
pub mod stats;
pub mod view;

#[cfg(test)]
mod testing;

pub use export::{export_file_name, to_csv};
pub use filter::{matches_search, StatusFilter, TimeRange, ViewFilters};
pub use import::{parse_message, FieldChange, ImportReview, RecordDraft};
pub use leaderboard::{AgentActivity, Leaderboard, Standing};
pub use share::{share_link, share_text};
pub use stats::StatusCounts;
pub use view::{AgentView, RenderedView, Slot, SupervisorView, ViewMode, ViewModel};
