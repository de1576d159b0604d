//! Typed documents for each collection.
//!
//! Field names on the wire are preserved with `serde(rename)`; the mixed
//! casing (`Name`, `createdByUid`, `fiberReady`) is part of the stored format.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing status of an installation lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum JobStatus {
    Forwarded,
    Pending,
    Installed,
    Rejected,
    Lead,
    /// Stored as the empty string.
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl JobStatus {
    /// Every status, in display order.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Forwarded,
        JobStatus::Pending,
        JobStatus::Installed,
        JobStatus::Rejected,
        JobStatus::Lead,
        JobStatus::Unset,
    ];

    /// The stored string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Forwarded => "Forwarded",
            JobStatus::Pending => "Pending",
            JobStatus::Installed => "Installed",
            JobStatus::Rejected => "Rejected",
            JobStatus::Lead => "Lead",
            JobStatus::Unset => "",
        }
    }

    /// Parse user or imported input, ignoring case and surrounding space.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        JobStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether fiber is already available at the premises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FiberReady {
    Yes,
    No,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl FiberReady {
    pub fn as_str(&self) -> &'static str {
        match self {
            FiberReady::Yes => "Yes",
            FiberReady::No => "No",
            FiberReady::Unset => "",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "yes" | "y" => Some(FiberReady::Yes),
            "no" | "n" => Some(FiberReady::No),
            "" => Some(FiberReady::Unset),
            _ => None,
        }
    }
}

/// How a record entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    #[default]
    Manual,
    Whatsapp,
}

/// Participant role. Legacy profiles without a role decode as `Dsr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Dsr,
    Supervisor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Dsr => "dsr",
            Role::Supervisor => "supervisor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Teams offered at registration. Free-text teams are also accepted.
pub const VALID_TEAMS: [&str; 5] = ["Julia", "BigTex", "Straton", "SkyReighn", "HQ"];

/// One field lead submitted by an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallationRecord {
    #[serde(default)]
    pub id: String,
    /// Owner uid; never changes after creation.
    #[serde(rename = "createdByUid")]
    pub created_by_uid: String,
    #[serde(rename = "createdAt", with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation.
    #[serde(rename = "updatedAt", with = "crate::timestamp")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub source: RecordSource,

    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Contact")]
    pub contact: String,
    #[serde(rename = "AltContact", default)]
    pub alt_contact: String,
    #[serde(rename = "Email", default)]
    pub email: String,
    #[serde(rename = "IdNo", default)]
    pub id_no: String,
    #[serde(rename = "RoadName", default)]
    pub road_name: String,
    #[serde(rename = "Address", default)]
    pub address: String,
    #[serde(rename = "FloorNo", default)]
    pub floor_no: String,
    #[serde(rename = "House", default)]
    pub house: String,
    #[serde(rename = "FAT", default)]
    pub fat: String,
    /// `"lat,lng"`
    #[serde(default)]
    pub coordinates: String,
    #[serde(rename = "fiberReady", default)]
    pub fiber_ready: FiberReady,
    #[serde(rename = "JobStatus", default)]
    pub job_status: JobStatus,
    /// Filled in by the office once installed.
    #[serde(rename = "AccountNumber", default)]
    pub account_number: String,
    #[serde(rename = "DSR", default)]
    pub dsr: String,
    #[serde(rename = "DSRContacts", default)]
    pub dsr_contacts: String,
    #[serde(rename = "Team", default)]
    pub team: String,
    #[serde(rename = "Comment", default)]
    pub comment: String,
}

/// One authenticated participant. The document id is the uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub uid: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: String,
    pub team: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: Role,
}

impl UserProfile {
    pub fn is_supervisor(&self) -> bool {
        self.role == Role::Supervisor
    }
}

/// Free-text scratchpad entry owned by one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    #[serde(default)]
    pub id: String,
    pub content: String,
    #[serde(rename = "createdAt", with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "createdByUid")]
    pub created_by_uid: String,
}

/// Team-scoped broadcast from a supervisor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub content: String,
    pub team: String,
    #[serde(rename = "createdAt", with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
    /// Poster display name.
    #[serde(rename = "createdBy", default)]
    pub created_by: String,
}

/// One-way message into a single recipient inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectMessage {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "recipientUid")]
    pub recipient_uid: String,
    #[serde(rename = "senderUid")]
    pub sender_uid: String,
    #[serde(rename = "senderName", default)]
    pub sender_name: String,
    pub content: String,
    /// Monotonic false -> true.
    #[serde(default)]
    pub read: bool,
    #[serde(rename = "createdAt", with = "crate::timestamp")]
    pub created_at: DateTime<Utc>,
}
