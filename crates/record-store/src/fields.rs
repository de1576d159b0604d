//! Editable fields of an installation record.
//!
//! Forms, partial updates, the import parser, share text and CSV export all
//! address record data through [`RecordField`] instead of raw strings.

use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::models::{FiberReady, InstallationRecord, JobStatus};
use crate::validation::ValidationError;

/// A user-editable data field of an [`InstallationRecord`].
///
/// Bookkeeping fields (`id`, `createdByUid`, timestamps, flags) are not
/// listed; they are stamped by the dispatcher only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordField {
    Title,
    Name,
    Contact,
    AltContact,
    Email,
    IdNo,
    RoadName,
    Address,
    FloorNo,
    House,
    Fat,
    Coordinates,
    FiberReady,
    JobStatus,
    AccountNumber,
    Dsr,
    DsrContacts,
    Team,
    Comment,
}

impl RecordField {
    /// Every field, in form order.
    pub const ALL: [RecordField; 19] = [
        RecordField::Title,
        RecordField::Name,
        RecordField::Contact,
        RecordField::AltContact,
        RecordField::Email,
        RecordField::IdNo,
        RecordField::RoadName,
        RecordField::Address,
        RecordField::FloorNo,
        RecordField::House,
        RecordField::Fat,
        RecordField::Coordinates,
        RecordField::FiberReady,
        RecordField::JobStatus,
        RecordField::AccountNumber,
        RecordField::Dsr,
        RecordField::DsrContacts,
        RecordField::Team,
        RecordField::Comment,
    ];

    /// Document key for this field.
    pub fn wire_name(&self) -> &'static str {
        match self {
            RecordField::Title => "Title",
            RecordField::Name => "Name",
            RecordField::Contact => "Contact",
            RecordField::AltContact => "AltContact",
            RecordField::Email => "Email",
            RecordField::IdNo => "IdNo",
            RecordField::RoadName => "RoadName",
            RecordField::Address => "Address",
            RecordField::FloorNo => "FloorNo",
            RecordField::House => "House",
            RecordField::Fat => "FAT",
            RecordField::Coordinates => "coordinates",
            RecordField::FiberReady => "fiberReady",
            RecordField::JobStatus => "JobStatus",
            RecordField::AccountNumber => "AccountNumber",
            RecordField::Dsr => "DSR",
            RecordField::DsrContacts => "DSRContacts",
            RecordField::Team => "Team",
            RecordField::Comment => "Comment",
        }
    }

    /// Human-readable name used in validation messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            RecordField::Title => "title",
            RecordField::Name => "name",
            RecordField::Contact => "contact",
            RecordField::AltContact => "alt contact",
            RecordField::Email => "email",
            RecordField::IdNo => "ID number",
            RecordField::RoadName => "road name",
            RecordField::Address => "address",
            RecordField::FloorNo => "floor",
            RecordField::House => "house",
            RecordField::Fat => "FAT",
            RecordField::Coordinates => "coordinates",
            RecordField::FiberReady => "fiber ready",
            RecordField::JobStatus => "job status",
            RecordField::AccountNumber => "account number",
            RecordField::Dsr => "agent name",
            RecordField::DsrContacts => "agent contact",
            RecordField::Team => "team",
            RecordField::Comment => "comment",
        }
    }

    /// Look up a field by its document key.
    pub fn from_wire_name(name: &str) -> Option<Self> {
        RecordField::ALL.into_iter().find(|f| f.wire_name() == name)
    }

    /// Fields filled from the acting profile and locked in the form.
    pub fn is_profile_owned(&self) -> bool {
        matches!(
            self,
            RecordField::Dsr | RecordField::DsrContacts | RecordField::Team
        )
    }

    /// Read the field as text.
    pub fn read(&self, record: &InstallationRecord) -> String {
        match self {
            RecordField::Title => record.title.clone(),
            RecordField::Name => record.name.clone(),
            RecordField::Contact => record.contact.clone(),
            RecordField::AltContact => record.alt_contact.clone(),
            RecordField::Email => record.email.clone(),
            RecordField::IdNo => record.id_no.clone(),
            RecordField::RoadName => record.road_name.clone(),
            RecordField::Address => record.address.clone(),
            RecordField::FloorNo => record.floor_no.clone(),
            RecordField::House => record.house.clone(),
            RecordField::Fat => record.fat.clone(),
            RecordField::Coordinates => record.coordinates.clone(),
            RecordField::FiberReady => record.fiber_ready.as_str().to_string(),
            RecordField::JobStatus => record.job_status.as_str().to_string(),
            RecordField::AccountNumber => record.account_number.clone(),
            RecordField::Dsr => record.dsr.clone(),
            RecordField::DsrContacts => record.dsr_contacts.clone(),
            RecordField::Team => record.team.clone(),
            RecordField::Comment => record.comment.clone(),
        }
    }

    /// Write text into the field, validating choice fields.
    pub fn write(&self, record: &mut InstallationRecord, value: &str) -> Result<(), ValidationError> {
        let value = value.to_string();
        match self {
            RecordField::Title => record.title = value,
            RecordField::Name => record.name = value,
            RecordField::Contact => record.contact = value,
            RecordField::AltContact => record.alt_contact = value,
            RecordField::Email => record.email = value,
            RecordField::IdNo => record.id_no = value,
            RecordField::RoadName => record.road_name = value,
            RecordField::Address => record.address = value,
            RecordField::FloorNo => record.floor_no = value,
            RecordField::House => record.house = value,
            RecordField::Fat => record.fat = value,
            RecordField::Coordinates => record.coordinates = value,
            RecordField::FiberReady => record.fiber_ready = parse_fiber_ready(&value)?,
            RecordField::JobStatus => record.job_status = parse_job_status(&value)?,
            RecordField::AccountNumber => record.account_number = value,
            RecordField::Dsr => record.dsr = value,
            RecordField::DsrContacts => record.dsr_contacts = value,
            RecordField::Team => record.team = value,
            RecordField::Comment => record.comment = value,
        }
        Ok(())
    }

    /// Convert text into the stored JSON value, normalizing choice fields.
    pub fn to_json(&self, value: &str) -> Result<Value, ValidationError> {
        let normalized = match self {
            RecordField::FiberReady => parse_fiber_ready(value)?.as_str().to_string(),
            RecordField::JobStatus => parse_job_status(value)?.as_str().to_string(),
            _ => value.to_string(),
        };
        Ok(Value::String(normalized))
    }
}

impl Serialize for RecordField {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

fn parse_job_status(value: &str) -> Result<JobStatus, ValidationError> {
    JobStatus::parse(value).ok_or_else(|| ValidationError::InvalidChoice {
        field: "job status".to_string(),
        value: value.to_string(),
    })
}

fn parse_fiber_ready(value: &str) -> Result<FiberReady, ValidationError> {
    FiberReady::parse(value).ok_or_else(|| ValidationError::InvalidChoice {
        field: "fiber ready".to_string(),
        value: value.to_string(),
    })
}
