//! Parsing pasted lead messages into a record draft.
//!
//! Field agents forward leads as chat messages made of `Label: value` lines,
//! often with `*bold*` or `_italic_` markup. Labels are matched against a
//! synonym table; when a field has no labelled line, well-known value
//! shapes (phone, email, coordinates, ID number) are searched in the whole
//! text instead.
//!
//! Parsing never touches a form directly. The result is an [`ImportReview`]
//! listing what would change, and only [`ImportReview::apply`] writes.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use record_store::{InstallationRecord, RecordField, ValidationError};
use regex::Regex;
use serde::Serialize;
use tracing::debug;

/// Label synonyms, lower case, single-spaced.
const LABELS: &[(&str, RecordField)] = &[
    ("title", RecordField::Title),
    ("name", RecordField::Name),
    ("contact", RecordField::Contact),
    ("phone", RecordField::Contact),
    ("alt contact", RecordField::AltContact),
    ("alt phone", RecordField::AltContact),
    ("email", RecordField::Email),
    ("email address", RecordField::Email),
    ("id", RecordField::IdNo),
    ("id no", RecordField::IdNo),
    ("id number", RecordField::IdNo),
    ("road", RecordField::RoadName),
    ("road name", RecordField::RoadName),
    ("address", RecordField::Address),
    ("address/apt", RecordField::Address),
    ("address/apt name", RecordField::Address),
    ("floor", RecordField::FloorNo),
    ("floor no", RecordField::FloorNo),
    ("house", RecordField::House),
    ("fat", RecordField::Fat),
    ("coordinates", RecordField::Coordinates),
    ("fiber ready", RecordField::FiberReady),
    ("job status", RecordField::JobStatus),
    ("status", RecordField::JobStatus),
    ("account number", RecordField::AccountNumber),
    ("dsr", RecordField::Dsr),
    ("agent name", RecordField::Dsr),
    ("dsr contact", RecordField::DsrContacts),
    ("dsr contacts", RecordField::DsrContacts),
    ("agent contact", RecordField::DsrContacts),
    ("team", RecordField::Team),
    ("comment", RecordField::Comment),
];

/// Synonyms ordered longest first, so "address/apt name" wins over "address".
static LABELS_BY_LENGTH: Lazy<Vec<(&'static str, RecordField)>> = Lazy::new(|| {
    let mut labels = LABELS.to_vec();
    labels.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    labels
});

static CONTACT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\+254|0)[17]\d{8}").expect("Invalid contact pattern"));
static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}\b").expect("Invalid email pattern")
});
static COORDINATES_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"-?\d{1,3}\.\d+,\s*-?\d{1,3}\.\d+").expect("Invalid coordinates pattern")
});
static ID_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{6,9}\b").expect("Invalid ID number pattern"));

/// Field values extracted from a message, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordDraft {
    fields: BTreeMap<RecordField, String>,
}

impl RecordDraft {
    pub fn get(&self, field: RecordField) -> Option<&str> {
        self.fields.get(&field).map(String::as_str)
    }

    pub fn set(&mut self, field: RecordField, value: impl Into<String>) {
        self.fields.insert(field, value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (RecordField, &str)> {
        self.fields.iter().map(|(f, v)| (*f, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse a pasted message.
pub fn parse_message(text: &str) -> RecordDraft {
    let mut draft = RecordDraft::default();

    for line in text.lines() {
        let Some((label, value)) = line.split_once(':') else {
            continue;
        };
        let label = normalize_label(label);
        let Some(field) = match_label(&label) else {
            continue;
        };
        let value = strip_emphasis(value);
        if value.is_empty() || value.eq_ignore_ascii_case("n/a") {
            continue;
        }
        draft.set(field, value);
    }

    let plain = text.replace('*', "");
    fallback(&mut draft, RecordField::Contact, &CONTACT_PATTERN, &plain);
    fallback(&mut draft, RecordField::Email, &EMAIL_PATTERN, &plain);
    fallback(&mut draft, RecordField::Coordinates, &COORDINATES_PATTERN, &plain);
    if draft.get(RecordField::IdNo).is_none() {
        if let Some(id_no) = find_id_number(&plain) {
            draft.set(RecordField::IdNo, id_no);
        }
    }

    debug!(fields = draft.len(), "Parsed pasted message");
    draft
}

fn normalize_label(label: &str) -> String {
    label
        .replace(['*', '_'], "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Exact synonym first, then the longest synonym contained in the label.
fn match_label(label: &str) -> Option<RecordField> {
    if label.is_empty() {
        return None;
    }
    LABELS
        .iter()
        .find(|(synonym, _)| *synonym == label)
        .or_else(|| {
            LABELS_BY_LENGTH
                .iter()
                .find(|(synonym, _)| label.contains(synonym))
        })
        .map(|(_, field)| *field)
}

/// Drop `*` anywhere and `_` pairs wrapping the whole value.
fn strip_emphasis(value: &str) -> String {
    let mut value = value.replace('*', "").trim().to_string();
    while value.len() >= 2 && value.starts_with('_') && value.ends_with('_') {
        value = value[1..value.len() - 1].trim().to_string();
    }
    value
}

fn fallback(draft: &mut RecordDraft, field: RecordField, pattern: &Regex, text: &str) {
    if draft.get(field).is_some() {
        return;
    }
    if let Some(found) = pattern.find(text) {
        draft.set(field, found.as_str());
    }
}

// A 6-9 digit run that is not part of a decimal number or phone number.
fn find_id_number(text: &str) -> Option<String> {
    ID_NUMBER_PATTERN
        .find_iter(text)
        .find(|m| {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            !matches!(before, Some('.') | Some('+') | Some('-'))
                && !matches!(after, Some('.'))
        })
        .map(|m| m.as_str().to_string())
}

/// One pending field change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub field: RecordField,
    pub current: String,
    pub incoming: String,
}

/// Parsed values compared with the form they would be merged into.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReview {
    changes: Vec<FieldChange>,
    locked: Vec<RecordField>,
    rejected: Vec<ValidationError>,
}

impl ImportReview {
    /// Compare `draft` with `current`. Fields in `locked` are never changed.
    pub fn new(draft: &RecordDraft, current: &InstallationRecord, locked: &[RecordField]) -> Self {
        let mut review = ImportReview::default();
        for (field, value) in draft.iter() {
            if locked.contains(&field) {
                review.locked.push(field);
                continue;
            }
            let incoming = match field.to_json(value) {
                Ok(serde_json::Value::String(s)) => s,
                Ok(_) => value.to_string(),
                Err(err) => {
                    review.rejected.push(err);
                    continue;
                }
            };
            let current = field.read(current);
            if current != incoming {
                review.changes.push(FieldChange {
                    field,
                    current,
                    incoming,
                });
            }
        }
        review
    }

    /// Fields that would change.
    pub fn changes(&self) -> &[FieldChange] {
        &self.changes
    }

    /// Parsed fields skipped because the form locks them.
    pub fn locked(&self) -> &[RecordField] {
        &self.locked
    }

    /// Parsed values that are not valid for their field.
    pub fn rejected(&self) -> &[ValidationError] {
        &self.rejected
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Write the changes into `record`. Returns the fields written.
    pub fn apply(self, record: &mut InstallationRecord) -> Vec<RecordField> {
        self.changes
            .into_iter()
            .filter(|change| change.field.write(record, &change.incoming).is_ok())
            .map(|change| change.field)
            .collect()
    }
}
