//! Plain-text rendering of a record for chat confirmation.
//!
//! The output is deterministic: fixed field order, one `Label: value` line
//! per field, key fields in `*bold*`. The same labels are understood by
//! [`parse_message`](crate::import::parse_message).

use record_store::{InstallationRecord, RecordField};

/// Base of the outbound chat link.
pub const SHARE_BASE_URL: &str = "https://wa.me/";

/// Country code substituted for a leading `0` in recipient numbers.
pub const DEFAULT_COUNTRY_CODE: &str = "254";

enum Line {
    Field(&'static str, RecordField, bool),
    Blank,
}

const LINES: &[Line] = &[
    Line::Field("Title", RecordField::Title, false),
    Line::Field("Name", RecordField::Name, true),
    Line::Field("Contact", RecordField::Contact, true),
    Line::Field("Alt Contact", RecordField::AltContact, false),
    Line::Field("Email", RecordField::Email, true),
    Line::Field("ID", RecordField::IdNo, false),
    Line::Field("Road", RecordField::RoadName, true),
    Line::Field("Address", RecordField::Address, true),
    Line::Field("Floor", RecordField::FloorNo, true),
    Line::Field("House", RecordField::House, true),
    Line::Field("FAT", RecordField::Fat, true),
    Line::Field("Coordinates", RecordField::Coordinates, true),
    Line::Field("Fiber Ready", RecordField::FiberReady, true),
    Line::Field("Job Status", RecordField::JobStatus, true),
    Line::Field("Account Number", RecordField::AccountNumber, false),
    Line::Blank,
    Line::Field("DSR", RecordField::Dsr, true),
    Line::Field("DSR Contact", RecordField::DsrContacts, true),
    Line::Field("Team", RecordField::Team, true),
    Line::Field("Comment", RecordField::Comment, false),
];

/// Render `record` as a chat message.
///
/// Line breaks inside values are flattened to spaces so every field stays
/// on its own line.
pub fn share_text(record: &InstallationRecord) -> String {
    let mut out = String::new();
    for line in LINES {
        match line {
            Line::Field(label, field, bold) => {
                let value = field.read(record).replace(['\r', '\n'], " ");
                if *bold {
                    out.push_str(&format!("*{}:* {}\n", label, value));
                } else {
                    out.push_str(&format!("{}: {}\n", label, value));
                }
            }
            Line::Blank => out.push('\n'),
        }
    }
    out
}

/// Chat link carrying the rendered record, optionally addressed to `phone`.
pub fn share_link(record: &InstallationRecord, phone: Option<&str>) -> String {
    let text = urlencoding::encode(&share_text(record)).into_owned();
    match phone.map(international_digits).filter(|p| !p.is_empty()) {
        Some(number) => format!("{}{}?text={}", SHARE_BASE_URL, number, text),
        None => format!("{}?text={}", SHARE_BASE_URL, text),
    }
}

fn international_digits(phone: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix('0') {
        Some(local) if !phone.trim_start().starts_with('+') => {
            format!("{}{}", DEFAULT_COUNTRY_CODE, local)
        }
        _ => digits,
    }
}
