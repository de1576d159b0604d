//! CSV export of a filtered record list.
//!
//! Fixed columns, UTF-8 with a byte-order mark so spreadsheet tools pick the
//! right encoding, `\n` between rows. A field is quoted when it contains a
//! comma, quote, CR or LF, with embedded quotes doubled.

use std::borrow::Cow;
use std::fmt::Display;

use chrono::{DateTime, TimeZone};
use record_store::{InstallationRecord, RecordField};

/// Byte-order mark written before the header.
pub const BOM: char = '\u{feff}';

/// Column headers, in order.
pub const HEADERS: [&str; 15] = [
    "Date",
    "Title",
    "Name",
    "Contact",
    "Alt Contact",
    "Email",
    "Road Name",
    "Coordinates",
    "Address/Apt",
    "FAT",
    "Status",
    "Agent Name",
    "Agent Contact",
    "Team",
    "Comment",
];

/// Record fields behind every column after `Date`.
const COLUMNS: [RecordField; 14] = [
    RecordField::Title,
    RecordField::Name,
    RecordField::Contact,
    RecordField::AltContact,
    RecordField::Email,
    RecordField::RoadName,
    RecordField::Coordinates,
    RecordField::Address,
    RecordField::Fat,
    RecordField::JobStatus,
    RecordField::Dsr,
    RecordField::DsrContacts,
    RecordField::Team,
    RecordField::Comment,
];

/// Quote a value if needed.
pub fn escape_field(value: &str) -> Cow<'_, str> {
    if value.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", value.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(value)
    }
}

/// Render `records` as CSV. The `Date` column shows `updatedAt` in `tz`.
pub fn to_csv<Tz>(records: &[InstallationRecord], tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::new();
    out.push(BOM);
    out.push_str(&HEADERS.join(","));

    for record in records {
        out.push('\n');
        let date = record
            .updated_at
            .with_timezone(tz)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string();
        let mut row = vec![escape_field(&date).into_owned()];
        row.extend(
            COLUMNS
                .iter()
                .map(|field| escape_field(&field.read(record)).into_owned()),
        );
        out.push_str(&row.join(","));
    }
    out
}

/// `FiberTrack_Export_<YYYY-MM-DD>.csv` for the date of `now`.
pub fn export_file_name<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("FiberTrack_Export_{}.csv", now.format("%Y-%m-%d"))
}
