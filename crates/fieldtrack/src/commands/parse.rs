//! Dry run of the lead-message import on a blank form.

use std::fmt::Write;
use std::io::Read;
use std::path::Path;

use field_sync::RecordForm;
use field_view::ImportReview;

use crate::error::Result;

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(path)?)
    }
}

/// Describe what importing a message would do to a new record form.
pub fn format_review(review: &ImportReview) -> String {
    let mut out = String::new();
    if review.is_empty() && review.rejected().is_empty() {
        let _ = writeln!(out, "No recognised fields.");
        return out;
    }

    for change in review.changes() {
        let _ = writeln!(out, "  {:<16} {}", change.field.display_name(), change.incoming);
    }
    for field in review.locked() {
        let _ = writeln!(out, "  {:<16} (locked, kept from profile)", field.display_name());
    }
    for error in review.rejected() {
        let _ = writeln!(out, "  rejected: {}", error);
    }
    out
}

pub fn run(path: &Path) -> Result<()> {
    let text = read_input(path)?;
    let review = RecordForm::new(None).review_import(&text);
    print!("{}", format_review(&review));
    Ok(())
}
