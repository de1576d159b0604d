//! Record form state: the draft being edited plus what is locked.
//!
//! New forms are pre-filled from the acting profile. The ownership fields
//! (`DSR`, `DSRContacts`, `Team`) are locked whenever a profile is present
//! and on every edit, and neither typing nor an import can change them.

use field_view::{parse_message, ImportReview};
use geocoder::{Coordinates, Geocoder, Place};
use record_store::{InstallationRecord, JobStatus, RecordField, RecordSource, UserProfile, ValidationError};
use tracing::debug;

/// An installation record being created or edited.
#[derive(Debug, Clone)]
pub struct RecordForm {
    original: Option<InstallationRecord>,
    draft: InstallationRecord,
    locked: Vec<RecordField>,
    source: RecordSource,
}

fn profile_fields() -> Vec<RecordField> {
    RecordField::ALL
        .into_iter()
        .filter(|f| f.is_profile_owned())
        .collect()
}

impl RecordForm {
    /// Blank form for a new record. Status starts as `Pending`.
    pub fn new(profile: Option<&UserProfile>) -> Self {
        let mut draft = InstallationRecord {
            job_status: JobStatus::Pending,
            ..Default::default()
        };
        let locked = match profile {
            Some(profile) => {
                draft.dsr = profile.display_name.clone();
                draft.dsr_contacts = profile.phone_number.clone();
                draft.team = profile.team.clone();
                profile_fields()
            }
            None => Vec::new(),
        };
        Self {
            original: None,
            draft,
            locked,
            source: RecordSource::Manual,
        }
    }

    /// Form for editing an existing record.
    pub fn edit(record: &InstallationRecord) -> Self {
        Self {
            original: Some(record.clone()),
            draft: record.clone(),
            locked: profile_fields(),
            source: record.source,
        }
    }

    pub fn draft(&self) -> &InstallationRecord {
        &self.draft
    }

    /// The record as stored, for edits.
    pub fn original(&self) -> Option<&InstallationRecord> {
        self.original.as_ref()
    }

    pub fn is_edit(&self) -> bool {
        self.original.is_some()
    }

    pub fn locked(&self) -> &[RecordField] {
        &self.locked
    }

    pub fn is_locked(&self, field: RecordField) -> bool {
        self.locked.contains(&field)
    }

    /// Manual, or whatsapp once an import has been applied.
    pub fn source(&self) -> RecordSource {
        self.source
    }

    pub fn get(&self, field: RecordField) -> String {
        field.read(&self.draft)
    }

    /// Set one field from text.
    pub fn set(&mut self, field: RecordField, value: &str) -> Result<(), ValidationError> {
        if self.is_locked(field) {
            return Err(ValidationError::ReadOnly(field.display_name().to_string()));
        }
        field.write(&mut self.draft, value)
    }

    /// Fields that differ from the stored record, or that are filled in on
    /// a new form. Locked fields are never reported.
    pub fn changed_fields(&self) -> Vec<RecordField> {
        RecordField::ALL
            .into_iter()
            .filter(|f| !self.is_locked(*f))
            .filter(|f| match &self.original {
                Some(original) => f.read(original) != f.read(&self.draft),
                None => !f.read(&self.draft).is_empty(),
            })
            .collect()
    }

    /// Parse a pasted message into a reviewable set of changes.
    pub fn review_import(&self, text: &str) -> ImportReview {
        ImportReview::new(&parse_message(text), &self.draft, &self.locked)
    }

    /// Merge a reviewed import into the draft.
    pub fn apply_import(&mut self, review: ImportReview) -> Vec<RecordField> {
        let applied = review.apply(&mut self.draft);
        if !applied.is_empty() {
            self.source = RecordSource::Whatsapp;
        }
        debug!(fields = applied.len(), "Applied import");
        applied
    }

    /// Pin the record to `at` and fill the road name when the geocoder
    /// knows it. A failed lookup keeps the road name already entered.
    pub async fn set_location(&mut self, at: Coordinates, geocoder: &dyn Geocoder) -> Option<Place> {
        self.draft.coordinates = at.to_string();
        let place = geocoder.reverse(at).await?;
        if let Some(road) = &place.road {
            self.draft.road_name = road.clone();
        }
        Some(place)
    }

    /// Search for a place by name and pin the record there.
    pub async fn search_location(&mut self, text: &str, geocoder: &dyn Geocoder) -> Option<Coordinates> {
        let at = geocoder.search(text).await?;
        self.set_location(at, geocoder).await;
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn agent_profile() -> UserProfile {
        UserProfile {
            uid: "u1".to_string(),
            display_name: "Grace Wanjiru".to_string(),
            phone_number: "0722000111".to_string(),
            team: "Julia".to_string(),
            email: "grace@example.com".to_string(),
            role: Default::default(),
        }
    }

    struct FixedGeocoder(Option<&'static str>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn reverse(&self, at: Coordinates) -> Option<Place> {
            self.0.map(|road| Place {
                coordinates: at,
                road: Some(road.to_string()),
                area: None,
                display_name: road.to_string(),
            })
        }

        async fn search(&self, _text: &str) -> Option<Coordinates> {
            self.0.and(Coordinates::new(-1.25, 36.8).ok())
        }
    }

    #[test]
    fn test_new_form_is_prefilled_and_locked() {
        let profile = agent_profile();
        let mut form = RecordForm::new(Some(&profile));
        assert_eq!(form.draft().dsr, "Grace Wanjiru");
        assert_eq!(form.draft().team, "Julia");
        assert_eq!(form.draft().job_status, JobStatus::Pending);

        assert!(matches!(
            form.set(RecordField::Team, "BigTex"),
            Err(ValidationError::ReadOnly(_))
        ));
        form.set(RecordField::Name, "Jane").unwrap();
        assert_eq!(form.changed_fields(), vec![RecordField::Name, RecordField::JobStatus]);

        let unowned = RecordForm::new(None);
        assert!(unowned.locked().is_empty());
    }

    #[test]
    fn test_import_keeps_locked_fields() {
        let profile = agent_profile();
        let mut form = RecordForm::new(Some(&profile));
        let review = form.review_import("*Name:* Peter\n*Team:* Straton\nContact: 0712345678");
        assert_eq!(review.locked(), &[RecordField::Team]);

        let applied = form.apply_import(review);
        assert!(applied.contains(&RecordField::Name));
        assert_eq!(form.draft().team, "Julia");
        assert_eq!(form.source(), RecordSource::Whatsapp);
    }

    #[test]
    fn test_edit_reports_only_changes() {
        let record = InstallationRecord {
            id: "r1".into(),
            name: "Jane".into(),
            contact: "0712345678".into(),
            team: "Julia".into(),
            ..Default::default()
        };
        let mut form = RecordForm::edit(&record);
        assert!(form.changed_fields().is_empty());

        form.set(RecordField::Comment, "gate code 44").unwrap();
        form.set(RecordField::Name, "Jane").unwrap();
        assert_eq!(form.changed_fields(), vec![RecordField::Comment]);
    }

    #[tokio::test]
    async fn test_location_fills_road_best_effort() {
        let mut form = RecordForm::new(None);
        form.set(RecordField::RoadName, "Typed Road").unwrap();
        let at = Coordinates::new(-1.2195, 36.8436).unwrap();

        assert!(form.set_location(at, &FixedGeocoder(None)).await.is_none());
        assert_eq!(form.draft().coordinates, "-1.219500,36.843600");
        assert_eq!(form.draft().road_name, "Typed Road");

        form.set_location(at, &FixedGeocoder(Some("Kiambu Road"))).await;
        assert_eq!(form.draft().road_name, "Kiambu Road");

        let found = form.search_location("Ridgeways", &FixedGeocoder(Some("Kiambu Road"))).await;
        assert_eq!(found, Coordinates::new(-1.25, 36.8).ok());
        assert_eq!(form.draft().coordinates, "-1.250000,36.800000");
    }
}
