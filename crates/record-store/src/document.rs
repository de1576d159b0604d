//! Raw and typed documents.
//!
//! The store exchanges untyped JSON bodies ([`RawDocument`]). Everything
//! above the store works with typed records decoded through
//! [`CollectionDocument`], so a malformed body fails at the boundary instead
//! of leaking empty fields into the reducer.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Result, StoreError};
use crate::models::{Announcement, DirectMessage, InstallationRecord, Note, UserProfile};
use crate::query::Collection;

/// A document body: top-level JSON object.
pub type Fields = Map<String, Value>;

/// A document as the store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDocument {
    pub id: String,
    pub fields: Fields,
}

impl RawDocument {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// One full result set delivered by a live subscription.
///
/// Each snapshot supersedes the previous one from the same subscription.
/// `sequence` increases by one per delivery, starting at 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub sequence: u64,
    pub docs: Vec<RawDocument>,
}

impl Snapshot {
    /// Decode every document, failing on the first malformed one.
    pub fn decode<T: CollectionDocument>(&self) -> Result<Vec<T>> {
        self.docs.iter().map(T::decode).collect()
    }
}

/// A typed record stored in a fixed collection.
pub trait CollectionDocument: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// Collection this type lives in.
    const COLLECTION: Collection;

    /// Body key that mirrors the document id.
    const ID_FIELD: &'static str = "id";

    /// Document id.
    fn doc_id(&self) -> &str;

    /// Decode a raw document, injecting the document id into the body.
    fn decode(raw: &RawDocument) -> Result<Self> {
        let mut fields = raw.fields.clone();
        fields.insert(Self::ID_FIELD.to_string(), Value::String(raw.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(|e| StoreError::Malformed {
            collection: Self::COLLECTION,
            id: raw.id.clone(),
            reason: e.to_string(),
        })
    }

    /// Encode into a body without the id key. The store owns the id.
    fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            Value::Object(mut fields) => {
                fields.remove(Self::ID_FIELD);
                Ok(fields)
            }
            other => Err(StoreError::Malformed {
                collection: Self::COLLECTION,
                id: self.doc_id().to_string(),
                reason: format!("expected an object, got {}", other),
            }),
        }
    }
}

impl CollectionDocument for InstallationRecord {
    const COLLECTION: Collection = Collection::Installations;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl CollectionDocument for UserProfile {
    const COLLECTION: Collection = Collection::Users;
    const ID_FIELD: &'static str = "uid";

    fn doc_id(&self) -> &str {
        &self.uid
    }
}

impl CollectionDocument for Note {
    const COLLECTION: Collection = Collection::Notes;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl CollectionDocument for Announcement {
    const COLLECTION: Collection = Collection::Announcements;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

impl CollectionDocument for DirectMessage {
    const COLLECTION: Collection = Collection::Messages;

    fn doc_id(&self) -> &str {
        &self.id
    }
}

/// A decoded document tagged by collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Installation(InstallationRecord),
    User(UserProfile),
    Note(Note),
    Announcement(Announcement),
    Message(DirectMessage),
}

impl Document {
    /// Decode a raw document from the given collection.
    pub fn decode(collection: Collection, raw: &RawDocument) -> Result<Self> {
        Ok(match collection {
            Collection::Installations => Document::Installation(InstallationRecord::decode(raw)?),
            Collection::Users => Document::User(UserProfile::decode(raw)?),
            Collection::Notes => Document::Note(Note::decode(raw)?),
            Collection::Announcements => Document::Announcement(Announcement::decode(raw)?),
            Collection::Messages => Document::Message(DirectMessage::decode(raw)?),
        })
    }

    pub fn collection(&self) -> Collection {
        match self {
            Document::Installation(_) => Collection::Installations,
            Document::User(_) => Collection::Users,
            Document::Note(_) => Collection::Notes,
            Document::Announcement(_) => Collection::Announcements,
            Document::Message(_) => Collection::Messages,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Document::Installation(d) => d.doc_id(),
            Document::User(d) => d.doc_id(),
            Document::Note(d) => d.doc_id(),
            Document::Announcement(d) => d.doc_id(),
            Document::Message(d) => d.doc_id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(id: &str, value: Value) -> RawDocument {
        RawDocument::new(id, value.as_object().cloned().unwrap())
    }

    #[test]
    fn test_decode_injects_id() {
        let doc = raw(
            "n1",
            json!({
                "content": "call back",
                "createdAt": "2024-05-01T09:30:00.000Z",
                "createdByUid": "u1"
            }),
        );
        let note = Note::decode(&doc).unwrap();
        assert_eq!(note.id, "n1");
        assert_eq!(note.content, "call back");
    }

    #[test]
    fn test_decode_profile_uses_uid() {
        let doc = raw("u9", json!({"displayName": "Sup", "team": "HQ", "role": "supervisor"}));
        let profile = UserProfile::decode(&doc).unwrap();
        assert_eq!(profile.uid, "u9");
        assert!(profile.is_supervisor());
    }

    #[test]
    fn test_malformed_document_names_collection_and_id() {
        let doc = raw("m1", json!({"recipientUid": "u1", "content": "hi"}));
        let err = DirectMessage::decode(&doc).unwrap_err();
        match err {
            StoreError::Malformed { collection, id, .. } => {
                assert_eq!(collection, Collection::Messages);
                assert_eq!(id, "m1");
            }
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_snapshot_decode_fails_fast() {
        let good = raw(
            "a1",
            json!({
                "title": "t", "content": "c", "team": "Julia",
                "createdAt": "2024-05-01T09:30:00.000Z"
            }),
        );
        let bad = raw("a2", json!({"title": "t", "team": "Julia"}));
        let snapshot = Snapshot {
            sequence: 1,
            docs: vec![good, bad],
        };
        assert!(snapshot.decode::<Announcement>().is_err());
    }

    #[test]
    fn test_to_fields_strips_generated_id() {
        let note = Note {
            id: String::new(),
            content: "x".into(),
            created_at: chrono::Utc::now(),
            created_by_uid: "u1".into(),
        };
        let fields = note.to_fields().unwrap();
        assert!(!fields.contains_key("id"));
        assert_eq!(fields["createdByUid"], json!("u1"));
    }

    #[test]
    fn test_document_enum_dispatch() {
        let doc = raw("u1", json!({"displayName": "A", "team": "Julia"}));
        let decoded = Document::decode(Collection::Users, &doc).unwrap();
        assert_eq!(decoded.collection(), Collection::Users);
        assert_eq!(decoded.id(), "u1");
    }
}
