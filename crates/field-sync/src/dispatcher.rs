//! Write actions: validate, stamp, write.
//!
//! The dispatcher never touches view state. A successful write shows up in
//! the view through the live queries like any other change, so a write that
//! completes after the view was torn down has nothing to mutate.

use std::sync::Arc;

use field_view::share_link;
use record_store::validation::{validate_content, validate_email, validate_required};
use record_store::{
    timestamp, Announcement, Collection, CollectionDocument, ContactRule, DirectMessage,
    DocumentStore, Fields, InstallationRecord, Note, RecordField, Role, UserProfile,
};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::error::{ActionError, Result};
use crate::form::RecordForm;
use crate::identity::Identity;

/// The signed-in identity together with its profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub identity: Identity,
    pub profile: UserProfile,
}

impl Actor {
    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    pub fn is_supervisor(&self) -> bool {
        self.profile.is_supervisor()
    }
}

/// Result of a record save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SavedRecord {
    pub id: String,
    /// Pre-filled chat link, when sharing was requested.
    pub share_link: Option<String>,
}

/// What a two-step delete targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteTarget {
    Record(String),
    Note(String),
}

impl DeleteTarget {
    fn collection(&self) -> Collection {
        match self {
            DeleteTarget::Record(_) => Collection::Installations,
            DeleteTarget::Note(_) => Collection::Notes,
        }
    }

    fn id(&self) -> &str {
        match self {
            DeleteTarget::Record(id) | DeleteTarget::Note(id) => id,
        }
    }
}

/// A delete that has been checked and awaits confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a pending deletion does nothing until confirmed"]
pub struct PendingDeletion {
    collection: Collection,
    id: String,
    owner: String,
}

impl PendingDeletion {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Result of a reply: the send, and separately the mark-read of the
/// message replied to.
#[derive(Debug)]
pub struct ReplyOutcome {
    pub message_id: String,
    pub mark_read: Result<()>,
}

/// Profile details entered at registration.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub display_name: String,
    pub phone_number: String,
    pub team: String,
    pub access_code: Option<String>,
}

/// Validates and performs every user-initiated write.
pub struct ActionDispatcher {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    contact_rule: ContactRule,
    supervisor_code: Option<String>,
}

impl ActionDispatcher {
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, config: &SyncConfig) -> Self {
        Self {
            store,
            clock,
            contact_rule: config.contact_rule.clone(),
            supervisor_code: config.supervisor_code.clone(),
        }
    }

    fn validate_record(&self, record: &InstallationRecord) -> Result<()> {
        validate_required("name", &record.name)?;
        self.contact_rule.validate("contact", &record.contact)?;
        if !record.alt_contact.trim().is_empty() {
            self.contact_rule.validate("alt contact", &record.alt_contact)?;
        }
        if !record.email.trim().is_empty() {
            validate_email(&record.email)?;
        }
        Ok(())
    }

    /// Save a new record owned by `actor`.
    ///
    /// With `share` set, the result carries a chat link for the saved
    /// record. The link is built after the write and cannot fail it.
    pub async fn create_record(&self, actor: &Actor, form: &RecordForm, share: bool) -> Result<SavedRecord> {
        let mut record = form.draft().clone();
        self.validate_record(&record)?;

        let now = self.clock.now();
        record.id = String::new();
        record.created_by_uid = actor.uid().to_string();
        record.created_at = now;
        record.updated_at = now;
        record.synced = true;
        record.edited = false;
        record.source = form.source();
        record.dsr = actor.profile.display_name.clone();
        record.dsr_contacts = actor.profile.phone_number.clone();
        record.team = actor.profile.team.clone();

        let id = self
            .store
            .add(Collection::Installations, record.to_fields()?)
            .await?;
        record.id = id.clone();
        info!(id = %id, uid = %actor.uid(), source = ?record.source, "Record created");

        Ok(SavedRecord {
            id,
            share_link: share.then(|| share_link(&record, None)),
        })
    }

    /// Save the changed fields of an edited record.
    ///
    /// The owner and supervisors may edit. Ownership and creation fields are
    /// never written. Returns the fields that were sent.
    pub async fn update_record(&self, actor: &Actor, form: &RecordForm) -> Result<Vec<RecordField>> {
        let original = form.original().ok_or(ActionError::Unsaved)?;
        if original.id.is_empty() {
            return Err(ActionError::Unsaved);
        }
        if original.created_by_uid != actor.uid() && !actor.is_supervisor() {
            return Err(ActionError::NotOwner("edit this record"));
        }
        self.validate_record(form.draft())?;

        let changed = form.changed_fields();
        let mut fields = Fields::new();
        for field in &changed {
            fields.insert(
                field.wire_name().to_string(),
                field.to_json(&form.get(*field))?,
            );
        }
        fields.insert(
            "updatedAt".to_string(),
            Value::String(timestamp::format(&self.clock.now())),
        );
        fields.insert("edited".to_string(), Value::Bool(true));
        fields.insert("synced".to_string(), Value::Bool(true));

        self.store
            .update(Collection::Installations, &original.id, fields)
            .await?;
        info!(id = %original.id, uid = %actor.uid(), fields = changed.len(), "Record updated");
        Ok(changed)
    }

    /// First step of a delete: check the target exists and `actor` owns it.
    pub async fn request_delete(&self, actor: &Actor, target: DeleteTarget) -> Result<PendingDeletion> {
        let collection = target.collection();
        let id = target.id();
        let raw = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| ActionError::NotFound {
                collection,
                id: id.to_string(),
            })?;

        let owner = raw
            .fields
            .get("createdByUid")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if owner != actor.uid() {
            return Err(ActionError::NotOwner("delete this"));
        }

        Ok(PendingDeletion {
            collection,
            id: id.to_string(),
            owner: owner.to_string(),
        })
    }

    /// Second step of a delete.
    pub async fn confirm_delete(&self, actor: &Actor, pending: PendingDeletion) -> Result<()> {
        if pending.owner != actor.uid() {
            return Err(ActionError::NotOwner("delete this"));
        }
        self.store.delete(pending.collection, &pending.id).await?;
        info!(collection = %pending.collection, id = %pending.id, "Deleted");
        Ok(())
    }

    /// Add a note to the actor's scratchpad.
    pub async fn add_note(&self, actor: &Actor, content: &str) -> Result<String> {
        validate_content("note", content)?;
        let note = Note {
            id: String::new(),
            content: content.trim().to_string(),
            created_at: self.clock.now(),
            created_by_uid: actor.uid().to_string(),
        };
        let id = self.store.add(Collection::Notes, note.to_fields()?).await?;
        info!(id = %id, uid = %actor.uid(), "Note added");
        Ok(id)
    }

    /// Send a direct message to `recipient`, once one is resolved.
    pub async fn send_message(&self, actor: &Actor, recipient: Option<&str>, content: &str) -> Result<String> {
        validate_content("message", content)?;
        let recipient = recipient
            .map(str::trim)
            .filter(|uid| !uid.is_empty())
            .ok_or(ActionError::NoRecipient)?;

        let message = DirectMessage {
            id: String::new(),
            recipient_uid: recipient.to_string(),
            sender_uid: actor.uid().to_string(),
            sender_name: actor.profile.display_name.clone(),
            content: content.trim().to_string(),
            read: false,
            created_at: self.clock.now(),
        };
        let id = self
            .store
            .add(Collection::Messages, message.to_fields()?)
            .await?;
        info!(id = %id, from = %actor.uid(), to = %recipient, "Message sent");
        Ok(id)
    }

    /// Reply to `original`, then mark it read.
    ///
    /// A failed mark-read is reported in the outcome; the reply itself has
    /// already been sent.
    pub async fn reply(&self, actor: &Actor, original: &DirectMessage, content: &str) -> Result<ReplyOutcome> {
        let message_id = self
            .send_message(actor, Some(&original.sender_uid), content)
            .await?;

        let mark_read = self.mark_read(actor, original).await;
        if let Err(e) = &mark_read {
            warn!(message = %original.id, error = %e, "Reply sent but mark-read failed");
        }
        Ok(ReplyOutcome {
            message_id,
            mark_read,
        })
    }

    /// Mark a received message read.
    pub async fn mark_read(&self, actor: &Actor, message: &DirectMessage) -> Result<()> {
        if message.recipient_uid != actor.uid() {
            return Err(ActionError::NotOwner("mark this message read"));
        }
        let mut fields = Fields::new();
        fields.insert("read".to_string(), Value::Bool(true));
        self.store
            .update(Collection::Messages, &message.id, fields)
            .await?;
        Ok(())
    }

    /// Broadcast to the poster's own team.
    pub async fn post_announcement(&self, actor: &Actor, title: &str, content: &str) -> Result<String> {
        if !actor.is_supervisor() {
            return Err(ActionError::NotSupervisor("post announcements"));
        }
        validate_required("title", title)?;
        validate_content("content", content)?;

        let announcement = Announcement {
            id: String::new(),
            title: title.trim().to_string(),
            content: content.trim().to_string(),
            team: actor.profile.team.clone(),
            created_at: self.clock.now(),
            created_by: actor.profile.display_name.clone(),
        };
        let id = self
            .store
            .add(Collection::Announcements, announcement.to_fields()?)
            .await?;
        info!(id = %id, team = %announcement.team, "Announcement posted");
        Ok(id)
    }

    /// Create the profile for a freshly authenticated identity.
    ///
    /// The role is supervisor only when a supervisor code is configured
    /// and `access_code` matches it.
    pub async fn register(&self, identity: &Identity, registration: &Registration) -> Result<UserProfile> {
        validate_required("display name", &registration.display_name)?;
        self.contact_rule
            .validate("phone number", &registration.phone_number)?;
        validate_required("team", &registration.team)?;

        if self.store.get(Collection::Users, &identity.uid).await?.is_some() {
            warn!(uid = %identity.uid, "Registration refused, profile exists");
            return Err(ActionError::AlreadyRegistered(identity.uid.clone()));
        }

        let role = match (&self.supervisor_code, &registration.access_code) {
            (Some(expected), Some(given)) if given.trim() == expected.as_str() => Role::Supervisor,
            (_, Some(_)) => {
                warn!(uid = %identity.uid, "Access code rejected, registering as agent");
                Role::Dsr
            }
            _ => Role::Dsr,
        };

        let profile = UserProfile {
            uid: identity.uid.clone(),
            display_name: registration.display_name.trim().to_string(),
            phone_number: registration.phone_number.trim().to_string(),
            team: registration.team.trim().to_string(),
            email: identity.email.clone(),
            role,
        };
        self.store
            .set(Collection::Users, &identity.uid, profile.to_fields()?)
            .await?;
        info!(uid = %identity.uid, role = %role, team = %profile.team, "Profile registered");
        Ok(profile)
    }
}
