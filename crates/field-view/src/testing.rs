//! Record and profile builders shared by unit tests.

use chrono::{DateTime, Utc};
use record_store::{InstallationRecord, JobStatus, Role, UserProfile};

pub fn record(id: &str, uid: &str, status: JobStatus, updated_at: DateTime<Utc>) -> InstallationRecord {
    InstallationRecord {
        id: id.to_string(),
        created_by_uid: uid.to_string(),
        created_at: updated_at,
        updated_at,
        synced: true,
        name: "Jane Doe".to_string(),
        contact: "0712345678".to_string(),
        job_status: status,
        dsr: format!("Agent {}", uid),
        dsr_contacts: "0799000000".to_string(),
        team: "Julia".to_string(),
        ..Default::default()
    }
}

pub fn agent(uid: &str) -> UserProfile {
    UserProfile {
        uid: uid.to_string(),
        display_name: format!("Agent {}", uid),
        phone_number: "0799000000".to_string(),
        team: "Julia".to_string(),
        email: format!("{}@fieldtrack.test", uid),
        role: Role::Dsr,
    }
}
