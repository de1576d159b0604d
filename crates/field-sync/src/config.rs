//! Configuration loaded from environment variables.

use std::env;

use record_store::validation::DEFAULT_CONTACT_PATTERN;
use record_store::ContactRule;

/// Default SQLite cache location.
pub const DEFAULT_DATABASE_URL: &str = "sqlite:fieldtrack.db?mode=rwc";

/// Team name whose supervisors see every team.
pub const DEFAULT_HQ_TEAM: &str = "HQ";

/// Unread messages shown per inbox.
pub const DEFAULT_INBOX_LIMIT: usize = 5;

/// Public Nominatim endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Sync layer configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// SQLite database URL for the offline cache.
    pub database_url: String,
    /// HQ sentinel team.
    pub hq_team: String,
    /// Maximum unread messages per inbox subscription.
    pub inbox_limit: usize,
    /// Mobile numbering rule for contact fields.
    pub contact_rule: ContactRule,
    /// Access code that grants the supervisor role at registration.
    /// Without one, every registration is an agent.
    pub supervisor_code: Option<String>,
    /// Geocoding service base URL.
    pub nominatim_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            hq_team: DEFAULT_HQ_TEAM.to_string(),
            inbox_limit: DEFAULT_INBOX_LIMIT,
            contact_rule: ContactRule::default(),
            supervisor_code: None,
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `FIELDTRACK_DATABASE_URL` | SQLite database URL | `sqlite:fieldtrack.db?mode=rwc` |
    /// | `FIELDTRACK_HQ_TEAM` | Team whose supervisors see all teams | `HQ` |
    /// | `FIELDTRACK_INBOX_LIMIT` | Unread messages per inbox | `5` |
    /// | `FIELDTRACK_CONTACT_PATTERN` | Mobile number regex | Kenyan mobile pattern |
    /// | `FIELDTRACK_SUPERVISOR_CODE` | Supervisor registration code | (none) |
    /// | `NOMINATIM_URL` | Geocoding service URL | `https://nominatim.openstreetmap.org` |
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("FIELDTRACK_DATABASE_URL")
            .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let hq_team =
            env::var("FIELDTRACK_HQ_TEAM").unwrap_or_else(|_| DEFAULT_HQ_TEAM.to_string());

        let inbox_limit = match env::var("FIELDTRACK_INBOX_LIMIT") {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(limit) if limit > 0 => limit,
                _ => return Err(ConfigError::InvalidInboxLimit(raw)),
            },
            Err(_) => DEFAULT_INBOX_LIMIT,
        };

        let pattern = env::var("FIELDTRACK_CONTACT_PATTERN")
            .unwrap_or_else(|_| DEFAULT_CONTACT_PATTERN.to_string());
        let contact_rule =
            ContactRule::new(&pattern).map_err(|e| ConfigError::InvalidContactPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;

        let supervisor_code = env::var("FIELDTRACK_SUPERVISOR_CODE")
            .ok()
            .filter(|code| !code.trim().is_empty());

        let nominatim_url =
            env::var("NOMINATIM_URL").unwrap_or_else(|_| DEFAULT_NOMINATIM_URL.to_string());

        Ok(Self {
            database_url,
            hq_team,
            inbox_limit,
            contact_rule,
            supervisor_code,
            nominatim_url,
        })
    }

    /// Whether `team` is the HQ sentinel.
    pub fn is_hq(&self, team: &str) -> bool {
        team == self.hq_team
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FIELDTRACK_INBOX_LIMIT must be a positive integer, got '{0}'")]
    InvalidInboxLimit(String),

    #[error("Invalid FIELDTRACK_CONTACT_PATTERN '{pattern}': {reason}")]
    InvalidContactPattern { pattern: String, reason: String },
}
