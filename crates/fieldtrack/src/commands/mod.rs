//! Subcommand implementations.

pub mod export;
pub mod parse;
pub mod report;
pub mod seed;
pub mod watch;

use field_sync::{plan_for, SyncConfig};
use field_view::{ViewMode, ViewModel};
use record_store::{DocumentStore, Role, Snapshot, UserProfile};

use crate::error::Result;
use crate::ViewArgs;

/// Load a supervisor overview for `args.team` (every team when unset) with
/// the requested filters applied.
///
/// Uses the same query plan as a supervisor session, fetched once.
pub async fn load_overview(
    store: &dyn DocumentStore,
    config: &SyncConfig,
    args: &ViewArgs,
) -> Result<ViewModel> {
    let scope = UserProfile {
        uid: "fieldtrack-cli".to_string(),
        display_name: "FieldTrack CLI".to_string(),
        phone_number: String::new(),
        team: args.team.clone().unwrap_or_else(|| config.hq_team.clone()),
        email: String::new(),
        role: Role::Supervisor,
    };

    let mut model = ViewModel::new(ViewMode::Supervisor);
    for (slot, query) in plan_for(&scope, ViewMode::Supervisor, config).iter() {
        let docs = store.fetch(query).await?;
        model.apply(slot, &Snapshot { sequence: 1, docs })?;
    }

    model.set_range(args.range);
    model.set_status(args.status);
    model.set_search(args.search.clone());
    model.select_agent(args.agent.clone());
    Ok(model)
}
