//! CSV export of the filtered team record list.

use std::path::{Path, PathBuf};

use chrono::Local;
use field_view::{export_file_name, to_csv, RenderedView};
use record_store::DocumentStore;
use tracing::info;

use crate::commands::load_overview;
use crate::error::Result;
use crate::state::AppState;
use crate::ViewArgs;

/// Write the records matching `args` to `out`. Returns the number of rows.
pub async fn export(
    store: &dyn DocumentStore,
    config: &field_sync::SyncConfig,
    args: &ViewArgs,
    out: &Path,
) -> Result<usize> {
    let model = load_overview(store, config, args).await?;
    let records = match model.render(&Local::now()) {
        RenderedView::Supervisor(view) => view.records,
        RenderedView::Field(view) => view.records,
    };

    std::fs::write(out, to_csv(&records, &Local))?;
    info!(path = %out.display(), rows = records.len(), "Export written");
    Ok(records.len())
}

pub async fn run(state: &AppState, args: &ViewArgs, out: Option<PathBuf>) -> Result<()> {
    let out = out.unwrap_or_else(|| PathBuf::from(export_file_name(&Local::now())));
    let rows = export(state.store.as_ref(), &state.config, args, &out).await?;
    println!("Wrote {} records to {}", rows, out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::seed::seed;
    use field_sync::SyncConfig;
    use field_view::{StatusFilter, TimeRange};
    use record_store::{JobStatus, MemoryStore};

    fn args(team: Option<&str>, status: StatusFilter) -> ViewArgs {
        ViewArgs {
            team: team.map(str::to_string),
            range: TimeRange::All,
            status,
            search: String::new(),
            agent: None,
        }
    }

    #[tokio::test]
    async fn test_export_team_records() {
        let store = MemoryStore::new();
        seed(&store, 5, 10).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("north.csv");

        let rows = export(
            &store,
            &SyncConfig::default(),
            &args(Some("Nairobi North"), StatusFilter::All),
            &out,
        )
        .await
        .unwrap();
        assert_eq!(rows, 15);

        let csv = std::fs::read_to_string(&out).unwrap();
        assert!(csv.starts_with('\u{feff}'));
        assert_eq!(csv.lines().count(), 16);
        assert!(csv.lines().skip(1).all(|line| line.contains("Nairobi North")));
    }

    #[tokio::test]
    async fn test_export_status_filter() {
        let store = MemoryStore::new();
        seed(&store, 5, 10).await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("installed.csv");

        export(
            &store,
            &SyncConfig::default(),
            &args(None, StatusFilter::Only(JobStatus::Installed)),
            &out,
        )
        .await
        .unwrap();

        let csv = std::fs::read_to_string(&out).unwrap();
        assert!(csv.lines().skip(1).all(|line| line.contains(",Installed,")));
    }
}
