//! Team overview: KPIs, leaderboard and per-agent activity.

use std::fmt::Write;

use chrono::Local;
use field_view::{RenderedView, SupervisorView};

use crate::commands::load_overview;
use crate::error::Result;
use crate::state::AppState;
use crate::ViewArgs;

/// Plain-text report of a supervisor overview.
pub fn format_report(view: &SupervisorView, scope: &str) -> String {
    let mut out = String::new();
    let stats = &view.stats;
    let _ = writeln!(out, "{} | {}", scope, view.filters.range);
    let _ = writeln!(
        out,
        "Total {}  Installed {}  Pending {}  Forwarded {}  Lead {}  Rejected {}",
        stats.total, stats.installed, stats.pending, stats.forwarded, stats.lead, stats.rejected
    );

    let _ = writeln!(out, "\nLeaderboard");
    if view.leaderboard.is_empty() {
        let _ = writeln!(out, "  (no agents)");
    }
    for standing in view.leaderboard.iter() {
        let _ = writeln!(
            out,
            "  {:>2}. {:<24} {:>4} pts  ({} installs / {} total)",
            standing.rank, standing.name, standing.score, standing.installs, standing.total
        );
    }

    let _ = writeln!(out, "\nSubmissions");
    for agent in &view.activity {
        let _ = writeln!(
            out,
            "  {:<24} {:>4} in range  {:>4} all time  {:>5.1}%",
            agent.name,
            agent.in_range,
            agent.all_time,
            agent.share * 100.0
        );
    }

    let _ = writeln!(out, "\n{} matching records", view.records.len());
    out
}

pub async fn run(state: &AppState, args: &ViewArgs, json: bool) -> Result<()> {
    let model = load_overview(state.store.as_ref(), &state.config, args).await?;
    let rendered = model.render(&Local::now());

    if json {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    if let RenderedView::Supervisor(view) = &rendered {
        let scope = args.team.as_deref().unwrap_or("All teams");
        print!("{}", format_report(view, scope));
    }
    Ok(())
}
