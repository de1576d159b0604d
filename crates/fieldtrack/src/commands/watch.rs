//! Follow one user's live dashboard until interrupted.

use std::sync::Arc;

use field_sync::{
    Identity, IdentityProvider, LocalIdentityProvider, Session, SessionState, SessionUpdate,
    SystemClock,
};
use field_view::RenderedView;
use tracing::{info, warn};

use crate::error::Result;
use crate::state::AppState;

/// One-line summary of a rendered view.
pub fn summarize(view: &RenderedView) -> String {
    match view {
        RenderedView::Field(view) => format!(
            "field | {} records | {} installed | {} pending | {} unsynced | {} unread | {} notes",
            view.stats.total,
            view.stats.installed,
            view.stats.pending,
            view.stats.unsynced,
            view.inbox.len(),
            view.notes.len()
        ),
        RenderedView::Supervisor(view) => {
            let leader = view
                .leaderboard
                .iter()
                .next()
                .map(|s| format!("{} ({} pts)", s.name, s.score))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "supervisor | {} | {} records | {} installed | {} agents | leader {} | {} unread",
                view.filters.range,
                view.stats.total,
                view.stats.installed,
                view.agents.len(),
                leader,
                view.inbox.len()
            )
        }
    }
}

fn describe(state: &SessionState) -> String {
    match state {
        SessionState::SignedOut => "signed out".to_string(),
        SessionState::NeedsProfile(identity) => {
            format!("{} has no profile yet; register first", identity.uid)
        }
        SessionState::PermissionDenied { reason, .. } => format!("permission denied: {}", reason),
        SessionState::Unavailable { reason, .. } => format!("unavailable: {}", reason),
        SessionState::Active { profile, view, .. } => {
            format!("{} ({}) on {:?} view", profile.display_name, profile.team, view)
        }
    }
}

pub async fn run(state: &AppState, uid: String, email: String) -> Result<()> {
    let provider = LocalIdentityProvider::new();
    let mut session = Session::new(
        state.store.clone(),
        provider.watch(),
        state.config.clone(),
        Arc::new(SystemClock),
    );
    provider.restore(Identity { uid, email });

    session.start().await;
    println!("{}", describe(session.state()));
    if !session.state().is_active() {
        return Ok(());
    }
    if let Some(view) = session.render() {
        println!("{}", summarize(&view));
    }

    loop {
        let update = tokio::select! {
            update = session.next_update() => update,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        };

        match update {
            None => break,
            Some(SessionUpdate::ViewChanged(_)) => {
                if let Some(view) = session.render() {
                    println!("{}", summarize(&view));
                }
            }
            Some(SessionUpdate::Routed) => {
                println!("{}", describe(session.state()));
                if !session.state().is_active() {
                    break;
                }
            }
            Some(SessionUpdate::Transient { slot, error }) => {
                warn!(%slot, error = %error, "Live query interrupted");
            }
            Some(SessionUpdate::Rejected { slot, error }) => {
                warn!(%slot, error = %error, "Snapshot rejected");
            }
            Some(SessionUpdate::Stale) | Some(SessionUpdate::Ended(_)) => {}
        }
    }

    drop(provider);
    Ok(())
}
