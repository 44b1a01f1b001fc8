//! The workflow engine: phase strategy, admission, executor, and the three
//! periodic loops that drive issues through their phases.

pub mod cleaner;
pub mod executor;
pub mod issue_watcher;
pub mod phase;
pub mod pr_watcher;
pub mod queue;
pub mod supervisor;

use std::sync::Arc;

use tracing::warn;

use crate::config::SobaConfig;
use crate::errors::Result;
use crate::github::{IssueOps, PullOps, RepoSlug};
use crate::slack::SlackNotifier;
use crate::tmux::TmuxClient;
use crate::workspace::WorkspaceManager;

pub use executor::PhaseExecutor;
pub use supervisor::Supervisor;

/// Immutable bundle of collaborators handed to every component. The only
/// shared mutable state in the system is the label set, which lives
/// upstream.
#[derive(Clone)]
pub struct Services {
    pub config: Arc<SobaConfig>,
    pub slug: RepoSlug,
    /// Identifies tmux sessions created by this daemon.
    pub session_fingerprint: String,
    pub issues: Arc<dyn IssueOps>,
    pub pulls: Arc<dyn PullOps>,
    pub tmux: Arc<TmuxClient>,
    pub workspace: Arc<WorkspaceManager>,
    pub slack: Arc<SlackNotifier>,
    pub executor: Arc<PhaseExecutor>,
}

/// Add `add`, then remove `remove` with bounded retries. Add-before-remove
/// keeps the new label authoritative even when the remove half fails; the
/// leftover label is retried and warned about rather than failing the
/// transition.
pub(crate) async fn flip_labels(
    issues: &dyn IssueOps,
    number: u64,
    remove: &str,
    add: &str,
) -> Result<()> {
    issues.add_label(number, add).await?;

    let mut last_err = None;
    for attempt in 1..=3u32 {
        match issues.remove_label(number, remove).await {
            Ok(()) => return Ok(()),
            Err(err) => {
                warn!(issue = number, label = remove, attempt, error = %err, "label remove failed");
                last_err = Some(err);
            }
        }
    }
    if let Some(err) = last_err {
        warn!(issue = number, label = remove, error = %err, "stale label left behind");
    }
    Ok(())
}
