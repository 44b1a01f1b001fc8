//! Queue admission.
//!
//! At most one issue may hold an active label, and at most one may sit in
//! `soba:queued` awaiting its plan. Selection is pure; the issue watcher
//! performs the actual label flip.

use crate::github::types::Issue;
use crate::workflow::phase::{self, labels};

/// Pick the next `todo` issue to admit, or `None` when an issue is already
/// active or queued. Smallest issue number wins: a deterministic FIFO by
/// creation-order proxy.
pub fn admit_next(open_issues: &[Issue]) -> Option<u64> {
    let any_active = open_issues
        .iter()
        .any(|issue| issue.labels.iter().any(|l| phase::is_active_label(l)));
    if any_active {
        return None;
    }

    let any_queued = open_issues
        .iter()
        .any(|issue| issue.has_label(labels::QUEUED));
    if any_queued {
        return None;
    }

    open_issues
        .iter()
        .filter(|issue| issue.has_label(labels::TODO))
        .map(|issue| issue.number)
        .min()
}
