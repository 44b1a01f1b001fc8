//! Label taxonomy and phase strategy.
//!
//! Pure and stateless: every decision is a function of the label snapshot
//! observed at the start of a tick, which keeps the watchers deterministic
//! and lets an operator edit labels in the GitHub UI at any time.

use std::collections::BTreeSet;
use std::fmt;

use crate::errors::{Result, SobaError};

pub mod labels {
    pub const TODO: &str = "soba:todo";
    pub const QUEUED: &str = "soba:queued";
    pub const PLANNING: &str = "soba:planning";
    pub const READY: &str = "soba:ready";
    pub const DOING: &str = "soba:doing";
    pub const REVIEW_REQUESTED: &str = "soba:review-requested";
    pub const REVIEWING: &str = "soba:reviewing";
    pub const REQUIRES_CHANGES: &str = "soba:requires-changes";
    pub const REVISING: &str = "soba:revising";
    pub const DONE: &str = "soba:done";
    pub const MERGED: &str = "soba:merged";
    /// PR-only label; never counted when classifying an issue.
    pub const LGTM: &str = "soba:lgtm";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Queue,
    Plan,
    Implement,
    Review,
    Revise,
    Merge,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Queue => "queue",
            Phase::Plan => "plan",
            Phase::Implement => "implement",
            Phase::Review => "review",
            Phase::Revise => "revise",
            Phase::Merge => "merge",
        };
        f.write_str(name)
    }
}

/// Labels that represent in-flight work. An issue holding one blocks new
/// admissions; `todo`, `queued`, `merged`, and the PR-only `lgtm` are not
/// in this set.
pub const ACTIVE_LABELS: [&str; 7] = [
    labels::PLANNING,
    labels::READY,
    labels::DOING,
    labels::REVIEW_REQUESTED,
    labels::REVIEWING,
    labels::REQUIRES_CHANGES,
    labels::REVISING,
];

pub fn is_active_label(label: &str) -> bool {
    ACTIVE_LABELS.contains(&label)
}

/// Phase for a single workflow label.
pub fn phase_for_label(label: &str) -> Option<Phase> {
    match label {
        labels::TODO => Some(Phase::Queue),
        labels::QUEUED | labels::PLANNING => Some(Phase::Plan),
        labels::READY | labels::DOING => Some(Phase::Implement),
        labels::REVIEW_REQUESTED | labels::REVIEWING => Some(Phase::Review),
        labels::REQUIRES_CHANGES | labels::REVISING => Some(Phase::Revise),
        labels::DONE | labels::MERGED => Some(Phase::Merge),
        _ => None,
    }
}

/// Classify an issue by its labels. Exactly one workflow label (the PR-only
/// `lgtm` excluded) must be present; zero or several is a classification
/// error for that issue only.
pub fn current_phase(issue_labels: &BTreeSet<String>) -> Result<Phase> {
    let workflow: Vec<&str> = issue_labels
        .iter()
        .map(String::as_str)
        .filter(|l| l.starts_with(crate::github::types::LABEL_PREFIX))
        .filter(|l| *l != labels::LGTM)
        .collect();

    match workflow.as_slice() {
        [] => Err(SobaError::validation("issue has no workflow label")),
        [single] => phase_for_label(single).ok_or_else(|| {
            SobaError::validation("unknown workflow label").with_context("label", single)
        }),
        several => Err(SobaError::validation("issue has conflicting workflow labels")
            .with_context("labels", several.join(","))),
    }
}

/// The label an issue must hold for the watcher to dispatch `phase`, and
/// the in-progress label the executor flips it to.
pub fn start_transition(phase: Phase) -> Option<(&'static str, &'static str)> {
    match phase {
        Phase::Plan => Some((labels::QUEUED, labels::PLANNING)),
        Phase::Implement => Some((labels::READY, labels::DOING)),
        Phase::Review => Some((labels::REVIEW_REQUESTED, labels::REVIEWING)),
        Phase::Revise => Some((labels::REQUIRES_CHANGES, labels::REVISING)),
        Phase::Queue | Phase::Merge => None,
    }
}

/// The label flip a watcher applies once a phase's external completion
/// signal arrives. For Review this is the approval outcome; a
/// changes-requested review takes the `requires-changes` branch instead,
/// which the PR watcher applies directly.
pub fn success_transition(phase: Phase) -> Option<(&'static str, &'static str)> {
    match phase {
        Phase::Plan => Some((labels::PLANNING, labels::READY)),
        Phase::Implement => Some((labels::DOING, labels::REVIEW_REQUESTED)),
        Phase::Review => Some((labels::REVIEWING, labels::DONE)),
        Phase::Revise => Some((labels::REVISING, labels::REVIEW_REQUESTED)),
        Phase::Merge => Some((labels::DONE, labels::MERGED)),
        Phase::Queue => None,
    }
}

/// Phase the watcher should dispatch for an issue sitting on `label`, if
/// that label is a start label.
pub fn dispatchable_phase(label: &str) -> Option<Phase> {
    match label {
        labels::QUEUED => Some(Phase::Plan),
        labels::READY => Some(Phase::Implement),
        labels::REVIEW_REQUESTED => Some(Phase::Review),
        labels::REQUIRES_CHANGES => Some(Phase::Revise),
        _ => None,
    }
}

/// The transition table. Anything not listed is a conflict.
pub fn validate_transition(from: Phase, to: Phase) -> Result<()> {
    let valid = matches!(
        (from, to),
        (Phase::Queue, Phase::Plan)
            | (Phase::Plan, Phase::Implement)
            | (Phase::Implement, Phase::Review)
            | (Phase::Review, Phase::Merge)
            | (Phase::Review, Phase::Revise)
            | (Phase::Revise, Phase::Review)
    );
    if valid {
        Ok(())
    } else {
        Err(SobaError::conflict("invalid phase transition")
            .with_context("from", from)
            .with_context("to", to))
    }
}
