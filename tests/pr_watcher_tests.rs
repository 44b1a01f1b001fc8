//! PR watcher scenarios: review feedback, approval, auto-merge, external
//! merges.

mod common;

use common::{harness, harness_with, open_pull};
use soba::github::types::PrState;
use soba::workflow::issue_watcher::IssueWatcher;
use soba::workflow::phase::labels;
use soba::workflow::pr_watcher::PrWatcher;
use tokio::sync::watch;

fn pr_watcher(services: soba::workflow::Services) -> (PrWatcher, watch::Sender<bool>) {
    let (tx, rx) = watch::channel(false);
    (PrWatcher::new(services, rx), tx)
}

#[tokio::test]
async fn pr_appearing_completes_the_implement_phase() {
    let h = harness();
    h.github.seed_issue(3, &[labels::DOING]);
    h.github.seed_pull(open_pull(42, "soba/3"));

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(
        h.github.labels_of(3),
        vec![labels::REVIEW_REQUESTED.to_string()]
    );
    assert_eq!(
        h.github.mutation_log(),
        vec!["add:3:soba:review-requested", "remove:3:soba:doing"]
    );
}

#[tokio::test]
async fn changes_requested_moves_issue_to_requires_changes() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.changes_requested = true;
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(
        h.github.labels_of(3),
        vec![labels::REQUIRES_CHANGES.to_string()]
    );
}

#[tokio::test]
async fn revise_cycle_reaches_a_new_pane_within_one_issue_tick() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.changes_requested = true;
    h.github.seed_pull(pr);

    let (mut prw, _tx1) = pr_watcher(h.services.clone());
    prw.tick().await.unwrap();

    let (tx2, rx2) = watch::channel(false);
    let mut issue_watcher = IssueWatcher::new(h.services.clone(), rx2);
    issue_watcher.tick().await.unwrap();
    drop(tx2);

    assert_eq!(h.github.labels_of(3), vec![labels::REVISING.to_string()]);
    let calls = h.commands.call_log();
    assert!(calls
        .iter()
        .any(|c| c.contains("claude --dangerously-skip-permissions /soba:revise 3")));
}

#[tokio::test]
async fn lgtm_with_auto_merge_finishes_the_issue() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.labels.insert(labels::LGTM.to_string());
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::MERGED.to_string()]);
    assert!(h.github.is_closed(3));
    let log = h.github.mutation_log();
    // reviewing -> done, merge, done -> merged, close.
    assert_eq!(
        log,
        vec![
            "add:3:soba:done",
            "remove:3:soba:reviewing",
            "merge:42",
            "add:3:soba:merged",
            "remove:3:soba:done",
            "close:3",
        ]
    );
}

#[tokio::test]
async fn approval_supersedes_a_stale_changes_request() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.changes_requested = true;
    pr.labels.insert(labels::LGTM.to_string());
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::MERGED.to_string()]);
    assert!(h.github.is_closed(3));
}

#[tokio::test]
async fn lgtm_without_auto_merge_stops_at_done() {
    let h = harness_with(|c| c.workflow.auto_merge_enabled = false);
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.labels.insert(labels::LGTM.to_string());
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::DONE.to_string()]);
    assert!(!h.github.is_closed(3));
}

#[tokio::test]
async fn merge_failure_leaves_done_and_retries_next_tick() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.labels.insert(labels::LGTM.to_string());
    h.github.seed_pull(pr);
    h.github.merge_failures.lock().unwrap().insert(42);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    // First tick: approval recorded, merge failed, labels stay at done.
    assert_eq!(h.github.labels_of(3), vec![labels::DONE.to_string()]);
    assert!(!h.github.is_closed(3));

    // Transient failure clears; the next tick completes the merge.
    h.github.merge_failures.lock().unwrap().clear();
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::MERGED.to_string()]);
    assert!(h.github.is_closed(3));
}

#[tokio::test]
async fn externally_merged_pr_finishes_the_issue() {
    let h = harness();
    h.github.seed_issue(3, &[labels::DOING]);
    let mut pr = open_pull(42, "soba/3");
    pr.state = PrState::Merged;
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::MERGED.to_string()]);
    assert!(h.github.is_closed(3));
}

#[tokio::test]
async fn unlinked_and_untracked_prs_are_ignored() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    // No soba branch, no body reference.
    h.github.seed_pull(open_pull(50, "feature/other"));
    // Linked to an issue soba does not track.
    h.github.seed_pull(open_pull(51, "soba/999"));

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::REVIEWING.to_string()]);
    assert!(h.github.mutation_log().is_empty());
}

#[tokio::test]
async fn body_reference_links_when_branch_is_foreign() {
    let h = harness();
    h.github.seed_issue(7, &[labels::REVIEWING]);
    let mut pr = open_pull(60, "feature/manual");
    pr.body = "Fixes #7".to_string();
    pr.changes_requested = true;
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(
        h.github.labels_of(7),
        vec![labels::REQUIRES_CHANGES.to_string()]
    );
}

#[tokio::test]
async fn closed_unmerged_pr_changes_nothing() {
    let h = harness();
    h.github.seed_issue(3, &[labels::REVIEWING]);
    let mut pr = open_pull(42, "soba/3");
    pr.state = PrState::Closed;
    pr.changes_requested = true;
    h.github.seed_pull(pr);

    let (mut w, _tx) = pr_watcher(h.services.clone());
    w.tick().await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::REVIEWING.to_string()]);
}
