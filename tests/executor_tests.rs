//! Phase executor behavior: pane handling, label ordering, idempotence.

mod common;

use common::harness;
use soba::workflow::phase::{labels, Phase};

#[tokio::test]
async fn retry_attempt_splits_a_new_pane_instead_of_a_window() {
    let h = harness();
    h.github.seed_issue(3, &[labels::QUEUED]);
    // Session and window already exist from a previous attempt.
    h.commands.stub("tmux has-session -t soba-octo-widgets", "");
    h.commands.stub(
        "tmux list-windows -t soba-octo-widgets -F #{window_name}",
        "issue-3\n",
    );
    h.commands.stub(
        "tmux split-window -h -d -t soba-octo-widgets:issue-3 -P -F #{pane_index}",
        "1\n",
    );

    let issue = h.github.issue_snapshot(3);
    h.services.executor.execute(&issue, Phase::Plan).await.unwrap();

    let calls = h.commands.call_log();
    assert!(
        !calls.iter().any(|c| c.starts_with("tmux new-window")),
        "no second window: {calls:?}"
    );
    assert!(
        calls
            .iter()
            .any(|c| c.starts_with("tmux split-window -h -d -t soba-octo-widgets:issue-3")),
        "pane split: {calls:?}"
    );
    // Keystrokes go to the new pane.
    assert!(calls
        .iter()
        .any(|c| c.contains("send-keys -t soba-octo-widgets:issue-3.1")));
}

#[tokio::test]
async fn start_labels_are_added_before_removed() {
    let h = harness();
    h.github.seed_issue(3, &[labels::QUEUED]);

    let issue = h.github.issue_snapshot(3);
    h.services.executor.execute(&issue, Phase::Plan).await.unwrap();

    assert_eq!(
        h.github.mutation_log(),
        vec!["add:3:soba:planning", "remove:3:soba:queued"]
    );
}

#[tokio::test]
async fn rerun_on_in_progress_issue_leaves_labels_untouched() {
    let h = harness();
    h.github.seed_issue(3, &[labels::PLANNING]);

    let issue = h.github.issue_snapshot(3);
    h.services.executor.execute(&issue, Phase::Plan).await.unwrap();

    assert!(h.github.mutation_log().is_empty());
    assert_eq!(h.github.labels_of(3), vec![labels::PLANNING.to_string()]);
    // A retry pane is still created so the operator can see both attempts.
    assert!(h
        .commands
        .call_log()
        .iter()
        .any(|c| c.contains("/soba:plan 3")));
}

#[tokio::test]
async fn tmux_disabled_still_flips_labels_and_prepares_worktree() {
    let h = common::harness_with(|c| c.workflow.use_tmux = false);
    h.github.seed_issue(3, &[labels::QUEUED]);

    let issue = h.github.issue_snapshot(3);
    h.services.executor.execute(&issue, Phase::Plan).await.unwrap();

    assert_eq!(h.github.labels_of(3), vec![labels::PLANNING.to_string()]);
    let calls = h.commands.call_log();
    assert!(calls.iter().any(|c| c.starts_with("git worktree add")));
    assert!(!calls.iter().any(|c| c.starts_with("tmux")));
}

#[tokio::test]
async fn tmux_failure_leaves_labels_unchanged() {
    let h = harness();
    h.github.seed_issue(3, &[labels::QUEUED]);
    h.commands.stub_fail(
        "tmux new-session -d -s soba-octo-widgets",
        "error connecting to server",
    );

    let issue = h.github.issue_snapshot(3);
    let result = h.services.executor.execute(&issue, Phase::Plan).await;

    assert!(result.is_err());
    assert_eq!(h.github.labels_of(3), vec![labels::QUEUED.to_string()]);
    assert!(h.github.mutation_log().is_empty());
}
