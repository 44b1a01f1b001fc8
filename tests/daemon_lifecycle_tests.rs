//! Daemon PID-file lifecycle.

use soba::daemon::{pid_alive, DaemonManager};
use soba::errors::SobaError;

#[tokio::test]
async fn stop_with_stale_pid_reports_process_not_found_and_cleans_up() {
    let tmp = tempfile::tempdir().unwrap();
    let pid_file = tmp.path().join("soba.pid");
    std::fs::write(&pid_file, "999999\n").unwrap();

    let manager = DaemonManager::new(&pid_file);
    let err = manager.stop().await.unwrap_err();

    assert!(err.to_string().contains("process not found"));
    assert!(!pid_file.exists());
    assert!(!manager.is_running());
}

#[tokio::test]
async fn stop_without_pid_file_is_the_not_running_error() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = DaemonManager::new(tmp.path().join("soba.pid"));

    let err = manager.stop().await.unwrap_err();
    assert!(matches!(err, SobaError::NotFound { .. }));
    assert!(err.to_string().contains("daemon is not running"));
}

#[tokio::test]
async fn invalid_pid_content_is_a_validation_error() {
    let tmp = tempfile::tempdir().unwrap();
    let pid_file = tmp.path().join("soba.pid");
    std::fs::write(&pid_file, "banana\n").unwrap();

    let err = DaemonManager::new(&pid_file).stop().await.unwrap_err();
    assert!(matches!(err, SobaError::Validation { .. }));
    assert!(err.to_string().contains("invalid PID in file"));
}

#[test]
fn is_running_tracks_a_live_pid() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = DaemonManager::new(tmp.path().join("soba.pid"));
    assert!(!manager.is_running());

    // Our own process is as live as it gets.
    manager.write_pid(std::process::id()).unwrap();
    assert!(manager.is_running());

    manager.remove_pid_file();
    assert!(!manager.is_running());
}

#[test]
fn status_reports_pid_and_start_time() {
    let tmp = tempfile::tempdir().unwrap();
    let manager = DaemonManager::new(tmp.path().join("soba.pid"));
    manager.write_pid(std::process::id()).unwrap();

    let state = manager.status(tmp.path().join("soba.log")).unwrap();
    assert_eq!(state.pid, std::process::id());
    assert!(state.running);
    assert!(state.started_at.is_some());
}

#[test]
fn signal_zero_probe_matches_reality() {
    assert!(pid_alive(std::process::id() as i32));
    assert!(!pid_alive(999_999));
}
