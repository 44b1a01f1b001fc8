//! Tracing setup and log-file retention.

use std::path::Path;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogConfig, LogFormat};

/// Initialize the global subscriber writing to stdout. In daemon mode
/// stdout is already redirected onto the log file, so one code path covers
/// both foreground and detached operation.
pub fn init(config: &LogConfig, level_override: Option<&str>) -> Result<()> {
    let level = level_override.unwrap_or(&config.level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("soba={level}")));

    match config.format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
                .with(filter)
                .try_init()?;
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer())
                .with(filter)
                .try_init()?;
        }
    }
    Ok(())
}

/// Delete the oldest `soba-*.log` files beyond `keep`. Called once at
/// daemon startup; errors only skip the pruning, never the start.
pub fn prune_logs(dir: &Path, keep: usize) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    let mut logs: Vec<(std::time::SystemTime, std::path::PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("soba-") || !name.ends_with(".log") {
                return None;
            }
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .collect();

    if logs.len() <= keep {
        return;
    }

    // Newest first; everything past the retention window goes.
    logs.sort_by(|a, b| b.0.cmp(&a.0));
    for (_, path) in logs.into_iter().skip(keep) {
        if let Err(err) = std::fs::remove_file(&path) {
            tracing::debug!(path = %path.display(), error = %err, "failed to prune log file");
        }
    }
}

/// Most recent log file in `dir`, for `soba log`.
pub fn latest_log(dir: &Path) -> Option<std::path::PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            name.starts_with("soba-") && name.ends_with(".log")
        })
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str, age_secs: u64) {
        let path = dir.join(name);
        std::fs::write(&path, "x").unwrap();
        let mtime = std::time::SystemTime::now() - std::time::Duration::from_secs(age_secs);
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(mtime).unwrap();
    }

    #[test]
    fn prune_keeps_newest_n() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "soba-1.log", 300);
        touch(tmp.path(), "soba-2.log", 200);
        touch(tmp.path(), "soba-3.log", 100);
        touch(tmp.path(), "unrelated.txt", 400);

        prune_logs(tmp.path(), 2);

        assert!(!tmp.path().join("soba-1.log").exists());
        assert!(tmp.path().join("soba-2.log").exists());
        assert!(tmp.path().join("soba-3.log").exists());
        assert!(tmp.path().join("unrelated.txt").exists());
    }

    #[test]
    fn latest_log_picks_newest() {
        let tmp = tempfile::tempdir().unwrap();
        touch(tmp.path(), "soba-10.log", 500);
        touch(tmp.path(), "soba-20.log", 5);
        assert_eq!(
            latest_log(tmp.path()),
            Some(tmp.path().join("soba-20.log"))
        );
    }

    #[test]
    fn empty_dir_yields_no_latest() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(latest_log(tmp.path()), None);
    }
}
