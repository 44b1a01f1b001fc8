use std::path::Path;

use anyhow::{Context, Result};

use crate::config::SobaConfig;
use crate::tmux::TmuxClient;

pub struct OpenCommand {
    config_path: String,
}

impl OpenCommand {
    pub fn new(config_path: String) -> Self {
        Self { config_path }
    }

    /// Replace this process with `tmux attach-session` on the repo session.
    pub fn execute(&self) -> Result<()> {
        let config = SobaConfig::load(Path::new(&self.config_path))?;
        let session = config.repo_slug()?.session_name();

        let mut cmd = std::process::Command::new("tmux");
        cmd.args(TmuxClient::attach_args(&session));

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            let err = cmd.exec();
            // exec only returns on failure
            Err(err).context(format!("failed to attach to session '{session}'"))
        }

        #[cfg(not(unix))]
        {
            let status = cmd.status().context("failed to run tmux")?;
            if !status.success() {
                anyhow::bail!("failed to attach to session '{session}'");
            }
            Ok(())
        }
    }
}
