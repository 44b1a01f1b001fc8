use anyhow::Result;

use crate::daemon::DaemonManager;

pub struct StopCommand;

impl StopCommand {
    pub fn new() -> Self {
        Self
    }

    pub async fn execute(&self) -> Result<()> {
        DaemonManager::default().stop().await?;
        println!("Daemon stopped successfully");
        Ok(())
    }
}

impl Default for StopCommand {
    fn default() -> Self {
        Self::new()
    }
}
