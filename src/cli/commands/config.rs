use std::path::Path;

use anyhow::Result;

use crate::config::SobaConfig;

pub struct ConfigCommand {
    config_path: String,
}

impl ConfigCommand {
    pub fn new(config_path: String) -> Self {
        Self { config_path }
    }

    /// Print the fully resolved configuration (file + env overrides +
    /// interpolation) so operators can see what the daemon will actually
    /// use.
    pub fn execute(&self) -> Result<()> {
        let mut config = SobaConfig::load(Path::new(&self.config_path))?;
        if !config.github.token.is_empty() {
            config.github.token = "<redacted>".to_string();
        }
        println!("{}", serde_json::to_string_pretty(&config)?);
        Ok(())
    }
}
