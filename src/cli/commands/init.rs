use std::path::Path;

use anyhow::{bail, Result};

use crate::config::CONFIG_TEMPLATE;

pub struct InitCommand {
    config_path: String,
    force: bool,
}

impl InitCommand {
    pub fn new(config_path: String, force: bool) -> Self {
        Self { config_path, force }
    }

    pub fn execute(&self) -> Result<()> {
        let path = Path::new(&self.config_path);
        if path.exists() && !self.force {
            bail!(
                "{} already exists. Use --force to overwrite.",
                path.display()
            );
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, CONFIG_TEMPLATE)?;

        println!("Created {}", path.display());
        println!();
        println!("Next steps:");
        println!("  1. Set github.repository to your owner/repo");
        println!("  2. Export SOBA_GITHUB_TOKEN or log in with `gh auth login`");
        println!("  3. Label an issue soba:todo and run `soba start`");
        Ok(())
    }
}
