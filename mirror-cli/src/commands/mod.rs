pub mod check;
pub mod diff;
pub mod run;
pub mod sync;

use std::path::PathBuf;

use anyhow::{Context, Result};

use mirror_core::{config, SyncConfiguration};

/// Home directory and the config file chosen for this invocation.
#[derive(Debug, Clone)]
pub struct Paths {
    pub home: PathBuf,
    pub config: PathBuf,
}

impl Paths {
    pub fn resolve(config_override: Option<PathBuf>) -> Result<Self> {
        let home: PathBuf = dirs::home_dir().context("could not determine home directory")?;
        let config = config_override.unwrap_or_else(|| config::config_path_at(&home));
        Ok(Self { home, config })
    }

    pub fn load(&self) -> Result<SyncConfiguration> {
        config::load_from(&self.config)
            .with_context(|| format!("invalid configuration in {}", self.config.display()))
    }

    pub fn data_dir(&self, config: &SyncConfiguration) -> PathBuf {
        config::resolve_data_dir(config, &self.home)
    }
}
