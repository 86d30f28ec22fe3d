// ============================================================
// Layer 6 — Config Store
// ============================================================
// Saves and restores a TstConfig as JSON.
//
// Weights are never written here: the model owns no persistent
// state beyond its architecture, and an external trainer decides
// how to checkpoint parameters. The config is enough to rebuild
// an identical (freshly initialised) model.
//
// Example file:
//   {
//     "c_in": 3,
//     "c_out": 1,
//     "seq_len": 50,
//     "max_seq_len": null,
//     "d_model": 64,
//     ...
//   }

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};

use crate::domain::traits::ConfigSource;
use crate::ml::model::TstConfig;

/// Reads and writes one TstConfig JSON file.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the config as pretty JSON, creating parent directories.
    pub fn save(&self, cfg: &TstConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Cannot create directory '{}'", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&self.path, json)
            .with_context(|| format!("Cannot write config to '{}'", self.path.display()))?;

        tracing::debug!("Saved model config to '{}'", self.path.display());
        Ok(())
    }

    pub fn load(&self) -> Result<TstConfig> {
        let json = fs::read_to_string(&self.path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Run 'init-config' to create one.",
                self.path.display()
            )
        })?;

        serde_json::from_str(&json)
            .with_context(|| format!("Invalid model config in '{}'", self.path.display()))
    }
}

impl ConfigSource<TstConfig> for ConfigStore {
    fn load_config(&self) -> Result<TstConfig> {
        self.load()
    }
}
