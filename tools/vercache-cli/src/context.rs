//! CLI execution context.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};

use vercache_core::{CachingConfig, ENV_VERSION_STORE_URI};
use vercache_redis::RedisCounterStore;
use vercache_versioning::MasterVersionKeyVersioner;

use crate::output::Output;

const CONFIG_NAMES: [&str; 3] = ["vercache.toml", ".vercache.toml", "vercache.json"];

/// Execution context for CLI commands.
pub struct Context {
    /// Caching configuration, with environment overrides applied.
    pub config: CachingConfig,
    /// Output handler.
    pub output: Output,
}

impl Context {
    /// Load context from a config file, or the nearest one found upwards from the
    /// working directory.
    pub fn load(config_path: Option<&str>, output: Output) -> Result<Self> {
        let config = match config_path {
            Some(path) => CachingConfig::load(path)?,
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                match find_config(&cwd) {
                    Some(path) => {
                        output.debug(&format!("Using config {}", path.display()));
                        CachingConfig::load(&path)?
                    }
                    None => CachingConfig::default(),
                }
            }
        };
        let config = config
            .apply_env()
            .context("Failed to apply environment overrides")?;

        Ok(Self { config, output })
    }

    /// Connect to the configured version store.
    pub async fn versioner(&self) -> Result<MasterVersionKeyVersioner<RedisCounterStore>> {
        if let Some(uri) = self.config.version_store.uri.as_deref() {
            self.output.debug(&format!("Connecting to {}", uri));
        }
        let store = RedisCounterStore::from_config(&self.config)
            .await
            .with_context(|| {
                format!(
                    "Failed to open the version store (set version_store.uri or {})",
                    ENV_VERSION_STORE_URI
                )
            })?;
        Ok(store.into_versioner())
    }
}

fn find_config(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();
    loop {
        for name in CONFIG_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        if !current.pop() {
            return None;
        }
    }
}
