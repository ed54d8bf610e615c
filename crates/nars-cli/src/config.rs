use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nars_core::MemoryConfig;

/// Config file from `--config`, else `NARS_CONFIG`, else built-in defaults.
pub fn load(explicit: Option<&Path>, seed: Option<u64>) -> Result<MemoryConfig> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(|| std::env::var("NARS_CONFIG").ok().map(PathBuf::from));

    let mut config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            let config: MemoryConfig = toml::from_str(&text)
                .with_context(|| format!("failed to parse config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => MemoryConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}
