//! Loading and saving enforcement configuration
//!
//! Configuration is stored as pretty-printed JSON. Writes go through a
//! temporary file and a rename so a crash never leaves a torn file behind.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use super::EnforcementConfig;

/// Write data atomically to a file
///
/// Creates a temporary file, writes the data, syncs, then renames
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");

    let mut file = File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {:?}", temp_path))?;
    file.write_all(data).context("Failed to write data")?;
    file.sync_all().context("Failed to sync file")?;
    drop(file);

    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename {:?} to {:?}", temp_path, path))?;

    Ok(())
}

/// Write enforcement configuration to `path`
pub fn write_config(path: &Path, config: &EnforcementConfig) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    let json = serde_json::to_vec_pretty(config).context("Failed to serialize config")?;
    write_atomic(path, &json)
}

/// Load enforcement configuration from `path`
pub fn load_config(path: &Path) -> Result<EnforcementConfig> {
    let data = fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    let config: EnforcementConfig =
        serde_json::from_slice(&data).context("Failed to deserialize config")?;

    Ok(config)
}
