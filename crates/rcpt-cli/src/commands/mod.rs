//! Subcommands.

pub mod batch;
pub mod config;
pub mod normalize;
pub mod usage;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

use rcpt_core::extraction::response::{parse_response, validate};
use rcpt_core::{RawExtraction, RcptConfig, ValidationWarning};

/// `<config dir>/rcpt/config.json`.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("rcpt")
        .join("config.json")
}

/// Explicit config file, else the default file when present, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<RcptConfig> {
    let path = match config_path {
        Some(path) => PathBuf::from(path),
        None => {
            let path = default_config_path();
            if !path.exists() {
                return Ok(RcptConfig::default());
            }
            path
        }
    };

    RcptConfig::from_file(&path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Read a raw model response file and check its shape.
pub fn read_raw(path: &Path) -> anyhow::Result<(RawExtraction, Vec<ValidationWarning>)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let raw = parse_response(&text).with_context(|| format!("Invalid response in {}", path.display()))?;
    let warnings = validate(&raw);
    Ok((raw, warnings))
}
