//! Config module.
//! Manages I/O for board_config.json (site, square colors, scan settings).
//! Uses serde for JSON serialization.
//! Site presets carry the well-known square colors, so repeat runs can
//! skip the CLI flags entirely.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::locate::DEFAULT_MINIMUM_SIZE;
use crate::pixel::Color;

pub const CONFIG_PATH: &str = "board_config.json";

/// Resolved watcher settings, persisted between runs. Colors are stored
/// as `rrggbb` hex so the file stays hand-editable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub site: String,
    pub light_square: String,
    pub dark_square: String,
    pub tolerance: u32,
    pub minimum_size: u32,
    pub poll_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let (light, dark) = site_preset("chesscom").unwrap();
        Self {
            site: "chesscom".to_string(),
            light_square: light.to_string(),
            dark_square: dark.to_string(),
            tolerance: 0,
            minimum_size: DEFAULT_MINIMUM_SIZE,
            poll_interval_ms: 500,
        }
    }
}

impl Config {
    /// Parses the stored hex colors into (light, dark).
    pub fn colors(&self) -> Result<(Color, Color)> {
        let light = Color::from_hex(&self.light_square)
            .context("Invalid light square color in config")?;
        let dark =
            Color::from_hex(&self.dark_square).context("Invalid dark square color in config")?;
        Ok((light, dark))
    }
}

/// Built-in square colors of the supported sites. Custom colors come from
/// the CLI or an interactive prompt.
pub fn site_preset(site: &str) -> Option<(&'static str, &'static str)> {
    match site {
        "lichess" => Some(("f0d9b5", "b58863")),
        "chesscom" => Some(("eeeed2", "769656")),
        _ => None,
    }
}

/// Loads a saved config. `Ok(None)` when the file does not exist yet.
pub fn load(path: impl AsRef<Path>) -> Result<Option<Config>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse config from {}", path.display()))?;
    Ok(Some(config))
}

/// Writes the config as pretty-printed JSON.
pub fn save(config: &Config, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let raw = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, raw).with_context(|| format!("Failed to write config to {}", path.display()))?;
    Ok(())
}
