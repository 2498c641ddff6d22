use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TracefallError};
use crate::model::constants;

/// View geometry and display settings, in logical pixels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub row_height: f64,
    pub axis_height: f64,
    pub tree_width: f64,
    pub indent_unit: f64,
    pub min_bar_width: f64,
    pub bar_height: f64,
    pub tick_count: usize,
    pub pixel_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            row_height: constants::ROW_HEIGHT,
            axis_height: constants::AXIS_HEIGHT,
            tree_width: constants::TREE_WIDTH,
            indent_unit: constants::INDENT_UNIT,
            min_bar_width: constants::MIN_BAR_WIDTH,
            bar_height: constants::BAR_HEIGHT,
            tick_count: constants::TICK_COUNT,
            pixel_ratio: 1.0,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("row_height", self.row_height),
            ("axis_height", self.axis_height),
            ("tree_width", self.tree_width),
            ("bar_height", self.bar_height),
            ("pixel_ratio", self.pixel_ratio),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(TracefallError::Config(format!(
                    "{name} must be a positive number (value={value})"
                )));
            }
        }
        for (name, value) in [
            ("indent_unit", self.indent_unit),
            ("min_bar_width", self.min_bar_width),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(TracefallError::Config(format!(
                    "{name} must not be negative (value={value})"
                )));
            }
        }
        if self.tick_count == 0 {
            return Err(TracefallError::Config(
                "tick_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    row_height: Option<f64>,
    axis_height: Option<f64>,
    tree_width: Option<f64>,
    indent_unit: Option<f64>,
    min_bar_width: Option<f64>,
    bar_height: Option<f64>,
    tick_count: Option<usize>,
    pixel_ratio: Option<f64>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("TRACEFALL_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("tracefall/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TracefallError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TracefallError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn env_number<T: std::str::FromStr>(key: &str) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| TracefallError::Config(format!("bad {key} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        row_height: env_number("TRACEFALL_ROW_HEIGHT")?,
        axis_height: env_number("TRACEFALL_AXIS_HEIGHT")?,
        tree_width: env_number("TRACEFALL_TREE_WIDTH")?,
        indent_unit: env_number("TRACEFALL_INDENT")?,
        min_bar_width: env_number("TRACEFALL_MIN_BAR_WIDTH")?,
        bar_height: None,
        tick_count: env_number("TRACEFALL_TICK_COUNT")?,
        pixel_ratio: env_number("TRACEFALL_PIXEL_RATIO")?,
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.row_height {
        cfg.row_height = v;
    }
    if let Some(v) = overrides.axis_height {
        cfg.axis_height = v;
    }
    if let Some(v) = overrides.tree_width {
        cfg.tree_width = v;
    }
    if let Some(v) = overrides.indent_unit {
        cfg.indent_unit = v;
    }
    if let Some(v) = overrides.min_bar_width {
        cfg.min_bar_width = v;
    }
    if let Some(v) = overrides.bar_height {
        cfg.bar_height = v;
    }
    if let Some(v) = overrides.tick_count {
        cfg.tick_count = v;
    }
    if let Some(v) = overrides.pixel_ratio {
        cfg.pixel_ratio = v;
    }
    cfg.validate()
        .map_err(|e| TracefallError::Config(format!("invalid settings from {source}: {e}")))
}
