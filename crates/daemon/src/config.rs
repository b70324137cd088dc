//! Configuration management for the cellswap daemon.
//!
//! Configuration is loaded from TOML files in the following locations (in order):
//! 1. The platform config directory (`cellswap/config.toml`)
//! 2. `~/.config/cellswap/config.toml` (Unix-style)
//! 3. `./config.toml` (current directory, for development)

use anyhow::{Context, Result};
use cellswap_core::{BoardSettings, Easing, TableLayout};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Main configuration structure for cellswap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Initial grid population.
    pub grid: GridConfig,
    /// Transition timing.
    pub animation: AnimationConfig,
    /// Cell geometry.
    pub layout: LayoutConfig,
    /// Drag-and-drop behavior.
    pub interaction: InteractionConfig,
    /// Behavior configuration.
    pub behavior: BehaviorConfig,
    /// IPC endpoint.
    pub ipc: IpcConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Rows created at startup. Not recorded in history.
    #[serde(default = "default_initial_rows")]
    pub initial_rows: usize,

    /// Items in every new row.
    #[serde(default = "default_items_per_row")]
    pub items_per_row: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            initial_rows: default_initial_rows(),
            items_per_row: default_items_per_row(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Length of a single transition in milliseconds.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    /// Easing curve for transitions.
    #[serde(default)]
    pub easing: EasingConfig,

    /// Interval between animation ticks in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_duration_ms(),
            easing: EasingConfig::default(),
            tick_ms: default_tick_ms(),
        }
    }
}

/// Easing configuration (wrapper for serialization).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EasingConfig {
    Linear,
    /// CSS `ease`.
    #[default]
    Ease,
    EaseInOut,
}

impl From<EasingConfig> for Easing {
    fn from(config: EasingConfig) -> Self {
        match config {
            EasingConfig::Linear => Easing::Linear,
            EasingConfig::Ease => Easing::Ease,
            EasingConfig::EaseInOut => Easing::EaseInOut,
        }
    }
}

/// Cell geometry used to compute transition deltas.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    #[serde(default = "default_cell_size")]
    pub cell_width: i32,

    #[serde(default = "default_cell_size")]
    pub cell_height: i32,

    /// Gap between cells in pixels.
    #[serde(default = "default_gap")]
    pub gap: i32,

    #[serde(default)]
    pub origin_x: i32,

    #[serde(default)]
    pub origin_y: i32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cell_width: default_cell_size(),
            cell_height: default_cell_size(),
            gap: default_gap(),
            origin_x: 0,
            origin_y: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Reject drops while any transition is still running.
    #[serde(default = "default_true")]
    pub block_drops_while_animating: bool,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            block_drops_while_animating: true,
        }
    }
}

/// Behavior-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IpcConfig {
    /// Address the daemon listens on.
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
        }
    }
}

// Default value functions for serde
fn default_initial_rows() -> usize {
    3
}

fn default_items_per_row() -> usize {
    3
}

fn default_duration_ms() -> u64 {
    cellswap_core::DEFAULT_DURATION_MS
}

fn default_tick_ms() -> u64 {
    16
}

fn default_cell_size() -> i32 {
    100
}

fn default_gap() -> i32 {
    10
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_address() -> String {
    cellswap_ipc::DEFAULT_ADDRESS.to_string()
}

const MAX_ITEMS_PER_ROW: usize = 64;
const MAX_INITIAL_ROWS: usize = 1000;
const MAX_DURATION_MS: u64 = 10_000;
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A value that was adjusted during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub field: &'static str,
    pub message: String,
}

impl ConfigWarning {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl Config {
    /// Load configuration from standard locations.
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self> {
        let paths = config_paths();

        for path in &paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific path.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Clamp out-of-range values, returning one warning per adjustment.
    pub fn validate(&mut self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.grid.items_per_row == 0 || self.grid.items_per_row > MAX_ITEMS_PER_ROW {
            let clamped = self.grid.items_per_row.clamp(1, MAX_ITEMS_PER_ROW);
            warnings.push(ConfigWarning::new(
                "grid.items_per_row",
                format!("{} is out of range, using {}", self.grid.items_per_row, clamped),
            ));
            self.grid.items_per_row = clamped;
        }
        if self.grid.initial_rows > MAX_INITIAL_ROWS {
            warnings.push(ConfigWarning::new(
                "grid.initial_rows",
                format!("{} is too large, using {}", self.grid.initial_rows, MAX_INITIAL_ROWS),
            ));
            self.grid.initial_rows = MAX_INITIAL_ROWS;
        }

        if self.animation.duration_ms > MAX_DURATION_MS {
            warnings.push(ConfigWarning::new(
                "animation.duration_ms",
                format!("{} is too large, using {}", self.animation.duration_ms, MAX_DURATION_MS),
            ));
            self.animation.duration_ms = MAX_DURATION_MS;
        }
        if self.animation.tick_ms == 0 || self.animation.tick_ms > 1000 {
            warnings.push(ConfigWarning::new(
                "animation.tick_ms",
                format!("{} is out of range, using {}", self.animation.tick_ms, default_tick_ms()),
            ));
            self.animation.tick_ms = default_tick_ms();
        }

        if self.layout.cell_width <= 0 {
            warnings.push(ConfigWarning::new("layout.cell_width", "must be positive, using 100"));
            self.layout.cell_width = default_cell_size();
        }
        if self.layout.cell_height <= 0 {
            warnings.push(ConfigWarning::new("layout.cell_height", "must be positive, using 100"));
            self.layout.cell_height = default_cell_size();
        }
        if self.layout.gap < 0 {
            warnings.push(ConfigWarning::new("layout.gap", "must not be negative, using 0"));
            self.layout.gap = 0;
        }

        let level = self.behavior.log_level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            warnings.push(ConfigWarning::new(
                "behavior.log_level",
                format!("unknown level '{}', using info", self.behavior.log_level),
            ));
            self.behavior.log_level = default_log_level();
        }

        if self.ipc.address.parse::<SocketAddr>().is_err() {
            warnings.push(ConfigWarning::new(
                "ipc.address",
                format!("'{}' is not a socket address, using {}", self.ipc.address, default_address()),
            ));
            self.ipc.address = default_address();
        }

        warnings
    }

    pub fn board_settings(&self) -> BoardSettings {
        BoardSettings {
            duration_ms: self.animation.duration_ms,
            easing: self.animation.easing.into(),
            block_drops_while_animating: self.interaction.block_drops_while_animating,
        }
    }

    pub fn table_layout(&self) -> TableLayout {
        TableLayout {
            origin_x: self.layout.origin_x,
            origin_y: self.layout.origin_y,
            cell_width: self.layout.cell_width,
            cell_height: self.layout.cell_height,
            gap: self.layout.gap,
        }
    }
}

/// Get all possible config file paths in priority order.
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // 1. Platform standard: e.g. ~/.config/cellswap or %APPDATA%\cellswap
    if let Some(proj_dirs) = ProjectDirs::from("com", "cellswap", "cellswap") {
        paths.push(proj_dirs.config_dir().join("config.toml"));
    }

    // 2. Unix-style: ~/.config/cellswap/config.toml
    if let Some(home) = dirs_home() {
        paths.push(home.join(".config").join("cellswap").join("config.toml"));
    }

    // 3. Current directory: ./config.toml
    paths.push(PathBuf::from("config.toml"));

    paths
}

/// Get the user's home directory.
fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.grid.initial_rows, 3);
        assert_eq!(config.grid.items_per_row, 3);
        assert_eq!(config.animation.duration_ms, 500);
        assert_eq!(config.animation.easing, EasingConfig::Ease);
        assert_eq!(config.animation.tick_ms, 16);
        assert_eq!(config.layout.gap, 10);
        assert!(config.interaction.block_drops_while_animating);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.ipc.address, "127.0.0.1:7878");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.layout.gap, config.layout.gap);
        assert_eq!(parsed.animation.easing, config.animation.easing);
        assert_eq!(parsed.ipc.address, config.ipc.address);
    }

    #[test]
    fn test_config_partial_parse() {
        // Config with only some fields should use defaults for the rest
        let toml_str = r#"
            [animation]
            duration_ms = 250
            easing = "ease_in_out"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.animation.duration_ms, 250);
        assert_eq!(config.animation.easing, EasingConfig::EaseInOut);
        assert_eq!(config.animation.tick_ms, 16); // default
        assert_eq!(config.grid.items_per_row, 3); // default
    }

    #[test]
    fn test_easing_conversion() {
        assert_eq!(Easing::from(EasingConfig::Linear), Easing::Linear);
        assert_eq!(Easing::from(EasingConfig::Ease), Easing::Ease);
        assert_eq!(Easing::from(EasingConfig::EaseInOut), Easing::EaseInOut);
    }

    #[test]
    fn test_unknown_easing_rejected() {
        let toml_str = r#"
            [animation]
            easing = "bounce"
        "#;
        assert!(toml::from_str::<Config>(toml_str).is_err());
    }

    #[test]
    fn test_config_paths_not_empty() {
        let paths = config_paths();
        assert!(!paths.is_empty());
        assert_eq!(paths.last(), Some(&PathBuf::from("config.toml")));
    }

    #[test]
    fn test_validate_default_has_no_warnings() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_validate_clamps_values() {
        let toml_str = r#"
            [grid]
            items_per_row = 0

            [animation]
            tick_ms = 0

            [layout]
            cell_width = -5
            gap = -1

            [behavior]
            log_level = "loud"

            [ipc]
            address = "not an address"
        "#;
        let mut config: Config = toml::from_str(toml_str).unwrap();
        let warnings = config.validate();

        let fields: Vec<_> = warnings.iter().map(|w| w.field).collect();
        assert_eq!(
            fields,
            vec![
                "grid.items_per_row",
                "animation.tick_ms",
                "layout.cell_width",
                "layout.gap",
                "behavior.log_level",
                "ipc.address",
            ]
        );
        assert_eq!(config.grid.items_per_row, 1);
        assert_eq!(config.animation.tick_ms, 16);
        assert_eq!(config.layout.cell_width, 100);
        assert_eq!(config.layout.gap, 0);
        assert_eq!(config.behavior.log_level, "info");
        assert_eq!(config.ipc.address, "127.0.0.1:7878");
    }

    #[test]
    fn test_board_settings_from_config() {
        let toml_str = r#"
            [animation]
            duration_ms = 120
            easing = "linear"

            [interaction]
            block_drops_while_animating = false
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let settings = config.board_settings();
        assert_eq!(settings.duration_ms, 120);
        assert_eq!(settings.easing, Easing::Linear);
        assert!(!settings.block_drops_while_animating);
    }

    #[test]
    fn test_table_layout_from_config() {
        let toml_str = r#"
            [layout]
            cell_width = 80
            origin_y = 40
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        let layout = config.table_layout();
        assert_eq!(layout.cell_width, 80);
        assert_eq!(layout.cell_height, 100);
        assert_eq!(layout.origin_y, 40);
        assert_eq!(layout.gap, 10);
    }

    #[test]
    fn test_load_from_path() {
        let path = std::env::temp_dir().join(format!("cellswap-config-{}.toml", std::process::id()));
        fs::write(&path, "[grid]\ninitial_rows = 5\n").unwrap();
        let config = Config::load_from_path(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(config.grid.initial_rows, 5);

        assert!(Config::load_from_path(Path::new("/nonexistent/cellswap.toml")).is_err());
    }
}
