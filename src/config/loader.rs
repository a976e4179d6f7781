//! Configuration file loading with precedence handling.

use crate::model::margin::RootMargin;
use crate::observer::FirstIntersectionPolicy;
use crate::state::settings::{
    ControllerSettings, SentinelPlacement, DEFAULT_FILTER_MARGIN, DEFAULT_RESULTS_MARGIN,
};
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LOADMORE_CONFIG";
/// Environment override for the first-intersection policy.
pub const FIRST_INTERSECTION_ENV: &str = "LOADMORE_FIRST_INTERSECTION";
/// Environment override for sentinel placement.
pub const SENTINEL_PLACEMENT_ENV: &str = "LOADMORE_SENTINEL_PLACEMENT";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (file may not exist or have permission issues).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML syntax.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },

    /// A value parsed but is out of range or malformed.
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Setting name as written in the file or environment.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// All fields are optional - if not specified, hardcoded defaults are used.
/// Corresponds to `~/.config/loadmore/config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Whether the first intersection callback after mount is processed.
    #[serde(default)]
    pub first_intersection: Option<FirstIntersectionPolicy>,

    /// One sentinel per container, or one shared by result streams.
    #[serde(default)]
    pub sentinel_placement: Option<SentinelPlacement>,

    /// Container attribute carrying the host's loading flag.
    #[serde(default)]
    pub loading_attribute: Option<String>,

    /// Container attribute carrying the container kind.
    #[serde(default)]
    pub kind_attribute: Option<String>,

    /// Intersection threshold in `[0, 1]`.
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Diagnostics kept per binding.
    #[serde(default)]
    pub diagnostic_capacity: Option<usize>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,

    /// Root margins per container kind.
    #[serde(default)]
    pub margins: Option<MarginsSection>,
}

/// Margins section from TOML.
///
/// ```toml
/// [margins]
/// results = "100px 0px 0px 0px"
/// filter = "10px"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MarginsSection {
    /// Result-stream margin in CSS shorthand.
    #[serde(default)]
    pub results: Option<String>,

    /// Filter-list margin in CSS shorthand.
    #[serde(default)]
    pub filter: Option<String>,
}

/// Resolved configuration after applying precedence rules.
///
/// Created by merging defaults, config file, env vars, and CLI args.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Whether the first callback after mount is processed.
    pub first_intersection: FirstIntersectionPolicy,
    /// Per-container or shared result-stream sentinel.
    pub sentinel_placement: SentinelPlacement,
    /// Container attribute carrying the loading flag.
    pub loading_attribute: String,
    /// Container attribute carrying the container kind.
    pub kind_attribute: String,
    /// Intersection threshold.
    pub threshold: f64,
    /// Root margin for result streams.
    pub results_margin: RootMargin,
    /// Root margin for filter lists.
    pub filter_margin: RootMargin,
    /// Diagnostics kept per binding.
    pub diagnostic_capacity: usize,
    /// Path to log file for tracing output.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let settings = ControllerSettings::default();
        Self {
            first_intersection: settings.first_intersection,
            sentinel_placement: settings.sentinel_placement,
            loading_attribute: settings.loading_attribute,
            kind_attribute: settings.kind_attribute,
            threshold: settings.threshold,
            results_margin: DEFAULT_RESULTS_MARGIN,
            filter_margin: DEFAULT_FILTER_MARGIN,
            diagnostic_capacity: settings.diagnostic_capacity,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Settings handed to every binding.
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            first_intersection: self.first_intersection,
            sentinel_placement: self.sentinel_placement,
            loading_attribute: self.loading_attribute.clone(),
            kind_attribute: self.kind_attribute.clone(),
            threshold: self.threshold,
            results_margin: self.results_margin,
            filter_margin: self.filter_margin,
            diagnostic_capacity: self.diagnostic_capacity,
        }
    }
}

/// Resolve default log file path.
///
/// Returns `~/.local/state/loadmore/loadmore.log` on Unix-like systems,
/// or appropriate platform path on other systems.
///
/// If state directory cannot be determined, falls back to current directory.
pub fn default_log_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("loadmore").join("loadmore.log"),
        None => PathBuf::from("loadmore.log"),
    }
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if file doesn't exist (not an error - use defaults).
///
/// # Errors
///
/// Returns error if file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();

    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    let config: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    Ok(Some(config))
}

/// Resolve default config file path.
///
/// Returns `~/.config/loadmore/config.toml` on Unix, appropriate path on other platforms.
/// Returns `None` if home directory cannot be determined.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("loadmore").join("config.toml"))
}

/// Load configuration with precedence handling.
///
/// Precedence (highest to lowest):
/// 1. Explicit `config_path` argument (CLI `--config`)
/// 2. `LOADMORE_CONFIG` environment variable
/// 3. Default path `~/.config/loadmore/config.toml`
///
/// Missing config files are NOT errors - defaults are used.
///
/// # Errors
///
/// Returns error only if a config file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }

    match default_config_path() {
        Some(default_path) => load_config_file(default_path),
        None => Ok(None),
    }
}

/// Merge config file into defaults to create resolved config.
///
/// For each field in `ConfigFile`, if `Some(value)`, use it; otherwise use default.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for unparsable margins, a threshold
/// outside `[0, 1]` or blank attribute names.
pub fn merge_config(config_file: Option<ConfigFile>) -> Result<ResolvedConfig, ConfigError> {
    let defaults = ResolvedConfig::default();

    let Some(config) = config_file else {
        return Ok(defaults);
    };
    let margins = config.margins.unwrap_or_default();

    let resolved = ResolvedConfig {
        first_intersection: config
            .first_intersection
            .unwrap_or(defaults.first_intersection),
        sentinel_placement: config
            .sentinel_placement
            .unwrap_or(defaults.sentinel_placement),
        loading_attribute: config
            .loading_attribute
            .unwrap_or(defaults.loading_attribute),
        kind_attribute: config.kind_attribute.unwrap_or(defaults.kind_attribute),
        threshold: config.threshold.unwrap_or(defaults.threshold),
        results_margin: parse_margin("margins.results", margins.results)?
            .unwrap_or(defaults.results_margin),
        filter_margin: parse_margin("margins.filter", margins.filter)?
            .unwrap_or(defaults.filter_margin),
        diagnostic_capacity: config
            .diagnostic_capacity
            .unwrap_or(defaults.diagnostic_capacity),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    };
    validate(&resolved)?;
    Ok(resolved)
}

fn parse_margin(field: &str, raw: Option<String>) -> Result<Option<RootMargin>, ConfigError> {
    raw.map(|raw| {
        raw.parse::<RootMargin>()
            .map_err(|e| ConfigError::InvalidValue {
                field: field.to_string(),
                reason: e.to_string(),
            })
    })
    .transpose()
}

fn validate(config: &ResolvedConfig) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&config.threshold) {
        return Err(ConfigError::InvalidValue {
            field: "threshold".to_string(),
            reason: format!("{} is outside [0, 1]", config.threshold),
        });
    }
    for (field, value) in [
        ("loading_attribute", &config.loading_attribute),
        ("kind_attribute", &config.kind_attribute),
    ] {
        if value.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                reason: "attribute name is empty".to_string(),
            });
        }
    }
    Ok(())
}

/// Parse `suppress` / `deliver`.
pub fn parse_first_intersection(
    field: &str,
    raw: &str,
) -> Result<FirstIntersectionPolicy, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "suppress" => Ok(FirstIntersectionPolicy::Suppress),
        "deliver" => Ok(FirstIntersectionPolicy::Deliver),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected suppress or deliver, got {other:?}"),
        }),
    }
}

/// Parse `per-container` / `shared`.
pub fn parse_sentinel_placement(
    field: &str,
    raw: &str,
) -> Result<SentinelPlacement, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "per-container" => Ok(SentinelPlacement::PerContainer),
        "shared" => Ok(SentinelPlacement::Shared),
        other => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("expected per-container or shared, got {other:?}"),
        }),
    }
}

/// Apply environment variable overrides to resolved config.
///
/// Checks for:
/// - `LOADMORE_FIRST_INTERSECTION`: `suppress` or `deliver`
/// - `LOADMORE_SENTINEL_PLACEMENT`: `per-container` or `shared`
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if a variable is set to an unknown value.
pub fn apply_env_overrides(mut config: ResolvedConfig) -> Result<ResolvedConfig, ConfigError> {
    if let Ok(raw) = std::env::var(FIRST_INTERSECTION_ENV) {
        config.first_intersection = parse_first_intersection(FIRST_INTERSECTION_ENV, &raw)?;
    }

    if let Ok(raw) = std::env::var(SENTINEL_PLACEMENT_ENV) {
        config.sentinel_placement = parse_sentinel_placement(SENTINEL_PLACEMENT_ENV, &raw)?;
    }

    Ok(config)
}

/// Apply CLI argument overrides to resolved config.
///
/// CLI args have the highest precedence and override all other sources.
/// Only applies overrides for flags that were explicitly set by the user.
///
/// Precedence chain: Defaults → Config File → Env Vars → CLI Args (highest)
pub fn apply_cli_overrides(
    mut config: ResolvedConfig,
    first_intersection_override: Option<FirstIntersectionPolicy>,
    placement_override: Option<SentinelPlacement>,
) -> ResolvedConfig {
    if let Some(policy) = first_intersection_override {
        config.first_intersection = policy;
    }

    if let Some(placement) = placement_override {
        config.sentinel_placement = placement;
    }

    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
