//! YAML configuration for gnarl.
//!
//! Every field has a default, so an empty file (or no file at all) gives the
//! stock thresholds and the full pattern library.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::analysis::{PatternDef, RatingBands, Thresholds};
use crate::error::ConfigurationError;

/// File names looked up, in order, when no `--config` is given.
pub const CONFIG_FILE_NAMES: &[&str] = &["gnarl.yaml", ".gnarl.yaml"];

/// Stock configuration written by `gnarl init`.
pub const DEFAULT_TEMPLATE: &str = include_str!("templates/default.yaml");

const DEFAULT_MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub rating: RatingBands,
    /// Glob patterns for paths to skip (e.g. "**/migrations/**").
    #[serde(default)]
    pub excluded_paths: Vec<String>,
    #[serde(default)]
    pub include_test_files: bool,
    /// Names never graded high-confidence dead code.
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,
    /// Built-in pattern ids to turn off.
    #[serde(default)]
    pub disabled_patterns: Vec<String>,
    /// Extra tree-sitter query patterns.
    #[serde(default)]
    pub patterns: Vec<PatternDef>,
    #[serde(default)]
    pub passes: Passes,
    #[serde(default)]
    pub limits: Limits,
}

fn default_entry_points() -> Vec<String> {
    vec!["main".to_string()]
}

fn default_true() -> bool {
    true
}

/// Optional analysis passes. Metrics always run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Passes {
    #[serde(default = "default_true")]
    pub patterns: bool,
    #[serde(default = "default_true")]
    pub dead_code: bool,
}

impl Default for Passes {
    fn default() -> Self {
        Self {
            patterns: true,
            dead_code: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Limits {
    /// Files larger than this are skipped before parsing.
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
}

fn default_max_file_bytes() -> u64 {
    DEFAULT_MAX_FILE_BYTES
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            rating: RatingBands::default(),
            excluded_paths: Vec::new(),
            include_test_files: false,
            entry_points: default_entry_points(),
            disabled_patterns: Vec::new(),
            patterns: Vec::new(),
            passes: Passes::default(),
            limits: Limits::default(),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse_str(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        // An empty document deserializes as unit, not as an empty map.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// First config file found in `dir`, if any.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        CONFIG_FILE_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|p| p.is_file())
    }

    /// Load `explicit` if given, else a discovered file in `dir`, else defaults.
    pub fn load(explicit: Option<&Path>, dir: &Path) -> anyhow::Result<Self> {
        match explicit.map(Path::to_path_buf).or_else(|| Self::discover(dir)) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config");
                Self::parse_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check thresholds, globs and user patterns for consistency.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.rating.low_max > self.rating.medium_max {
            return Err(ConfigurationError::Invalid(format!(
                "rating.low_max ({}) exceeds rating.medium_max ({})",
                self.rating.low_max, self.rating.medium_max
            )));
        }
        if self.limits.max_file_bytes == 0 {
            return Err(ConfigurationError::Invalid(
                "limits.max_file_bytes must be positive".to_string(),
            ));
        }
        self.exclusion_set()?;

        let mut seen = std::collections::HashSet::new();
        for pattern in &self.patterns {
            if pattern.id.trim().is_empty() {
                return Err(ConfigurationError::Invalid(
                    "pattern with an empty id".to_string(),
                ));
            }
            if !seen.insert(pattern.id.as_str()) {
                return Err(ConfigurationError::Invalid(format!(
                    "duplicate pattern id {:?}",
                    pattern.id
                )));
            }
        }

        Ok(())
    }

    /// Compiled `excluded_paths`.
    pub fn exclusion_set(&self) -> Result<GlobSet, ConfigurationError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.excluded_paths {
            let glob = Glob::new(pattern).map_err(|e| {
                ConfigurationError::Invalid(format!(
                    "invalid excluded_paths pattern {:?}: {}",
                    pattern, e
                ))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigurationError::Invalid(e.to_string()))
    }
}
