//! Upload configuration.
//!
//! Handles loading, validating, and merging `upload.toml`. Stock defaults are
//! the base layer; a user file only needs the keys it wants to change.
//! Configuration is immutable once loaded and is handed to the
//! [`UploadPipeline`](crate::pipeline::UploadPipeline) by value.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! attribute = "file"               # record attribute receiving the staged upload path
//! storage_attribute = "filename"   # record attribute receiving the stored name
//! # fixed_name = "avatar"          # store as avatar.<ext> instead of <base>_<token>.<ext>
//! scenarios = ["insert", "update"] # record scenarios that process uploads
//! thumbnail_prefix = "thumb_"
//! original_prefix = "original_"
//! delete_on_delete = true          # remove step directories with the record
//! clean_on_update = false          # wipe step directories before an update writes
//!
//! [aliases]
//! webroot = "public"               # "@webroot/..." in step paths
//!
//! [[steps]]
//! path = "@webroot/uploads/{id}"   # {attr} is replaced by the record attribute
//!
//! [[steps]]
//! path = "@webroot/images/{id}"
//! [steps.policy]
//! size = [400, 400]
//! quality = 80
//! thumbnail_size = [100, 100]
//! thumbnail_quality = 70
//! save_original = true
//! ```
//!
//! Unknown keys are rejected to catch typos early. Steps whose directory is a
//! function of the record, or whose handler is custom code, are passed in code
//! with [`UploadPipeline::with_steps`](crate::pipeline::UploadPipeline::with_steps).

use crate::handler::ImagePolicy;
use crate::paths::Aliases;
use crate::steps::Step;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Upload configuration loaded from `upload.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Record attribute that receives the staged upload path.
    pub attribute: String,
    /// Record attribute that receives the stored file name.
    pub storage_attribute: String,
    /// Fixed stem for the stored name; the upload's extension is kept.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_name: Option<String>,
    /// Record scenarios in which uploads are processed.
    pub scenarios: Vec<String>,
    pub thumbnail_prefix: String,
    pub original_prefix: String,
    /// Remove every step directory when the record is deleted.
    pub delete_on_delete: bool,
    /// Remove each step directory before an update writes into it.
    pub clean_on_update: bool,
    /// `@name` path prefixes.
    pub aliases: Aliases,
    /// Ordered step list.
    pub steps: Vec<StepConfig>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            attribute: "file".to_string(),
            storage_attribute: "filename".to_string(),
            fixed_name: None,
            scenarios: vec!["insert".to_string(), "update".to_string()],
            thumbnail_prefix: "thumb_".to_string(),
            original_prefix: "original_".to_string(),
            delete_on_delete: true,
            clean_on_update: false,
            aliases: Aliases::new(),
            steps: Vec::new(),
        }
    }
}

/// A step as written in a config file: a static path plus optional policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<ImagePolicy>,
}

impl StepConfig {
    pub fn to_step(&self) -> Step {
        match &self.policy {
            Some(policy) => Step::with_policy(self.path.as_str(), policy.clone()),
            None => Step::copy(self.path.as_str()),
        }
    }
}

fn validation(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

impl UploadConfig {
    /// Validate config values are within acceptable ranges.
    ///
    /// An empty step list is allowed here because steps can also be supplied
    /// in code; the pipeline rejects running without any.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.attribute.trim().is_empty() {
            return Err(validation("attribute must not be empty"));
        }
        if self.storage_attribute.trim().is_empty() {
            return Err(validation("storage_attribute must not be empty"));
        }
        if let Some(name) = &self.fixed_name {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(validation(
                    "fixed_name must be a non-empty name without path separators",
                ));
            }
        }
        if self.scenarios.is_empty() {
            return Err(validation("scenarios must not be empty"));
        }
        if self.thumbnail_prefix.is_empty() || self.original_prefix.is_empty() {
            return Err(validation("thumbnail_prefix and original_prefix must not be empty"));
        }
        if self.thumbnail_prefix == self.original_prefix {
            return Err(validation("thumbnail_prefix and original_prefix must differ"));
        }
        for name in self.aliases.keys() {
            if name.is_empty() || name.contains(['/', '\\', '@']) {
                return Err(validation(format!("invalid alias name '{name}'")));
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            if step.path.trim().is_empty() {
                return Err(validation(format!("steps[{i}].path must not be empty")));
            }
            if let Some(policy) = &step.policy {
                policy
                    .validate(&format!("steps[{i}].policy"))
                    .map_err(ConfigError::Validation)?;
            }
        }
        Ok(())
    }

    /// Runtime steps for the configured step list.
    pub fn steps(&self) -> Vec<Step> {
        self.steps.iter().map(StepConfig::to_step).collect()
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(UploadConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user
///   `[[steps]]` list replaces the default list rather than appending.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<UploadConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: UploadConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a TOML file.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<UploadConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `upload.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Upload Pipeline Configuration
# =============================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Record attribute that receives the staged upload path.
attribute = "file"

# Record attribute that receives the stored file name.
storage_attribute = "filename"

# Store every upload as <fixed_name>.<ext> instead of <base>_<token>.<ext>.
# fixed_name = "avatar"

# Record scenarios in which uploads are processed. Saves under any other
# scenario leave files and attributes untouched.
scenarios = ["insert", "update"]

# Prefixes for derived files written next to the main output.
thumbnail_prefix = "thumb_"
original_prefix = "original_"

# Remove every step directory when the record is deleted.
# A step path that resolves to "/" is never removed.
delete_on_delete = true

# On updates, remove each step directory before writing the new files.
clean_on_update = false

# ---------------------------------------------------------------------------
# Path aliases: "@webroot/uploads" expands to "public/uploads".
# ---------------------------------------------------------------------------
[aliases]
# webroot = "public"

# ---------------------------------------------------------------------------
# Steps, in order. Each step writes into its own directory.
# {attr} in a path is replaced by the record's attribute value.
# A step without a policy copies the upload verbatim.
# ---------------------------------------------------------------------------
# [[steps]]
# path = "@webroot/uploads/{id}"
#
# [[steps]]
# path = "@webroot/images/{id}"
# [steps.policy]
# size = [400, 400]            # resize to fit inside width x height
# quality = 80                 # 1-100, JPEG and AVIF outputs
# thumbnail_size = [100, 100]  # optional: cropped thumbnail, thumb_<name>
# thumbnail_quality = 70       # optional: defaults to quality
# save_original = true         # optional: byte copy as original_<name>
"##
}
