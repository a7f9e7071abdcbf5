//! Site configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! serialized to a TOML table, the user's file is merged on top, and the
//! result is deserialized with unknown keys rejected.
//!
//! ## Config File Location
//!
//! Place `config.toml` in the content root (or point `--config` at the
//! directory that holds it):
//!
//! ```text
//! content/
//! ├── config.toml              # Sort defaults and gallery definitions
//! ├── manifest.json            # Image pool from the processing stage
//! └── ...
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [sort]
//! field = "dateTaken"       # Primary sort field for every gallery
//! direction = "asc"         # asc | desc
//! fallback = "filename"     # Sort key when the primary field is absent ("" disables)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//!
//! [[galleries]]
//! name = "night"
//! filter = "exif.iso >= 3200 | sort dateTaken desc"
//! sort = "exif.focalLength:desc"   # Optional per-gallery override
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse: override just the values you want:
//!
//! ```toml
//! # Newest photos first everywhere
//! [sort]
//! direction = "desc"
//! ```
//!
//! Unknown keys are rejected to catch typos early. The global sort field
//! and fallback are checked against the known property paths at load time;
//! per-gallery filters and sort overrides are checked when each gallery is
//! built, so one broken gallery doesn't block the others.

use crate::sort::{SortConfig, SortError, SortSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Config validation error: [sort] {0}")]
    Sort(#[from] SortError),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Global sort applied to every gallery.
    pub sort: SortConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Gallery definitions, built in order.
    pub galleries: Vec<GalleryConfig>,
}

impl SiteConfig {
    /// Validate the global sort and the gallery list.
    pub fn validate(&self) -> Result<(), ConfigError> {
        SortSpec::resolve(&self.sort, None)?;
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        let mut seen = HashSet::new();
        for gallery in &self.galleries {
            let name = gallery.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Validation(
                    "galleries.name must not be empty".into(),
                ));
            }
            if !seen.insert(name) {
                return Err(ConfigError::Validation(format!(
                    "duplicate gallery name '{name}'"
                )));
            }
        }
        Ok(())
    }

    /// Find a gallery definition by name.
    pub fn gallery(&self, name: &str) -> Option<&GalleryConfig> {
        self.galleries.iter().find(|g| g.name == name)
    }
}

/// One `[[galleries]]` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GalleryConfig {
    pub name: String,
    /// Filter expression. Empty means every image in the pool.
    #[serde(default)]
    pub filter: String,
    /// `field[:direction]` override of the global sort.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(SiteConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely, so a user's
///   `[[galleries]]` list replaces the (empty) default list.
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

/// Load a `config.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `config.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = path.join("config.toml");
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<SiteConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: SiteConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `config.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(root)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Gallery Query Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Sorting
# ---------------------------------------------------------------------------
[sort]
# Property used to order every gallery, unless the gallery overrides it.
# Any filter property works: filename, sourcePath, width, height, fileSize,
# dateTaken, exif.<field> or exif.raw.<Tag>.
field = "dateTaken"

# asc (oldest / smallest first) or desc.
direction = "asc"

# Sort key for images whose primary field is missing, e.g. photos without a
# capture date. Set to "" to disable (such images then sort last).
# Ties are always broken by filename, then source path.
fallback = "filename"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for filtering and gallery builds.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Galleries
# ---------------------------------------------------------------------------
# Each [[galleries]] entry selects images from the shared pool with a filter
# expression. An empty or missing filter includes every image.
#
# [[galleries]]
# name = "canon-high-iso"
# filter = "exif.make == 'Canon' and exif.iso >= 800 | sort dateTaken desc | limit 5"
#
# [[galleries]]
# name = "favorites"
# filter = "exif.raw.Rating >= 4"
# sort = "exif.focalLength:desc"   # field only keeps the global direction
"##
}
