#![forbid(unsafe_code)]

//! Matrix configuration as data.
//!
//! [`MatrixConfig::default`] carries the stock constants. With the `config`
//! feature it can also be loaded from TOML or JSON:
//!
//! ```toml
//! # splom.toml
//! cell_size = 120
//! sample_percent = 50
//! render_strategy = "square:side=2"
//! ```
//!
//! Missing keys keep their defaults.

#[cfg(feature = "config")]
use std::path::Path;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use splom_core::{Descriptor, Size};
use splom_overlay::builtin;

/// Tunables for one scatter-plot matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct MatrixConfig {
    /// Default cell edge length in pixels.
    pub cell_size: u16,
    pub min_cell_size: u16,
    pub max_cell_size: u16,
    /// Granularity of the cell-size control.
    pub cell_size_step: u16,

    /// Default percentage of rows to sample.
    pub sample_percent: u8,
    /// Seed for the subsampler.
    pub sampler_seed: u64,

    /// Canonical string of the default render strategy.
    pub render_strategy: String,
    /// Canonical string of the overlay built when a requested one cannot be
    /// reconstructed.
    pub fallback_overlay: String,
    /// Canonical string of the render strategy built when a requested one
    /// cannot be reconstructed.
    pub fallback_strategy: String,
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            cell_size: 100,
            min_cell_size: 20,
            max_cell_size: 500,
            cell_size_step: 4,
            sample_percent: 100,
            sampler_seed: 1,
            render_strategy: "circle".into(),
            fallback_overlay: "diagonal".into(),
            fallback_strategy: "circle".into(),
        }
    }
}

impl MatrixConfig {
    /// Load from a TOML string.
    #[cfg(feature = "config")]
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(ConfigError::Toml)
    }

    /// Load from a TOML file on disk.
    #[cfg(feature = "config")]
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    #[cfg(feature = "config")]
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(ConfigError::Json)
    }

    /// Load from a JSON file on disk.
    #[cfg(feature = "config")]
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Check every field. An empty list means the config is usable.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.min_cell_size == 0 {
            errors.push("min_cell_size must be > 0".into());
        }
        if self.min_cell_size > self.max_cell_size {
            errors.push(format!(
                "min_cell_size ({}) must not exceed max_cell_size ({})",
                self.min_cell_size, self.max_cell_size
            ));
        }
        if self.cell_size_step == 0 {
            errors.push("cell_size_step must be > 0".into());
        }
        if !self.cell_size_in_range(self.cell_size) {
            errors.push(format!(
                "cell_size must be in {}..={}, got {}",
                self.min_cell_size, self.max_cell_size, self.cell_size
            ));
        }
        if self.sample_percent > 100 {
            errors.push(format!(
                "sample_percent must be in 0..=100, got {}",
                self.sample_percent
            ));
        }
        let overlays = builtin::overlay_registry();
        let strategies = builtin::strategy_registry();
        for (name, value, registered) in [
            ("render_strategy", &self.render_strategy, None),
            ("fallback_overlay", &self.fallback_overlay, Some(overlays.kinds().collect::<Vec<_>>())),
            ("fallback_strategy", &self.fallback_strategy, Some(strategies.kinds().collect())),
        ] {
            match Descriptor::parse(value) {
                Err(e) => errors.push(format!("{name} {value:?} is not a valid descriptor: {e}")),
                Ok(d) => {
                    if let Some(kinds) = registered.filter(|k| !k.contains(&d.kind())) {
                        errors.push(format!(
                            "{name} {value:?} names no built-in type (one of {})",
                            kinds.join(", ")
                        ));
                    }
                }
            }
        }

        errors
    }

    pub fn cell_size_in_range(&self, side: u16) -> bool {
        (self.min_cell_size..=self.max_cell_size).contains(&side)
    }

    /// Round `requested` to the nearest multiple of the step above the
    /// minimum, clamped to the limits.
    pub fn snap_cell_size(&self, requested: u16) -> u16 {
        let step = self.cell_size_step.max(1);
        let clamped = requested.clamp(self.min_cell_size, self.max_cell_size.max(self.min_cell_size));
        let offset = clamped - self.min_cell_size;
        let snapped = self
            .min_cell_size
            .saturating_add((offset + step / 2) / step * step);
        snapped.min(self.max_cell_size.max(self.min_cell_size))
    }

    /// The default cell size as a square.
    pub fn default_size(&self) -> Size {
        Size::square(self.cell_size)
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// A configuration file could not be loaded.
#[cfg(feature = "config")]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(toml::de::Error),
    #[error("JSON parse error: {0}")]
    Json(serde_json::Error),
}
