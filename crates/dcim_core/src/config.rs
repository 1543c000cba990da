//! Engine configuration.
//!
//! All pixel dimensions live here so the interactive controller and the batch
//! materializer derive geometry from one source. Every field has a default,
//! and a config file only needs to mention what it overrides.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Error loading an [`EngineConfig`] from disk.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config value: {0}")]
    InvalidValue(String),
}

/// Pixel metrics of a rack and of the devices mounted in it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RackMetrics {
    /// Height of one rack unit in pixels.
    pub px_per_u: f32,
    pub rack_width: f32,
    /// Width of the side rails, also the top and bottom padding of the slot area.
    pub rail_padding: f32,
    /// Height of the label header drawn above the top rail.
    pub header_height: f32,
}

impl Default for RackMetrics {
    fn default() -> Self {
        Self {
            px_per_u: 30.0,
            rack_width: 400.0,
            rail_padding: 20.0,
            header_height: 50.0,
        }
    }
}

impl RackMetrics {
    /// Width of a mounted device: the rack minus both rails.
    pub fn device_width(&self) -> f32 {
        self.rack_width - self.rail_padding * 2.0
    }

    /// Pixel height of a device spanning `u_height` units.
    pub fn device_height(&self, u_height: u32) -> f32 {
        u_height as f32 * self.px_per_u
    }

    /// Total pixel height of a rack: header, both rails and the slot area.
    pub fn rack_height(&self, total_u: u32) -> f32 {
        self.header_height + self.rail_padding * 2.0 + self.slot_area_height(total_u)
    }

    /// Height of the usable slot area of a rack.
    pub fn slot_area_height(&self, total_u: u32) -> f32 {
        total_u as f32 * self.px_per_u
    }

    /// Rack-relative offset of the top of the slot area.
    pub fn slot_area_top(&self) -> f32 {
        self.header_height + self.rail_padding
    }

    pub fn rack_size(&self, total_u: u32) -> Vec2 {
        Vec2::new(self.rack_width, self.rack_height(total_u))
    }

    pub fn device_size(&self, u_height: u32) -> Vec2 {
        Vec2::new(self.device_width(), self.device_height(u_height))
    }
}

/// Sizes used when a zone is dropped without explicit dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneDefaults {
    pub width: f32,
    pub height: f32,
    /// Smallest size a zone may be resized to.
    pub min_width: f32,
    pub min_height: f32,
}

impl Default for ZoneDefaults {
    fn default() -> Self {
        Self {
            width: 400.0,
            height: 300.0,
            min_width: 100.0,
            min_height: 100.0,
        }
    }
}

impl ZoneDefaults {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Fixed footprint of software elements.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareMetrics {
    pub width: f32,
    pub height: f32,
}

impl Default for SoftwareMetrics {
    fn default() -> Self {
        Self {
            width: 220.0,
            height: 70.0,
        }
    }
}

impl SoftwareMetrics {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Spacing constants of the batch layout materializer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchLayoutConfig {
    /// Horizontal inset of the first child inside the container zone.
    pub zone_padding_x: f32,
    /// Vertical inset of children, leaving room for the zone header.
    pub zone_padding_y: f32,
    /// Space kept below the tallest child.
    pub zone_padding_bottom: f32,
    /// Horizontal gap between neighbouring racks.
    pub rack_gap: f32,
    /// Horizontal gap between neighbouring flow nodes.
    pub flow_gap: f32,
    /// Extra vertical offset of the flow row below the zone padding.
    pub flow_row_offset: f32,
    /// Where the container zone goes on an empty canvas.
    pub origin: Vec2,
    /// Horizontal gap kept between existing content and a new container zone.
    pub content_gap: f32,
    /// Container size used when the description does not declare one.
    pub default_container: Vec2,
}

impl Default for BatchLayoutConfig {
    fn default() -> Self {
        Self {
            zone_padding_x: 50.0,
            zone_padding_y: 60.0,
            zone_padding_bottom: 50.0,
            rack_gap: 50.0,
            flow_gap: 100.0,
            flow_row_offset: 100.0,
            origin: Vec2::new(50.0, 50.0),
            content_gap: 100.0,
            default_container: Vec2::new(1200.0, 800.0),
        }
    }
}

/// Complete engine configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub rack: RackMetrics,
    pub zone: ZoneDefaults,
    pub software: SoftwareMetrics,
    pub batch: BatchLayoutConfig,
    /// Offset applied to the position of a duplicated element.
    pub duplicate_offset: Vec2,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rack: RackMetrics::default(),
            zone: ZoneDefaults::default(),
            software: SoftwareMetrics::default(),
            batch: BatchLayoutConfig::default(),
            duplicate_offset: Vec2::new(20.0, 20.0),
        }
    }
}

impl EngineConfig {
    /// Load a config from a JSON file. Missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;
        log::debug!("Loaded engine config from {}", path.display());
        Ok(config)
    }

    /// Parse a config from a JSON string and check it for unusable values.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig =
            serde_json::from_str(text).map_err(|source| ConfigError::Parse {
                path: PathBuf::new(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rack = &self.rack;
        if rack.px_per_u <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "rack.px_per_u must be positive, got {}",
                rack.px_per_u
            )));
        }
        if rack.device_width() <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "rack.rack_width ({}) must exceed both rails ({})",
                rack.rack_width,
                rack.rail_padding * 2.0
            )));
        }
        if rack.header_height < 0.0 || rack.rail_padding < 0.0 {
            return Err(ConfigError::InvalidValue(
                "rack padding and header height must not be negative".to_string(),
            ));
        }
        if self.zone.min_width <= 0.0 || self.zone.min_height <= 0.0 {
            return Err(ConfigError::InvalidValue(
                "zone minimum size must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
