//! Shared read-only configuration
//!
//! Defaults describe the standard tile system: a 64×64 grid of tiles, each
//! 1600/3 world units wide and split into 16×16 cells.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::chunk::{KnownTags, TagOrientation};
use crate::error::{Error, Result};

pub const DEFAULT_WORLD_SIZE: f64 = 64.0 * 1600.0 / 3.0;

/// Largest accepted `cells_per_side`; the cell index is sized from its square
pub const MAX_CELLS_PER_SIDE: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// World extent covered by the whole tile grid, per axis
    pub world_size: f64,
    /// Tiles per grid side
    pub grid_dimension: u32,
    /// Cells per tile side; the cell index holds `cells_per_side²` entries
    pub cells_per_side: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            world_size: DEFAULT_WORLD_SIZE,
            grid_dimension: 64,
            cells_per_side: 16,
        }
    }
}

impl GridConfig {
    /// World width of one tile
    pub fn tile_size(&self) -> f64 {
        self.world_size / self.grid_dimension as f64
    }

    pub fn cell_size(&self) -> f64 {
        self.tile_size() / self.cells_per_side as f64
    }

    pub fn expected_cells(&self) -> usize {
        let side = self.cells_per_side as usize;
        side * side
    }

    /// World coordinate of the grid centre
    pub fn origin(&self) -> f64 {
        self.world_size / 2.0
    }
}

/// What cell-header offsets are counted from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetOrigin {
    /// Start of the container payload
    #[default]
    Payload,
    /// Start of the container's 8-byte chunk header
    ChunkStart,
}

impl OffsetOrigin {
    /// Bytes to subtract from a stored offset to make it payload-relative
    pub fn bias(self) -> usize {
        match self {
            Self::Payload => 0,
            Self::ChunkStart => 8,
        }
    }
}

/// Where the tile's own grid coordinate is read from and written to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileCoordinateSource {
    /// Cell header grid fields hold the tile coordinate and are rewritten
    #[default]
    HeaderFields,
    /// Derived from the first cell's world position; grid fields untouched
    WorldPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub grid: GridConfig,
    pub fallback_orientation: TagOrientation,
    pub known_tags: KnownTags,
    /// Misaligned arrays tolerated before a structural check fails
    pub misaligned_tolerance: usize,
    pub subchunk_offset_origin: OffsetOrigin,
    pub tile_coordinate_source: TileCoordinateSource,
    pub backup_extension: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            fallback_orientation: TagOrientation::Reversed,
            known_tags: KnownTags::default(),
            misaligned_tolerance: 0,
            subchunk_offset_origin: OffsetOrigin::Payload,
            tile_coordinate_source: TileCoordinateSource::HeaderFields,
            backup_extension: "bak".to_string(),
        }
    }
}

impl Config {
    /// Load from a JSON file; missing keys take their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.grid.world_size.is_finite() && self.grid.world_size > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "world_size must be positive, got {}",
                self.grid.world_size
            )));
        }
        if self.grid.grid_dimension == 0 || self.grid.cells_per_side == 0 {
            return Err(Error::InvalidConfig("grid dimensions must be non-zero".into()));
        }
        if self.grid.cells_per_side > MAX_CELLS_PER_SIDE {
            return Err(Error::InvalidConfig(format!(
                "cells_per_side must be at most {MAX_CELLS_PER_SIDE}, got {}",
                self.grid.cells_per_side
            )));
        }
        if self.backup_extension.is_empty() {
            return Err(Error::InvalidConfig("backup_extension must not be empty".into()));
        }
        Ok(())
    }
}
