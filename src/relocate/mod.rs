//! Tile relocation: moving a tile to a new grid coordinate by rewriting every
//! absolute position it embeds, in place.

mod patcher;

pub use patcher::{plan_relocation, relocate_buffer, relocate_with_index, RelocationPlan, RelocationSummary};

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use adtkit_layout::{Axis, AxisMap};

use crate::config::GridConfig;

/// Tile coordinate on the world grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: u32,
    pub y: u32,
}

impl GridCoord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Parse the trailing `_<x>_<y>` of a tile file name such as
    /// `Azeroth_32_48.adt`.
    pub fn from_file_name(path: impl AsRef<Path>) -> Option<Self> {
        let stem = path.as_ref().file_stem()?.to_str()?;
        let mut parts = stem.rsplit('_');
        let y = parts.next()?.parse().ok()?;
        let x = parts.next()?.parse().ok()?;
        // a bare "32_48" has no map name
        parts.next()?;
        Some(Self { x, y })
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What to move and by how much
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelocationRequest {
    pub from: GridCoord,
    pub to: GridCoord,
    /// Added to every height component; independent of the grid move
    #[serde(default)]
    pub vertical_offset: f64,
    /// Extra (x, up, z) bias for map-object placements only
    #[serde(default)]
    pub map_object_offset: [f64; 3],
}

impl RelocationRequest {
    pub fn new(from: GridCoord, to: GridCoord) -> Self {
        Self { from, to, vertical_offset: 0.0, map_object_offset: [0.0; 3] }
    }

    pub fn with_vertical_offset(mut self, offset: f64) -> Self {
        self.vertical_offset = offset;
        self
    }

    pub fn with_map_object_offset(mut self, offset: [f64; 3]) -> Self {
        self.map_object_offset = offset;
        self
    }

    /// The request that undoes this one
    pub fn inverse(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            vertical_offset: -self.vertical_offset,
            map_object_offset: self.map_object_offset.map(|v| -v),
        }
    }
}

/// World-space displacement, one value per logical axis
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RelocationDelta {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl RelocationDelta {
    pub fn between(from: GridCoord, to: GridCoord, vertical_offset: f64, grid: &GridConfig) -> Self {
        let tile = grid.tile_size();
        Self {
            dx: (to.x as f64 - from.x as f64) * tile,
            dy: (to.y as f64 - from.y as f64) * tile,
            dz: vertical_offset,
        }
    }

    pub fn for_request(request: &RelocationRequest, grid: &GridConfig) -> Self {
        Self::between(request.from, request.to, request.vertical_offset, grid)
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.dx,
            Axis::Y => self.dy,
            Axis::Vertical => self.dz,
        }
    }

    /// Signed displacement of a stored component
    pub fn component(&self, map: AxisMap) -> f64 {
        map.sign as f64 * self.along(map.axis)
    }

    pub fn inverse(&self) -> Self {
        Self { dx: -self.dx, dy: -self.dy, dz: -self.dz }
    }
}
