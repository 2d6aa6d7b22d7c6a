use byteorder::{ByteOrder, LittleEndian};
use serde::Serialize;

use adtkit_layout::cell::{patched_extent, GRID_X_FIELD, GRID_Y_FIELD, POSITION_FIELD};
use adtkit_layout::{PlacementKind, CELL_HEADER, CELL_POSITION_AXES, PLACEMENT_POSITION_AXES};

use super::{GridCoord, RelocationDelta, RelocationRequest};
use crate::cell::{CellIndex, CellLocation};
use crate::chunk::{read_chunks, Tag, TagOrientation};
use crate::codec::{FieldWrite, PatchWriter};
use crate::config::{Config, TileCoordinateSource};
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

/// What a relocation changed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelocationSummary {
    pub orientation: TagOrientation,
    pub delta: RelocationDelta,
    /// Tile coordinate read from the file before patching
    pub found: GridCoord,
    pub cells_patched: usize,
    pub models_patched: usize,
    pub map_objects_patched: usize,
    /// Scalar overwrites applied
    pub writes: usize,
    pub diagnostics: Diagnostics,
}

/// Every write a relocation would make, computed without touching the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct RelocationPlan {
    pub writes: Vec<FieldWrite>,
    pub summary: RelocationSummary,
}

fn field_offset(name: &str) -> usize {
    CELL_HEADER.field(name).map_or(0, |f| f.offset)
}

fn read_vec3(data: &[u8], offset: usize) -> [f32; 3] {
    [
        LittleEndian::read_f32(&data[offset..]),
        LittleEndian::read_f32(&data[offset + 4..]),
        LittleEndian::read_f32(&data[offset + 8..]),
    ]
}

/// Tile coordinate a cell claims, per the configured source
fn tile_coordinate(data: &[u8], cell: &CellLocation, config: &Config) -> Result<GridCoord> {
    let header = cell.payload_offset;
    match config.tile_coordinate_source {
        TileCoordinateSource::HeaderFields => Ok(GridCoord::new(
            LittleEndian::read_u32(&data[header + field_offset(GRID_X_FIELD)..]),
            LittleEndian::read_u32(&data[header + field_offset(GRID_Y_FIELD)..]),
        )),
        TileCoordinateSource::WorldPosition => {
            let at = header + field_offset(POSITION_FIELD);
            let pos = read_vec3(data, at);
            let origin = config.grid.origin();
            let tile = config.grid.tile_size();
            let limit = config.grid.grid_dimension as f64;
            // every cell corner lies in (origin - (n+1)*tile, origin - n*tile]
            let to_grid = |v: f32| {
                let n = ((origin - v as f64) / tile + 1e-4).floor();
                (n >= 0.0 && n < limit).then_some(n as u32)
            };
            match (to_grid(pos[1]), to_grid(pos[0])) {
                (Some(x), Some(y)) => Ok(GridCoord::new(x, y)),
                _ => Err(Error::OffGridPosition { offset: at as u64, position: pos }),
            }
        }
    }
}

fn push_vec3(writes: &mut Vec<FieldWrite>, offset: usize, values: [f64; 3]) {
    for (k, v) in values.iter().enumerate() {
        writes.push(FieldWrite::F32 { offset: offset + 4 * k, value: *v as f32 });
    }
}

/// Compute the full write set for a relocation. Every precondition is
/// checked here, so a plan that comes back `Ok` can be applied in one go.
pub fn plan_relocation(
    data: &[u8],
    index: &CellIndex,
    orientation: TagOrientation,
    request: &RelocationRequest,
    config: &Config,
) -> Result<RelocationPlan> {
    let cells = index.locate_cells(data, orientation)?;
    let required = patched_extent();
    for cell in &cells {
        if cell.payload_len < required {
            return Err(Error::InsufficientChunkSize {
                offset: cell.chunk_offset as u64,
                size: cell.payload_len as u32,
                required: required as u32,
            });
        }
    }

    let first = cells.first().ok_or(Error::MissingChunk("MCNK"))?;
    let found = tile_coordinate(data, first, config)?;
    if found != request.from {
        return Err(Error::CoordinateMismatch { expected: request.from, found });
    }

    let delta = RelocationDelta::for_request(request, &config.grid);
    let mut writes = Vec::new();

    for cell in &cells {
        let at = cell.payload_offset + field_offset(POSITION_FIELD);
        let pos = read_vec3(data, at);
        let moved: [f64; 3] =
            std::array::from_fn(|k| pos[k] as f64 + delta.component(CELL_POSITION_AXES[k]));
        push_vec3(&mut writes, at, moved);

        if config.tile_coordinate_source == TileCoordinateSource::HeaderFields {
            writes.push(FieldWrite::U32 {
                offset: cell.payload_offset + field_offset(GRID_X_FIELD),
                value: request.to.x,
            });
            writes.push(FieldWrite::U32 {
                offset: cell.payload_offset + field_offset(GRID_Y_FIELD),
                value: request.to.y,
            });
        }
    }
    tracing::debug!(cells = cells.len(), "planned cell writes");

    let stream = read_chunks(data, &config.known_tags, orientation);
    let mut patched = [0usize; 2];
    for (slot, kind) in [PlacementKind::Model, PlacementKind::MapObject].into_iter().enumerate() {
        let layout = kind.layout();
        let bias = match kind {
            PlacementKind::Model => [0.0; 3],
            PlacementKind::MapObject => request.map_object_offset,
        };
        for chunk in stream.find_all(Tag::new(kind.tag())) {
            let base = chunk.payload_offset() as usize;
            // only whole records are touched
            for record in 0..chunk.payload.len() / layout.size {
                for name in kind.position_fields() {
                    let Some(field) = layout.field(name) else { continue };
                    let at = base + record * layout.size + field.offset;
                    let pos = read_vec3(data, at);
                    let moved: [f64; 3] = std::array::from_fn(|k| {
                        pos[k] as f64 + delta.component(PLACEMENT_POSITION_AXES[k]) + bias[k]
                    });
                    push_vec3(&mut writes, at, moved);
                }
                patched[slot] += 1;
            }
        }
    }
    tracing::debug!(models = patched[0], map_objects = patched[1], "planned placement writes");

    Ok(RelocationPlan {
        summary: RelocationSummary {
            orientation,
            delta,
            found,
            cells_patched: cells.len(),
            models_patched: patched[0],
            map_objects_patched: patched[1],
            writes: writes.len(),
            diagnostics: Diagnostics::new(),
        },
        writes,
    })
}

/// Relocate using an already-parsed cell index
pub fn relocate_with_index(
    data: &mut [u8],
    index: &CellIndex,
    orientation: TagOrientation,
    request: &RelocationRequest,
    config: &Config,
) -> Result<RelocationSummary> {
    let plan = plan_relocation(data, index, orientation, request, config)?;
    PatchWriter::new(data).apply(&plan.writes)?;
    Ok(plan.summary)
}

/// Relocate a whole tile held in memory. The buffer length never changes;
/// on `Err` not a single byte has been written.
pub fn relocate_buffer(data: &mut [u8], request: &RelocationRequest, config: &Config) -> Result<RelocationSummary> {
    let (index, orientation, mut diagnostics) = {
        let stream = read_chunks(data, &config.known_tags, config.fallback_orientation);
        if let Some(offset) = stream.truncated_at {
            return Err(Error::PrecheckFailed(format!("chunk stream truncated at {offset:#x}")));
        }
        let mut diagnostics = stream.diagnostics.clone();
        let index = CellIndex::locate(&stream, config.grid.expected_cells(), &mut diagnostics)?;
        (index, stream.orientation, diagnostics)
    };

    let mut summary = relocate_with_index(data, &index, orientation, request, config)?;
    diagnostics.extend(std::mem::take(&mut summary.diagnostics));
    summary.diagnostics = diagnostics;
    tracing::info!(
        from = %request.from,
        to = %request.to,
        cells = summary.cells_patched,
        writes = summary.writes,
        "relocated tile"
    );
    Ok(summary)
}
