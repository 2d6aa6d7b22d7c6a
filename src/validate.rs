//! Structural and conformance checks over a whole tile

use indexmap::IndexMap;
use serde::Serialize;

use adtkit_layout::{tags, PlacementKind};

use crate::chunk::{Tag, TagOrientation};
use crate::config::{Config, TileCoordinateSource};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
use crate::document::{decode_bytes, DecodedDocument};
use crate::placement::PlacementRecord;
use crate::relocate::GridCoord;

const EXPECTED_VERSION: u32 = 18;
const MIN_SCALE: f32 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub file_len: u64,
    /// CRC-32 of the whole file
    pub checksum: u32,
    pub orientation: TagOrientation,
    pub chunk_counts: IndexMap<Tag, usize>,
    pub truncated_at: Option<u64>,
    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
}

impl ValidationReport {
    pub fn misaligned_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|d| d.kind == DiagnosticKind::MisalignedArray)
            .count()
    }

    /// Structural pass: no errors and no more misaligned arrays than tolerated
    pub fn passes(&self, misaligned_tolerance: usize) -> bool {
        self.errors.is_empty() && self.misaligned_count() <= misaligned_tolerance
    }

    /// Why `after` is not structurally the same file as `self`, if it isn't
    pub fn structural_change(&self, after: &ValidationReport) -> Option<String> {
        if self.file_len != after.file_len {
            return Some(format!("file length changed from {} to {}", self.file_len, after.file_len));
        }
        if self.chunk_counts != after.chunk_counts {
            return Some(format!(
                "chunk counts changed from {:?} to {:?}",
                self.chunk_counts, after.chunk_counts
            ));
        }
        None
    }

    /// One-line reason for a failed structural pass
    pub fn failure_reason(&self, misaligned_tolerance: usize) -> String {
        match self.errors.first() {
            Some(err) => err.to_string(),
            None => format!(
                "{} misaligned arrays, tolerance {misaligned_tolerance}",
                self.misaligned_count()
            ),
        }
    }
}

/// Validate a tile held in memory. Pure: the same bytes always give the
/// same report.
pub fn validate_bytes(data: &[u8], config: &Config) -> ValidationReport {
    let doc = decode_bytes(data, config);
    let mut diags = doc.diagnostics.clone();
    check_conformance(&doc, config, &mut diags);

    let (errors, warnings): (Vec<_>, Vec<_>) = diags
        .into_vec()
        .into_iter()
        .partition(|d| d.severity == Severity::Error);

    ValidationReport {
        file_len: data.len() as u64,
        checksum: crc32fast::hash(data),
        orientation: doc.orientation,
        chunk_counts: doc.counts(),
        truncated_at: doc.truncated_at,
        warnings,
        errors,
    }
}

fn check_conformance(doc: &DecodedDocument, config: &Config, diags: &mut Diagnostics) {
    let offset_of = |tag: [u8; 4]| doc.find(Tag::new(tag)).map(|c| c.offset);

    match doc.version() {
        Some(EXPECTED_VERSION) => {}
        Some(v) => diags.warn(
            DiagnosticKind::Conformance,
            offset_of(tags::MVER),
            format!("version {v}, expected {EXPECTED_VERSION}"),
        ),
        None => diags.warn(DiagnosticKind::Conformance, None, "no MVER chunk"),
    }
    if doc.find(Tag::new(tags::MHDR)).is_none() {
        diags.warn(DiagnosticKind::Conformance, None, "no MHDR chunk");
    }

    let expected = config.grid.expected_cells();
    let cell_count = doc.find_all(Tag::new(tags::MCNK)).count();
    if cell_count != expected {
        diags.warn(
            DiagnosticKind::Conformance,
            None,
            format!("{cell_count} MCNK chunks, expected {expected}"),
        );
    }
    check_cell_grid(doc, config, diags);

    for name in doc.textures() {
        if !name.to_ascii_lowercase().ends_with(".blp") {
            diags.warn(
                DiagnosticKind::Conformance,
                offset_of(tags::MTEX),
                format!("texture {name:?} is not a .blp"),
            );
        }
    }

    // map objects commonly leave the scale slot zeroed, so only models are checked
    for placement in doc.placements() {
        if let PlacementRecord::Model(m) = placement {
            if placement.scale() < MIN_SCALE {
                diags.warn(
                    DiagnosticKind::Conformance,
                    offset_of(PlacementKind::Model.tag()),
                    format!("model {} has scale {}", m.unique_id, placement.scale()),
                );
            }
        }
    }
}

/// Stored grid fields must make sense for the configured convention: one
/// shared tile coordinate, or unique in-range cell positions.
fn check_cell_grid(doc: &DecodedDocument, config: &Config, diags: &mut Diagnostics) {
    let cells: Vec<(usize, GridCoord)> = doc
        .cells()
        .filter_map(|(i, cell)| cell.grid().map(|g| (i, g)))
        .collect();

    match config.tile_coordinate_source {
        TileCoordinateSource::HeaderFields => {
            let limit = config.grid.grid_dimension;
            let Some(&(_, first)) = cells.first() else { return };
            for &(i, coord) in &cells {
                if coord != first {
                    diags.warn(
                        DiagnosticKind::Conformance,
                        None,
                        format!("cell {i} claims tile {coord}, cell 0 claims {first}"),
                    );
                }
                if coord.x >= limit || coord.y >= limit {
                    diags.warn(DiagnosticKind::Conformance, None, format!("cell {i} tile {coord} outside grid"));
                }
            }
        }
        TileCoordinateSource::WorldPosition => {
            let limit = config.grid.cells_per_side;
            let mut seen = std::collections::HashSet::new();
            for &(i, coord) in &cells {
                if coord.x >= limit || coord.y >= limit {
                    diags.warn(DiagnosticKind::Conformance, None, format!("cell {i} index {coord} out of range"));
                } else if !seen.insert(coord) {
                    diags.warn(DiagnosticKind::Conformance, None, format!("cell {i} index {coord} duplicated"));
                }
            }
        }
    }
}
