//! Cell containers: the top-level cell index and the per-cell decode
//!
//! The index (MCIN) is the authoritative map from cell number to container
//! offset. Physical container order in the stream carries no meaning.

mod index;
mod resolver;

pub use index::{CellIndex, CellIndexEntry, CellLocation};
pub use resolver::{decode_cell, resolve, SubrecordEntry};

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Serialize;

use adtkit_layout::cell::{self as layout, GRID_X_FIELD, GRID_Y_FIELD, POSITION_FIELD};
use adtkit_layout::SubrecordKind;

use crate::registry::Record;
use crate::relocate::GridCoord;

bitflags! {
    /// Cell header flag word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
    pub struct CellFlags: u32 {
        /// Shadow map offset and size are present
        const HAS_MCSH = layout::FLAG_HAS_MCSH;
        const IMPASS = layout::FLAG_IMPASS;
        const LQ_RIVER = layout::FLAG_LQ_RIVER;
        const LQ_OCEAN = layout::FLAG_LQ_OCEAN;
        const LQ_MAGMA = layout::FLAG_LQ_MAGMA;
        const LQ_SLIME = layout::FLAG_LQ_SLIME;
        /// Vertex colour offset is present
        const HAS_MCCV = layout::FLAG_HAS_MCCV;
        const DO_NOT_FIX_ALPHA_MAP = layout::FLAG_DO_NOT_FIX_ALPHA_MAP;
        /// Height/normal offsets are replaced by a 64-bit hole mask
        const HIGH_RES_HOLES = layout::FLAG_HIGH_RES_HOLES;
    }
}

/// A decoded cell container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedCell {
    pub header: Record,
    pub flags: CellFlags,
    /// Keyed by sub-record kind name, in slot order
    pub subrecords: IndexMap<&'static str, SubrecordEntry>,
}

impl DecodedCell {
    /// Grid fields as stored in the header
    pub fn grid(&self) -> Option<GridCoord> {
        Some(GridCoord::new(
            self.header.u32(GRID_X_FIELD)?,
            self.header.u32(GRID_Y_FIELD)?,
        ))
    }

    pub fn position(&self) -> Option<[f32; 3]> {
        self.header.vec3(POSITION_FIELD)
    }

    pub fn subrecord(&self, kind: SubrecordKind) -> Option<&SubrecordEntry> {
        self.subrecords.get(kind.name())
    }

    pub fn unresolved_count(&self) -> usize {
        self.subrecords
            .values()
            .filter(|e| matches!(e, SubrecordEntry::Unresolved { .. }))
            .count()
    }
}

/// Space-separated hex of up to `max` bytes
pub(crate) fn hex_dump(bytes: &[u8], max: usize) -> String {
    bytes
        .iter()
        .take(max)
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_round_trip() {
        let flags = CellFlags::from_bits_retain(0x10041);
        assert!(flags.contains(CellFlags::HAS_MCSH));
        assert!(flags.contains(CellFlags::HAS_MCCV));
        assert!(flags.contains(CellFlags::HIGH_RES_HOLES));
        assert_eq!(flags.bits(), 0x10041);
    }

    #[test]
    fn test_hex_dump_caps() {
        assert_eq!(hex_dump(&[0x4d, 0x43, 0x00], 2), "4d 43");
        assert_eq!(hex_dump(&[], 32), "");
    }
}
