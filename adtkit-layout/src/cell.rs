//! Cell container (MCNK) header layout
//!
//! The header is a fixed 128-byte record at the start of the container
//! payload. Sub-record offsets are stored in the header rather than reached
//! by walking the payload, so the resolver in `adtkit` works from
//! `SUBRECORD_SLOTS` alone.

use crate::fields::{Axis, AxisMap, FieldSpec, FieldType, StructLayout};
use crate::tags;

pub const FLAG_HAS_MCSH: u32 = 0x1;
pub const FLAG_IMPASS: u32 = 0x2;
pub const FLAG_LQ_RIVER: u32 = 0x4;
pub const FLAG_LQ_OCEAN: u32 = 0x8;
pub const FLAG_LQ_MAGMA: u32 = 0x10;
pub const FLAG_LQ_SLIME: u32 = 0x20;
pub const FLAG_HAS_MCCV: u32 = 0x40;
pub const FLAG_DO_NOT_FIX_ALPHA_MAP: u32 = 0x8000;
pub const FLAG_HIGH_RES_HOLES: u32 = 0x10000;

pub const GRID_X_FIELD: &str = "index_x";
pub const GRID_Y_FIELD: &str = "index_y";
pub const POSITION_FIELD: &str = "position";

const F: &str = "flags";

pub const CELL_HEADER: StructLayout = StructLayout {
    name: "MCNK",
    size: 0x80,
    fields: &[
        FieldSpec::new(F, 0x00, FieldType::U32),
        FieldSpec::new(GRID_X_FIELD, 0x04, FieldType::U32),
        FieldSpec::new(GRID_Y_FIELD, 0x08, FieldType::U32),
        FieldSpec::new("n_layers", 0x0C, FieldType::U32),
        FieldSpec::new("n_doodad_refs", 0x10, FieldType::U32),
        FieldSpec::new("ofs_height", 0x14, FieldType::U32).when_clear(F, FLAG_HIGH_RES_HOLES),
        FieldSpec::new("ofs_normal", 0x18, FieldType::U32).when_clear(F, FLAG_HIGH_RES_HOLES),
        FieldSpec::new("holes_high_res", 0x14, FieldType::U64).when_set(F, FLAG_HIGH_RES_HOLES),
        FieldSpec::new("ofs_layer", 0x1C, FieldType::U32),
        FieldSpec::new("ofs_refs", 0x20, FieldType::U32),
        FieldSpec::new("ofs_alpha", 0x24, FieldType::U32),
        FieldSpec::new("size_alpha", 0x28, FieldType::U32),
        FieldSpec::new("ofs_shadow", 0x2C, FieldType::U32).when_set(F, FLAG_HAS_MCSH),
        FieldSpec::new("size_shadow", 0x30, FieldType::U32).when_set(F, FLAG_HAS_MCSH),
        FieldSpec::new("area_id", 0x34, FieldType::U32),
        FieldSpec::new("n_map_obj_refs", 0x38, FieldType::U32),
        FieldSpec::new("holes_low_res", 0x3C, FieldType::U16),
        FieldSpec::new("unknown_but_used", 0x3E, FieldType::U16),
        FieldSpec::new("low_quality_texture_map", 0x40, FieldType::Bytes(16)),
        FieldSpec::new("no_effect_doodad", 0x50, FieldType::U64),
        FieldSpec::new("ofs_sound_emitters", 0x58, FieldType::U32),
        FieldSpec::new("n_sound_emitters", 0x5C, FieldType::U32),
        FieldSpec::new("ofs_liquid", 0x60, FieldType::U32),
        FieldSpec::new("size_liquid", 0x64, FieldType::U32),
        FieldSpec::new(POSITION_FIELD, 0x68, FieldType::Vec3F32),
        FieldSpec::new("ofs_mccv", 0x74, FieldType::U32).when_set(F, FLAG_HAS_MCCV),
        FieldSpec::new("ofs_mclv", 0x78, FieldType::U32),
        FieldSpec::new("unused", 0x7C, FieldType::U32),
    ],
};

/// Cell position components: `[0]` runs along grid y, `[1]` along grid x,
/// both decreasing as the grid index grows; `[2]` is height.
pub const CELL_POSITION_AXES: [AxisMap; 3] = [
    AxisMap::minus(Axis::Y),
    AxisMap::minus(Axis::X),
    AxisMap::plus(Axis::Vertical),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubrecordKind {
    Heights,
    Normals,
    Layers,
    DoodadRefs,
    AlphaMaps,
    ShadowMap,
    Liquid,
    SoundEmitters,
    VertexColors,
    VertexLighting,
}

impl SubrecordKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Heights => "heights",
            Self::Normals => "normals",
            Self::Layers => "layers",
            Self::DoodadRefs => "doodad_refs",
            Self::AlphaMaps => "alpha_maps",
            Self::ShadowMap => "shadow_map",
            Self::Liquid => "liquid",
            Self::SoundEmitters => "sound_emitters",
            Self::VertexColors => "vertex_colors",
            Self::VertexLighting => "vertex_lighting",
        }
    }
}

/// Where a sub-record's offset lives in the header and which tag the
/// nested record is expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubrecordSlot {
    pub kind: SubrecordKind,
    pub offset_field: &'static str,
    pub tag: [u8; 4],
}

pub const SUBRECORD_SLOTS: &[SubrecordSlot] = &[
    SubrecordSlot { kind: SubrecordKind::Heights, offset_field: "ofs_height", tag: tags::MCVT },
    SubrecordSlot { kind: SubrecordKind::Normals, offset_field: "ofs_normal", tag: tags::MCNR },
    SubrecordSlot { kind: SubrecordKind::Layers, offset_field: "ofs_layer", tag: tags::MCLY },
    SubrecordSlot { kind: SubrecordKind::DoodadRefs, offset_field: "ofs_refs", tag: tags::MCRF },
    SubrecordSlot { kind: SubrecordKind::AlphaMaps, offset_field: "ofs_alpha", tag: tags::MCAL },
    SubrecordSlot { kind: SubrecordKind::ShadowMap, offset_field: "ofs_shadow", tag: tags::MCSH },
    SubrecordSlot { kind: SubrecordKind::Liquid, offset_field: "ofs_liquid", tag: tags::MCLQ },
    SubrecordSlot { kind: SubrecordKind::SoundEmitters, offset_field: "ofs_sound_emitters", tag: tags::MCSE },
    SubrecordSlot { kind: SubrecordKind::VertexColors, offset_field: "ofs_mccv", tag: tags::MCCV },
    SubrecordSlot { kind: SubrecordKind::VertexLighting, offset_field: "ofs_mclv", tag: tags::MCLV },
];

/// Smallest payload that holds every field the relocation patcher writes
pub fn patched_extent() -> usize {
    [GRID_X_FIELD, GRID_Y_FIELD, POSITION_FIELD]
        .iter()
        .filter_map(|name| CELL_HEADER.field(name))
        .map(FieldSpec::end)
        .max()
        .unwrap_or(CELL_HEADER.size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields_fit() {
        for field in CELL_HEADER.fields {
            assert!(field.end() <= CELL_HEADER.size, "{} overruns header", field.name);
        }
    }

    #[test]
    fn test_every_slot_has_offset_field() {
        for slot in SUBRECORD_SLOTS {
            let field = CELL_HEADER.field(slot.offset_field).unwrap();
            assert_eq!(field.ty, FieldType::U32);
        }
    }

    #[test]
    fn test_patched_extent() {
        assert_eq!(patched_extent(), 0x74);
    }
}
