//! Canonical tag -> structural descriptor
//!
//! One table shared by the decoder, the validator and the patcher.

use crate::cell::CELL_HEADER;
use crate::fields::{FieldSpec, FieldType, StructLayout};
use crate::placement::{MAP_OBJECT_PLACEMENT, MODEL_PLACEMENT};
use crate::tags;

/// Structural shape of a chunk payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Descriptor {
    /// Fixed-width struct, possibly with flag-conditional fields
    Struct(&'static StructLayout),
    /// Homogeneous array; element count is `payload_len / element.size`
    Array(&'static StructLayout),
    /// Null-separated string table
    Strings,
    /// Cell container: fixed header plus offset-addressed sub-records
    CellContainer(&'static StructLayout),
    /// Opaque payload with a known tag
    Blob,
}

pub const VERSION: StructLayout = StructLayout {
    name: "MVER",
    size: 4,
    fields: &[FieldSpec::new("version", 0, FieldType::U32)],
};

pub const MHDR_FLAG_MFBO: u32 = 0x1;

pub const TILE_HEADER: StructLayout = StructLayout {
    name: "MHDR",
    size: 64,
    fields: &[
        FieldSpec::new("flags", 0, FieldType::U32),
        FieldSpec::new("ofs_mcin", 4, FieldType::U32),
        FieldSpec::new("ofs_mtex", 8, FieldType::U32),
        FieldSpec::new("ofs_mmdx", 12, FieldType::U32),
        FieldSpec::new("ofs_mmid", 16, FieldType::U32),
        FieldSpec::new("ofs_mwmo", 20, FieldType::U32),
        FieldSpec::new("ofs_mwid", 24, FieldType::U32),
        FieldSpec::new("ofs_mddf", 28, FieldType::U32),
        FieldSpec::new("ofs_modf", 32, FieldType::U32),
        FieldSpec::new("ofs_mfbo", 36, FieldType::U32).when_set("flags", MHDR_FLAG_MFBO),
        FieldSpec::new("ofs_mh2o", 40, FieldType::U32),
        FieldSpec::new("ofs_mtxf", 44, FieldType::U32),
        FieldSpec::new("unused", 48, FieldType::Bytes(16)),
    ],
};

pub const CELL_INDEX_ENTRY: StructLayout = StructLayout {
    name: "MCIN",
    size: 16,
    fields: &[
        FieldSpec::new("offset", 0, FieldType::U32),
        FieldSpec::new("size", 4, FieldType::U32),
        FieldSpec::new("flags", 8, FieldType::U32),
        FieldSpec::new("reserved", 12, FieldType::U32),
    ],
};

pub const FLIGHT_BOUNDS: StructLayout = StructLayout {
    name: "MFBO",
    size: 36,
    fields: &[
        FieldSpec::new("maximum", 0, FieldType::Bytes(18)),
        FieldSpec::new("minimum", 18, FieldType::Bytes(18)),
    ],
};

pub const U32_ELEMENT: StructLayout = StructLayout {
    name: "u32",
    size: 4,
    fields: &[FieldSpec::new("value", 0, FieldType::U32)],
};

pub const HEIGHT_ELEMENT: StructLayout = StructLayout {
    name: "height",
    size: 4,
    fields: &[FieldSpec::new("height", 0, FieldType::F32)],
};

pub const NORMAL_ELEMENT: StructLayout = StructLayout {
    name: "normal",
    size: 3,
    fields: &[FieldSpec::new("normal", 0, FieldType::Vec3I8)],
};

pub const LAYER_ELEMENT: StructLayout = StructLayout {
    name: "layer",
    size: 16,
    fields: &[
        FieldSpec::new("texture_id", 0, FieldType::U32),
        FieldSpec::new("flags", 4, FieldType::U32),
        FieldSpec::new("ofs_alpha", 8, FieldType::U32),
        FieldSpec::new("effect_id", 12, FieldType::U32),
    ],
};

pub const COLOR_ELEMENT: StructLayout = StructLayout {
    name: "color",
    size: 4,
    fields: &[
        FieldSpec::new("b", 0, FieldType::U8),
        FieldSpec::new("g", 1, FieldType::U8),
        FieldSpec::new("r", 2, FieldType::U8),
        FieldSpec::new("a", 3, FieldType::U8),
    ],
};

pub const SOUND_EMITTER_ELEMENT: StructLayout = StructLayout {
    name: "sound_emitter",
    size: 28,
    fields: &[
        FieldSpec::new("entry_id", 0, FieldType::U32),
        FieldSpec::new("position", 4, FieldType::Vec3F32),
        FieldSpec::new("size", 16, FieldType::Vec3F32),
    ],
};

/// Look up the descriptor for a canonical tag. Unknown tags return `None`
/// and are kept as opaque bytes by the caller.
pub fn descriptor(tag: [u8; 4]) -> Option<Descriptor> {
    let d = match tag {
        tags::MVER => Descriptor::Struct(&VERSION),
        tags::MHDR => Descriptor::Struct(&TILE_HEADER),
        tags::MCIN => Descriptor::Array(&CELL_INDEX_ENTRY),
        tags::MTEX | tags::MMDX | tags::MWMO => Descriptor::Strings,
        tags::MMID | tags::MWID | tags::MTXF | tags::MCRF => Descriptor::Array(&U32_ELEMENT),
        tags::MDDF => Descriptor::Array(&MODEL_PLACEMENT),
        tags::MODF => Descriptor::Array(&MAP_OBJECT_PLACEMENT),
        tags::MCNK => Descriptor::CellContainer(&CELL_HEADER),
        tags::MFBO => Descriptor::Struct(&FLIGHT_BOUNDS),
        tags::MCVT => Descriptor::Array(&HEIGHT_ELEMENT),
        tags::MCNR => Descriptor::Array(&NORMAL_ELEMENT),
        tags::MCLY => Descriptor::Array(&LAYER_ELEMENT),
        tags::MCCV => Descriptor::Array(&COLOR_ELEMENT),
        tags::MCSE => Descriptor::Array(&SOUND_EMITTER_ELEMENT),
        tags::MH2O | tags::MCAL | tags::MCSH | tags::MCLQ | tags::MCLV => Descriptor::Blob,
        _ => return None,
    };
    Some(d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_known_tag_has_descriptor() {
        for tag in tags::KNOWN_TOP_LEVEL.iter().chain(tags::SUBRECORD_TAGS) {
            assert!(descriptor(*tag).is_some(), "{:?}", std::str::from_utf8(tag));
        }
    }

    #[test]
    fn test_unknown_tag() {
        assert_eq!(descriptor(*b"ZZZZ"), None);
    }

    #[test]
    fn test_struct_sizes() {
        for layout in [&VERSION, &TILE_HEADER, &CELL_INDEX_ENTRY, &FLIGHT_BOUNDS, &LAYER_ELEMENT] {
            let end = layout.fields.iter().map(FieldSpec::end).max().unwrap();
            assert_eq!(end, layout.size, "{}", layout.name);
        }
    }
}
