//! Placement record layouts (MDDF / MODF)

use crate::fields::{Axis, AxisMap, FieldSpec, FieldType, StructLayout};

pub const MODEL_PLACEMENT: StructLayout = StructLayout {
    name: "MDDF",
    size: 36,
    fields: &[
        FieldSpec::new("name_id", 0, FieldType::U32),
        FieldSpec::new("unique_id", 4, FieldType::U32),
        FieldSpec::new("position", 8, FieldType::Vec3F32),
        FieldSpec::new("rotation", 20, FieldType::Vec3F32),
        FieldSpec::new("scale", 32, FieldType::U16),
        FieldSpec::new("flags", 34, FieldType::U16),
    ],
};

pub const MAP_OBJECT_PLACEMENT: StructLayout = StructLayout {
    name: "MODF",
    size: 64,
    fields: &[
        FieldSpec::new("name_id", 0, FieldType::U32),
        FieldSpec::new("unique_id", 4, FieldType::U32),
        FieldSpec::new("position", 8, FieldType::Vec3F32),
        FieldSpec::new("rotation", 20, FieldType::Vec3F32),
        FieldSpec::new("extents_lower", 32, FieldType::Vec3F32),
        FieldSpec::new("extents_upper", 44, FieldType::Vec3F32),
        FieldSpec::new("flags", 56, FieldType::U16),
        FieldSpec::new("doodad_set", 58, FieldType::U16),
        FieldSpec::new("name_set", 60, FieldType::U16),
        FieldSpec::new("scale", 62, FieldType::U16),
    ],
};

/// Placement positions are stored as (x, up, z)
pub const PLACEMENT_POSITION_AXES: [AxisMap; 3] = [
    AxisMap::plus(Axis::X),
    AxisMap::plus(Axis::Vertical),
    AxisMap::plus(Axis::Y),
];

/// Fixed-point scale denominator (1024 == 1.0)
pub const SCALE_ONE: f32 = 1024.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlacementKind {
    /// Lightweight model placement
    Model,
    /// Heavy placement with a bounding box and set ids
    MapObject,
}

impl PlacementKind {
    pub const fn layout(self) -> &'static StructLayout {
        match self {
            Self::Model => &MODEL_PLACEMENT,
            Self::MapObject => &MAP_OBJECT_PLACEMENT,
        }
    }

    pub const fn tag(self) -> [u8; 4] {
        match self {
            Self::Model => crate::tags::MDDF,
            Self::MapObject => crate::tags::MODF,
        }
    }

    /// Every Vec3 field that holds an absolute world position
    pub const fn position_fields(self) -> &'static [&'static str] {
        match self {
            Self::Model => &["position"],
            Self::MapObject => &["position", "extents_lower", "extents_upper"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_cover_fields() {
        for kind in [PlacementKind::Model, PlacementKind::MapObject] {
            let layout = kind.layout();
            let end = layout.fields.iter().map(FieldSpec::end).max().unwrap();
            assert_eq!(end, layout.size);
        }
    }

    #[test]
    fn test_position_fields_are_vec3() {
        for kind in [PlacementKind::Model, PlacementKind::MapObject] {
            for name in kind.position_fields() {
                assert_eq!(kind.layout().field(name).unwrap().ty, FieldType::Vec3F32);
            }
        }
    }
}
