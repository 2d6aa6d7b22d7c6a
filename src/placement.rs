//! Typed views over the placement arrays (MDDF / MODF)

use serde::Serialize;

use adtkit_layout::placement::SCALE_ONE;
use adtkit_layout::PlacementKind;

use crate::codec::BinaryReader;
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModelPlacement {
    pub name_id: u32,
    pub unique_id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    /// Fixed point, 1024 == 1.0
    pub scale: u16,
    pub flags: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapObjectPlacement {
    pub name_id: u32,
    pub unique_id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub extents_lower: [f32; 3],
    pub extents_upper: [f32; 3],
    pub flags: u16,
    pub doodad_set: u16,
    pub name_set: u16,
    pub scale: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementRecord {
    Model(ModelPlacement),
    MapObject(MapObjectPlacement),
}

impl PlacementRecord {
    pub fn kind(&self) -> PlacementKind {
        match self {
            Self::Model(_) => PlacementKind::Model,
            Self::MapObject(_) => PlacementKind::MapObject,
        }
    }

    pub fn unique_id(&self) -> u32 {
        match self {
            Self::Model(p) => p.unique_id,
            Self::MapObject(p) => p.unique_id,
        }
    }

    pub fn position(&self) -> [f32; 3] {
        match self {
            Self::Model(p) => p.position,
            Self::MapObject(p) => p.position,
        }
    }

    /// Scale as a multiplier
    pub fn scale(&self) -> f32 {
        let raw = match self {
            Self::Model(p) => p.scale,
            Self::MapObject(p) => p.scale,
        };
        raw as f32 / SCALE_ONE
    }
}

fn read_model(r: &mut BinaryReader<'_>) -> Result<ModelPlacement> {
    Ok(ModelPlacement {
        name_id: r.read_u32_le()?,
        unique_id: r.read_u32_le()?,
        position: r.read_vec3_f32()?,
        rotation: r.read_vec3_f32()?,
        scale: r.read_u16_le()?,
        flags: r.read_u16_le()?,
    })
}

fn read_map_object(r: &mut BinaryReader<'_>) -> Result<MapObjectPlacement> {
    Ok(MapObjectPlacement {
        name_id: r.read_u32_le()?,
        unique_id: r.read_u32_le()?,
        position: r.read_vec3_f32()?,
        rotation: r.read_vec3_f32()?,
        extents_lower: r.read_vec3_f32()?,
        extents_upper: r.read_vec3_f32()?,
        flags: r.read_u16_le()?,
        doodad_set: r.read_u16_le()?,
        name_set: r.read_u16_le()?,
        scale: r.read_u16_le()?,
    })
}

/// Parse every whole record in a placement payload. Trailing bytes that do
/// not make up a full record are ignored.
pub fn parse_placements(kind: PlacementKind, payload: &[u8]) -> Result<Vec<PlacementRecord>> {
    let stride = kind.layout().size;
    let mut out = Vec::with_capacity(payload.len() / stride);
    for bytes in payload.chunks_exact(stride) {
        let mut r = BinaryReader::new(bytes);
        out.push(match kind {
            PlacementKind::Model => PlacementRecord::Model(read_model(&mut r)?),
            PlacementKind::MapObject => PlacementRecord::MapObject(read_map_object(&mut r)?),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;

    #[test]
    fn test_parse_models_ignores_tail() {
        let mut w = BinaryWriter::new();
        w.write_u32_le(3);
        w.write_u32_le(77);
        w.write_vec3_f32([100.0, 5.0, 200.0]);
        w.write_vec3_f32([0.0, 90.0, 0.0]);
        w.write_u16_le(512);
        w.write_u16_le(0);
        w.write_bytes(&[1, 2, 3]);

        let records = parse_placements(PlacementKind::Model, w.as_slice()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].unique_id(), 77);
        assert_eq!(records[0].position(), [100.0, 5.0, 200.0]);
        assert_eq!(records[0].scale(), 0.5);
    }

    #[test]
    fn test_parse_map_object() {
        let mut w = BinaryWriter::new();
        w.write_u32_le(0);
        w.write_u32_le(9);
        for v in [[1.0, 2.0, 3.0], [0.0; 3], [-1.0, -1.0, -1.0], [4.0, 4.0, 4.0]] {
            w.write_vec3_f32(v);
        }
        for v in [0u16, 1, 0, 1024] {
            w.write_u16_le(v);
        }
        let records = parse_placements(PlacementKind::MapObject, w.as_slice()).unwrap();
        match records[0] {
            PlacementRecord::MapObject(p) => {
                assert_eq!(p.extents_upper, [4.0, 4.0, 4.0]);
                assert_eq!(p.doodad_set, 1);
            }
            other => panic!("expected map object, got {other:?}"),
        }
        assert_eq!(records[0].scale(), 1.0);
    }
}
