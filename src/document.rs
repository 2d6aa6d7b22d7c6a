//! Full structural decode of a tile

use indexmap::IndexMap;
use serde::Serialize;

use adtkit_layout::{tags, PlacementKind};

use crate::cell::{CellIndex, DecodedCell};
use crate::chunk::{read_chunks, Tag, TagOrientation};
use crate::codec::BinaryWriter;
use crate::config::Config;
use crate::diagnostics::Diagnostics;
use crate::placement::{parse_placements, PlacementRecord};
use crate::registry::{self, DecodeContext, TypedRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedChunk {
    pub tag: Tag,
    /// Tag bytes as stored
    #[serde(skip)]
    pub raw_tag: [u8; 4],
    pub offset: u64,
    pub declared_size: u32,
    #[serde(skip)]
    pub payload: Vec<u8>,
    pub record: TypedRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedDocument {
    pub orientation: TagOrientation,
    /// False when the first tag was unknown and the fallback was used
    pub orientation_inferred: bool,
    pub file_len: u64,
    pub chunks: Vec<DecodedChunk>,
    pub index: Option<CellIndex>,
    pub truncated_at: Option<u64>,
    pub diagnostics: Diagnostics,
}

/// Decode a tile held in memory. Never fails: anomalies land in
/// `diagnostics` and decoding carries on past them.
pub fn decode_bytes(data: &[u8], config: &Config) -> DecodedDocument {
    let stream = read_chunks(data, &config.known_tags, config.fallback_orientation);
    let mut diagnostics = stream.diagnostics.clone();
    let ctx = DecodeContext::new(stream.orientation, config.subchunk_offset_origin);

    let chunks: Vec<DecodedChunk> = stream
        .chunks
        .iter()
        .map(|chunk| {
            tracing::debug!(tag = %chunk.tag, offset = chunk.offset, size = chunk.declared_size, "decoding chunk");
            DecodedChunk {
                tag: chunk.tag,
                raw_tag: chunk.raw_tag,
                offset: chunk.offset,
                declared_size: chunk.declared_size,
                payload: chunk.payload.to_vec(),
                record: registry::decode(chunk.tag, chunk.payload, ctx.at(chunk.payload_offset()), &mut diagnostics),
            }
        })
        .collect();

    let index = stream.find(Tag::new(tags::MCIN)).map(|chunk| {
        CellIndex::parse(chunk.payload, config.grid.expected_cells(), chunk.payload_offset(), &mut diagnostics)
    });

    DecodedDocument {
        orientation: stream.orientation,
        orientation_inferred: stream.orientation_inferred,
        file_len: data.len() as u64,
        chunks,
        index,
        truncated_at: stream.truncated_at,
        diagnostics,
    }
}

impl DecodedDocument {
    pub fn find(&self, tag: Tag) -> Option<&DecodedChunk> {
        self.chunks.iter().find(|c| c.tag == tag)
    }

    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &DecodedChunk> {
        self.chunks.iter().filter(move |c| c.tag == tag)
    }

    pub fn counts(&self) -> IndexMap<Tag, usize> {
        let mut counts = IndexMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.tag).or_insert(0) += 1;
        }
        counts
    }

    pub fn version(&self) -> Option<u32> {
        self.find(Tag::new(tags::MVER))?.record.as_struct()?.u32("version")
    }

    /// Cell by index number, located through the cell index rather than by
    /// stream position
    pub fn cell(&self, index: usize) -> Option<&DecodedCell> {
        let entry = self.index.as_ref()?.entries.get(index)?;
        if entry.is_empty() {
            return None;
        }
        self.chunks
            .iter()
            .find(|c| c.offset == entry.offset as u64)?
            .record
            .as_cell()
    }

    /// Every indexed cell that resolves, in index order
    pub fn cells(&self) -> impl Iterator<Item = (usize, &DecodedCell)> {
        let count = self.index.as_ref().map_or(0, CellIndex::len);
        (0..count).filter_map(|i| self.cell(i).map(|c| (i, c)))
    }

    pub fn textures(&self) -> &[String] {
        self.find(Tag::new(tags::MTEX))
            .and_then(|c| c.record.as_strings())
            .unwrap_or(&[])
    }

    /// Model placements first, then map objects
    pub fn placements(&self) -> Vec<PlacementRecord> {
        let mut out = Vec::new();
        for kind in [PlacementKind::Model, PlacementKind::MapObject] {
            for chunk in self.find_all(Tag::new(kind.tag())) {
                if let Ok(records) = parse_placements(kind, &chunk.payload) {
                    out.extend(records);
                }
            }
        }
        out
    }

    /// Re-emit every decoded chunk verbatim in its stored orientation
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.file_len as usize);
        for chunk in &self.chunks {
            writer.write_chunk(chunk.raw_tag, &chunk.payload);
        }
        writer.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::TileBuilder;
    use crate::diagnostics::DiagnosticKind;
    use crate::config::OffsetOrigin;
    use crate::relocate::GridCoord;
    use adtkit_layout::SubrecordKind;

    #[test]
    fn test_decode_built_tile() {
        let config = Config::default();
        let data = TileBuilder::new(GridCoord::new(3, 5)).cells(3).model([1.0, 2.0, 3.0]).build();
        let doc = decode_bytes(&data, &config);

        assert_eq!(doc.orientation, TagOrientation::Reversed);
        assert!(doc.orientation_inferred);
        assert_eq!(doc.version(), Some(18));
        assert_eq!(doc.cells().count(), 3);
        assert_eq!(doc.cell(2).unwrap().grid(), Some(GridCoord::new(3, 5)));
        assert!(doc.cell(3).is_none());
        assert_eq!(doc.placements().len(), 1);
        assert_eq!(doc.textures().len(), 1);
        assert!(doc.diagnostics.is_empty(), "{:?}", doc.diagnostics);
        assert_eq!(doc.to_bytes(), data);
    }

    #[test]
    fn test_cell_found_via_index_not_order() {
        let config = Config::default();
        let data = TileBuilder::new(GridCoord::new(3, 5)).cells(2).reverse_cell_order().build();
        let doc = decode_bytes(&data, &config);

        let stream_order: Vec<u64> = doc.find_all(Tag::new(tags::MCNK)).map(|c| c.offset).collect();
        assert!(stream_order[0] < stream_order[1]);
        let index = doc.index.as_ref().unwrap();
        assert!(index.entries[0].offset > index.entries[1].offset);
        assert_eq!(doc.cell(0).unwrap().header.u32("index_x"), Some(3));
    }

    #[test]
    fn test_truncated_tail_keeps_prefix() {
        let config = Config::default();
        let mut data = TileBuilder::new(GridCoord::new(3, 5)).cells(1).build();
        data.extend_from_slice(b"XXXX");
        data.extend_from_slice(&100u32.to_le_bytes());

        let doc = decode_bytes(&data, &config);
        assert!(doc.truncated_at.is_some());
        assert_eq!(doc.diagnostics.count(DiagnosticKind::TruncatedChunk), 1);
        assert_eq!(doc.cells().count(), 1);
    }

    #[test]
    fn test_json_output() {
        let config = Config::default();
        let data = TileBuilder::new(GridCoord::new(1, 1)).cells(1).build();
        let json = serde_json::to_value(decode_bytes(&data, &config)).unwrap();
        assert_eq!(json["orientation"], "reversed");
        assert_eq!(json["chunks"][0]["tag"], "MVER");
        assert_eq!(json["chunks"][0]["record"]["kind"], "struct");
        assert_eq!(json["chunks"][0]["record"]["fields"]["version"], 18);
    }

    #[test]
    fn test_chunk_start_offsets() {
        let data = TileBuilder::new(GridCoord::new(2, 3))
            .cells(2)
            .offset_origin(OffsetOrigin::ChunkStart)
            .build();

        let config = Config { subchunk_offset_origin: OffsetOrigin::ChunkStart, ..Config::default() };
        let doc = decode_bytes(&data, &config);
        assert_eq!(doc.cells().count(), 2);
        for (_, cell) in doc.cells() {
            assert_eq!(cell.unresolved_count(), 0);
            assert!(cell.subrecord(SubrecordKind::Heights).unwrap().record().is_some());
            assert!(cell.subrecord(SubrecordKind::Layers).unwrap().record().is_some());
        }

        // read payload-relative, every stored offset lands eight bytes late
        let doc = decode_bytes(&data, &Config::default());
        assert!(doc.cells().all(|(_, cell)| cell.unresolved_count() == 3));
    }
}
