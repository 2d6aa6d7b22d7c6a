use serde::Serialize;

use adtkit_layout::registry::CELL_INDEX_ENTRY;
use adtkit_layout::tags;

use crate::chunk::{ChunkStream, Tag, TagOrientation, CHUNK_HEADER_SIZE};
use crate::codec::BinaryReader;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellIndexEntry {
    /// Absolute file offset of the container's chunk header
    pub offset: u32,
    pub size: u32,
    pub flags: u32,
    pub reserved: u32,
}

impl CellIndexEntry {
    /// Unused slot in a sparse tile
    pub fn is_empty(&self) -> bool {
        self.offset == 0 && self.size == 0
    }
}

/// Parsed MCIN payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CellIndex {
    pub entries: Vec<CellIndexEntry>,
}

/// A cell container confirmed to exist where the index says
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellLocation {
    pub index: usize,
    pub chunk_offset: usize,
    pub payload_offset: usize,
    pub payload_len: usize,
}

impl CellLocation {
    pub fn payload<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.payload_offset..self.payload_offset + self.payload_len]
    }
}

impl CellIndex {
    /// Parse an index payload. The entry count is `len / 16`; a count other
    /// than `expected` is reported but not fatal. A ragged tail is left to
    /// the registry's array check.
    pub fn parse(payload: &[u8], expected: usize, payload_offset: u64, diags: &mut Diagnostics) -> Self {
        let stride = CELL_INDEX_ENTRY.size;
        let count = payload.len() / stride;
        if count != expected {
            diags.warn(
                DiagnosticKind::IndexCountMismatch,
                Some(payload_offset),
                format!("MCIN holds {count} entries, expected {expected}"),
            );
        }

        let mut reader = BinaryReader::new(payload);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            // count is derived from the length, so these reads cannot fail
            let (Ok(offset), Ok(size), Ok(flags), Ok(reserved)) = (
                reader.read_u32_le(),
                reader.read_u32_le(),
                reader.read_u32_le(),
                reader.read_u32_le(),
            ) else {
                break;
            };
            entries.push(CellIndexEntry { offset, size, flags, reserved });
        }
        Self { entries }
    }

    /// Find and parse the index chunk of a stream
    pub fn locate(stream: &ChunkStream<'_>, expected: usize, diags: &mut Diagnostics) -> Result<Self> {
        let chunk = stream
            .find(Tag::new(tags::MCIN))
            .ok_or(Error::MissingChunk("MCIN"))?;
        Ok(Self::parse(chunk.payload, expected, chunk.payload_offset(), diags))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Non-empty entries with their index position
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &CellIndexEntry)> {
        self.entries.iter().enumerate().filter(|(_, e)| !e.is_empty())
    }

    /// Follow every non-empty entry into `data` and confirm a cell container
    /// header sits there. Fails on the first entry that does not.
    pub fn locate_cells(&self, data: &[u8], orientation: TagOrientation) -> Result<Vec<CellLocation>> {
        let expected = Tag::new(tags::MCNK);
        let mut cells = Vec::with_capacity(self.entries.len());
        for (index, entry) in self.occupied() {
            let offset = entry.offset as usize;
            let mismatch = |found: String| Error::IndexEntryMismatch {
                index,
                offset: entry.offset as u64,
                found,
            };

            let mut reader = BinaryReader::at(data, offset);
            let raw = reader
                .read_tag()
                .map_err(|_| mismatch("end of file".to_string()))?;
            let tag = orientation.canonical(raw);
            if tag != expected {
                return Err(mismatch(format!("tag {}", Tag::new(raw))));
            }
            let declared = reader
                .read_u32_le()
                .map_err(|_| mismatch("truncated header".to_string()))? as usize;
            let payload_offset = offset + CHUNK_HEADER_SIZE;
            let available = data.len() - payload_offset;
            if declared > available {
                return Err(Error::TruncatedChunk {
                    offset: entry.offset as u64,
                    needed: declared as u64,
                    available: available as u64,
                });
            }
            cells.push(CellLocation { index, chunk_offset: offset, payload_offset, payload_len: declared });
        }
        Ok(cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::BinaryWriter;

    fn index_bytes(entries: &[(u32, u32)]) -> Vec<u8> {
        let mut w = BinaryWriter::new();
        for &(offset, size) in entries {
            w.write_u32_le(offset);
            w.write_u32_le(size);
            w.write_u32_le(0);
            w.write_u32_le(0);
        }
        w.into_vec()
    }

    #[test]
    fn test_parse_short_index_warns() {
        let mut diags = Diagnostics::new();
        let index = CellIndex::parse(&index_bytes(&[(148, 136), (492, 136)]), 256, 8, &mut diags);
        assert_eq!(index.len(), 2);
        assert_eq!(index.entries[1].offset, 492);
        assert_eq!(diags.count(DiagnosticKind::IndexCountMismatch), 1);
    }

    #[test]
    fn test_empty_entries_skipped() {
        let mut diags = Diagnostics::new();
        let index = CellIndex::parse(&index_bytes(&[(0, 0), (40, 8)]), 2, 0, &mut diags);
        assert!(diags.is_empty());
        let occupied: Vec<_> = index.occupied().map(|(i, _)| i).collect();
        assert_eq!(occupied, vec![1]);
    }

    #[test]
    fn test_locate_cells_checks_tag() {
        let mut data = vec![0u8; 64];
        data[16..20].copy_from_slice(b"KNCM");
        data[20..24].copy_from_slice(&8u32.to_le_bytes());
        data[40..44].copy_from_slice(b"XXXX");

        let good = CellIndex { entries: vec![CellIndexEntry { offset: 16, size: 16, flags: 0, reserved: 0 }] };
        let cells = good.locate_cells(&data, TagOrientation::Reversed).unwrap();
        assert_eq!(cells[0].payload_offset, 24);
        assert_eq!(cells[0].payload_len, 8);

        let bad = CellIndex { entries: vec![CellIndexEntry { offset: 40, size: 16, flags: 0, reserved: 0 }] };
        let err = bad.locate_cells(&data, TagOrientation::Reversed).unwrap_err();
        assert!(matches!(err, Error::IndexEntryMismatch { index: 0, offset: 40, .. }));

        let past_end = CellIndex { entries: vec![CellIndexEntry { offset: 200, size: 16, flags: 0, reserved: 0 }] };
        assert!(matches!(
            past_end.locate_cells(&data, TagOrientation::Reversed),
            Err(Error::IndexEntryMismatch { .. })
        ));
    }
}
