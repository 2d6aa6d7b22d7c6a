use indexmap::IndexMap;
use serde::Serialize;

use adtkit_layout::{CELL_HEADER, SUBRECORD_SLOTS};

use super::{hex_dump, CellFlags, DecodedCell};
use crate::chunk::{Tag, CHUNK_HEADER_SIZE};
use crate::codec::BinaryReader;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::registry::{self, DecodeContext, Record, TypedRecord};

const HEX_DUMP_LIMIT: usize = 32;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SubrecordEntry {
    Resolved {
        tag: Tag,
        /// Offset of the nested header within the container payload
        offset: usize,
        declared_size: u32,
        record: TypedRecord,
    },
    Unresolved {
        /// Tag found at the offset, if the offset was in range
        tag: Option<Tag>,
        /// Offset as stored in the header
        stored_offset: u32,
        reason: String,
        /// Up to 32 bytes found at the offset
        hex: String,
    },
}

impl SubrecordEntry {
    pub fn record(&self) -> Option<&TypedRecord> {
        match self {
            Self::Resolved { record, .. } => Some(record),
            Self::Unresolved { .. } => None,
        }
    }
}

/// Decode a cell container payload: fixed header first, then every
/// sub-record the header points at.
pub fn decode_cell(payload: &[u8], ctx: DecodeContext, diags: &mut Diagnostics) -> DecodedCell {
    if payload.len() < CELL_HEADER.size {
        diags.warn(
            DiagnosticKind::Conformance,
            Some(ctx.payload_offset),
            format!("MCNK: {} bytes, header needs {}", payload.len(), CELL_HEADER.size),
        );
    }
    let header = registry::decode_struct(&CELL_HEADER, payload);
    let flags = CellFlags::from_bits_retain(header.u32("flags").unwrap_or(0));
    let subrecords = resolve(payload, &header, ctx, diags);
    DecodedCell { header, flags, subrecords }
}

/// Resolve the header's sub-record offsets against `payload`.
///
/// Only `payload` is ever read; offsets never reach outside the container.
/// A zero or flag-absent offset means the sub-record is not present. Anything
/// that fails a bounds or tag check becomes `Unresolved` plus a diagnostic;
/// the other slots are still resolved.
pub fn resolve(
    payload: &[u8],
    header: &Record,
    ctx: DecodeContext,
    diags: &mut Diagnostics,
) -> IndexMap<&'static str, SubrecordEntry> {
    let bias = ctx.offset_origin.bias();
    let mut out = IndexMap::new();

    for slot in SUBRECORD_SLOTS {
        let Some(stored) = header.u32(slot.offset_field) else {
            continue;
        };
        if stored == 0 {
            continue;
        }
        let expected = Tag::new(slot.tag);
        let name = slot.kind.name();

        let unresolved = |diags: &mut Diagnostics, tag: Option<Tag>, at: Option<usize>, reason: String| {
            let hex = at.map(|rel| hex_dump(&payload[rel..], HEX_DUMP_LIMIT)).unwrap_or_default();
            let file_offset = ctx.payload_offset + at.unwrap_or(0) as u64;
            diags.warn(
                DiagnosticKind::UnresolvedSubchunk,
                Some(file_offset),
                format!("{name} ({expected}) at {stored:#x}: {reason} [{hex}]"),
            );
            SubrecordEntry::Unresolved { tag, stored_offset: stored, reason, hex }
        };

        let Some(rel) = (stored as usize).checked_sub(bias) else {
            out.insert(name, unresolved(diags, None, None, "offset precedes container payload".into()));
            continue;
        };
        if rel >= payload.len() {
            let reason = format!("offset past container end ({} bytes)", payload.len());
            out.insert(name, unresolved(diags, None, None, reason));
            continue;
        }
        if rel + CHUNK_HEADER_SIZE > payload.len() {
            out.insert(name, unresolved(diags, None, Some(rel), "nested header runs past container end".into()));
            continue;
        }

        let mut reader = BinaryReader::at(payload, rel);
        let (Ok(raw), Ok(size)) = (reader.read_tag(), reader.read_u32_le()) else {
            out.insert(name, unresolved(diags, None, Some(rel), "unreadable nested header".into()));
            continue;
        };
        let found = ctx.orientation.canonical(raw);
        if found != expected {
            if ctx.orientation.opposite().canonical(raw) == expected {
                diags.warn(
                    DiagnosticKind::MixedOrientation,
                    Some(ctx.payload_offset + rel as u64),
                    format!("{expected} stored {:?}, file is {:?}", ctx.orientation.opposite(), ctx.orientation),
                );
            }
            out.insert(name, unresolved(diags, Some(found), Some(rel), format!("expected {expected}, found {found}")));
            continue;
        }

        let start = rel + CHUNK_HEADER_SIZE;
        let end = start + size as usize;
        if end > payload.len() {
            let reason = format!("declared size {size} runs past container end");
            out.insert(name, unresolved(diags, Some(found), Some(rel), reason));
            continue;
        }

        let record = registry::decode(found, &payload[start..end], ctx.at(ctx.payload_offset + start as u64), diags);
        out.insert(
            name,
            SubrecordEntry::Resolved { tag: found, offset: rel, declared_size: size, record },
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::TagOrientation;
    use crate::codec::BinaryWriter;
    use crate::config::OffsetOrigin;
    use crate::registry::Value;
    use adtkit_layout::SubrecordKind;

    fn ctx() -> DecodeContext {
        DecodeContext::new(TagOrientation::Reversed, OffsetOrigin::Payload)
    }

    /// 128-byte header followed by an MCVT with two heights and an MCRF
    fn cell_payload() -> Vec<u8> {
        let mut header = vec![0u8; 0x80];
        header[0x14..0x18].copy_from_slice(&0x80u32.to_le_bytes()); // ofs_height
        header[0x20..0x24].copy_from_slice(&0x90u32.to_le_bytes()); // ofs_refs
        header[0x68..0x6C].copy_from_slice(&1.5f32.to_le_bytes());

        let mut w = BinaryWriter::new();
        w.write_bytes(&header);
        w.write_chunk(*b"TVCM", &[0, 0, 128, 63, 0, 0, 0, 64]);
        w.write_chunk(*b"FRCM", &7u32.to_le_bytes());
        w.into_vec()
    }

    #[test]
    fn test_resolves_present_slots() {
        let mut diags = Diagnostics::new();
        let cell = decode_cell(&cell_payload(), ctx(), &mut diags);
        assert!(diags.is_empty(), "{diags:?}");
        assert_eq!(cell.subrecords.len(), 2);
        assert_eq!(cell.position(), Some([1.5, 0.0, 0.0]));

        let heights = cell.subrecord(SubrecordKind::Heights).unwrap().record().unwrap();
        let heights = heights.as_array().unwrap();
        assert_eq!(heights[1].f32("height"), Some(2.0));

        let refs = cell.subrecord(SubrecordKind::DoodadRefs).unwrap().record().unwrap();
        assert_eq!(refs.as_array().unwrap()[0].u32("value"), Some(7));
    }

    #[test]
    fn test_out_of_range_offset_is_unresolved() {
        let mut payload = cell_payload();
        payload[0x1C..0x20].copy_from_slice(&5000u32.to_le_bytes()); // ofs_layer

        let mut diags = Diagnostics::new();
        let cell = decode_cell(&payload, ctx().at(1000), &mut diags);
        match cell.subrecord(SubrecordKind::Layers).unwrap() {
            SubrecordEntry::Unresolved { tag, stored_offset, .. } => {
                assert_eq!(*tag, None);
                assert_eq!(*stored_offset, 5000);
            }
            other => panic!("expected unresolved, got {other:?}"),
        }
        // the other slots still resolve
        assert!(cell.subrecord(SubrecordKind::Heights).unwrap().record().is_some());
        assert_eq!(diags.count(DiagnosticKind::UnresolvedSubchunk), 1);
        assert_eq!(cell.unresolved_count(), 1);
    }

    #[test]
    fn test_wrong_tag_reports_hex() {
        let mut payload = cell_payload();
        payload[0x20..0x24].copy_from_slice(&0x80u32.to_le_bytes()); // refs -> heights record

        let mut diags = Diagnostics::new();
        let cell = decode_cell(&payload, ctx(), &mut diags);
        match cell.subrecord(SubrecordKind::DoodadRefs).unwrap() {
            SubrecordEntry::Unresolved { tag, hex, .. } => {
                assert_eq!(*tag, Some(Tag::new(*b"MCVT")));
                assert!(hex.starts_with("54 56 43 4d"));
            }
            other => panic!("expected unresolved, got {other:?}"),
        }
    }

    #[test]
    fn test_opposite_orientation_flagged() {
        let mut payload = cell_payload();
        let at = 0x80;
        payload[at..at + 4].copy_from_slice(b"MCVT");

        let mut diags = Diagnostics::new();
        let cell = decode_cell(&payload, ctx(), &mut diags);
        assert!(cell.subrecord(SubrecordKind::Heights).unwrap().record().is_none());
        assert_eq!(diags.count(DiagnosticKind::MixedOrientation), 1);
    }

    #[test]
    fn test_chunk_start_origin() {
        let mut payload = cell_payload();
        payload[0x14..0x18].copy_from_slice(&0x88u32.to_le_bytes());
        payload[0x20..0x24].copy_from_slice(&0x98u32.to_le_bytes());

        let mut diags = Diagnostics::new();
        let ctx = DecodeContext::new(TagOrientation::Reversed, OffsetOrigin::ChunkStart);
        let cell = decode_cell(&payload, ctx, &mut diags);
        assert_eq!(cell.unresolved_count(), 0);
    }

    #[test]
    fn test_flag_gated_offset_ignored() {
        let mut payload = cell_payload();
        // shadow offset set but HAS_MCSH clear
        payload[0x2C..0x30].copy_from_slice(&0x10u32.to_le_bytes());

        let mut diags = Diagnostics::new();
        let cell = decode_cell(&payload, ctx(), &mut diags);
        assert!(cell.subrecord(SubrecordKind::ShadowMap).is_none());
        assert!(diags.is_empty());
    }

    #[test]
    fn test_high_res_holes_replace_height_and_normal() {
        let mut payload = cell_payload();
        payload[0..4].copy_from_slice(&0x10000u32.to_le_bytes());
        // mask bytes that would read as ofs_height = 0x80, ofs_normal = 0x90
        let mask = 0x0000_0090_0000_0080u64;
        payload[0x14..0x1C].copy_from_slice(&mask.to_le_bytes());
        payload[0x3C..0x3E].copy_from_slice(&0x00F0u16.to_le_bytes());

        let mut diags = Diagnostics::new();
        let cell = decode_cell(&payload, ctx(), &mut diags);
        assert!(diags.is_empty(), "{diags:?}");
        assert!(cell.flags.contains(CellFlags::HIGH_RES_HOLES));
        assert!(!cell.header.is_present("ofs_height"));
        assert!(!cell.header.is_present("ofs_normal"));
        assert_eq!(cell.header.get("holes_high_res"), Some(&Value::U64(mask)));
        assert_eq!(cell.header.u16("holes_low_res"), Some(0x00F0));

        assert!(cell.subrecord(SubrecordKind::Heights).is_none());
        assert!(cell.subrecord(SubrecordKind::Normals).is_none());
        assert!(cell.subrecord(SubrecordKind::DoodadRefs).unwrap().record().is_some());
        assert_eq!(cell.unresolved_count(), 0);
    }
}
