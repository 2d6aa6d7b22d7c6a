use proptest::prelude::*;

use adtkit::builder::TileBuilder;
use adtkit::cell::{decode_cell, SubrecordEntry};
use adtkit::codec::BinaryWriter;
use adtkit::config::OffsetOrigin;
use adtkit::layout::{CELL_HEADER, SUBRECORD_SLOTS};
use adtkit::registry::DecodeContext;
use adtkit::relocate::relocate_buffer;
use adtkit::{decode_bytes, Config, DiagnosticKind, Diagnostics, GridCoord, RelocationRequest, Tag, TagOrientation};

const TAGS: &[&[u8; 4]] = &[b"MVER", b"MHDR", b"MTEX", b"MMID", b"MDDF", b"MCNK", b"MCVT", b"QQQQ"];

fn orientation() -> impl Strategy<Value = TagOrientation> {
    prop_oneof![Just(TagOrientation::Natural), Just(TagOrientation::Reversed)]
}

fn chunk_list() -> impl Strategy<Value = Vec<(usize, Vec<u8>)>> {
    prop::collection::vec((0..TAGS.len(), prop::collection::vec(any::<u8>(), 0..200)), 0..12)
}

fn coord() -> impl Strategy<Value = GridCoord> {
    (1u32..63, 1u32..63).prop_map(|(x, y)| GridCoord::new(x, y))
}

fn position() -> impl Strategy<Value = [f32; 3]> {
    [-15000.0f32..15000.0, -500.0f32..500.0, -15000.0f32..15000.0]
}

/// Every absolute position in the tile, cells first
fn positions(data: &[u8], config: &Config) -> Vec<[f32; 3]> {
    let doc = decode_bytes(data, config);
    let mut out: Vec<[f32; 3]> = doc.cells().filter_map(|(_, c)| c.position()).collect();
    out.extend(doc.placements().iter().map(|p| p.position()));
    out
}

proptest! {
    #[test]
    fn decode_round_trip_is_identity(chunks in chunk_list(), orient in orientation()) {
        let mut w = BinaryWriter::new();
        for (tag, payload) in &chunks {
            w.write_chunk(orient.raw(Tag::new(*TAGS[*tag])), payload);
        }
        let data = w.into_vec();
        let doc = decode_bytes(&data, &Config::default());
        prop_assert_eq!(doc.truncated_at, None);
        prop_assert_eq!(doc.to_bytes(), data);
    }

    #[test]
    fn relocation_preserves_size_and_counts(
        from in coord(),
        to in coord(),
        cells in 1usize..24,
        model in position(),
        vertical in -100.0f64..100.0,
    ) {
        let config = Config::default();
        let mut data = TileBuilder::new(from).cells(cells).model(model).build();
        let before = decode_bytes(&data, &config).counts();
        let len = data.len();

        let request = RelocationRequest::new(from, to).with_vertical_offset(vertical);
        relocate_buffer(&mut data, &request, &config).unwrap();

        prop_assert_eq!(data.len(), len);
        prop_assert_eq!(decode_bytes(&data, &config).counts(), before);
    }

    #[test]
    fn relocation_is_invertible(
        from in coord(),
        to in coord(),
        cells in 1usize..24,
        model in position(),
        object in position(),
        vertical in -100.0f64..100.0,
    ) {
        let config = Config::default();
        let original = TileBuilder::new(from)
            .cells(cells)
            .model(model)
            .map_object(object, [object[0] - 10.0, object[1] - 10.0, object[2] - 10.0], [object[0] + 10.0, object[1] + 10.0, object[2] + 10.0])
            .build();
        let request = RelocationRequest::new(from, to).with_vertical_offset(vertical);

        let mut data = original.clone();
        relocate_buffer(&mut data, &request, &config).unwrap();
        relocate_buffer(&mut data, &request.inverse(), &config).unwrap();

        for (a, b) in positions(&original, &config).iter().zip(positions(&data, &config)) {
            for k in 0..3 {
                prop_assert!((a[k] - b[k]).abs() < 0.02, "{:?} vs {:?}", a, b);
            }
        }
    }

    #[test]
    fn resolver_never_reads_outside_payload(
        offsets in prop::collection::vec(any::<u32>(), SUBRECORD_SLOTS.len()),
        tail in prop::collection::vec(any::<u8>(), 0..256),
        flags in any::<u32>(),
    ) {
        let mut payload = vec![0u8; CELL_HEADER.size];
        payload[0..4].copy_from_slice(&flags.to_le_bytes());
        for (slot, offset) in SUBRECORD_SLOTS.iter().zip(&offsets) {
            let field = CELL_HEADER.field(slot.offset_field).unwrap();
            payload[field.offset..field.offset + 4].copy_from_slice(&offset.to_le_bytes());
        }
        payload.extend_from_slice(&tail);

        let mut diags = Diagnostics::new();
        let ctx = DecodeContext::new(TagOrientation::Reversed, OffsetOrigin::Payload);
        let cell = decode_cell(&payload, ctx, &mut diags);

        let mut unresolved = 0;
        for entry in cell.subrecords.values() {
            match entry {
                SubrecordEntry::Resolved { offset, declared_size, .. } => {
                    prop_assert!(*offset < payload.len());
                    prop_assert!(offset + 8 + *declared_size as usize <= payload.len());
                }
                SubrecordEntry::Unresolved { stored_offset, .. } => {
                    unresolved += 1;
                    prop_assert!(*stored_offset != 0);
                }
            }
        }
        prop_assert_eq!(diags.count(DiagnosticKind::UnresolvedSubchunk), unresolved);
    }
}
