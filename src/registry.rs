//! Decoder registry
//!
//! Interprets the descriptors from `adtkit_layout::registry` against chunk
//! payloads. Every consumer (document decode, cell resolver, validator) goes
//! through `decode`, so there is exactly one reading of each layout.

use indexmap::IndexMap;
use serde::Serialize;

use adtkit_layout::{descriptor, Descriptor, FieldSpec, FieldType, Presence, StructLayout};

use crate::cell::{self, DecodedCell};
use crate::chunk::{Tag, TagOrientation};
use crate::codec::BinaryReader;
use crate::config::OffsetOrigin;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;

/// A decoded field value. `Absent` marks a flag-gated field whose flag is
/// unset; it is never a stand-in for zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    Vec3F32([f32; 3]),
    Vec3I8([i8; 3]),
    Bytes(Vec<u8>),
    Absent,
}

impl Value {
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Widen any unsigned integer value
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::U8(v) => Some(v as u64),
            Self::U16(v) => Some(v as u64),
            Self::U32(v) => Some(v as u64),
            Self::U64(v) => Some(v),
            _ => None,
        }
    }
}

/// Decoded fixed-width struct, fields in layout order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub layout: &'static str,
    pub fields: IndexMap<&'static str, Value>,
}

impl Record {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some_and(|v| !v.is_absent())
    }

    pub fn u32(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            Value::U32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn u16(&self, name: &str) -> Option<u16> {
        match self.get(name)? {
            Value::U16(v) => Some(*v),
            _ => None,
        }
    }

    pub fn f32(&self, name: &str) -> Option<f32> {
        match self.get(name)? {
            Value::F32(v) => Some(*v),
            _ => None,
        }
    }

    pub fn vec3(&self, name: &str) -> Option<[f32; 3]> {
        match self.get(name)? {
            Value::Vec3F32(v) => Some(*v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypedRecord {
    Struct(Record),
    Array {
        element: &'static str,
        stride: usize,
        elements: Vec<Record>,
        /// Bytes left over after the last whole element
        trailing: usize,
    },
    Strings {
        entries: Vec<String>,
    },
    Cell(Box<DecodedCell>),
    Blob {
        len: usize,
    },
    /// Tag with no descriptor; bytes kept for lossless round-trip
    Unknown {
        declared_size: u32,
        raw: Vec<u8>,
    },
}

impl TypedRecord {
    pub fn as_struct(&self) -> Option<&Record> {
        match self {
            Self::Struct(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Record]> {
        match self {
            Self::Array { elements, .. } => Some(elements),
            _ => None,
        }
    }

    pub fn as_cell(&self) -> Option<&DecodedCell> {
        match self {
            Self::Cell(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Strings { entries } => Some(entries),
            _ => None,
        }
    }
}

/// Everything a decoder needs besides the payload itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeContext {
    pub orientation: TagOrientation,
    pub offset_origin: OffsetOrigin,
    /// Absolute file offset of the payload's first byte, for diagnostics
    pub payload_offset: u64,
}

impl DecodeContext {
    pub fn new(orientation: TagOrientation, offset_origin: OffsetOrigin) -> Self {
        Self { orientation, offset_origin, payload_offset: 0 }
    }

    pub fn at(self, payload_offset: u64) -> Self {
        Self { payload_offset, ..self }
    }
}

/// Decode a chunk payload by canonical tag
pub fn decode(tag: Tag, payload: &[u8], ctx: DecodeContext, diags: &mut Diagnostics) -> TypedRecord {
    match descriptor(tag.0) {
        Some(Descriptor::Struct(layout)) => {
            if payload.len() < layout.size {
                diags.warn(
                    DiagnosticKind::Conformance,
                    Some(ctx.payload_offset),
                    format!("{tag}: {} bytes, layout needs {}", payload.len(), layout.size),
                );
            }
            TypedRecord::Struct(decode_struct(layout, payload))
        }
        Some(Descriptor::Array(element)) => decode_array(tag, element, payload, ctx, diags),
        Some(Descriptor::Strings) => TypedRecord::Strings { entries: decode_strings(payload) },
        Some(Descriptor::CellContainer(_)) => {
            TypedRecord::Cell(Box::new(cell::decode_cell(payload, ctx, diags)))
        }
        Some(Descriptor::Blob) => TypedRecord::Blob { len: payload.len() },
        None => TypedRecord::Unknown {
            declared_size: payload.len() as u32,
            raw: payload.to_vec(),
        },
    }
}

/// Decode one struct. Fields that fall past the end of `bytes` are `Absent`.
pub fn decode_struct(layout: &StructLayout, bytes: &[u8]) -> Record {
    let mut fields = IndexMap::with_capacity(layout.fields.len());
    for spec in layout.fields {
        let present = match spec.presence {
            Presence::Always => true,
            Presence::FlagSet { flags, mask } => (flag_value(&fields, flags) & mask as u64) != 0,
            Presence::FlagClear { flags, mask } => (flag_value(&fields, flags) & mask as u64) == 0,
        };
        let value = if present {
            read_field(spec, bytes).unwrap_or(Value::Absent)
        } else {
            Value::Absent
        };
        fields.insert(spec.name, value);
    }
    Record { layout: layout.name, fields }
}

fn flag_value(fields: &IndexMap<&'static str, Value>, name: &str) -> u64 {
    fields.get(name).and_then(Value::as_u64).unwrap_or(0)
}

fn read_field(spec: &FieldSpec, bytes: &[u8]) -> Result<Value> {
    let mut r = BinaryReader::at(bytes, spec.offset);
    Ok(match spec.ty {
        FieldType::U8 => Value::U8(r.read_u8()?),
        FieldType::U16 => Value::U16(r.read_u16_le()?),
        FieldType::U32 => Value::U32(r.read_u32_le()?),
        FieldType::U64 => Value::U64(r.read_u64_le()?),
        FieldType::F32 => Value::F32(r.read_f32_le()?),
        FieldType::Vec3F32 => Value::Vec3F32(r.read_vec3_f32()?),
        FieldType::Vec3I8 => Value::Vec3I8(r.read_vec3_i8()?),
        FieldType::Bytes(n) => Value::Bytes(r.read_bytes(n)?.to_vec()),
    })
}

fn decode_array(
    tag: Tag,
    element: &'static StructLayout,
    payload: &[u8],
    ctx: DecodeContext,
    diags: &mut Diagnostics,
) -> TypedRecord {
    let stride = element.size;
    let trailing = payload.len() % stride;
    if trailing != 0 {
        diags.warn(
            DiagnosticKind::MisalignedArray,
            Some(ctx.payload_offset),
            format!("{tag}: {} bytes is not a multiple of {stride}, {trailing} dropped", payload.len()),
        );
    }
    let elements = payload
        .chunks_exact(stride)
        .map(|bytes| decode_struct(element, bytes))
        .collect();
    TypedRecord::Array { element: element.name, stride, elements, trailing }
}

fn decode_strings(payload: &[u8]) -> Vec<String> {
    let mut reader = BinaryReader::new(payload);
    let mut entries = Vec::new();
    while let Ok(s) = reader.read_cstr() {
        if !s.is_empty() {
            entries.push(s);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use adtkit_layout::registry::TILE_HEADER;

    fn ctx() -> DecodeContext {
        DecodeContext::new(TagOrientation::Reversed, OffsetOrigin::Payload)
    }

    #[test]
    fn test_decode_version() {
        let mut diags = Diagnostics::new();
        let record = decode(Tag::new(*b"MVER"), &18u32.to_le_bytes(), ctx(), &mut diags);
        assert_eq!(record.as_struct().unwrap().u32("version"), Some(18));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_array_truncates_and_warns() {
        let mut payload = Vec::new();
        for v in [1u32, 2, 3] {
            payload.extend_from_slice(&v.to_le_bytes());
        }
        payload.push(0xAA);

        let mut diags = Diagnostics::new();
        let record = decode(Tag::new(*b"MMID"), &payload, ctx().at(100), &mut diags);
        match &record {
            TypedRecord::Array { elements, trailing, stride, .. } => {
                assert_eq!(elements.len(), 3);
                assert_eq!(*trailing, 1);
                assert_eq!(*stride, 4);
                assert_eq!(elements[2].u32("value"), Some(3));
            }
            other => panic!("expected array, got {other:?}"),
        }
        assert_eq!(diags.count(DiagnosticKind::MisalignedArray), 1);
        assert_eq!(diags.iter().next().unwrap().offset, Some(100));
    }

    #[test]
    fn test_flag_conditional_absent_not_zero() {
        let mut payload = vec![0u8; 64];
        payload[36..40].copy_from_slice(&0x1234u32.to_le_bytes());

        // flags = 0: MFBO offset is absent even though the bytes are non-zero
        let record = decode_struct(&TILE_HEADER, &payload);
        assert_eq!(record.get("ofs_mfbo"), Some(&Value::Absent));
        assert!(!record.is_present("ofs_mfbo"));
        assert_eq!(record.u32("ofs_mddf"), Some(0));

        payload[0] = 1;
        let record = decode_struct(&TILE_HEADER, &payload);
        assert_eq!(record.u32("ofs_mfbo"), Some(0x1234));
    }

    #[test]
    fn test_short_struct_marks_tail_absent() {
        let mut diags = Diagnostics::new();
        let record = decode(Tag::new(*b"MHDR"), &[0u8; 10], ctx(), &mut diags);
        let record = record.as_struct().unwrap();
        assert_eq!(record.u32("ofs_mcin"), Some(0));
        assert!(!record.is_present("ofs_modf"));
        assert_eq!(diags.count(DiagnosticKind::Conformance), 1);
    }

    #[test]
    fn test_strings() {
        let mut diags = Diagnostics::new();
        let record = decode(Tag::new(*b"MTEX"), b"a.blp\0\0b.blp\0", ctx(), &mut diags);
        assert_eq!(record.as_strings().unwrap(), &["a.blp".to_string(), "b.blp".to_string()]);
    }

    #[test]
    fn test_unknown_keeps_bytes() {
        let mut diags = Diagnostics::new();
        let record = decode(Tag::new(*b"QQQQ"), &[9, 8, 7], ctx(), &mut diags);
        assert_eq!(record, TypedRecord::Unknown { declared_size: 3, raw: vec![9, 8, 7] });
    }

    #[test]
    fn test_value_json() {
        assert_eq!(serde_json::to_string(&Value::Absent).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Value::U32(5)).unwrap(), "5");
    }
}
