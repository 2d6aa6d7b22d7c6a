//! Declarative layout tables for terrain tile (ADT) files
//!
//! Nothing in here reads bytes. These are the tables the decoder and the
//! relocation patcher in `adtkit` interpret:
//! 1. `tags` - Canonical chunk identifiers and the known top-level tag table
//! 2. `fields` - Field/struct descriptors shared by every consumer
//! 3. `cell` - The fixed 128-byte cell container header and its sub-record offsets
//! 4. `placement` - Model (36-byte) and map-object (64-byte) placement records
//! 5. `registry` - Canonical tag -> structural descriptor

pub mod tags;
pub mod fields;
pub mod cell;
pub mod placement;
pub mod registry;

pub use tags::{KNOWN_TOP_LEVEL, SUBRECORD_TAGS};
pub use fields::{Axis, AxisMap, FieldSpec, FieldType, Presence, StructLayout};
pub use cell::{SubrecordKind, SubrecordSlot, CELL_HEADER, CELL_POSITION_AXES, SUBRECORD_SLOTS};
pub use placement::{PlacementKind, MAP_OBJECT_PLACEMENT, MODEL_PLACEMENT, PLACEMENT_POSITION_AXES};
pub use registry::{descriptor, Descriptor, CELL_INDEX_ENTRY};
