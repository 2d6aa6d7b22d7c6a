//! adtkit
//!
//! Reads, validates and relocates chunked terrain tile files. Tiles are
//! decoded from a flat buffer into typed chunks, cell containers are
//! resolved through their offset tables, and relocation rewrites every
//! embedded world position in place under backup protection.

pub mod backup;
pub mod batch;
pub mod builder;
pub mod cell;
pub mod chunk;
pub mod codec;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod error;
pub mod placement;
pub mod registry;
pub mod relocate;
pub mod validate;

mod ops;

pub use adtkit_layout as layout;

pub use chunk::{read_chunks, Chunk, ChunkReader, ChunkStream, KnownTags, Tag, TagOrientation};
pub use config::Config;
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use document::{decode_bytes, DecodedChunk, DecodedDocument};
pub use error::{Error, Result};
pub use ops::{decode, relocate, validate, RelocationResult};
pub use relocate::{GridCoord, RelocationDelta, RelocationRequest, RelocationSummary};
pub use validate::{validate_bytes, ValidationReport};
