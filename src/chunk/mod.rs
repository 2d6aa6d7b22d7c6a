//! Chunk stream reader
//!
//! A tile is a flat sequence of `tag:4, size:u32le, payload:size` records.
//! Tag byte order is inferred once per file from the first chunk and then
//! applied to every comparison.

mod stream;
mod tag;

pub use stream::{read_chunks, Chunk, ChunkReader, ChunkStream, CHUNK_HEADER_SIZE};
pub use tag::{KnownTags, Tag, TagOrientation};
