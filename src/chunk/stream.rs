use indexmap::IndexMap;

use super::tag::{KnownTags, Tag, TagOrientation};
use crate::codec::{BinaryReader, BinaryWriter};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{Error, Result};

pub const CHUNK_HEADER_SIZE: usize = 8;

/// One tag-length-value record, borrowed from the file buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Canonical tag, after applying the file's orientation
    pub tag: Tag,
    /// Tag bytes exactly as stored
    pub raw_tag: [u8; 4],
    pub declared_size: u32,
    pub payload: &'a [u8],
    /// Absolute offset of the chunk header
    pub offset: u64,
}

impl Chunk<'_> {
    pub fn payload_offset(&self) -> u64 {
        self.offset + CHUNK_HEADER_SIZE as u64
    }

    /// Offset one past the last payload byte
    pub fn end(&self) -> u64 {
        self.payload_offset() + self.declared_size as u64
    }
}

/// Single forward pass over a chunk stream.
///
/// Yields chunks until the buffer is exhausted. A header or payload that
/// would run past the end yields one `Err(TruncatedChunk)` and ends the
/// iteration; everything before it has already been yielded.
pub struct ChunkReader<'a, 'k> {
    reader: BinaryReader<'a>,
    known: &'k KnownTags,
    orientation: TagOrientation,
    inferred: bool,
    diagnostics: Diagnostics,
    done: bool,
}

impl<'a, 'k> ChunkReader<'a, 'k> {
    pub fn new(data: &'a [u8], known: &'k KnownTags, fallback: TagOrientation) -> Self {
        let (orientation, inferred) = match data.get(..4) {
            Some(first) => {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(first);
                TagOrientation::infer(raw, known, fallback)
            }
            None => (fallback, false),
        };
        if !inferred && !data.is_empty() {
            tracing::debug!(?orientation, "first tag unknown, using fallback orientation");
        }
        Self {
            reader: BinaryReader::new(data),
            known,
            orientation,
            inferred,
            diagnostics: Diagnostics::new(),
            done: false,
        }
    }

    pub fn orientation(&self) -> TagOrientation {
        self.orientation
    }

    /// Whether the orientation matched the known-tag table
    pub fn orientation_inferred(&self) -> bool {
        self.inferred
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    fn truncated(&mut self, offset: usize, needed: usize) -> Error {
        self.done = true;
        let available = self.reader.remaining();
        self.diagnostics.error(
            DiagnosticKind::TruncatedChunk,
            Some(offset as u64),
            format!("need {needed} bytes, {available} left"),
        );
        Error::TruncatedChunk {
            offset: offset as u64,
            needed: needed as u64,
            available: available as u64,
        }
    }

    fn read_next(&mut self) -> Result<Chunk<'a>> {
        let offset = self.reader.position();
        if self.reader.remaining() < CHUNK_HEADER_SIZE {
            return Err(self.truncated(offset, CHUNK_HEADER_SIZE));
        }
        let raw_tag = self.reader.read_tag()?;
        let declared_size = self.reader.read_u32_le()?;
        if self.reader.remaining() < declared_size as usize {
            let needed = CHUNK_HEADER_SIZE + declared_size as usize;
            self.reader.set_position(offset);
            return Err(self.truncated(offset, needed));
        }
        let payload = self.reader.read_bytes(declared_size as usize)?;

        let tag = self.orientation.canonical(raw_tag);
        if !self.known.contains(tag) {
            let other = self.orientation.opposite().canonical(raw_tag);
            if self.known.contains(other) {
                self.diagnostics.warn(
                    DiagnosticKind::MixedOrientation,
                    Some(offset as u64),
                    format!("{other} is stored {:?}, file is {:?}", self.orientation.opposite(), self.orientation),
                );
            }
        }

        Ok(Chunk { tag, raw_tag, declared_size, payload, offset: offset as u64 })
    }
}

impl<'a> Iterator for ChunkReader<'a, '_> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.reader.is_empty() {
            return None;
        }
        Some(self.read_next())
    }
}

/// The fully consumed result of a `ChunkReader`
#[derive(Debug, Clone)]
pub struct ChunkStream<'a> {
    pub data: &'a [u8],
    pub orientation: TagOrientation,
    pub orientation_inferred: bool,
    pub chunks: Vec<Chunk<'a>>,
    /// Offset where decoding stopped early, if it did
    pub truncated_at: Option<u64>,
    pub diagnostics: Diagnostics,
}

pub fn read_chunks<'a>(data: &'a [u8], known: &KnownTags, fallback: TagOrientation) -> ChunkStream<'a> {
    let mut reader = ChunkReader::new(data, known, fallback);
    let mut chunks = Vec::new();
    let mut truncated_at = None;
    for item in reader.by_ref() {
        match item {
            Ok(chunk) => chunks.push(chunk),
            Err(Error::TruncatedChunk { offset, .. }) => truncated_at = Some(offset),
            Err(_) => break,
        }
    }
    let orientation = reader.orientation();
    let orientation_inferred = reader.orientation_inferred();
    ChunkStream {
        data,
        orientation,
        orientation_inferred,
        chunks,
        truncated_at,
        diagnostics: reader.into_diagnostics(),
    }
}

impl<'a> ChunkStream<'a> {
    pub fn find(&self, tag: Tag) -> Option<&Chunk<'a>> {
        self.chunks.iter().find(|c| c.tag == tag)
    }

    pub fn find_all(&self, tag: Tag) -> impl Iterator<Item = &Chunk<'a>> {
        self.chunks.iter().filter(move |c| c.tag == tag)
    }

    /// Chunk count per canonical tag, in first-seen order
    pub fn counts(&self) -> IndexMap<Tag, usize> {
        let mut counts = IndexMap::new();
        for chunk in &self.chunks {
            *counts.entry(chunk.tag).or_insert(0) += 1;
        }
        counts
    }

    /// Re-emit every decoded chunk verbatim, original tag bytes included
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = BinaryWriter::with_capacity(self.data.len());
        for chunk in &self.chunks {
            writer.write_chunk(chunk.raw_tag, chunk.payload);
        }
        writer.into_vec()
    }
}
