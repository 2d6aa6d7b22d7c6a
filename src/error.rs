use std::path::PathBuf;

use crate::relocate::GridCoord;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("truncated chunk at offset {offset}: need {needed} bytes, have {available}")]
    TruncatedChunk { offset: u64, needed: u64, available: u64 },

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("missing {0} chunk")]
    MissingChunk(&'static str),

    #[error("coordinate mismatch: expected {expected}, found {found}")]
    CoordinateMismatch { expected: GridCoord, found: GridCoord },

    #[error("cell at offset {offset} has position {position:?} outside the tile grid")]
    OffGridPosition { offset: u64, position: [f32; 3] },

    #[error("chunk at offset {offset} has {size} payload bytes, need at least {required}")]
    InsufficientChunkSize { offset: u64, size: u32, required: u32 },

    #[error("index entry {index} points at offset {offset} which holds {found}")]
    IndexEntryMismatch { index: usize, offset: u64, found: String },

    #[error("pre-check failed: {0}")]
    PrecheckFailed(String),

    #[error("validation failed: {0}")]
    ValidationFailed(String),

    #[error("duplicate job for {0:?}")]
    DuplicateJob(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// True for failures detected before any byte of the target was written
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::CoordinateMismatch { .. }
                | Self::OffGridPosition { .. }
                | Self::TruncatedChunk { .. }
                | Self::InsufficientChunkSize { .. }
                | Self::IndexEntryMismatch { .. }
                | Self::MissingChunk(_)
                | Self::PrecheckFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
