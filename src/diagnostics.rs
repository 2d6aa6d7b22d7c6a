//! Decode-time and patch-time findings, collected instead of printed.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Chunk header or payload runs past the end of the buffer
    TruncatedChunk,
    /// Array payload is not a whole multiple of its stride
    MisalignedArray,
    /// Cell sub-record offset out of range or carrying the wrong tag
    UnresolvedSubchunk,
    /// Tag only resolves under the other orientation
    MixedOrientation,
    /// Cell index has an unexpected number of entries
    IndexCountMismatch,
    /// Structurally sound but outside what the format allows
    Conformance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    /// File offset the finding refers to, when there is one
    pub offset: Option<u64>,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.offset {
            Some(offset) => write!(f, "{:?} @ {:#x}: {}", self.kind, offset, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Append-only sink threaded through each operation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, kind: DiagnosticKind, offset: Option<u64>, message: impl Into<String>) {
        self.push(kind, Severity::Warning, offset, message.into());
    }

    pub fn error(&mut self, kind: DiagnosticKind, offset: Option<u64>, message: impl Into<String>) {
        self.push(kind, Severity::Error, offset, message.into());
    }

    fn push(&mut self, kind: DiagnosticKind, severity: Severity, offset: Option<u64>, message: String) {
        tracing::debug!(?kind, ?severity, offset, %message, "diagnostic");
        self.items.push(Diagnostic { kind, severity, offset, message });
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.items.iter().filter(|d| d.kind == kind).count()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
