use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical (forward) 4-character chunk identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tag(pub [u8; 4]);

impl Tag {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> [u8; 4] {
        self.0
    }

    pub const fn reversed(self) -> Self {
        Self(adtkit_layout::tags::reversed(self.0))
    }

    pub fn as_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({})", self.as_str())
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

impl From<[u8; 4]> for Tag {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&str> for Tag {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let bytes: [u8; 4] = s
            .as_bytes()
            .try_into()
            .map_err(|_| format!("tag must be exactly 4 bytes: {s:?}"))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Tag {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.as_str())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Tag::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}

/// How tags are laid out on disk. A property of the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOrientation {
    /// On-disk bytes equal the canonical identifier
    Natural,
    /// On-disk bytes are the canonical identifier back-to-front
    Reversed,
}

impl TagOrientation {
    pub const fn opposite(self) -> Self {
        match self {
            Self::Natural => Self::Reversed,
            Self::Reversed => Self::Natural,
        }
    }

    /// Stored bytes -> canonical tag
    pub const fn canonical(self, raw: [u8; 4]) -> Tag {
        match self {
            Self::Natural => Tag(raw),
            Self::Reversed => Tag(adtkit_layout::tags::reversed(raw)),
        }
    }

    /// Canonical tag -> stored bytes
    pub const fn raw(self, tag: Tag) -> [u8; 4] {
        match self {
            Self::Natural => tag.0,
            Self::Reversed => adtkit_layout::tags::reversed(tag.0),
        }
    }

    /// Decide the file's orientation from its first stored tag. Returns the
    /// orientation and whether it was matched against the table (as opposed
    /// to falling back).
    pub fn infer(first_raw: [u8; 4], known: &KnownTags, fallback: Self) -> (Self, bool) {
        if known.contains(Tag(first_raw)) {
            (Self::Natural, true)
        } else if known.contains(Self::Reversed.canonical(first_raw)) {
            (Self::Reversed, true)
        } else {
            (fallback, false)
        }
    }
}

/// Table of canonical tags considered valid at the top level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownTags {
    tags: Vec<Tag>,
}

impl KnownTags {
    pub fn new(tags: impl IntoIterator<Item = Tag>) -> Self {
        let mut tags: Vec<Tag> = tags.into_iter().collect();
        tags.sort();
        tags.dedup();
        Self { tags }
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.tags.binary_search(&tag).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = Tag> + '_ {
        self.tags.iter().copied()
    }
}

impl Default for KnownTags {
    fn default() -> Self {
        Self::new(adtkit_layout::KNOWN_TOP_LEVEL.iter().copied().map(Tag))
    }
}

impl Serialize for KnownTags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.tags.iter())
    }
}

impl<'de> Deserialize<'de> for KnownTags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tags = Vec::<Tag>::deserialize(deserializer)?;
        Ok(Self::new(tags))
    }
}
