//! Field and struct descriptors

/// Primitive on-disk field type. All multi-byte values are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    F32,
    /// Three consecutive f32 values
    Vec3F32,
    /// Three consecutive i8 values
    Vec3I8,
    /// Opaque fixed-width byte run
    Bytes(usize),
}

impl FieldType {
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 | Self::F32 => 4,
            Self::U64 => 8,
            Self::Vec3F32 => 12,
            Self::Vec3I8 => 3,
            Self::Bytes(n) => n,
        }
    }
}

/// Whether a field carries data, decided by a flags field decoded earlier
/// in the same struct. An absent field still occupies its slot on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Always,
    FlagSet { flags: &'static str, mask: u32 },
    FlagClear { flags: &'static str, mask: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub offset: usize,
    pub ty: FieldType,
    pub presence: Presence,
}

impl FieldSpec {
    pub const fn new(name: &'static str, offset: usize, ty: FieldType) -> Self {
        Self { name, offset, ty, presence: Presence::Always }
    }

    pub const fn when_set(self, flags: &'static str, mask: u32) -> Self {
        Self { presence: Presence::FlagSet { flags, mask }, ..self }
    }

    pub const fn when_clear(self, flags: &'static str, mask: u32) -> Self {
        Self { presence: Presence::FlagClear { flags, mask }, ..self }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.ty.width()
    }
}

/// Fixed-size struct: fields at explicit offsets, possibly overlapping when
/// two flag-conditional fields share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StructLayout {
    pub name: &'static str,
    pub size: usize,
    pub fields: &'static [FieldSpec],
}

impl StructLayout {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Axis of a relocation delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Grid x (east-west tile column)
    X,
    /// Grid y (north-south tile row)
    Y,
    /// Height, driven by the caller's vertical offset only
    Vertical,
}

/// How one component of a stored position follows the delta
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisMap {
    pub axis: Axis,
    pub sign: i8,
}

impl AxisMap {
    pub const fn plus(axis: Axis) -> Self {
        Self { axis, sign: 1 }
    }

    pub const fn minus(axis: Axis) -> Self {
        Self { axis, sign: -1 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_end() {
        let f = FieldSpec::new("position", 0x68, FieldType::Vec3F32);
        assert_eq!(f.end(), 0x74);
        assert_eq!(f.presence, Presence::Always);
    }

    #[test]
    fn test_conditional_builder() {
        let f = FieldSpec::new("ofs_shadow", 0x2C, FieldType::U32).when_set("flags", 1);
        assert_eq!(f.presence, Presence::FlagSet { flags: "flags", mask: 1 });
    }
}
