//! Canonical 4-character chunk identifiers

pub const MVER: [u8; 4] = *b"MVER";
pub const MHDR: [u8; 4] = *b"MHDR";
pub const MCIN: [u8; 4] = *b"MCIN";
pub const MTEX: [u8; 4] = *b"MTEX";
pub const MMDX: [u8; 4] = *b"MMDX";
pub const MMID: [u8; 4] = *b"MMID";
pub const MWMO: [u8; 4] = *b"MWMO";
pub const MWID: [u8; 4] = *b"MWID";
pub const MDDF: [u8; 4] = *b"MDDF";
pub const MODF: [u8; 4] = *b"MODF";
pub const MCNK: [u8; 4] = *b"MCNK";
pub const MFBO: [u8; 4] = *b"MFBO";
pub const MH2O: [u8; 4] = *b"MH2O";
pub const MTXF: [u8; 4] = *b"MTXF";

pub const MCVT: [u8; 4] = *b"MCVT";
pub const MCNR: [u8; 4] = *b"MCNR";
pub const MCLY: [u8; 4] = *b"MCLY";
pub const MCRF: [u8; 4] = *b"MCRF";
pub const MCAL: [u8; 4] = *b"MCAL";
pub const MCSH: [u8; 4] = *b"MCSH";
pub const MCLQ: [u8; 4] = *b"MCLQ";
pub const MCSE: [u8; 4] = *b"MCSE";
pub const MCCV: [u8; 4] = *b"MCCV";
pub const MCLV: [u8; 4] = *b"MCLV";

/// Tags that may legitimately appear at the top level of a tile.
/// Orientation inference tests the first chunk against this table.
pub const KNOWN_TOP_LEVEL: &[[u8; 4]] = &[
    MVER, MHDR, MCIN, MTEX, MMDX, MMID, MWMO, MWID, MDDF, MODF, MCNK, MFBO, MH2O, MTXF,
];

/// Tags only ever reached through a cell header offset
pub const SUBRECORD_TAGS: &[[u8; 4]] = &[
    MCVT, MCNR, MCLY, MCRF, MCAL, MCSH, MCLQ, MCSE, MCCV, MCLV,
];

/// Byte-reversed form of a tag
pub const fn reversed(tag: [u8; 4]) -> [u8; 4] {
    [tag[3], tag[2], tag[1], tag[0]]
}
