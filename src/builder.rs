//! Synthetic tile construction
//!
//! Produces well-formed tiles for tests and for callers that need a fixture.
//! Layout follows the usual top-level order with every cell container after
//! the placement arrays.

use adtkit_layout::placement::SCALE_ONE;
use adtkit_layout::{tags, CELL_HEADER};

use crate::chunk::{Tag, TagOrientation, CHUNK_HEADER_SIZE};
use crate::codec::BinaryWriter;
use crate::config::{GridConfig, OffsetOrigin};
use crate::relocate::GridCoord;

const HEIGHTS: usize = 145;
const DEFAULT_TEXTURE: &str = "tileset/generic/grass.blp";

#[derive(Debug, Clone, Copy)]
struct Model {
    position: [f32; 3],
    scale: u16,
}

#[derive(Debug, Clone, Copy)]
struct MapObject {
    position: [f32; 3],
    lower: [f32; 3],
    upper: [f32; 3],
}

#[derive(Debug, Clone)]
pub struct TileBuilder {
    coord: GridCoord,
    grid: GridConfig,
    orientation: TagOrientation,
    offset_origin: OffsetOrigin,
    version: u32,
    cells: usize,
    cell_payload_len: Option<usize>,
    local_indices: bool,
    reverse_cells: bool,
    textures: Vec<String>,
    models: Vec<Model>,
    map_objects: Vec<MapObject>,
    extra: Vec<([u8; 4], Vec<u8>)>,
}

impl TileBuilder {
    pub fn new(coord: GridCoord) -> Self {
        let grid = GridConfig::default();
        Self {
            coord,
            grid,
            orientation: TagOrientation::Reversed,
            offset_origin: OffsetOrigin::Payload,
            version: 18,
            cells: grid.expected_cells(),
            cell_payload_len: None,
            local_indices: false,
            reverse_cells: false,
            textures: Vec::new(),
            models: Vec::new(),
            map_objects: Vec::new(),
            extra: Vec::new(),
        }
    }

    /// Number of occupied index slots, filled from slot 0
    pub fn cells(mut self, n: usize) -> Self {
        self.cells = n;
        self
    }

    /// Replace every cell payload with `len` bytes holding only the header
    /// fields that fit
    pub fn cell_payload_len(mut self, len: usize) -> Self {
        self.cell_payload_len = Some(len);
        self
    }

    /// Store each cell's column/row in the grid fields instead of the tile
    /// coordinate
    pub fn local_cell_indices(mut self) -> Self {
        self.local_indices = true;
        self
    }

    /// Write cell containers to the stream in reverse index order
    pub fn reverse_cell_order(mut self) -> Self {
        self.reverse_cells = true;
        self
    }

    pub fn orientation(mut self, orientation: TagOrientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn offset_origin(mut self, origin: OffsetOrigin) -> Self {
        self.offset_origin = origin;
        self
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn texture(mut self, name: impl Into<String>) -> Self {
        self.textures.push(name.into());
        self
    }

    pub fn model(self, position: [f32; 3]) -> Self {
        self.model_scaled(position, SCALE_ONE as u16)
    }

    pub fn model_scaled(mut self, position: [f32; 3], scale: u16) -> Self {
        self.models.push(Model { position, scale });
        self
    }

    pub fn map_object(mut self, position: [f32; 3], lower: [f32; 3], upper: [f32; 3]) -> Self {
        self.map_objects.push(MapObject { position, lower, upper });
        self
    }

    /// Append a top-level chunk after the cells, tag given in canonical form
    pub fn extra_chunk(mut self, tag: [u8; 4], payload: Vec<u8>) -> Self {
        self.extra.push((tag, payload));
        self
    }

    fn cell_position(&self, i: usize) -> [f32; 3] {
        let per_side = self.grid.cells_per_side as usize;
        let (col, row) = ((i % per_side) as f64, (i / per_side) as f64);
        let origin = self.grid.origin();
        let (tile, cell) = (self.grid.tile_size(), self.grid.cell_size());
        [
            (origin - self.coord.y as f64 * tile - row * cell) as f32,
            (origin - self.coord.x as f64 * tile - col * cell) as f32,
            0.0,
        ]
    }

    fn cell_payload(&self, i: usize) -> Vec<u8> {
        let per_side = self.grid.cells_per_side as usize;
        let (grid_x, grid_y) = if self.local_indices {
            ((i % per_side) as u32, (i / per_side) as u32)
        } else {
            (self.coord.x, self.coord.y)
        };
        let bias = self.offset_origin.bias() as u32;

        let mut header = BinaryWriter::with_capacity(CELL_HEADER.size);
        let sub = |n: usize| CELL_HEADER.size + n;
        let ofs_height = sub(0);
        let ofs_normal = ofs_height + CHUNK_HEADER_SIZE + HEIGHTS * 4;
        let ofs_layer = ofs_normal + CHUNK_HEADER_SIZE + HEIGHTS * 3;
        let position = self.cell_position(i);

        header.write_u32_le(0); // flags
        header.write_u32_le(grid_x);
        header.write_u32_le(grid_y);
        header.write_u32_le(1); // n_layers
        header.write_u32_le(0); // n_doodad_refs
        header.write_u32_le(ofs_height as u32 + bias);
        header.write_u32_le(ofs_normal as u32 + bias);
        header.write_u32_le(ofs_layer as u32 + bias);
        header.write_zeros(0x68 - header.len());
        header.write_vec3_f32(position);
        header.write_zeros(CELL_HEADER.size - header.len());

        let mut payload = header.into_vec();
        if let Some(len) = self.cell_payload_len {
            payload.resize(len, 0);
            return payload;
        }

        let mut w = BinaryWriter::from(payload);
        w.write_chunk(self.raw(tags::MCVT), &vec![0u8; HEIGHTS * 4]);
        let normals: Vec<u8> = (0..HEIGHTS).flat_map(|_| [0u8, 0, 127]).collect();
        w.write_chunk(self.raw(tags::MCNR), &normals);
        let mut layer = BinaryWriter::new();
        layer.write_u32_le(0);
        layer.write_zeros(12);
        w.write_chunk(self.raw(tags::MCLY), layer.as_slice());
        w.into_vec()
    }

    fn raw(&self, tag: [u8; 4]) -> [u8; 4] {
        self.orientation.raw(Tag::new(tag))
    }

    pub fn build(&self) -> Vec<u8> {
        let mut top: Vec<([u8; 4], Vec<u8>)> = Vec::new();

        top.push((tags::MVER, self.version.to_le_bytes().to_vec()));
        top.push((tags::MHDR, vec![0u8; 64]));
        let entries = self.cells.max(self.grid.expected_cells());
        top.push((tags::MCIN, vec![0u8; entries * 16]));

        let textures: Vec<&str> = if self.textures.is_empty() {
            vec![DEFAULT_TEXTURE]
        } else {
            self.textures.iter().map(String::as_str).collect()
        };
        top.push((tags::MTEX, string_table(&textures)));

        let has_models = !self.models.is_empty();
        let has_objects = !self.map_objects.is_empty();
        top.push((tags::MMDX, if has_models { string_table(&["world/generic/tree.m2"]) } else { Vec::new() }));
        top.push((tags::MMID, if has_models { 0u32.to_le_bytes().to_vec() } else { Vec::new() }));
        top.push((tags::MWMO, if has_objects { string_table(&["world/wmo/house.wmo"]) } else { Vec::new() }));
        top.push((tags::MWID, if has_objects { 0u32.to_le_bytes().to_vec() } else { Vec::new() }));

        let mut mddf = BinaryWriter::new();
        for (n, m) in self.models.iter().enumerate() {
            mddf.write_u32_le(0);
            mddf.write_u32_le(n as u32 + 1);
            mddf.write_vec3_f32(m.position);
            mddf.write_vec3_f32([0.0; 3]);
            mddf.write_u16_le(m.scale);
            mddf.write_u16_le(0);
        }
        top.push((tags::MDDF, mddf.into_vec()));

        let mut modf = BinaryWriter::new();
        for (n, o) in self.map_objects.iter().enumerate() {
            modf.write_u32_le(0);
            modf.write_u32_le(n as u32 + 1000);
            modf.write_vec3_f32(o.position);
            modf.write_vec3_f32([0.0; 3]);
            modf.write_vec3_f32(o.lower);
            modf.write_vec3_f32(o.upper);
            modf.write_u16_le(0);
            modf.write_u16_le(0);
            modf.write_u16_le(0);
            modf.write_u16_le(SCALE_ONE as u16);
        }
        top.push((tags::MODF, modf.into_vec()));

        let first_cell = top.len();
        let order: Vec<usize> = if self.reverse_cells {
            (0..self.cells).rev().collect()
        } else {
            (0..self.cells).collect()
        };
        for &i in &order {
            top.push((tags::MCNK, self.cell_payload(i)));
        }
        top.extend(self.extra.iter().cloned());

        let mut offsets = Vec::with_capacity(top.len());
        let mut at = 0usize;
        for (_, payload) in &top {
            offsets.push(at);
            at += CHUNK_HEADER_SIZE + payload.len();
        }

        let mut index = BinaryWriter::with_capacity(entries * 16);
        let mut cell_chunks: Vec<(usize, usize)> = order
            .iter()
            .enumerate()
            .map(|(k, &i)| (i, first_cell + k))
            .collect();
        cell_chunks.sort_unstable();
        for &(_, chunk) in &cell_chunks {
            index.write_u32_le(offsets[chunk] as u32);
            index.write_u32_le((CHUNK_HEADER_SIZE + top[chunk].1.len()) as u32);
            index.write_zeros(8);
        }
        index.write_zeros(entries * 16 - index.len());
        top[2].1 = index.into_vec();

        // MHDR offsets count from its own payload
        let base = offsets[1] + CHUNK_HEADER_SIZE;
        let rel = |k: usize| (offsets[k] - base) as u32;
        let mut mhdr = BinaryWriter::with_capacity(64);
        mhdr.write_u32_le(0);
        for k in 2..=9 {
            mhdr.write_u32_le(rel(k));
        }
        mhdr.write_zeros(64 - mhdr.len());
        top[1].1 = mhdr.into_vec();

        let mut out = BinaryWriter::with_capacity(at);
        for (tag, payload) in &top {
            out.write_chunk(self.raw(*tag), payload);
        }
        out.into_vec()
    }
}

fn string_table(entries: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    for e in entries {
        out.extend_from_slice(e.as_bytes());
        out.push(0);
    }
    out
}
