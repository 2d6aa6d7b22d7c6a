pub mod reader;
pub mod writer;
pub mod patch;

pub use reader::BinaryReader;
pub use writer::BinaryWriter;
pub use patch::{FieldWrite, PatchWriter};
