/// Little-endian byte sink for building chunk streams
pub struct BinaryWriter {
    data: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { data: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, n: usize) {
        self.data.resize(self.data.len() + n, 0);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_u16_le(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32_le(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_f32_le(&mut self, v: f32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_vec3_f32(&mut self, v: [f32; 3]) {
        for c in v {
            self.write_f32_le(c);
        }
    }

    /// Write a tag+size header followed by the payload
    pub fn write_chunk(&mut self, raw_tag: [u8; 4], payload: &[u8]) {
        self.write_bytes(&raw_tag);
        self.write_u32_le(payload.len() as u32);
        self.write_bytes(payload);
    }
}

impl Default for BinaryWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Continue writing after existing bytes
impl From<Vec<u8>> for BinaryWriter {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl From<BinaryWriter> for Vec<u8> {
    fn from(writer: BinaryWriter) -> Self {
        writer.into_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::reader::BinaryReader;

    #[test]
    fn test_roundtrip_primitives() {
        let mut writer = BinaryWriter::new();
        writer.write_u8(0x42);
        writer.write_u16_le(0x1234);
        writer.write_u32_le(0xDEADBEEF);
        writer.write_vec3_f32([1.0, 2.0, 3.0]);

        let data = writer.into_vec();
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u8().unwrap(), 0x42);
        assert_eq!(reader.read_u16_le().unwrap(), 0x1234);
        assert_eq!(reader.read_u32_le().unwrap(), 0xDEADBEEF);
        assert_eq!(reader.read_vec3_f32().unwrap(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_write_chunk() {
        let mut writer = BinaryWriter::new();
        writer.write_chunk(*b"REVM", &18u32.to_le_bytes());
        assert_eq!(writer.as_slice(), &[b'R', b'E', b'V', b'M', 4, 0, 0, 0, 18, 0, 0, 0]);
    }

    #[test]
    fn test_write_zeros() {
        let mut writer = BinaryWriter::with_capacity(8);
        writer.write_u8(1);
        writer.write_zeros(3);
        assert_eq!(writer.len(), 4);
        assert_eq!(writer.as_slice(), &[1, 0, 0, 0]);
    }
}
