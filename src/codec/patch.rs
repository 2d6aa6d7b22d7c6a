//! Fixed-width overwrites into an existing buffer.
//!
//! Nothing here can grow or shrink the buffer: every write lands on bytes
//! that already exist, or fails without touching anything.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

/// A single scalar overwrite at an absolute buffer offset
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldWrite {
    U32 { offset: usize, value: u32 },
    F32 { offset: usize, value: f32 },
}

impl FieldWrite {
    pub fn offset(&self) -> usize {
        match *self {
            Self::U32 { offset, .. } | Self::F32 { offset, .. } => offset,
        }
    }

    pub fn end(&self) -> usize {
        self.offset() + 4
    }
}

pub struct PatchWriter<'a> {
    data: &'a mut [u8],
    written: usize,
}

impl<'a> PatchWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, written: 0 }
    }

    /// Number of scalar writes applied so far
    pub fn written(&self) -> usize {
        self.written
    }

    fn check(&self, offset: usize, width: usize) -> Result<()> {
        if offset.checked_add(width).map_or(true, |end| end > self.data.len()) {
            return Err(Error::UnexpectedEof);
        }
        Ok(())
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) -> Result<()> {
        self.check(offset, 4)?;
        LittleEndian::write_u32(&mut self.data[offset..offset + 4], value);
        self.written += 1;
        Ok(())
    }

    pub fn write_f32(&mut self, offset: usize, value: f32) -> Result<()> {
        self.check(offset, 4)?;
        LittleEndian::write_f32(&mut self.data[offset..offset + 4], value);
        self.written += 1;
        Ok(())
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32> {
        self.check(offset, 4)?;
        Ok(LittleEndian::read_f32(&self.data[offset..offset + 4]))
    }

    /// Apply a planned write set. Every offset is checked before the first
    /// byte changes, so a bad plan leaves the buffer as it was.
    pub fn apply(&mut self, plan: &[FieldWrite]) -> Result<()> {
        for write in plan {
            self.check(write.offset(), 4)?;
        }
        for write in plan {
            match *write {
                FieldWrite::U32 { offset, value } => self.write_u32(offset, value)?,
                FieldWrite::F32 { offset, value } => self.write_f32(offset, value)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_in_place() {
        let mut data = vec![0u8; 12];
        let mut writer = PatchWriter::new(&mut data);
        writer.write_u32(0, 7).unwrap();
        writer.write_f32(4, 1.5).unwrap();
        assert_eq!(writer.read_f32(4).unwrap(), 1.5);
        assert_eq!(writer.written(), 2);
        assert_eq!(data.len(), 12);
        assert_eq!(&data[0..4], &[7, 0, 0, 0]);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut data = vec![0u8; 6];
        let mut writer = PatchWriter::new(&mut data);
        assert!(writer.write_u32(4, 1).is_err());
        assert!(writer.write_u32(usize::MAX - 1, 1).is_err());
        assert_eq!(writer.written(), 0);
    }

    #[test]
    fn test_bad_plan_writes_nothing() {
        let mut data = vec![0u8; 8];
        let plan = [
            FieldWrite::U32 { offset: 0, value: 0xFFFF_FFFF },
            FieldWrite::F32 { offset: 6, value: 2.0 },
        ];
        let mut writer = PatchWriter::new(&mut data);
        assert!(writer.apply(&plan).is_err());
        assert_eq!(data, vec![0u8; 8]);
    }
}
