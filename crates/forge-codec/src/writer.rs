/// Little-endian byte sink.
#[derive(Clone, Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i16(&mut self, v: i16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// A 16-bit length-prefixed Latin-1 string; characters outside Latin-1
    /// are written as `?`.
    pub fn string(&mut self, s: &str) {
        let bytes: Vec<u8> = s
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .take(u16::MAX as usize)
            .collect();
        self.u16(bytes.len() as u16);
        self.buf.extend_from_slice(&bytes);
    }

    /// Overwrite a previously written u32 at `pos`.
    pub fn patch_u32(&mut self, pos: usize, v: u32) {
        self.buf[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
    }

    /// Overwrite a previously written u16 at `pos`.
    pub fn patch_u16(&mut self, pos: usize, v: u16) {
        self.buf[pos..pos + 2].copy_from_slice(&v.to_le_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteReader;

    #[test]
    fn writes_little_endian() {
        let mut w = ByteWriter::new();
        w.u16(0x1234);
        w.i32(-2);
        assert_eq!(w.into_inner(), vec![0x34, 0x12, 0xFE, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn patch_in_place() {
        let mut w = ByteWriter::new();
        w.u32(0);
        w.u8(9);
        w.patch_u32(0, 0xAABBCCDD);
        assert_eq!(w.into_inner(), vec![0xDD, 0xCC, 0xBB, 0xAA, 9]);
    }

    #[test]
    fn string_replaces_non_latin1() {
        let mut w = ByteWriter::new();
        w.string("a\u{e9}\u{263a}");
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![3, 0, b'a', 0xE9, b'?']);
        assert_eq!(ByteReader::new(&bytes).string().unwrap(), "a\u{e9}?");
    }
}
