//! Primitive readers/writers for the BARE wire format.
//!
//! Unsigned integers use base-128 little-endian varints (continuation bit on
//! all but the last byte), signed ones the same after zigzag mapping.
//! Fixed-width integers and floats are little-endian. Strings are
//! length-prefixed UTF-8. Booleans are a single strict `0`/`1` byte.

use thiserror::Error;

/// Decoding failure with the byte offset it happened at.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("decode error at offset {offset}: {message}")]
pub struct DecodeError {
    pub offset: usize,
    pub message: String,
}

impl DecodeError {
    pub fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

/// Read side: a window over borrowed bytes with a running offset.
pub struct ByteCursor<'a> {
    bytes: &'a [u8],
    pub offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    pub fn done(&self) -> bool {
        self.offset >= self.bytes.len()
    }

    fn err(&self, message: impl Into<String>) -> DecodeError {
        DecodeError::new(self.offset, message)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        let byte = *self
            .bytes
            .get(self.offset)
            .ok_or_else(|| self.err("unexpected end of input"))?;
        self.offset += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .offset
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| self.err("unexpected end of input"))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    /// Base-128 varint, at most ten bytes.
    pub fn read_uint(&mut self) -> Result<u64, DecodeError> {
        let start = self.offset;
        let mut value = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = self.read_u8()?;
            if shift == 63 && byte > 1 {
                return Err(DecodeError::new(start, "varint overflows 64 bits"));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
            if shift > 63 {
                return Err(DecodeError::new(start, "varint overflows 64 bits"));
            }
        }
    }

    /// Zigzag-mapped varint.
    pub fn read_int(&mut self) -> Result<i64, DecodeError> {
        let raw = self.read_uint()?;
        Ok((raw >> 1) as i64 ^ -((raw & 1) as i64))
    }

    pub fn read_bool(&mut self) -> Result<bool, DecodeError> {
        let offset = self.offset;
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::new(
                offset,
                format!("invalid boolean byte {other}"),
            )),
        }
    }

    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let bytes: [u8; 2] = self.read_array()?;
        Ok(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes: [u8; 4] = self.read_array()?;
        Ok(u32::from_le_bytes(bytes))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let bytes: [u8; 8] = self.read_array()?;
        Ok(u64::from_le_bytes(bytes))
    }

    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    pub fn read_string(&mut self) -> Result<String, DecodeError> {
        let len = self.read_length()?;
        let offset = self.offset;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodeError::new(offset, "invalid UTF-8 in string"))
    }

    /// Length prefix bounded by the address space.
    pub fn read_length(&mut self) -> Result<usize, DecodeError> {
        let offset = self.offset;
        let len = self.read_uint()?;
        usize::try_from(len).map_err(|_| DecodeError::new(offset, "length does not fit usize"))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let slice = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }
}

/// Write side: an owned growable buffer.
#[derive(Debug, Default)]
pub struct ByteSink {
    buf: Vec<u8>,
}

impl ByteSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_uint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn write_int(&mut self, value: i64) {
        self.write_uint(((value << 1) ^ (value >> 63)) as u64);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.write_u32(value.to_bits());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_uint(value.len() as u64);
        self.buf.extend_from_slice(value.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uint_bytes(value: u64) -> Vec<u8> {
        let mut sink = ByteSink::new();
        sink.write_uint(value);
        sink.into_bytes()
    }

    #[test]
    fn varint_layout() {
        assert_eq!(uint_bytes(0), vec![0x00]);
        assert_eq!(uint_bytes(127), vec![0x7f]);
        assert_eq!(uint_bytes(128), vec![0x80, 0x01]);
        assert_eq!(uint_bytes(300), vec![0xac, 0x02]);
        assert_eq!(uint_bytes(u64::MAX).len(), 10);
    }

    #[test]
    fn varint_round_trip() {
        for value in [0u64, 1, 127, 128, 255, 300, 1 << 20, u64::MAX] {
            let bytes = uint_bytes(value);
            let mut cursor = ByteCursor::new(&bytes);
            assert_eq!(cursor.read_uint().unwrap(), value);
            assert!(cursor.done());
        }
    }

    #[test]
    fn zigzag_round_trip() {
        for value in [0i64, -1, 1, -64, 63, i64::MIN, i64::MAX] {
            let mut sink = ByteSink::new();
            sink.write_int(value);
            let bytes = sink.into_bytes();
            let mut cursor = ByteCursor::new(&bytes);
            assert_eq!(cursor.read_int().unwrap(), value);
        }
    }

    #[test]
    fn zigzag_small_values_stay_small() {
        let mut sink = ByteSink::new();
        sink.write_int(-1);
        assert_eq!(sink.into_bytes(), vec![0x01]);
        let mut sink = ByteSink::new();
        sink.write_int(1);
        assert_eq!(sink.into_bytes(), vec![0x02]);
    }

    #[test]
    fn bool_is_strict() {
        let mut cursor = ByteCursor::new(&[2]);
        let err = cursor.read_bool().unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("invalid boolean"));
    }

    #[test]
    fn string_round_trip() {
        let mut sink = ByteSink::new();
        sink.write_string("héllo");
        let bytes = sink.into_bytes();
        let mut cursor = ByteCursor::new(&bytes);
        assert_eq!(cursor.read_string().unwrap(), "héllo");
        assert!(cursor.done());
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut cursor = ByteCursor::new(&[2, 0xff, 0xfe]);
        let err = cursor.read_string().unwrap_err();
        assert_eq!(err.offset, 1);
        assert!(err.message.contains("UTF-8"));
    }

    #[test]
    fn truncated_input_reports_offset() {
        let mut cursor = ByteCursor::new(&[0x80]);
        assert!(cursor.read_uint().is_err());

        let mut cursor = ByteCursor::new(&[1, 2]);
        assert!(cursor.read_u32().is_err());
    }

    #[test]
    fn fixed_width_little_endian() {
        let mut sink = ByteSink::new();
        sink.write_u32(0x0403_0201);
        assert_eq!(sink.into_bytes(), vec![1, 2, 3, 4]);
    }
}
