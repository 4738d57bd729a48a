//! Little-endian wire stream primitives
//!
//! `DataStream` reads the Bitcoin wire encoding from a byte slice;
//! `DataWriter` builds it. Reads past the end of the input fail with a
//! `Serialization` error naming the offset and length requested.

use crate::error::{ChainError, Result};
use crate::types::ByteString;

/// Forward-only reader over a byte slice
#[derive(Debug)]
pub struct DataStream<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> DataStream<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        DataStream { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(ChainError::Serialization(format!(
                "Unexpected end of data: need {} bytes at offset {}, {} left",
                n,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_hash32(&mut self) -> Result<[u8; 32]> {
        let b = self.read_bytes(32)?;
        let mut out = [0u8; 32];
        out.copy_from_slice(b);
        Ok(out)
    }

    /// Variable-length integer: one byte below 0xfd, then 0xfd+u16,
    /// 0xfe+u32, 0xff+u64.
    pub fn read_compact_size(&mut self) -> Result<u64> {
        let tag = self.read_u8()?;
        match tag {
            0xfd => Ok(self.read_u16()? as u64),
            0xfe => Ok(self.read_u32()? as u64),
            0xff => self.read_u64(),
            n => Ok(n as u64),
        }
    }

    /// Compact-size length followed by that many raw bytes
    pub fn read_var_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_compact_size()?;
        if len > usize::MAX as u64 {
            return Err(ChainError::Serialization(format!(
                "Variable-length field of {} bytes is not addressable",
                len
            )));
        }
        self.read_bytes(len as usize)
    }
}

/// Append-only wire encoder
#[derive(Debug, Default)]
pub struct DataWriter {
    buf: ByteString,
}

impl DataWriter {
    pub fn new() -> Self {
        DataWriter { buf: Vec::new() }
    }

    pub fn into_bytes(self) -> ByteString {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_compact_size(&mut self, v: u64) {
        if v < 0xfd {
            self.write_u8(v as u8);
        } else if v <= 0xffff {
            self.write_u8(0xfd);
            self.write_u16(v as u16);
        } else if v <= 0xffff_ffff {
            self.write_u8(0xfe);
            self.write_u32(v as u32);
        } else {
            self.write_u8(0xff);
            self.write_u64(v);
        }
    }

    pub fn write_var_bytes(&mut self, data: &[u8]) {
        self.write_compact_size(data.len() as u64);
        self.write_bytes(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Boundary values of every compact-size form, concatenated.
    const COMPACT_VALUES: [u64; 9] = [
        0,
        1,
        252,
        253,
        65535,
        65536,
        4294967295,
        4294967296,
        18446744073709551615,
    ];
    const COMPACT_HEX: &str =
        "0001fcfdfd00fdfffffe00000100feffffffffff0000000001000000ffffffffffffffffff";

    #[test]
    fn test_compact_size_encoding_grid() {
        let mut writer = DataWriter::new();
        for v in COMPACT_VALUES {
            writer.write_compact_size(v);
        }
        assert_eq!(hex::encode(writer.into_bytes()), COMPACT_HEX);
    }

    #[test]
    fn test_compact_size_decoding_grid() {
        let bytes = hex::decode(COMPACT_HEX).unwrap();
        let mut stream = DataStream::new(&bytes);
        for v in COMPACT_VALUES {
            assert_eq!(stream.read_compact_size().unwrap(), v);
        }
        assert!(stream.is_empty());
    }

    #[test]
    fn test_read_past_end_is_error() {
        let bytes = [1u8, 2];
        let mut stream = DataStream::new(&bytes);
        assert!(stream.read_u32().is_err());
        // A failed read must not consume anything usable.
        assert_eq!(stream.remaining(), 2);
    }

    #[test]
    fn test_var_bytes_round_trip() {
        let payload = vec![0xabu8; 300];
        let mut writer = DataWriter::new();
        writer.write_var_bytes(&payload);
        let bytes = writer.into_bytes();
        assert_eq!(bytes[0], 0xfd);
        let mut stream = DataStream::new(&bytes);
        assert_eq!(stream.read_var_bytes().unwrap(), &payload[..]);
    }

    #[test]
    fn test_truncated_var_bytes() {
        let bytes = [0x05u8, 0xaa, 0xbb];
        let mut stream = DataStream::new(&bytes);
        assert!(stream.read_var_bytes().is_err());
    }

    #[test]
    fn test_little_endian_primitives() {
        let bytes = hex::decode("0100000002000300000000000000").unwrap();
        let mut stream = DataStream::new(&bytes);
        assert_eq!(stream.read_u32().unwrap(), 1);
        assert_eq!(stream.read_u16().unwrap(), 2);
        assert_eq!(stream.read_u64().unwrap(), 3);
    }
}
