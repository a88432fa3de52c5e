// Copyright (c) 2024 Alibaba Cloud
//
// SPDX-License-Identifier: Apache-2.0
//

//! Bounds-checked primitive reads over an in-memory log.
//!
//! Every read either consumes exactly its width and advances the cursor, or fails with
//! [`Error::InsufficientBuffer`] and leaves the cursor where it was. Endianness is always
//! chosen by the caller through the `byteorder` marker types.

use crate::error::{Error, Result};
use crate::guid::Guid;
use byteorder::{ByteOrder, LittleEndian};

pub const GUID_SIZE: usize = 16;

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Bytes not consumed yet, without advancing.
    pub fn peek_rest(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::InsufficientBuffer {
                needed,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.data[self.position..self.position + n];
        self.position += n;
        Ok(out)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }

    /// Consumes everything left.
    pub fn read_rest(&mut self) -> &'a [u8] {
        let out = self.peek_rest();
        self.position = self.data.len();
        out
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16_with<E: ByteOrder>(&mut self) -> Result<u16> {
        Ok(E::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32_with<E: ByteOrder>(&mut self) -> Result<u32> {
        Ok(E::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64_with<E: ByteOrder>(&mut self) -> Result<u64> {
        Ok(E::read_u64(self.read_bytes(8)?))
    }

    // UEFI and crypto-agile structures are little-endian throughout.
    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_u16_with::<LittleEndian>()
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_u32_with::<LittleEndian>()
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_u64_with::<LittleEndian>()
    }

    pub fn read_guid(&mut self) -> Result<Guid> {
        Ok(Guid::from_bytes(self.read_array::<GUID_SIZE>()?))
    }

    /// Reads a length-checked sub-reader of `n` bytes.
    pub fn sub_reader(&mut self, n: usize) -> Result<ByteReader<'a>> {
        Ok(ByteReader::new(self.read_bytes(n)?))
    }

    /// Reads a NUL-terminated UCS-2 string, consuming the terminator when present.
    pub fn read_ucs2_cstr(&mut self) -> Result<String> {
        let mut units = Vec::new();
        loop {
            let unit = self.read_u16()?;
            if unit == 0 {
                break;
            }
            units.push(unit);
        }
        Ok(String::from_utf16_lossy(&units))
    }
}

/// Decodes little-endian UCS-2, stopping at the first NUL.
pub fn ucs2_to_string(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(LittleEndian::read_u16)
        .take_while(|&c| c != 0)
        .collect();
    String::from_utf16_lossy(&units)
}

/// Counterpart of the reader used by tests and by callers re-assembling records.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn put_u16_with<E: ByteOrder>(&mut self, v: u16) -> &mut Self {
        let mut b = [0u8; 2];
        E::write_u16(&mut b, v);
        self.put_bytes(&b)
    }

    pub fn put_u32_with<E: ByteOrder>(&mut self, v: u32) -> &mut Self {
        let mut b = [0u8; 4];
        E::write_u32(&mut b, v);
        self.put_bytes(&b)
    }

    pub fn put_u64_with<E: ByteOrder>(&mut self, v: u64) -> &mut Self {
        let mut b = [0u8; 8];
        E::write_u64(&mut b, v);
        self.put_bytes(&b)
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        self.put_u16_with::<LittleEndian>(v)
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        self.put_u32_with::<LittleEndian>(v)
    }

    pub fn put_u64(&mut self, v: u64) -> &mut Self {
        self.put_u64_with::<LittleEndian>(v)
    }

    pub fn put_bytes(&mut self, b: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(b);
        self
    }

    pub fn put_ucs2(&mut self, s: &str, nul: bool) -> &mut Self {
        for unit in s.encode_utf16() {
            self.put_u16(unit);
        }
        if nul {
            self.put_u16(0);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::BigEndian;

    #[test]
    fn test_reads_advance_by_width() {
        let data = [1u8, 0, 2, 0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 4];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u16().unwrap(), 1);
        assert_eq!(r.position(), 2);
        assert_eq!(r.read_u32().unwrap(), 2);
        assert_eq!(r.read_u64().unwrap(), 3);
        assert_eq!(r.read_u8().unwrap(), 4);
        assert!(r.is_empty());
    }

    #[test]
    fn test_failed_read_leaves_state() {
        let data = [0xAAu8, 0xBB, 0xCC];
        let mut r = ByteReader::new(&data);
        r.read_u8().unwrap();
        match r.read_u32() {
            Err(Error::InsufficientBuffer { needed, remaining }) => {
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(r.position(), 1);
        assert_eq!(r.read_u16_with::<BigEndian>().unwrap(), 0xBBCC);
    }

    #[test]
    fn test_endianness_is_explicit() {
        let data = [0x12u8, 0x34, 0x56, 0x78];
        assert_eq!(
            ByteReader::new(&data).read_u32_with::<BigEndian>().unwrap(),
            0x12345678
        );
        assert_eq!(ByteReader::new(&data).read_u32().unwrap(), 0x78563412);
    }

    #[test]
    fn test_read_bytes_bounds() {
        let data = [0u8; 4];
        let mut r = ByteReader::new(&data);
        assert!(r.read_bytes(5).is_err());
        assert_eq!(r.read_bytes(4).unwrap().len(), 4);
        assert!(r.read_bytes(1).is_err());
        assert_eq!(r.read_bytes(0).unwrap().len(), 0);
    }

    #[test]
    fn test_ucs2_helpers() {
        let mut w = ByteWriter::new();
        w.put_ucs2("BootOrder", true).put_u8(0x7F);
        let bytes = w.into_vec();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.read_ucs2_cstr().unwrap(), "BootOrder");
        assert_eq!(r.read_u8().unwrap(), 0x7F);
        assert_eq!(ucs2_to_string(&bytes), "BootOrder");
    }
}
