// Copyright 2025 Pushtx Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Binary serialization used by the chain for transactions.
//!
//! Integers are little-endian, lengths and some header fields use the
//! LEB128-style `varuint32` encoding.

use thiserror::Error;

/// Errors raised while decoding packed bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of input: needed {needed} bytes at offset {offset}")]
    UnexpectedEof { offset: usize, needed: usize },
    #[error("varuint32 at offset {0} overflows 32 bits")]
    VarintOverflow(usize),
    #[error("{0} trailing bytes after value")]
    TrailingBytes(usize),
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// Append-only byte sink for [`Pack`] implementations.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
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

    pub fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn write_varuint32(&mut self, v: u32) {
        let mut val = v as u64;
        loop {
            let mut b = (val & 0x7f) as u8;
            val >>= 7;
            if val > 0 {
                b |= 0x80;
            }
            self.buf.push(b);
            if val == 0 {
                break;
            }
        }
    }

    /// Writes raw bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over packed bytes for [`Unpack`] implementations.
#[derive(Debug)]
pub struct Decoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.data.len() - self.pos < n {
            return Err(DecodeError::UnexpectedEof {
                offset: self.pos,
                needed: n,
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        let mut arr = [0u8; 8];
        arr.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn read_varuint32(&mut self) -> Result<u32, DecodeError> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0;
        loop {
            let b = self.read_u8()?;
            value |= ((b & 0x7f) as u64) << shift;
            if b & 0x80 == 0 {
                break;
            }
            shift += 7;
            if shift >= 35 {
                return Err(DecodeError::VarintOverflow(start));
            }
        }
        u32::try_from(value).map_err(|_| DecodeError::VarintOverflow(start))
    }

    pub fn read_raw(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.data.len() - self.pos {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

/// Types with a canonical binary form.
pub trait Pack {
    fn pack(&self, enc: &mut Encoder);

    fn to_packed(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        self.pack(&mut enc);
        enc.finish()
    }
}

/// Inverse of [`Pack`].
pub trait Unpack: Sized {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError>;

    fn from_packed(data: &[u8]) -> Result<Self, DecodeError> {
        let mut dec = Decoder::new(data);
        let value = Self::unpack(&mut dec)?;
        dec.finish()?;
        Ok(value)
    }
}

impl Pack for u8 {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u8(*self)
    }
}

impl Unpack for u8 {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_u8()
    }
}

impl Pack for u16 {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u16(*self)
    }
}

impl Unpack for u16 {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_u16()
    }
}

impl Pack for u32 {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_u32(*self)
    }
}

impl Unpack for u32 {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        dec.read_u32()
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn pack(&self, enc: &mut Encoder) {
        enc.write_varuint32(self.len() as u32);
        for item in self {
            item.pack(enc);
        }
    }
}

impl<T: Unpack> Unpack for Vec<T> {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        let len = dec.read_varuint32()? as usize;
        // Cap the preallocation; a hostile length prefix fails on read instead.
        let mut out = Vec::with_capacity(len.min(1024));
        for _ in 0..len {
            out.push(T::unpack(dec)?);
        }
        Ok(out)
    }
}

impl<A: Pack, B: Pack> Pack for (A, B) {
    fn pack(&self, enc: &mut Encoder) {
        self.0.pack(enc);
        self.1.pack(enc);
    }
}

impl<A: Unpack, B: Unpack> Unpack for (A, B) {
    fn unpack(dec: &mut Decoder<'_>) -> Result<Self, DecodeError> {
        Ok((A::unpack(dec)?, B::unpack(dec)?))
    }
}
