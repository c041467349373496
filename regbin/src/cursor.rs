// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `ByteCursor` is a bounds-checked big-endian reader over an immutable buffer.
//! A read either returns the whole field and advances past it, or fails with
//! `DecodeError::OutOfBounds` and leaves the position untouched.

use std::mem::size_of;

use zerocopy::FromBytes;

use crate::error::DecodeError;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Offset of the next byte to be read.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// The unread part of the buffer.
    pub fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos..]
    }

    fn check(&self, wanted: usize) -> Result<()> {
        if wanted > self.remaining() {
            return Err(DecodeError::OutOfBounds {
                offset: self.pos,
                wanted,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        self.check(n)?;
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    /// Reads a fixed-layout record. `T` must be built from unaligned fields.
    pub fn read<T: FromBytes>(&mut self) -> Result<T> {
        self.check(size_of::<T>())?;
        let value = T::read_from_prefix(self.rest()).ok_or(DecodeError::OutOfBounds {
            offset: self.pos,
            wanted: size_of::<T>(),
            remaining: self.remaining(),
        })?;
        self.pos += size_of::<T>();
        Ok(value)
    }

    /// Reads a fixed-layout record without advancing.
    pub fn peek<T: FromBytes>(&self) -> Result<T> {
        self.clone().read()
    }

    pub fn skip(&mut self, n: usize) -> Result<()> {
        self.read_bytes(n).map(|_| ())
    }
}
