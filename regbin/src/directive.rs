// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Directive (sub-block) decoding.
//!
//! Every directive starts with two bytes:
//!
//! | offset | field             |
//! |--------|-------------------|
//! | 0      | device target     |
//! | 1      | directive tag     |
//!
//! followed by a tag-specific body:
//!
//! * `1` single write: `u16 n`, then `n` records of `book, page, register, value`.
//! * `2` burst write: `u16 len`, `book, page, register, reserved`, then `len` bytes.
//! * `3` delay: `u16` milliseconds.
//! * `4` field write: `reserved, mask, book, page, register, value`.

use std::fmt;

use serde::Serialize;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::error::Result;

const TAG_SINGLE_WRITE: u8 = 1;
const TAG_BURST_WRITE: u8 = 2;
const TAG_DELAY: u8 = 3;
const TAG_FIELD_WRITE: u8 = 4;

const DIRECTIVE_HEADER_SIZE: usize = 2;
const LENGTH_SIZE: usize = 2;
const RECORD_SIZE: usize = 4;
const FIELD_WRITE_BODY_SIZE: usize = 6;

/// Book/page/register address of one device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegAddr {
    pub book: u8,
    pub page: u8,
    pub register: u8,
}

impl RegAddr {
    pub fn new(book: u8, page: u8, register: u8) -> Self {
        Self {
            book,
            page,
            register,
        }
    }
}

impl fmt::Display for RegAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "book {:#04x} page {:#04x} reg {:#04x}",
            self.book, self.page, self.register
        )
    }
}

/// One entry of a single write directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegWrite {
    pub addr: RegAddr,
    pub value: u8,
}

/// A decoded register operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    SingleWrite { entries: Vec<RegWrite> },
    BurstWrite { addr: RegAddr, payload: Vec<u8> },
    Delay { milliseconds: u16 },
    FieldWrite { mask: u8, addr: RegAddr, value: u8 },
    /// A tag this decoder does not know. Only the two header bytes are
    /// consumed, so the body (if any) is decoded as the next directive.
    Unknown { tag: u8 },
}

impl Directive {
    pub fn kind(&self) -> &'static str {
        match self {
            Directive::SingleWrite { .. } => "single write",
            Directive::BurstWrite { .. } => "burst write",
            Directive::Delay { .. } => "delay",
            Directive::FieldWrite { .. } => "field write",
            Directive::Unknown { .. } => "unknown",
        }
    }
}

fn ensure(what: &'static str, needed: usize, available: usize) -> Result<()> {
    if needed > available {
        return Err(DecodeError::Truncated {
            what,
            needed,
            available,
        });
    }
    Ok(())
}

fn read_addr(c: &mut ByteCursor) -> Result<RegAddr> {
    let [book, page, register] = c.read_array()?;
    Ok(RegAddr::new(book, page, register))
}

/// Decodes the directive at the cursor.
///
/// `sublock_limit` is the number of bytes left in the enclosing block,
/// counted from the start of this directive. On success the cursor is moved
/// past the directive and the number of bytes consumed is returned with it.
/// On failure the cursor is left where it was.
pub fn decode_one(cursor: &mut ByteCursor, sublock_limit: usize) -> Result<(Directive, usize)> {
    let mut c = cursor.clone();
    let start = c.position();

    // The enclosing block decides which channels a directive addresses.
    let _device_target = c.read_u8()?;
    let tag = c.read_u8()?;

    let directive = match tag {
        TAG_SINGLE_WRITE => {
            let n = c.read_u16()? as usize;
            ensure(
                "single write",
                DIRECTIVE_HEADER_SIZE + LENGTH_SIZE + RECORD_SIZE * n,
                sublock_limit,
            )?;
            let entries = (0..n)
                .map(|_| -> Result<RegWrite> {
                    let addr = read_addr(&mut c)?;
                    let value = c.read_u8()?;
                    Ok(RegWrite { addr, value })
                })
                .collect::<Result<Vec<_>>>()?;
            Directive::SingleWrite { entries }
        }
        TAG_BURST_WRITE => {
            let len = c.read_u16()? as usize;
            ensure(
                "burst write",
                DIRECTIVE_HEADER_SIZE + LENGTH_SIZE + RECORD_SIZE + len,
                sublock_limit,
            )?;
            if len % RECORD_SIZE != 0 {
                return Err(DecodeError::Malformed(format!(
                    "burst write length {} is not a multiple of {}",
                    len, RECORD_SIZE
                )));
            }
            let addr = read_addr(&mut c)?;
            c.skip(1)?;
            let payload = c.read_bytes(len)?.to_vec();
            Directive::BurstWrite { addr, payload }
        }
        TAG_DELAY => Directive::Delay {
            milliseconds: c.read_u16()?,
        },
        TAG_FIELD_WRITE => {
            ensure(
                "field write",
                DIRECTIVE_HEADER_SIZE + FIELD_WRITE_BODY_SIZE,
                sublock_limit,
            )?;
            c.skip(1)?;
            let mask = c.read_u8()?;
            let addr = read_addr(&mut c)?;
            let value = c.read_u8()?;
            Directive::FieldWrite { mask, addr, value }
        }
        tag => Directive::Unknown { tag },
    };

    let consumed = c.position() - start;
    *cursor = c;
    Ok((directive, consumed))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn decode(bytes: &[u8]) -> Result<(Directive, usize)> {
        let mut c = ByteCursor::new(bytes);
        decode_one(&mut c, bytes.len())
    }

    #[test]
    fn single_write() {
        let bytes = [0, 1, 0, 2, 0x00, 0x01, 0x21, 0x40, 0x00, 0x02, 0x30, 0x7f];
        let (d, n) = decode(&bytes).unwrap();
        assert_eq!(n, bytes.len());
        assert_eq!(
            d,
            Directive::SingleWrite {
                entries: vec![
                    RegWrite {
                        addr: RegAddr::new(0, 1, 0x21),
                        value: 0x40
                    },
                    RegWrite {
                        addr: RegAddr::new(0, 2, 0x30),
                        value: 0x7f
                    },
                ]
            }
        );
    }

    #[test]
    fn single_write_beyond_limit() {
        let bytes = [0, 1, 0, 3, 0x00, 0x01, 0x21, 0x40];
        assert_matches!(
            decode(&bytes),
            Err(DecodeError::Truncated {
                what: "single write",
                needed: 16,
                available: 8
            })
        );
    }

    #[test]
    fn burst_write() {
        let bytes = [0, 2, 0, 4, 0x8c, 0x2c, 0x1c, 0xee, 1, 2, 3, 4];
        let (d, n) = decode(&bytes).unwrap();
        assert_eq!(n, 12);
        assert_eq!(
            d,
            Directive::BurstWrite {
                addr: RegAddr::new(0x8c, 0x2c, 0x1c),
                payload: vec![1, 2, 3, 4]
            }
        );
    }

    #[test]
    fn burst_write_length_not_multiple_of_four() {
        let bytes = [0, 2, 0, 6, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6];
        assert_matches!(decode(&bytes), Err(DecodeError::Malformed(_)));
    }

    #[test]
    fn burst_write_beyond_limit() {
        let bytes = [0, 2, 0, 8, 0, 0, 0, 0, 1, 2, 3, 4];
        assert_matches!(
            decode(&bytes),
            Err(DecodeError::Truncated {
                what: "burst write",
                needed: 16,
                available: 12
            })
        );
    }

    #[test]
    fn delay() {
        let (d, n) = decode(&[0, 3, 0x01, 0xf4]).unwrap();
        assert_eq!(d, Directive::Delay { milliseconds: 500 });
        assert_eq!(n, 4);
    }

    #[test]
    fn field_write() {
        let (d, n) = decode(&[0, 4, 0xff, 0x0c, 0, 0, 0x02, 0x08]).unwrap();
        assert_eq!(n, 8);
        assert_eq!(
            d,
            Directive::FieldWrite {
                mask: 0x0c,
                addr: RegAddr::new(0, 0, 0x02),
                value: 0x08
            }
        );
    }

    #[test]
    fn field_write_short() {
        assert_matches!(
            decode(&[0, 4, 0, 0x0c, 0, 0, 0x02]),
            Err(DecodeError::Truncated {
                what: "field write",
                ..
            })
        );
    }

    #[test]
    fn unknown_tag_consumes_header_only() {
        let bytes = [0, 9, 0, 3, 0, 20];
        let mut c = ByteCursor::new(&bytes);
        let (d, n) = decode_one(&mut c, bytes.len()).unwrap();
        assert_eq!(d, Directive::Unknown { tag: 9 });
        assert_eq!(n, 2);
        let limit = c.remaining();
        let (d, _) = decode_one(&mut c, limit).unwrap();
        assert_eq!(d, Directive::Delay { milliseconds: 20 });
    }

    #[test]
    fn failure_leaves_cursor_in_place() {
        let bytes = [0, 2, 0, 6, 0, 0, 0, 0, 1, 2, 3, 4, 5, 6];
        let mut c = ByteCursor::new(&bytes);
        assert!(decode_one(&mut c, bytes.len()).is_err());
        assert_eq!(c.position(), 0);
    }

    #[test]
    fn every_truncation_fails_cleanly() {
        let fixtures: [&[u8]; 4] = [
            &[0, 1, 0, 1, 0x00, 0x01, 0x21, 0x40],
            &[0, 2, 0, 4, 0, 0, 0, 0, 1, 2, 3, 4],
            &[0, 3, 0, 20],
            &[0, 4, 0, 0x0c, 0, 0, 0x02, 0x08],
        ];
        for fixture in fixtures {
            for end in 0..fixture.len() {
                let err = decode(&fixture[..end]).unwrap_err();
                assert_matches!(
                    err,
                    DecodeError::Truncated { .. } | DecodeError::OutOfBounds { .. },
                    "fixture {fixture:?} cut at {end}"
                );
            }
        }
    }

    #[test]
    fn decoding_is_deterministic() {
        let bytes = [0, 1, 0, 1, 0x00, 0x01, 0x21, 0x40];
        assert_eq!(decode(&bytes).unwrap(), decode(&bytes).unwrap());
    }
}
