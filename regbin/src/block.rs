// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fmt;
use std::mem::size_of;
use std::str::FromStr;

use bitflags::bitflags;
use serde::Serialize;
use static_assertions::const_assert_eq;
use zerocopy::byteorder::BigEndian;
use zerocopy::byteorder::U16;
use zerocopy::byteorder::U32;
use zerocopy::FromBytes;
use zerocopy::FromZeroes;

use crate::cursor::ByteCursor;
use crate::directive::decode_one;
use crate::directive::Directive;
use crate::error::DecodeError;

/// Size of the fixed block sub-header that precedes the directive bytes.
pub const BLOCK_HEADER_SIZE: usize = 12;

/// The point of the amp power sequence at which a block is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    Coefficient = 1,
    PostPowerUp = 2,
    PreShutdown = 3,
    PrePowerUp = 4,
    PostShutdown = 5,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Coefficient,
        Phase::PostPowerUp,
        Phase::PreShutdown,
        Phase::PrePowerUp,
        Phase::PostShutdown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Coefficient => "coefficient",
            Phase::PostPowerUp => "post-power-up",
            Phase::PreShutdown => "pre-shutdown",
            Phase::PrePowerUp => "pre-power-up",
            Phase::PostShutdown => "post-shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<u8> for Phase {
    type Error = DecodeError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .into_iter()
            .find(|p| *p as u8 == raw)
            .ok_or(DecodeError::UnknownPhase(raw))
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.name() == s)
            .ok_or_else(|| format!("unknown phase {s:?}"))
    }
}

bitflags! {
    /// Set of amp channels, bit `n` standing for channel `n`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
    pub struct ChannelMask: u8 {
        const CH0 = 1 << 0;
        const CH1 = 1 << 1;
        const CH2 = 1 << 2;
        const CH3 = 1 << 3;
        const CH4 = 1 << 4;
        const CH5 = 1 << 5;
        const CH6 = 1 << 6;
        const CH7 = 1 << 7;
    }
}

impl ChannelMask {
    /// The mask of the first `count` channels.
    pub fn first(count: u8) -> Self {
        Self::from_bits_truncate(((1u16 << count.min(8)) - 1) as u8)
    }

    /// Channel indexes in ascending order.
    pub fn channels(self) -> impl Iterator<Item = u8> {
        (0..8).filter(move |ch| self.bits() & (1 << *ch) != 0)
    }
}

/// The channels a block addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceTarget {
    /// Every channel of the container.
    All,
    /// One channel, by index.
    Channel(u8),
    /// More than one channel, but not necessarily all of them.
    Group(ChannelMask),
}

impl DeviceTarget {
    /// Decodes the raw target byte: 0 is every channel, otherwise a one-hot
    /// channel mask.
    pub fn from_raw(raw: u8) -> Self {
        match raw.count_ones() {
            0 => DeviceTarget::All,
            1 => DeviceTarget::Channel(raw.trailing_zeros() as u8),
            _ => DeviceTarget::Group(ChannelMask::from_bits_retain(raw)),
        }
    }

    /// The channels addressed in a container with `device_count` devices.
    pub fn mask(self, device_count: u8) -> ChannelMask {
        match self {
            DeviceTarget::All => ChannelMask::first(device_count),
            DeviceTarget::Channel(ch) => {
                ChannelMask::from_bits_retain(1u8.checked_shl(ch.into()).unwrap_or(0))
            }
            DeviceTarget::Group(mask) => mask,
        }
    }
}

impl fmt::Display for DeviceTarget {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DeviceTarget::All => write!(f, "all channels"),
            DeviceTarget::Channel(ch) => write!(f, "channel {}", ch),
            DeviceTarget::Group(mask) => write!(f, "channels {:#04x}", mask.bits()),
        }
    }
}

#[derive(FromZeroes, FromBytes)]
#[repr(C)]
pub(crate) struct BlockHeader {
    pub device_target: u8,
    pub phase: u8,
    pub checksum: U16<BigEndian>,
    pub byte_size: U32<BigEndian>,
    pub directive_count: U32<BigEndian>,
}

const_assert_eq!(size_of::<BlockHeader>(), BLOCK_HEADER_SIZE);

/// One register programming sequence for one phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Block {
    pub device_target: DeviceTarget,
    pub phase: Phase,
    /// Carried from the image but never checked.
    pub expected_checksum: u16,
    pub declared_byte_size: u32,
    pub declared_directive_count: u32,
    pub directives: Vec<Directive>,
}

/// The result of parsing one block.
///
/// `advance` always comes from the declared block size, so the enclosing
/// profile stays aligned even when the directive stream is inconsistent.
#[derive(Debug)]
pub struct ParsedBlock {
    pub block: Result<Block, DecodeError>,
    /// Non-fatal problems found while decoding a usable block.
    pub issues: Vec<DecodeError>,
    pub advance: usize,
}

/// Parses the block at the start of `bytes`.
///
/// `bytes` should hold exactly the sub-header and the declared directive
/// bytes; anything past the declared size is left for the caller.
pub fn parse_block(bytes: &[u8]) -> ParsedBlock {
    let header: BlockHeader = match ByteCursor::new(bytes).read() {
        Ok(header) => header,
        Err(e) => {
            return ParsedBlock {
                block: Err(e),
                issues: Vec::new(),
                advance: bytes.len(),
            }
        }
    };
    let declared_byte_size = header.byte_size.get();
    let advance = BLOCK_HEADER_SIZE.saturating_add(declared_byte_size as usize);
    let fail = |e| ParsedBlock {
        block: Err(e),
        issues: Vec::new(),
        advance,
    };

    let phase = match Phase::try_from(header.phase) {
        Ok(phase) => phase,
        Err(e) => return fail(e),
    };
    let available = bytes.len() - BLOCK_HEADER_SIZE;
    if declared_byte_size as usize > available {
        return fail(DecodeError::Truncated {
            what: "block",
            needed: declared_byte_size as usize,
            available,
        });
    }

    let declared_directive_count = header.directive_count.get();
    let region = &bytes[BLOCK_HEADER_SIZE..advance];
    let mut cursor = ByteCursor::new(region);
    let mut directives = Vec::new();
    let mut issues = Vec::new();
    while (directives.len() as u64) < declared_directive_count as u64 && !cursor.is_empty() {
        let limit = cursor.remaining();
        match decode_one(&mut cursor, limit) {
            Ok((directive, _)) => directives.push(directive),
            Err(e) => {
                issues.push(e);
                break;
            }
        }
    }

    if issues.is_empty() {
        if directives.len() as u64 != declared_directive_count as u64 {
            issues.push(DecodeError::DirectiveCountMismatch {
                declared: declared_directive_count,
                decoded: directives.len() as u32,
            });
        }
        if cursor.position() != region.len() {
            issues.push(DecodeError::BlockSizeMismatch {
                declared: region.len(),
                consumed: cursor.position(),
            });
        }
    }

    ParsedBlock {
        block: Ok(Block {
            device_target: DeviceTarget::from_raw(header.device_target),
            phase,
            expected_checksum: header.checksum.get(),
            declared_byte_size,
            declared_directive_count,
            directives,
        }),
        issues,
        advance,
    }
}
