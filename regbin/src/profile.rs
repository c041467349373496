// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use serde::Serialize;

use crate::block::parse_block;
use crate::block::Block;
use crate::block::BlockHeader;
use crate::block::ChannelMask;
use crate::block::Phase;
use crate::block::BLOCK_HEADER_SIZE;
use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::error::Result;
use crate::settings::ParseSettings;

/// Size of the name field of name-bearing formats.
pub const PROFILE_NAME_SIZE: usize = 64;

/// A named set of blocks, such as "speaker" or "receiver".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigurationProfile {
    pub name: Option<String>,
    pub declared_block_count: u32,
    /// Usable blocks in image order. Blocks that failed to parse are absent.
    pub blocks: Vec<Block>,
}

impl ConfigurationProfile {
    /// Blocks replayed at `phase`, with their index in `blocks`.
    pub fn blocks_for(&self, phase: Phase) -> impl Iterator<Item = (usize, &Block)> {
        self.blocks
            .iter()
            .enumerate()
            .filter(move |(_, b)| b.phase == phase)
    }

    /// Whether every declared block was parsed.
    pub fn is_complete(&self) -> bool {
        self.blocks.len() as u64 == self.declared_block_count as u64
    }

    /// Channels powered up by this profile, i.e. those addressed by its
    /// pre-power-up blocks.
    pub fn active_channels(&self, device_count: u8) -> ChannelMask {
        self.blocks_for(Phase::PrePowerUp)
            .fold(ChannelMask::empty(), |mask, (_, b)| {
                mask | b.device_target.mask(device_count)
            })
    }
}

/// A parsed profile with the problems found in it. Issues carry the index of
/// the block they concern, or `None` for the profile itself.
#[derive(Debug)]
pub struct ParsedProfile {
    pub profile: ConfigurationProfile,
    pub issues: Vec<(Option<usize>, DecodeError)>,
}

fn parse_name(raw: &[u8], issues: &mut Vec<(Option<usize>, DecodeError)>) -> String {
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    match std::str::from_utf8(&raw[..end]) {
        Ok(name) => name.to_owned(),
        Err(_) => {
            issues.push((None, DecodeError::NameNotUtf8));
            String::from_utf8_lossy(&raw[..end]).into_owned()
        }
    }
}

/// Parses one profile occupying exactly `bytes`.
///
/// Fails only if the profile preamble (name and block count) cannot be read.
/// Each block advances the cursor by its declared size, whatever its
/// directives decoded to; a block whose declared size overruns the profile
/// ends the profile.
pub fn parse_profile(
    bytes: &[u8],
    format_version: u32,
    settings: &ParseSettings,
) -> Result<ParsedProfile> {
    let mut cursor = ByteCursor::new(bytes);
    let mut issues = Vec::new();

    let name = if format_version >= settings.name_format_version {
        let raw = cursor.read_bytes(PROFILE_NAME_SIZE)?;
        Some(parse_name(raw, &mut issues))
    } else {
        None
    };
    let declared_block_count = cursor.read_u32()?;

    let mut blocks = Vec::new();
    for index in 0..declared_block_count as usize {
        let header: BlockHeader = match cursor.peek() {
            Ok(header) => header,
            Err(e) => {
                issues.push((Some(index), e));
                break;
            }
        };
        let size = BLOCK_HEADER_SIZE.saturating_add(header.byte_size.get() as usize);
        let rest = cursor.rest();
        let parsed = parse_block(&rest[..size.min(rest.len())]);

        issues.extend(parsed.issues.into_iter().map(|e| (Some(index), e)));
        match parsed.block {
            Ok(block) => blocks.push(block),
            Err(e) => issues.push((Some(index), e)),
        }
        if cursor.skip(parsed.advance).is_err() {
            break;
        }
    }

    if !cursor.is_empty() {
        issues.push((
            None,
            DecodeError::ProfileSizeMismatch {
                declared: bytes.len(),
                consumed: cursor.position(),
            },
        ));
    }

    Ok(ParsedProfile {
        profile: ConfigurationProfile {
            name,
            declared_block_count,
            blocks,
        },
        issues,
    })
}
