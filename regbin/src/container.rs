// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The regbin image header and the image as a whole.
//!
//! Header layout, all integers big-endian:
//!
//! ```text
//! u32 image_size
//! u32 checksum
//! u32 format_version
//! u32 driver_format_version
//! u32 timestamp
//! u8  platform_type
//! u8  device_family
//! u8  reserved
//! u8  device_count
//! u8  device_ids[device_count]
//! u32 profile_count
//! u32 profile_byte_sizes[profile_count]
//! ```
//!
//! The profiles follow back to back, each exactly as long as its entry in
//! `profile_byte_sizes`.

use std::mem::size_of;

use log::debug;
use log::warn;
use serde::Serialize;
use static_assertions::const_assert_eq;
use zerocopy::byteorder::BigEndian;
use zerocopy::byteorder::U32;
use zerocopy::FromBytes;
use zerocopy::FromZeroes;

use crate::cursor::ByteCursor;
use crate::error::DecodeError;
use crate::error::ParseIssue;
use crate::error::Result;
use crate::profile::parse_profile;
use crate::profile::ConfigurationProfile;
use crate::settings::ParseSettings;

const HEADER_FIXED_SIZE: usize = 24;
/// A header with no devices and no profiles.
pub const MIN_HEADER_SIZE: usize = HEADER_FIXED_SIZE + size_of::<u32>();
const MAX_DEVICES: u8 = 8;

#[derive(FromZeroes, FromBytes)]
#[repr(C)]
struct RawHeader {
    image_size: U32<BigEndian>,
    checksum: U32<BigEndian>,
    format_version: U32<BigEndian>,
    driver_format_version: U32<BigEndian>,
    timestamp: U32<BigEndian>,
    platform_type: u8,
    device_family: u8,
    reserved: u8,
    device_count: u8,
}

const_assert_eq!(size_of::<RawHeader>(), HEADER_FIXED_SIZE);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerHeader {
    pub image_size: u32,
    /// Carried from the image but never checked.
    pub checksum: u32,
    pub format_version: u32,
    pub driver_format_version: u32,
    pub timestamp: u32,
    pub platform_type: u8,
    pub device_family: u8,
    pub device_count: u8,
    pub device_ids: Vec<u8>,
    /// Profile count declared by the image.
    pub profile_count: u32,
    pub profile_byte_sizes: Vec<u32>,
}

impl ContainerHeader {
    /// Encoded size of this header.
    pub fn header_size(&self) -> usize {
        MIN_HEADER_SIZE
            + self.device_ids.len()
            + self.profile_byte_sizes.len() * size_of::<u32>()
    }
}

/// A parsed regbin image. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Container {
    pub header: ContainerHeader,
    /// Profiles that could be parsed, in image order. Selection indexes are
    /// 1-based positions in this list.
    pub profiles: Vec<ConfigurationProfile>,
    issues: Vec<ParseIssue>,
}

impl Container {
    /// Parses a whole image.
    ///
    /// Header inconsistencies are fatal. Problems inside one profile are
    /// logged and recorded in `issues()`, and never prevent the other
    /// profiles from being parsed.
    pub fn parse(blob: &[u8], settings: &ParseSettings) -> Result<Self> {
        let truncated = |_| DecodeError::TruncatedHeader(blob.len());
        if blob.len() < MIN_HEADER_SIZE {
            return Err(DecodeError::TruncatedHeader(blob.len()));
        }

        let mut cursor = ByteCursor::new(blob);
        let raw: RawHeader = cursor.read().map_err(truncated)?;
        let image_size = raw.image_size.get();
        if image_size as usize != blob.len() {
            return Err(DecodeError::SizeMismatch {
                declared: image_size,
                actual: blob.len(),
            });
        }

        if raw.device_count > settings.max_devices.min(MAX_DEVICES) {
            return Err(DecodeError::TooManyDevices(raw.device_count));
        }
        let device_ids = cursor
            .read_bytes(raw.device_count.into())
            .map_err(truncated)?
            .to_vec();

        let profile_count = cursor.read_u32().map_err(truncated)?;
        if profile_count > settings.max_profiles {
            return Err(DecodeError::TooManyProfiles {
                count: profile_count,
                max: settings.max_profiles,
            });
        }
        let profile_byte_sizes = (0..profile_count)
            .map(|_| cursor.read_u32())
            .collect::<Result<Vec<_>>>()
            .map_err(truncated)?;

        let header_size = cursor.position();
        let profiles_size: u64 = profile_byte_sizes.iter().map(|&s| s as u64).sum();
        if (image_size as u64) - (header_size as u64) != profiles_size {
            return Err(DecodeError::TotalSizeMismatch {
                image: image_size,
                header: header_size,
                profiles: profiles_size,
            });
        }

        let header = ContainerHeader {
            image_size,
            checksum: raw.checksum.get(),
            format_version: raw.format_version.get(),
            driver_format_version: raw.driver_format_version.get(),
            timestamp: raw.timestamp.get(),
            platform_type: raw.platform_type,
            device_family: raw.device_family,
            device_count: raw.device_count,
            device_ids,
            profile_count,
            profile_byte_sizes,
        };

        let mut profiles = Vec::new();
        let mut issues = Vec::new();
        for (i, &size) in header.profile_byte_sizes.iter().enumerate() {
            let position = i + 1;
            let bytes = cursor.read_bytes(size as usize)?;
            match parse_profile(bytes, header.format_version, settings) {
                Ok(parsed) => {
                    issues.extend(parsed.issues.into_iter().map(|(block, error)| ParseIssue {
                        profile: position,
                        block,
                        error,
                    }));
                    profiles.push(parsed.profile);
                }
                Err(error) => issues.push(ParseIssue {
                    profile: position,
                    block: None,
                    error,
                }),
            }
        }

        for issue in &issues {
            match issue.block {
                Some(block) => warn!(
                    "regbin profile {} block {}: {}",
                    issue.profile, block, issue.error
                ),
                None => warn!("regbin profile {}: {}", issue.profile, issue.error),
            }
        }
        debug!(
            "regbin parsed: format {:#x}, {} devices, {}/{} profiles",
            header.format_version,
            header.device_count,
            profiles.len(),
            header.profile_count
        );

        Ok(Self {
            header,
            profiles,
            issues,
        })
    }

    /// Number of selectable profiles.
    pub fn profile_count(&self) -> usize {
        self.profiles.len()
    }

    /// Returns the profile at the 1-based `index`. 0 selects nothing.
    ///
    /// `index` is a position in `profiles`, not in the image: a profile that
    /// failed to parse takes no index, so `ParseIssue::profile` may differ.
    pub fn profile(&self, index: usize) -> Option<&ConfigurationProfile> {
        index.checked_sub(1).and_then(|i| self.profiles.get(i))
    }

    /// Returns the 1-based index of the first profile called `name`.
    pub fn profile_by_name(&self, name: &str) -> Option<usize> {
        self.profiles
            .iter()
            .position(|p| p.name.as_deref() == Some(name))
            .map(|i| i + 1)
    }

    /// Problems that were skipped over while parsing. `ParseIssue::profile`
    /// is the position of the profile in the image, which differs from its
    /// selection index once an earlier profile failed to parse.
    pub fn issues(&self) -> &[ParseIssue] {
        &self.issues
    }
}
