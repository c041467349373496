// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::io;
use std::path::PathBuf;

use remain::sorted;
use thiserror::Error as ThisError;

use crate::DeviceTarget;
use crate::Phase;

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Errors produced while decoding a regbin image.
#[sorted]
#[derive(Debug, ThisError, PartialEq, Eq, Clone)]
pub enum DecodeError {
    #[error("block declares {declared} bytes of directives but {consumed} were decoded")]
    BlockSizeMismatch { declared: usize, consumed: usize },
    #[error("block declares {declared} directives but {decoded} were decoded")]
    DirectiveCountMismatch { declared: u32, decoded: u32 },
    #[error("malformed directive: {0}")]
    Malformed(String),
    #[error("profile name is not valid utf-8")]
    NameNotUtf8,
    #[error("read of {wanted} bytes at offset {offset} overruns buffer ({remaining} left)")]
    OutOfBounds {
        offset: usize,
        wanted: usize,
        remaining: usize,
    },
    #[error("profile declares {declared} bytes but {consumed} were used by its blocks")]
    ProfileSizeMismatch { declared: usize, consumed: usize },
    #[error("image size {declared} does not match blob length {actual}")]
    SizeMismatch { declared: u32, actual: usize },
    #[error("too many devices: {0}")]
    TooManyDevices(u8),
    #[error("too many profiles: {count}, at most {max} supported")]
    TooManyProfiles { count: u32, max: u32 },
    #[error("header size {header} plus profile sizes {profiles} does not match image size {image}")]
    TotalSizeMismatch {
        image: u32,
        header: usize,
        profiles: u64,
    },
    #[error("{what}: needs {needed} bytes, only {available} available")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },
    #[error("header truncated: blob is {0} bytes")]
    TruncatedHeader(usize),
    #[error("unknown block phase {0}")]
    UnknownPhase(u8),
}

/// A non-fatal decode problem, located by 1-based profile index and
/// 0-based block index within that profile.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ParseIssue {
    pub profile: usize,
    pub block: Option<usize>,
    #[serde(serialize_with = "serialize_display")]
    pub error: DecodeError,
}

fn serialize_display<S: serde::Serializer>(
    error: &DecodeError,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

/// A register access failure while replaying a profile.
#[derive(Debug, ThisError)]
#[error(
    "profile {profile_index} phase {phase}: block {block_index} directive {directive_index} \
     on {channel} failed: {source}"
)]
pub struct RunError {
    pub profile_index: usize,
    pub phase: Phase,
    pub block_index: usize,
    pub directive_index: usize,
    pub channel: DeviceTarget,
    #[source]
    pub source: io::Error,
}

#[sorted]
#[derive(Debug, ThisError)]
pub enum SettingsError {
    #[error("failed to parse {0}: {1}")]
    DeserializationFailed(String, serde_yaml::Error),
    #[error("{0:?}: {1}")]
    FileIOFailed(PathBuf, io::Error),
}
