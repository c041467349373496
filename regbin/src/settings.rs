// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::SettingsError;

/// `ParseSettings` holds the format limits the parser applies. Every field
/// may be omitted from the yaml file.
///
/// ```yaml
/// name_format_version: 0x105
/// max_profiles: 64
/// max_devices: 8
/// ```
#[derive(Debug, PartialEq, Eq, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ParseSettings {
    /// Images whose `format_version` is at least this carry a 64-byte name
    /// at the start of each profile.
    pub name_format_version: u32,
    /// Upper bound on the header profile count.
    pub max_profiles: u32,
    /// Upper bound on the header device count. At most 8.
    pub max_devices: u8,
}

impl Default for ParseSettings {
    fn default() -> Self {
        Self {
            name_format_version: 0x105,
            max_profiles: 64,
            max_devices: 8,
        }
    }
}

impl ParseSettings {
    /// Creates a `ParseSettings` from a yaml str.
    pub fn from_yaml_str(conf: &str) -> Result<Self, SettingsError> {
        serde_yaml::from_str(conf)
            .map_err(|e| SettingsError::DeserializationFailed("ParseSettings".to_owned(), e))
    }

    /// Reads a `ParseSettings` from the yaml file at `path`.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let conf = fs::read_to_string(path)
            .map_err(|e| SettingsError::FileIOFailed(path.to_path_buf(), e))?;
        Self::from_yaml_str(&conf)
    }
}
