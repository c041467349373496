// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! `regbin` parses the register programming images ("regbin") shipped for
//! smart amps and replays them through a caller supplied `RegisterAccess`.
//!
//! An image holds one or more profiles. Each profile is a list of blocks,
//! and each block is a sequence of register writes and delays to be run at
//! one `Phase` of the amp power sequence.
//!
//! ```no_run
//! # fn example(blob: &[u8], regs: &mut dyn regbin::RegisterAccess) -> anyhow::Result<()> {
//! use regbin::{Firmware, ParseSettings, Phase};
//!
//! let firmware = Firmware::new(ParseSettings::default());
//! firmware.load(blob)?;
//! firmware.select_profile_by_name("speaker");
//! firmware.run_phase(Phase::PrePowerUp, regs)?;
//! # Ok(())
//! # }
//! ```

mod block;
mod container;
mod cursor;
mod directive;
mod error;
mod firmware;
mod interpreter;
mod profile;
mod settings;

pub use block::parse_block;
pub use block::Block;
pub use block::ChannelMask;
pub use block::DeviceTarget;
pub use block::ParsedBlock;
pub use block::Phase;
pub use block::BLOCK_HEADER_SIZE;
pub use container::Container;
pub use container::ContainerHeader;
pub use container::MIN_HEADER_SIZE;
pub use cursor::ByteCursor;
pub use directive::decode_one;
pub use directive::Directive;
pub use directive::RegAddr;
pub use directive::RegWrite;
pub use error::DecodeError;
pub use error::ParseIssue;
pub use error::Result;
pub use error::RunError;
pub use error::SettingsError;
pub use firmware::Firmware;
pub use interpreter::run;
pub use interpreter::RegisterAccess;
pub use interpreter::RunReport;
pub use profile::parse_profile;
pub use profile::ConfigurationProfile;
pub use profile::ParsedProfile;
pub use profile::PROFILE_NAME_SIZE;
pub use settings::ParseSettings;
