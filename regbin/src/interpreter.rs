// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Replays the blocks of a profile through a `RegisterAccess`.

use std::io;
use std::thread;
use std::time::Duration;

use log::debug;
use log::trace;
use log::warn;

use crate::block::DeviceTarget;
use crate::block::Phase;
use crate::container::Container;
use crate::directive::Directive;
use crate::directive::RegAddr;
use crate::error::RunError;

/// Register level access to the amps, supplied by the caller.
///
/// `channel` is never `DeviceTarget::Group`: groups are split into one call
/// per channel before they reach the implementation.
pub trait RegisterAccess {
    fn single_write(&mut self, channel: DeviceTarget, addr: RegAddr, value: u8) -> io::Result<()>;

    fn burst_write(&mut self, channel: DeviceTarget, addr: RegAddr, payload: &[u8])
        -> io::Result<()>;

    /// Read-modify-write of the bits of `mask`.
    fn masked_update(
        &mut self,
        channel: DeviceTarget,
        addr: RegAddr,
        mask: u8,
        value: u8,
    ) -> io::Result<()>;

    fn sleep_ms(&mut self, milliseconds: u16) {
        thread::sleep(Duration::from_millis(milliseconds.into()));
    }
}

/// What a `run` executed. Directives that addressed no existing channel
/// are not counted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub blocks: usize,
    pub directives: usize,
}

/// Splits a block target into the targets handed to `RegisterAccess`.
///
/// With a single amp, `All` is passed through untouched. Otherwise each
/// addressed channel below `device_count` gets its own call.
fn fan_out(target: DeviceTarget, device_count: u8) -> Vec<DeviceTarget> {
    if target == DeviceTarget::All && device_count <= 1 {
        return vec![DeviceTarget::All];
    }
    target
        .mask(device_count)
        .channels()
        .filter(|&ch| {
            if ch >= device_count {
                warn!(
                    "regbin: channel {} is out of range, image has {} devices",
                    ch, device_count
                );
            }
            ch < device_count
        })
        .map(DeviceTarget::Channel)
        .collect()
}

fn apply(regs: &mut dyn RegisterAccess, channel: DeviceTarget, d: &Directive) -> io::Result<()> {
    match d {
        Directive::SingleWrite { entries } => {
            for e in entries {
                trace!("{}: write {} = {:#04x}", channel, e.addr, e.value);
                regs.single_write(channel, e.addr, e.value)?;
            }
            Ok(())
        }
        Directive::BurstWrite { addr, payload } => {
            trace!("{}: burst {} x {} bytes", channel, addr, payload.len());
            regs.burst_write(channel, *addr, payload)
        }
        Directive::FieldWrite { mask, addr, value } => {
            trace!(
                "{}: update {} mask {:#04x} = {:#04x}",
                channel,
                addr,
                mask,
                value
            );
            regs.masked_update(channel, *addr, *mask, *value)
        }
        Directive::Delay { .. } | Directive::Unknown { .. } => Ok(()),
    }
}

/// Replays every block of profile `profile_index` (1-based) tagged `phase`,
/// in image order.
///
/// An index of 0 or past the last profile does nothing. Directives run
/// strictly in order and delays block the calling thread. The first register
/// failure stops the run; registers written before it keep their new values.
pub fn run(
    container: &Container,
    profile_index: usize,
    phase: Phase,
    regs: &mut dyn RegisterAccess,
) -> Result<RunReport, RunError> {
    let mut report = RunReport::default();
    let Some(profile) = container.profile(profile_index) else {
        debug!(
            "regbin: no profile {} of {}, skip {}",
            profile_index,
            container.profile_count(),
            phase
        );
        return Ok(report);
    };

    let device_count = container.header.device_count;
    for (block_index, block) in profile.blocks_for(phase) {
        debug!(
            "regbin: profile {} {} block {} on {}: {} directives",
            profile_index,
            phase,
            block_index,
            block.device_target,
            block.directives.len()
        );
        let channels = fan_out(block.device_target, device_count);
        for (directive_index, directive) in block.directives.iter().enumerate() {
            match directive {
                Directive::Delay { milliseconds } => {
                    trace!("sleep {} ms", milliseconds);
                    regs.sleep_ms(*milliseconds);
                }
                Directive::Unknown { tag } => {
                    warn!(
                        "regbin: profile {} block {} directive {}: skip unknown tag {}",
                        profile_index, block_index, directive_index, tag
                    );
                    continue;
                }
                _ if channels.is_empty() => continue,
                _ => {
                    for &channel in &channels {
                        apply(regs, channel, directive).map_err(|source| RunError {
                            profile_index,
                            phase,
                            block_index,
                            directive_index,
                            channel,
                            source,
                        })?;
                    }
                }
            }
            report.directives += 1;
        }
        report.blocks += 1;
    }
    Ok(report)
}
