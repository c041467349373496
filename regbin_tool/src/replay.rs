// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::io;

use anyhow::bail;
use clap::Args;
use regbin::run;
use regbin::DeviceTarget;
use regbin::Phase;
use regbin::RegAddr;
use regbin::RegisterAccess;

use crate::Command;
use crate::ImageArgs;

#[derive(Args)]
pub(crate) struct ReplayCommand {
    #[command(flatten)]
    image: ImageArgs,
    /// Profile to replay: a 1-based index or a profile name
    #[arg(long)]
    profile: String,
    /// One of coefficient, pre-power-up, post-power-up, pre-shutdown,
    /// post-shutdown
    #[arg(long)]
    phase: Phase,
}

/// Prints register operations instead of performing them.
struct PrintRegisters;

impl RegisterAccess for PrintRegisters {
    fn single_write(&mut self, channel: DeviceTarget, addr: RegAddr, value: u8) -> io::Result<()> {
        println!("{channel}: write {addr} = {value:#04x}");
        Ok(())
    }

    fn burst_write(
        &mut self,
        channel: DeviceTarget,
        addr: RegAddr,
        payload: &[u8],
    ) -> io::Result<()> {
        println!("{channel}: burst {addr} = {payload:02x?}");
        Ok(())
    }

    fn masked_update(
        &mut self,
        channel: DeviceTarget,
        addr: RegAddr,
        mask: u8,
        value: u8,
    ) -> io::Result<()> {
        println!("{channel}: update {addr} mask {mask:#04x} = {value:#04x}");
        Ok(())
    }

    fn sleep_ms(&mut self, milliseconds: u16) {
        println!("sleep {milliseconds} ms");
    }
}

impl Command for ReplayCommand {
    fn run(self) -> anyhow::Result<()> {
        let container = self.image.load()?;
        let index = match self.profile.parse::<usize>() {
            Ok(index) => index,
            Err(_) => match container.profile_by_name(&self.profile) {
                Some(index) => index,
                None => bail!("no profile named {:?}", self.profile),
            },
        };
        if container.profile(index).is_none() {
            bail!(
                "profile {} out of range, image has {}",
                index,
                container.profile_count()
            );
        }
        let report = run(&container, index, self.phase, &mut PrintRegisters)?;
        log::info!(
            "replayed {} blocks, {} directives",
            report.blocks,
            report.directives
        );
        Ok(())
    }
}
