// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

#![allow(dead_code)]

use std::io;

use regbin::DeviceTarget;
use regbin::RegAddr;
use regbin::RegisterAccess;

pub fn single_write(entries: &[(u8, u8, u8, u8)]) -> Vec<u8> {
    let mut v = vec![0, 1];
    v.extend((entries.len() as u16).to_be_bytes());
    for &(book, page, reg, val) in entries {
        v.extend([book, page, reg, val]);
    }
    v
}

pub fn burst_write(book: u8, page: u8, reg: u8, payload: &[u8]) -> Vec<u8> {
    let mut v = vec![0, 2];
    v.extend((payload.len() as u16).to_be_bytes());
    v.extend([book, page, reg, 0]);
    v.extend(payload);
    v
}

pub fn delay(ms: u16) -> Vec<u8> {
    let mut v = vec![0, 3];
    v.extend(ms.to_be_bytes());
    v
}

pub fn field_write(mask: u8, book: u8, page: u8, reg: u8, value: u8) -> Vec<u8> {
    vec![0, 4, 0, mask, book, page, reg, value]
}

/// A block whose declared sizes match its directives.
pub fn block(target: u8, phase: u8, directives: &[Vec<u8>]) -> Vec<u8> {
    raw_block(target, phase, directives.len() as u32, &directives.concat())
}

pub fn raw_block(target: u8, phase: u8, count: u32, body: &[u8]) -> Vec<u8> {
    let mut v = vec![target, phase, 0, 0];
    v.extend((body.len() as u32).to_be_bytes());
    v.extend(count.to_be_bytes());
    v.extend(body);
    v
}

pub fn profile(name: Option<&str>, blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut v = Vec::new();
    if let Some(name) = name {
        let mut raw = [0u8; regbin::PROFILE_NAME_SIZE];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        v.extend(raw);
    }
    v.extend((blocks.len() as u32).to_be_bytes());
    v.extend(blocks.concat());
    v
}

pub const UNNAMED: u32 = 0x100;
pub const NAMED: u32 = 0x105;

pub fn image(format_version: u32, devices: &[u8], profiles: &[Vec<u8>]) -> Vec<u8> {
    let header_size = regbin::MIN_HEADER_SIZE + devices.len() + 4 * profiles.len();
    let size = header_size + profiles.iter().map(Vec::len).sum::<usize>();
    let mut v = Vec::new();
    v.extend((size as u32).to_be_bytes());
    v.extend(0u32.to_be_bytes());
    v.extend(format_version.to_be_bytes());
    v.extend(1u32.to_be_bytes());
    v.extend(0u32.to_be_bytes());
    v.extend([0, 0, 0, devices.len() as u8]);
    v.extend(devices);
    v.extend((profiles.len() as u32).to_be_bytes());
    for p in profiles {
        v.extend((p.len() as u32).to_be_bytes());
    }
    v.extend(profiles.concat());
    v
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(DeviceTarget, RegAddr, u8),
    Burst(DeviceTarget, RegAddr, Vec<u8>),
    Update(DeviceTarget, RegAddr, u8, u8),
    Sleep(u16),
}

/// Records every call. Register calls fail from the `fail_at`-th one on.
#[derive(Debug, Default)]
pub struct Recorder {
    pub ops: Vec<Op>,
    pub fail_at: Option<usize>,
    register_calls: usize,
}

impl Recorder {
    pub fn failing_at(call: usize) -> Self {
        Self {
            fail_at: Some(call),
            ..Default::default()
        }
    }

    fn register(&mut self, op: Op) -> io::Result<()> {
        let call = self.register_calls;
        self.register_calls += 1;
        if self.fail_at.is_some_and(|n| call >= n) {
            return Err(io::Error::new(io::ErrorKind::Other, "i2c nak"));
        }
        self.ops.push(op);
        Ok(())
    }
}

impl RegisterAccess for Recorder {
    fn single_write(&mut self, channel: DeviceTarget, addr: RegAddr, value: u8) -> io::Result<()> {
        self.register(Op::Write(channel, addr, value))
    }

    fn burst_write(
        &mut self,
        channel: DeviceTarget,
        addr: RegAddr,
        payload: &[u8],
    ) -> io::Result<()> {
        self.register(Op::Burst(channel, addr, payload.to_vec()))
    }

    fn masked_update(
        &mut self,
        channel: DeviceTarget,
        addr: RegAddr,
        mask: u8,
        value: u8,
    ) -> io::Result<()> {
        self.register(Op::Update(channel, addr, mask, value))
    }

    fn sleep_ms(&mut self, milliseconds: u16) {
        self.ops.push(Op::Sleep(milliseconds));
    }
}
