// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use log::info;
use log::warn;

use crate::block::Phase;
use crate::container::Container;
use crate::error::Result;
use crate::error::RunError;
use crate::interpreter::run;
use crate::interpreter::RegisterAccess;
use crate::interpreter::RunReport;
use crate::settings::ParseSettings;

/// `Firmware` holds the regbin image currently in use by one amp driver and
/// the profile selected for it.
///
/// The published `Container` is never modified: `load` swaps in a new one,
/// so a `run_phase` that already holds the old one finishes with it.
/// Callers must not run two phases against the same registers at once.
#[derive(Debug, Default)]
pub struct Firmware {
    settings: ParseSettings,
    current: RwLock<Option<Arc<Container>>>,
    /// 1-based, 0 for no profile.
    profile: AtomicUsize,
}

impl Firmware {
    pub fn new(settings: ParseSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    /// Parses `blob` and publishes it in place of the current image. On
    /// failure the current image stays in use.
    pub fn load(&self, blob: &[u8]) -> Result<Arc<Container>> {
        let container = match Container::parse(blob, &self.settings) {
            Ok(container) => Arc::new(container),
            Err(e) => {
                warn!("regbin: keep current image, failed to load new one: {}", e);
                return Err(e);
            }
        };
        info!(
            "regbin: loaded {} bytes, {} profiles, {} devices, {} issues",
            blob.len(),
            container.profile_count(),
            container.header.device_count,
            container.issues().len()
        );
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(container.clone());
        if previous.is_some() {
            info!("regbin: replaced previous image");
        }
        Ok(container)
    }

    /// Drops the current image, if any.
    pub fn unload(&self) {
        if self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some()
        {
            info!("regbin: unloaded image");
        }
    }

    pub fn container(&self) -> Option<Arc<Container>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Selects the profile used by `run_phase`. Any value is accepted; one
    /// that does not name a profile makes `run_phase` a no-op.
    pub fn set_profile(&self, index: usize) {
        self.profile.store(index, Ordering::Relaxed);
    }

    pub fn profile(&self) -> usize {
        self.profile.load(Ordering::Relaxed)
    }

    /// Selects the profile called `name` in the current image. Returns the
    /// selected index, or `None` if there is no such profile, in which case
    /// the selection is unchanged.
    pub fn select_profile_by_name(&self, name: &str) -> Option<usize> {
        let index = self.container()?.profile_by_name(name)?;
        self.set_profile(index);
        Some(index)
    }

    /// Replays `phase` of the selected profile of the current image.
    pub fn run_phase(
        &self,
        phase: Phase,
        regs: &mut dyn RegisterAccess,
    ) -> std::result::Result<RunReport, RunError> {
        match self.container() {
            Some(container) => run(&container, self.profile(), phase, regs),
            None => Ok(RunReport::default()),
        }
    }
}
