// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Window-system integration.
//!
//! A [`WindowSystem`] is the per-display collaborator that knows how the
//! display connection was made: it identifies the native connection, answers
//! "which drivers could serve this display" by talking to the windowing
//! protocol, fills the protocol-specific fields of the driver context, and
//! (for window systems that have windows) owns the drawable cache.
//!
//! The wire protocols themselves (DRI2/DRI3 and friends) are external
//! collaborators; this module only fixes their calling shape and fallback
//! ordering.

pub mod drm;

use std::ffi::c_void;

use crate::backend::CoreContext;
use crate::drawable::DrawableCache;
use crate::message::Messenger;
use crate::status::VaError;
use crate::status::VaResult;

/// One way of asking the windowing system for a driver name.
///
/// Probes either yield a non-empty ordered candidate list or fail cleanly so
/// the next probe gets its turn.
pub trait NameProbe: Send {
    /// Short name for diagnostics ("dri3", "dri2", ...).
    fn name(&self) -> &'static str;

    /// Runs the probe. An empty list counts as a clean failure.
    fn probe(&mut self) -> anyhow::Result<Vec<String>>;
}

/// An ordered sequence of probes, most modern protocol first.
pub struct ProbeChain {
    probes: Vec<Box<dyn NameProbe>>,
}

impl ProbeChain {
    pub fn new(probes: Vec<Box<dyn NameProbe>>) -> ProbeChain {
        ProbeChain { probes }
    }

    /// Runs the probes in order and returns the first non-empty candidate
    /// list. Fails with the unknown-driver status when every probe failed.
    pub fn run(&mut self, messenger: &Messenger) -> VaResult<Vec<String>> {
        for probe in &mut self.probes {
            match probe.probe() {
                Ok(candidates) if !candidates.is_empty() => {
                    messenger.info(&format!(
                        "{} probe found driver candidates: {}",
                        probe.name(),
                        candidates.join(", ")
                    ));
                    return Ok(candidates);
                }
                Ok(_) => {
                    messenger.info(&format!("{} probe found no driver", probe.name()));
                }
                Err(e) => {
                    messenger.info(&format!("{} probe failed: {:#}", probe.name(), e));
                }
            }
        }
        Err(VaError::Unknown)
    }
}

/// A display connection's window-system personality.
pub trait WindowSystem: Send {
    /// Identity of the native connection. Acquiring a display twice for the
    /// same value yields the same display handle. Zero is reserved for "no
    /// connection" and rejected at acquisition.
    fn native_handle(&self) -> usize;

    /// The display type constant reported to drivers.
    fn display_type(&self) -> u32;

    /// Queries the windowing protocol(s) for candidate driver names, most
    /// preferred first.
    fn driver_candidates(&mut self, messenger: &Messenger) -> VaResult<Vec<String>>;

    /// Fills the window-system fields of the driver context before driver
    /// init (native display pointer, protocol fd, ...).
    fn populate_core(&mut self, core: &mut CoreContext) {
        core.native_display = self.native_handle() as *mut c_void;
        core.display_type = self.display_type();
    }

    /// The drawable cache, for window systems that can present to windows.
    /// `None` means presentation entry points are unsupported on this
    /// display.
    fn drawables(&mut self) -> Option<&mut DrawableCache> {
        None
    }
}
