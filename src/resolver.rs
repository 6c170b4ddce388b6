// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driver name resolution.
//!
//! Decides which driver names the loader should try for a display, in strict
//! precedence order: the environment/config override (never honored in a
//! privileged process), then the application-registered override, then
//! whatever the window system's protocol probes report. The resolver never
//! touches the filesystem; that is the loader's job.

use crate::message::Messenger;
use crate::settings::Settings;
use crate::settings::DRIVER_NAME_KEY;
use crate::status::VaError;
use crate::status::VaResult;
use crate::wsi::WindowSystem;

/// Driver identifiers an application may select through the override entry
/// point. Arbitrary names are rejected there; the override is a
/// convenience, not a way to load any library by name.
pub const KNOWN_DRIVERS: &[&str] = &[
    "iHD",
    "i965",
    "radeonsi",
    "r600",
    "nouveau",
    "vmwgfx",
    "virtio_gpu",
    "d3d12",
];

const MAX_OVERRIDE_LEN: usize = 255;

/// Checks an application-supplied driver-name override. Rejects empty or
/// oversized names and names outside [`KNOWN_DRIVERS`].
pub fn validate_override(name: &str) -> VaResult<()> {
    if name.is_empty() || name.len() > MAX_OVERRIDE_LEN {
        return Err(VaError::InvalidParameter);
    }
    if !KNOWN_DRIVERS.contains(&name) {
        return Err(VaError::InvalidParameter);
    }
    Ok(())
}

/// Produces the ordered driver-name candidate list for a display.
pub fn driver_candidates(
    settings: &Settings,
    override_name: Option<&str>,
    wsi: &mut dyn WindowSystem,
    messenger: &Messenger,
) -> VaResult<Vec<String>> {
    // `Settings` already refuses every lookup in a privileged process, which
    // is what keeps set-uid binaries from loading caller-named libraries.
    if let Some(name) = settings.get(DRIVER_NAME_KEY) {
        messenger.info(&format!(
            "user environment requested driver '{}'",
            name
        ));
        return Ok(vec![name.to_owned()]);
    }

    if let Some(name) = override_name {
        messenger.info(&format!("application requested driver '{}'", name));
        return Ok(vec![name.to_owned()]);
    }

    wsi.driver_candidates(messenger)
}
