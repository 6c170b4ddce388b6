// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! DRM render-node window system.
//!
//! The headless path: the display connection is a file descriptor to a DRM
//! device, the driver candidates are derived from the kernel driver bound to
//! that device, and there are no drawables; presentation entry points
//! report the capability error on such a display.

use std::ffi::c_int;
use std::fs::File;
use std::os::fd::AsRawFd;
use std::os::fd::RawFd;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;

use crate::backend::CoreContext;
use crate::backend::DISPLAY_DRM_RENDER_NODES;
use crate::message::Messenger;
use crate::status::VaResult;
use crate::wsi::NameProbe;
use crate::wsi::ProbeChain;
use crate::wsi::WindowSystem;

/// Kernel driver name to driver candidates, most preferred first. Matching is
/// by prefix; a kernel driver with no entry maps to a driver of the same
/// name.
const DRIVER_NAME_MAP: &[(&str, &[&str])] = &[
    ("i915", &["iHD", "i965"]),
    ("iris", &["iHD", "i965"]),
    ("amdgpu", &["radeonsi"]),
    ("radeon", &["r600", "radeonsi"]),
    ("nouveau", &["nouveau"]),
    ("vmwgfx", &["vmwgfx"]),
    ("virtio_gpu", &["virtio_gpu"]),
];

fn map_kernel_driver(kernel_name: &str) -> Vec<String> {
    for (key, candidates) in DRIVER_NAME_MAP {
        if kernel_name.starts_with(key) {
            return candidates.iter().map(|c| c.to_string()).collect();
        }
    }
    vec![kernel_name.to_string()]
}

/// Resolves the name of the kernel driver serving the DRM device behind `fd`
/// through sysfs.
fn kernel_driver_name(fd: RawFd) -> anyhow::Result<String> {
    // Duplicate the fd so the temporary `File` does not close the caller's.
    let owned = unsafe { std::os::fd::BorrowedFd::borrow_raw(fd) }
        .try_clone_to_owned()
        .context("duplicating DRM fd")?;
    let meta = File::from(owned)
        .metadata()
        .context("stat of DRM device")?;

    let rdev = meta.rdev();
    let sysfs = format!(
        "/sys/dev/char/{}:{}/device/driver",
        nix::sys::stat::major(rdev),
        nix::sys::stat::minor(rdev)
    );
    let target = std::fs::read_link(&sysfs).with_context(|| format!("readlink {}", sysfs))?;

    target
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_owned)
        .context("sysfs driver link has no name")
}

struct DrmKernelProbe {
    fd: RawFd,
}

impl NameProbe for DrmKernelProbe {
    fn name(&self) -> &'static str {
        "drm"
    }

    fn probe(&mut self) -> anyhow::Result<Vec<String>> {
        let kernel_name = kernel_driver_name(self.fd)?;
        Ok(map_kernel_driver(&kernel_name))
    }
}

/// A display connection backed by a DRM render node.
pub struct DrmWindowSystem {
    file: File,
    path: PathBuf,
}

impl DrmWindowSystem {
    /// Opens the device at `path` (typically `/dev/dri/renderD128`).
    pub fn open<P: AsRef<Path>>(path: P) -> anyhow::Result<DrmWindowSystem> {
        let path = path.as_ref();
        let file = File::options()
            .read(true)
            .write(true)
            .open(path)
            .with_context(|| format!("opening DRM device {}", path.display()))?;

        Ok(DrmWindowSystem {
            file,
            path: path.to_owned(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl WindowSystem for DrmWindowSystem {
    fn native_handle(&self) -> usize {
        self.file.as_raw_fd() as usize
    }

    fn display_type(&self) -> u32 {
        DISPLAY_DRM_RENDER_NODES
    }

    fn driver_candidates(&mut self, messenger: &Messenger) -> VaResult<Vec<String>> {
        let probe = DrmKernelProbe {
            fd: self.file.as_raw_fd(),
        };
        ProbeChain::new(vec![Box::new(probe)]).run(messenger)
    }

    fn populate_core(&mut self, core: &mut CoreContext) {
        core.native_display = std::ptr::null_mut();
        core.display_type = self.display_type();
        core.drm_fd = self.file.as_raw_fd() as c_int;
    }
}
