// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Driver loading.
//!
//! Given an ordered list of driver-name candidates, the loader walks the
//! colon-separated search path, opens the first matching shared object that
//! exports a compatible versioned init symbol, runs the driver's init and
//! validates the result. Failures are local to a candidate: a half-installed
//! or version-mismatched driver makes the search move on, never abort.
//! Multiple GPU vendors routinely coexist on one host.
//!
//! This module is the only place that touches the dynamic linker. Everything
//! above it works against the [`DriverOpener`] seam.

use std::ffi::c_void;
use std::path::Path;

use crate::backend::driver_init_symbol;
use crate::backend::validate_driver;
use crate::backend::CoreContext;
use crate::backend::DriverInit;
use crate::backend::VTable;
use crate::backend::VTableVpp;
use crate::message::Messenger;
use crate::settings::Settings;
use crate::settings::DRIVERS_PATH_KEY;
use crate::status::VaError;
use crate::status::VaResult;
use crate::wsi::WindowSystem;
use crate::VA_MAJOR_VERSION;
use crate::VA_MINOR_VERSION;

/// Compiled-in search path, used unless the settings override it.
pub const DEFAULT_DRIVERS_PATH: &str = "/usr/lib64/dri:/usr/lib/x86_64-linux-gnu/dri:/usr/lib/dri";

const DRIVER_SUFFIX: &str = "_drv_video.so";

/// Why a shared object could not be opened.
#[derive(Debug)]
pub enum OpenError {
    /// Nothing at that path. Silent: the search just moves on.
    NotFound,
    /// The file exists but is not loadable (bad format, missing dependency).
    /// Logged, then the search moves on.
    Failed(String),
}

/// An open driver shared object.
pub trait OpenedDriver: Send {
    /// Resolves the versioned init entry point, if this object exports one
    /// for `major`.`minor`.
    fn init_symbol(&self, major: u32, minor: u32) -> Option<DriverInit>;

    /// Resolves an arbitrary symbol, for the private-function escape hatch.
    fn symbol(&self, name: &str) -> Option<*const c_void>;
}

/// The dynamic-linker seam.
pub trait DriverOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn OpenedDriver>, OpenError>;
}

/// The production opener, backed by `dlopen`.
pub struct DlOpener;

impl DriverOpener for DlOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn OpenedDriver>, OpenError> {
        if !path.exists() {
            return Err(OpenError::NotFound);
        }

        // NODELETE matters: drivers may leave worker threads or signal
        // handlers pointing into their own code after a logical unload.
        let flags = libloading::os::unix::RTLD_NOW
            | libloading::os::unix::RTLD_GLOBAL
            | libc::RTLD_NODELETE;

        // SAFETY: loading a shared object runs its constructors; that is the
        // deal the caller signs up for by installing a driver.
        match unsafe { libloading::os::unix::Library::open(Some(path), flags) } {
            Ok(library) => Ok(Box::new(DlDriver { library })),
            Err(e) => Err(OpenError::Failed(e.to_string())),
        }
    }
}

struct DlDriver {
    library: libloading::os::unix::Library,
}

impl DlDriver {
    fn get<T>(&self, name: &str) -> Option<T>
    where
        T: Copy,
    {
        let symbol = format!("{}\0", name);
        // SAFETY: the caller picks T to match the symbol's actual type; for
        // the init entry point that type is fixed by the ABI.
        unsafe {
            self.library
                .get::<T>(symbol.as_bytes())
                .ok()
                .map(|sym| *sym)
        }
    }
}

impl OpenedDriver for DlDriver {
    fn init_symbol(&self, major: u32, minor: u32) -> Option<DriverInit> {
        self.get::<DriverInit>(&driver_init_symbol(major, minor))
    }

    fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.get::<*const c_void>(name)
    }
}

/// A successfully loaded and validated driver binding.
///
/// Owns the context and vtable allocations handed to the driver (at stable
/// addresses, hence the raw boxes) and the open library handle. Dropping it
/// frees the allocations and closes the handle; [`LoadedDriver::terminate`]
/// additionally runs the driver's own terminate entry first.
pub struct LoadedDriver {
    core: *mut CoreContext,
    vtable: *mut VTable,
    vtable_vpp: *mut VTableVpp,
    library: Box<dyn OpenedDriver>,
}

// SAFETY: the raw pointers are uniquely owned allocations only dereferenced
// while the caller holds the display's driver lock.
unsafe impl Send for LoadedDriver {}

impl LoadedDriver {
    fn new(library: Box<dyn OpenedDriver>, wsi: &mut dyn WindowSystem) -> LoadedDriver {
        let vtable = Box::into_raw(Box::<VTable>::default());
        let vtable_vpp = Box::into_raw(Box::<VTableVpp>::default());

        let mut core = Box::new(CoreContext::new(wsi.display_type()));
        wsi.populate_core(&mut core);
        core.vtable = vtable;
        core.vtable_vpp = vtable_vpp;

        LoadedDriver {
            core: Box::into_raw(core),
            vtable,
            vtable_vpp,
            library,
        }
    }

    pub fn core(&self) -> &CoreContext {
        // SAFETY: `core` is a live, uniquely owned allocation.
        unsafe { &*self.core }
    }

    /// The pointer passed to every driver entry.
    pub fn core_ptr(&mut self) -> *mut CoreContext {
        self.core
    }

    /// The driver's function table. Goes through the context pointer rather
    /// than our own allocation, in case the driver installed its own table.
    pub fn vtable(&self) -> VaResult<&VTable> {
        // SAFETY: points either at our allocation or at driver-owned storage
        // that lives as long as the library handle.
        unsafe { self.core().vtable.as_ref() }.ok_or(VaError::Unimplemented)
    }

    /// The video-post-processing table, same aliasing rules as [`vtable`].
    ///
    /// [`vtable`]: LoadedDriver::vtable
    pub fn vtable_vpp(&self) -> VaResult<&VTableVpp> {
        // SAFETY: see `vtable`.
        unsafe { self.core().vtable_vpp.as_ref() }.ok_or(VaError::Unimplemented)
    }

    pub fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.library.symbol(name)
    }

    /// Runs the driver's terminate entry, then tears the binding down.
    pub fn terminate(mut self) -> VaResult<()> {
        let terminate = self.vtable().ok().and_then(|vt| vt.terminate);
        match terminate {
            // SAFETY: entry validated at load time; context is live.
            Some(f) => unsafe { f(self.core_ptr()) }.check(),
            None => Ok(()),
        }
        // Drop closes the library and frees the allocations.
    }
}

impl Drop for LoadedDriver {
    fn drop(&mut self) {
        // SAFETY: these raw boxes were created in `new` and never freed
        // elsewhere; the library handle outlives them and is closed after.
        unsafe {
            drop(Box::from_raw(self.vtable));
            drop(Box::from_raw(self.vtable_vpp));
            drop(Box::from_raw(self.core));
        }
    }
}

/// Walks minor versions downward so several library generations can coexist
/// with drivers built against any of them.
fn find_init(library: &dyn OpenedDriver) -> Option<(DriverInit, u32)> {
    (0..=VA_MINOR_VERSION)
        .rev()
        .find_map(|minor| library.init_symbol(VA_MAJOR_VERSION, minor).map(|f| (f, minor)))
}

/// One driver-load attempt over a fixed search path.
pub struct Loader<'a> {
    opener: &'a dyn DriverOpener,
    search_path: String,
}

impl<'a> Loader<'a> {
    pub fn new(settings: &Settings, opener: &'a dyn DriverOpener) -> Loader<'a> {
        Loader {
            opener,
            search_path: settings
                .get(DRIVERS_PATH_KEY)
                .unwrap_or(DEFAULT_DRIVERS_PATH)
                .to_owned(),
        }
    }

    /// Tries every candidate in order and returns the first driver that
    /// loads and validates. Fails with the unknown-driver status when none
    /// does.
    pub fn load(
        &self,
        candidates: &[String],
        wsi: &mut dyn WindowSystem,
        messenger: &Messenger,
    ) -> VaResult<LoadedDriver> {
        let mut result = Err(VaError::Unknown);
        for name in candidates {
            match self.load_one(name, wsi, messenger) {
                Ok(driver) => return Ok(driver),
                Err(e) => {
                    messenger.info(&format!("driver '{}' did not load: {}", name, e));
                    result = Err(e);
                }
            }
        }
        result
    }

    fn load_one(
        &self,
        name: &str,
        wsi: &mut dyn WindowSystem,
        messenger: &Messenger,
    ) -> VaResult<LoadedDriver> {
        let mut result = Err(VaError::Unknown);

        for dir in self.search_path.split(':').filter(|d| !d.is_empty()) {
            let path = Path::new(dir).join(format!("{}{}", name, DRIVER_SUFFIX));
            messenger.info(&format!("trying to open {}", path.display()));

            let library = match self.opener.open(&path) {
                Ok(library) => library,
                Err(OpenError::NotFound) => continue,
                Err(OpenError::Failed(e)) => {
                    messenger.error(&format!("opening {} failed: {}", path.display(), e));
                    continue;
                }
            };

            let Some((init, minor)) = find_init(library.as_ref()) else {
                messenger.error(&format!(
                    "{} exports no {} entry point for any compatible minor version",
                    path.display(),
                    driver_init_symbol(VA_MAJOR_VERSION, VA_MINOR_VERSION),
                ));
                continue;
            };
            messenger.info(&format!(
                "found init function {}",
                driver_init_symbol(VA_MAJOR_VERSION, minor)
            ));

            match self.init_driver(library, init, wsi, messenger) {
                Ok(driver) => return Ok(driver),
                Err(e) => {
                    messenger.error(&format!("{} init failed", path.display()));
                    result = Err(e);
                }
            }
        }

        result
    }

    fn init_driver(
        &self,
        library: Box<dyn OpenedDriver>,
        init: DriverInit,
        wsi: &mut dyn WindowSystem,
        messenger: &Messenger,
    ) -> VaResult<LoadedDriver> {
        let mut driver = LoadedDriver::new(library, wsi);

        // SAFETY: the init symbol has the ABI-mandated type and receives a
        // context that outlives it. A failing candidate is dropped whole, so
        // nothing it half-filled survives.
        unsafe { init(driver.core_ptr()) }.check()?;

        validate_driver(driver.core(), driver.vtable()?, messenger)?;

        Ok(driver)
    }
}
