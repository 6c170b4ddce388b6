// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Display handles and the process-wide display registry.
//!
//! [`Display`] is the opaque handle applications pass to every entry point.
//! Handles are validated against a registry of open displays on each call:
//! a handle is live exactly while its display is registered, and handle
//! values are never reused, so a stale copy fails validation instead of
//! aliasing a newer display.
//!
//! A single mutex guards the registry, held only for lookup, insert and
//! removal, never across a driver call, so a slow driver cannot stall
//! unrelated displays. Concurrent acquire/terminate on the same or different
//! native handles is safe.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::OnceLock;

use crate::loader::LoadedDriver;
use crate::message::Messenger;
use crate::status::VaError;
use crate::status::VaResult;
use crate::wsi::WindowSystem;

/// Opaque handle to an open display connection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Display {
    pub(crate) handle: u64,
}

/// Mutable driver-binding state of one display.
pub(crate) struct DriverSlot {
    /// Application-registered driver-name override, if any.
    pub override_name: Option<String>,
    /// The loaded driver, once `initialize` has succeeded.
    pub loaded: Option<LoadedDriver>,
}

/// Everything owned by one open display.
pub(crate) struct DisplayContext {
    pub handle: u64,
    /// Identity of the native connection; acquisition is idempotent on it.
    pub native: usize,
    pub wsi: Mutex<Box<dyn WindowSystem>>,
    pub messenger: Mutex<Messenger>,
    pub driver: Mutex<DriverSlot>,
}

impl DisplayContext {
    /// Runs `f` against the loaded driver under the driver lock. Reports the
    /// not-implemented status when no driver is bound, the state of a
    /// display whose `initialize` failed or never ran.
    pub fn with_driver<T>(&self, f: impl FnOnce(&mut LoadedDriver) -> VaResult<T>) -> VaResult<T> {
        let mut slot = self.driver.lock().unwrap();
        match slot.loaded.as_mut() {
            Some(driver) => f(driver),
            None => Err(VaError::Unimplemented),
        }
    }
}

struct Registry {
    next_handle: u64,
    contexts: HashMap<u64, Arc<DisplayContext>>,
}

fn registry() -> &'static Mutex<Registry> {
    static REGISTRY: OnceLock<Mutex<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        Mutex::new(Registry {
            next_handle: 1,
            contexts: HashMap::new(),
        })
    })
}

impl Display {
    /// Registers a display connection and returns its handle.
    ///
    /// Acquisition is idempotent: a second `open` for the same native
    /// connection returns the existing handle rather than a new display.
    /// Returns `None` for the reserved zero native handle.
    pub fn open(wsi: Box<dyn WindowSystem>) -> Option<Display> {
        let native = wsi.native_handle();
        if native == 0 {
            return None;
        }

        let mut registry = registry().lock().unwrap();

        if let Some(context) = registry.contexts.values().find(|c| c.native == native) {
            return Some(Display {
                handle: context.handle,
            });
        }

        let handle = registry.next_handle;
        registry.next_handle += 1;

        let context = Arc::new(DisplayContext {
            handle,
            native,
            wsi: Mutex::new(wsi),
            messenger: Mutex::new(Messenger::default()),
            driver: Mutex::new(DriverSlot {
                override_name: None,
                loaded: None,
            }),
        });
        registry.contexts.insert(handle, context);

        Some(Display { handle })
    }

    /// Whether this handle refers to a display that is currently open.
    pub fn is_valid(self) -> bool {
        registry().lock().unwrap().contexts.contains_key(&self.handle)
    }

    /// Resolves the handle, or reports the invalid-display status. Every
    /// entry point goes through this before anything else.
    pub(crate) fn context(self) -> VaResult<Arc<DisplayContext>> {
        registry()
            .lock()
            .unwrap()
            .contexts
            .get(&self.handle)
            .cloned()
            .ok_or(VaError::InvalidDisplay)
    }

    /// Removes the display from the registry. The context itself is freed
    /// once the last in-flight call holding it returns.
    pub(crate) fn unregister(self) {
        registry().lock().unwrap().contexts.remove(&self.handle);
    }
}
