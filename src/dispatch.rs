// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The public entry points.
//!
//! Every method follows the same pattern: validate the display handle first
//! (an invalid handle short-circuits before anything else), resolve the
//! loaded driver, then forward through the matching vtable entry and return
//! the driver's status verbatim. The only statuses synthesized here are
//! invalid-display, not-implemented (for absent optional entries or an
//! uninitialized display) and attribute-not-supported (when attributes are
//! requested from a driver that predates them).

use std::ffi::c_int;
use std::ffi::c_void;
use std::ffi::CStr;

use crate::backend::ConfigAttrib;
use crate::backend::DisplayAttribute;
use crate::backend::Image;
use crate::backend::ImageFormat;
use crate::backend::ProcessingRateParameter;
use crate::backend::SurfaceAttrib;
use crate::backend::SurfaceStatus;
use crate::display::Display;
use crate::loader::DlOpener;
use crate::loader::DriverOpener;
use crate::loader::Loader;
use crate::message::MessageCallback;
use crate::resolver;
use crate::settings::Settings;
use crate::status::VaError;
use crate::status::VaResult;
use crate::BufferId;
use crate::ConfigId;
use crate::ContextId;
use crate::DrawableId;
use crate::Entrypoint;
use crate::ImageId;
use crate::Profile;
use crate::Rectangle;
use crate::SubpictureId;
use crate::SurfaceId;
use crate::VA_MAJOR_VERSION;
use crate::VA_MINOR_VERSION;

impl Display {
    /// Resolves and loads the driver serving this display.
    ///
    /// On success returns the library's compiled major/minor version. The
    /// caller must check this result before issuing any other call: a
    /// display whose initialization failed stays open (until
    /// [`Display::terminate`]) but has no driver bound, and every dispatch
    /// call on it reports the not-implemented status.
    pub fn initialize(&self) -> VaResult<(u32, u32)> {
        self.initialize_with(&Settings::from_system(), &DlOpener)
    }

    pub(crate) fn initialize_with(
        &self,
        settings: &Settings,
        opener: &dyn DriverOpener,
    ) -> VaResult<(u32, u32)> {
        let ctx = self.context()?;

        let mut messenger = ctx.messenger.lock().unwrap();
        messenger.set_level(settings.messaging_level());
        messenger.info(&format!(
            "va-dispatch {}.{}",
            VA_MAJOR_VERSION, VA_MINOR_VERSION
        ));

        let mut wsi = ctx.wsi.lock().unwrap();
        let override_name = ctx.driver.lock().unwrap().override_name.clone();

        let candidates = resolver::driver_candidates(
            settings,
            override_name.as_deref(),
            wsi.as_mut(),
            &messenger,
        )?;

        let loader = Loader::new(settings, opener);
        let loaded = loader.load(&candidates, wsi.as_mut(), &messenger)?;

        ctx.driver.lock().unwrap().loaded = Some(loaded);

        Ok((VA_MAJOR_VERSION, VA_MINOR_VERSION))
    }

    /// Shuts the display down: runs the driver's terminate entry, closes the
    /// driver library, and unregisters the handle. After a successful
    /// terminate every further call on this handle (and on any copy of it)
    /// reports the invalid-display status.
    pub fn terminate(self) -> VaResult<()> {
        let ctx = self.context()?;

        let loaded = ctx.driver.lock().unwrap().loaded.take();
        let status = match loaded {
            Some(driver) => driver.terminate(),
            None => Ok(()),
        };

        if status.is_ok() {
            // Window-system teardown: drop every cached drawable binding.
            if let Some(cache) = ctx.wsi.lock().unwrap().drawables() {
                cache.clear();
            }
            self.unregister();
        }
        status
    }

    /// Registers a driver-name override consulted at the next `initialize`.
    /// The name must be one of the known driver identifiers.
    pub fn set_driver_name(&self, name: &str) -> VaResult<()> {
        let ctx = self.context()?;

        if let Err(e) = resolver::validate_override(name) {
            ctx.messenger
                .lock()
                .unwrap()
                .error(&format!("set_driver_name('{}') rejected: {}", name, e));
            return Err(e);
        }

        ctx.driver.lock().unwrap().override_name = Some(name.to_owned());
        Ok(())
    }

    /// Replaces the error-message hook. `None` disables error messages.
    pub fn set_error_callback(&self, cb: Option<MessageCallback>) -> Option<MessageCallback> {
        match self.context() {
            Ok(ctx) => ctx.messenger.lock().unwrap().set_error_hook(cb),
            Err(_) => None,
        }
    }

    /// Replaces the info-message hook. `None` disables info messages.
    pub fn set_info_callback(&self, cb: Option<MessageCallback>) -> Option<MessageCallback> {
        match self.context() {
            Ok(ctx) => ctx.messenger.lock().unwrap().set_info_hook(cb),
            Err(_) => None,
        }
    }

    /// The loaded driver's vendor string, `None` while no driver is bound.
    pub fn vendor_string(&self) -> Option<String> {
        let ctx = self.context().ok()?;
        let slot = ctx.driver.lock().unwrap();
        let driver = slot.loaded.as_ref()?;

        let vendor = driver.core().str_vendor;
        if vendor.is_null() {
            return None;
        }
        // SAFETY: validated non-null at load time; the string is owned by
        // the driver, which stays loaded while we hold the driver lock.
        Some(
            unsafe { CStr::from_ptr(vendor) }
                .to_string_lossy()
                .into_owned(),
        )
    }

    fn capability_maximum(&self, f: impl Fn(&crate::backend::CoreContext) -> c_int) -> usize {
        self.context()
            .ok()
            .and_then(|ctx| {
                let slot = ctx.driver.lock().unwrap();
                slot.loaded.as_ref().map(|driver| f(driver.core()) as usize)
            })
            .unwrap_or(0)
    }

    /// Maximum number of profiles the driver can report; 0 while no driver
    /// is bound (a plain read, not an error).
    pub fn max_num_profiles(&self) -> usize {
        self.capability_maximum(|core| core.max_profiles)
    }

    pub fn max_num_entrypoints(&self) -> usize {
        self.capability_maximum(|core| core.max_entrypoints)
    }

    pub fn max_num_config_attributes(&self) -> usize {
        self.capability_maximum(|core| core.max_attributes)
    }

    /// Resolves a private symbol from the loaded driver library.
    pub fn lib_func(&self, name: &str) -> Option<*const c_void> {
        let ctx = self.context().ok()?;
        let slot = ctx.driver.lock().unwrap();
        slot.loaded.as_ref()?.symbol(name)
    }

    pub fn query_config_profiles(&self) -> VaResult<Vec<Profile>> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_config_profiles
                .ok_or(VaError::Unimplemented)?;

            let mut num = driver.core().max_profiles;
            let mut profiles = Vec::with_capacity(num as usize);
            // SAFETY: the vector's capacity bounds what the driver may
            // write; it reports the count actually written.
            unsafe {
                f(driver.core_ptr(), profiles.as_mut_ptr(), &mut num).check()?;
                profiles.set_len(num as usize);
            }
            Ok(profiles)
        })
    }

    pub fn query_config_entrypoints(&self, profile: Profile) -> VaResult<Vec<Entrypoint>> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_config_entrypoints
                .ok_or(VaError::Unimplemented)?;

            let mut num = driver.core().max_entrypoints;
            let mut entrypoints = Vec::with_capacity(num as usize);
            // SAFETY: as in `query_config_profiles`.
            unsafe {
                f(driver.core_ptr(), profile, entrypoints.as_mut_ptr(), &mut num).check()?;
                entrypoints.set_len(num as usize);
            }
            Ok(entrypoints)
        })
    }

    /// Fills in the `value` of each listed attribute for the given
    /// profile/entrypoint pair.
    pub fn get_config_attributes(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
        attribs: &mut [ConfigAttrib],
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .get_config_attributes
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: the slice length bounds the driver's writes.
            unsafe {
                f(
                    driver.core_ptr(),
                    profile,
                    entrypoint,
                    attribs.as_mut_ptr(),
                    attribs.len() as c_int,
                )
                .check()
            }
        })
    }

    pub fn create_config(
        &self,
        profile: Profile,
        entrypoint: Entrypoint,
        attribs: &[ConfigAttrib],
    ) -> VaResult<ConfigId> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.create_config.ok_or(VaError::Unimplemented)?;
            let mut config_id = ConfigId::default();
            // SAFETY: out-pointer to a local; attribute list is read-only.
            unsafe {
                f(
                    driver.core_ptr(),
                    profile,
                    entrypoint,
                    attribs.as_ptr(),
                    attribs.len() as c_int,
                    &mut config_id,
                )
                .check()?;
            }
            Ok(config_id)
        })
    }

    pub fn destroy_config(&self, config: ConfigId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.destroy_config.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), config).check() }
        })
    }

    /// Returns the profile, entrypoint and attributes `config` was created
    /// with.
    pub fn query_config_attributes(
        &self,
        config: ConfigId,
    ) -> VaResult<(Profile, Entrypoint, Vec<ConfigAttrib>)> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_config_attributes
                .ok_or(VaError::Unimplemented)?;

            let mut profile = Profile::default();
            let mut entrypoint = Entrypoint::default();
            let mut num = 0;
            let mut attribs = Vec::with_capacity(driver.core().max_attributes as usize);
            // SAFETY: capacity bounds the driver's writes; count comes back
            // through `num`.
            unsafe {
                f(
                    driver.core_ptr(),
                    config,
                    &mut profile,
                    &mut entrypoint,
                    attribs.as_mut_ptr(),
                    &mut num,
                )
                .check()?;
                attribs.set_len(num as usize);
            }
            Ok((profile, entrypoint, attribs))
        })
    }

    /// Creates `num_surfaces` surfaces of the given geometry and format.
    ///
    /// When `attribs` is non-empty the driver must offer the modern
    /// surface-creation entry; requesting attributes from a driver without
    /// it reports the attribute-not-supported status rather than silently
    /// dropping them. The legacy entry takes the format ahead of the
    /// geometry, so forwarding to it reorders the arguments.
    pub fn create_surfaces(
        &self,
        width: u32,
        height: u32,
        format: u32,
        num_surfaces: u32,
        attribs: &[SurfaceAttrib],
    ) -> VaResult<Vec<SurfaceId>> {
        self.context()?.with_driver(|driver| {
            let vtable = driver.vtable()?;
            let mut surfaces = vec![SurfaceId::default(); num_surfaces as usize];

            if let Some(f) = vtable.create_surfaces2 {
                // SAFETY: surface buffer sized to `num_surfaces`.
                unsafe {
                    f(
                        driver.core_ptr(),
                        width,
                        height,
                        format,
                        surfaces.as_mut_ptr(),
                        num_surfaces,
                        attribs.as_ptr(),
                        attribs.len() as u32,
                    )
                    .check()?;
                }
            } else if !attribs.is_empty() {
                return Err(VaError::AttrNotSupported);
            } else {
                let f = vtable.create_surfaces.ok_or(VaError::Unimplemented)?;
                // SAFETY: as above; note the format-first legacy order.
                unsafe {
                    f(
                        driver.core_ptr(),
                        format as c_int,
                        width as c_int,
                        height as c_int,
                        num_surfaces as c_int,
                        surfaces.as_mut_ptr(),
                    )
                    .check()?;
                }
            }
            Ok(surfaces)
        })
    }

    pub fn destroy_surfaces(&self, surfaces: &[SurfaceId]) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .destroy_surfaces
                .ok_or(VaError::Unimplemented)?;
            // The ABI takes a mutable list; hand the driver its own copy.
            let mut list = surfaces.to_vec();
            // SAFETY: list outlives the call.
            unsafe { f(driver.core_ptr(), list.as_mut_ptr(), list.len() as c_int).check() }
        })
    }

    pub fn create_context(
        &self,
        config: ConfigId,
        picture_width: i32,
        picture_height: i32,
        flag: i32,
        render_targets: &[SurfaceId],
    ) -> VaResult<ContextId> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.create_context.ok_or(VaError::Unimplemented)?;
            let mut context = ContextId::default();
            let mut targets = render_targets.to_vec();
            // SAFETY: target list and out-pointer outlive the call.
            unsafe {
                f(
                    driver.core_ptr(),
                    config,
                    picture_width,
                    picture_height,
                    flag,
                    targets.as_mut_ptr(),
                    targets.len() as c_int,
                    &mut context,
                )
                .check()?;
            }
            Ok(context)
        })
    }

    pub fn destroy_context(&self, context: ContextId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.destroy_context.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), context).check() }
        })
    }

    /// Creates a buffer of `num_elements` elements of `size` bytes,
    /// optionally seeded with `data`.
    pub fn create_buffer(
        &self,
        context: ContextId,
        buffer_type: i32,
        size: u32,
        num_elements: u32,
        data: Option<&[u8]>,
    ) -> VaResult<BufferId> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.create_buffer.ok_or(VaError::Unimplemented)?;
            let mut buffer = BufferId::default();
            let data_ptr = data
                .map(|d| d.as_ptr() as *const c_void)
                .unwrap_or(std::ptr::null());
            // SAFETY: the driver copies `data` during the call, if present.
            unsafe {
                f(
                    driver.core_ptr(),
                    context,
                    buffer_type,
                    size,
                    num_elements,
                    data_ptr,
                    &mut buffer,
                )
                .check()?;
            }
            Ok(buffer)
        })
    }

    pub fn buffer_set_num_elements(&self, buffer: BufferId, num_elements: u32) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .buffer_set_num_elements
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), buffer, num_elements).check() }
        })
    }

    /// Maps `buffer` into the caller's address space. The pointer stays
    /// valid until [`Display::unmap_buffer`]; its layout is whatever the
    /// buffer type says it is.
    pub fn map_buffer(&self, buffer: BufferId) -> VaResult<*mut c_void> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.map_buffer.ok_or(VaError::Unimplemented)?;
            let mut ptr = std::ptr::null_mut();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), buffer, &mut ptr).check()?;
            }
            Ok(ptr)
        })
    }

    pub fn unmap_buffer(&self, buffer: BufferId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.unmap_buffer.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), buffer).check() }
        })
    }

    pub fn destroy_buffer(&self, buffer: BufferId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.destroy_buffer.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), buffer).check() }
        })
    }

    /// Returns `(type, size, num_elements)` of a buffer. Optional entry.
    pub fn buffer_info(&self, buffer: BufferId) -> VaResult<(i32, u32, u32)> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.buffer_info.ok_or(VaError::Unimplemented)?;
            let (mut type_, mut size, mut num) = (0, 0, 0);
            // SAFETY: out-pointers to locals.
            unsafe {
                f(driver.core_ptr(), buffer, &mut type_, &mut size, &mut num).check()?;
            }
            Ok((type_, size, num))
        })
    }

    pub fn begin_picture(&self, context: ContextId, render_target: SurfaceId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.begin_picture.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), context, render_target).check() }
        })
    }

    pub fn render_picture(&self, context: ContextId, buffers: &[BufferId]) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.render_picture.ok_or(VaError::Unimplemented)?;
            // SAFETY: buffer list is read-only and outlives the call.
            unsafe {
                f(
                    driver.core_ptr(),
                    context,
                    buffers.as_ptr(),
                    buffers.len() as c_int,
                )
                .check()
            }
        })
    }

    pub fn end_picture(&self, context: ContextId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.end_picture.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), context).check() }
        })
    }

    /// Blocks until all pending operations on `surface` complete. The wait
    /// itself happens in the driver.
    pub fn sync_surface(&self, surface: SurfaceId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.sync_surface.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), surface).check() }
        })
    }

    /// Like [`Display::sync_surface`] with a timeout. Optional entry.
    pub fn sync_surface2(&self, surface: SurfaceId, timeout_ns: u64) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.sync_surface2.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), surface, timeout_ns).check() }
        })
    }

    /// Blocks until operations writing `buffer` complete. Optional entry.
    pub fn sync_buffer(&self, buffer: BufferId, timeout_ns: u64) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.sync_buffer.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), buffer, timeout_ns).check() }
        })
    }

    pub fn query_surface_status(&self, surface: SurfaceId) -> VaResult<SurfaceStatus> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_surface_status
                .ok_or(VaError::Unimplemented)?;
            let mut status = SurfaceStatus::default();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), surface, &mut status).check()?;
            }
            Ok(status)
        })
    }

    /// Retrieves details of the error a previous call reported for
    /// `surface`. The returned pointer is driver-owned and valid until the
    /// next call on this display. Optional entry.
    pub fn query_surface_error(
        &self,
        surface: SurfaceId,
        error_status: VaError,
    ) -> VaResult<*mut c_void> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_surface_error
                .ok_or(VaError::Unimplemented)?;
            let mut info = std::ptr::null_mut();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), surface, error_status.into(), &mut info).check()?;
            }
            Ok(info)
        })
    }

    /// Lists the surface attributes configurable for `config`, writing them
    /// into `attribs` and returning the count. Optional entry.
    pub fn query_surface_attributes(
        &self,
        config: ConfigId,
        attribs: &mut [SurfaceAttrib],
    ) -> VaResult<usize> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_surface_attributes
                .ok_or(VaError::Unimplemented)?;
            let mut num = attribs.len() as u32;
            // SAFETY: `num` carries the slice length in, the written count
            // out.
            unsafe {
                f(driver.core_ptr(), config, attribs.as_mut_ptr(), &mut num).check()?;
            }
            Ok(num as usize)
        })
    }

    pub fn query_image_formats(&self) -> VaResult<Vec<ImageFormat>> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_image_formats
                .ok_or(VaError::Unimplemented)?;

            let mut num = driver.core().max_image_formats;
            let mut formats = Vec::with_capacity(num as usize);
            // SAFETY: capacity bounds the driver's writes.
            unsafe {
                f(driver.core_ptr(), formats.as_mut_ptr(), &mut num).check()?;
                formats.set_len(num as usize);
            }
            Ok(formats)
        })
    }

    pub fn create_image(&self, format: &ImageFormat, width: i32, height: i32) -> VaResult<Image> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.create_image.ok_or(VaError::Unimplemented)?;
            let mut image = Image::default();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), format, width, height, &mut image).check()?;
            }
            Ok(image)
        })
    }

    /// Derives an image backed directly by `surface`'s memory, where the
    /// driver supports that.
    pub fn derive_image(&self, surface: SurfaceId) -> VaResult<Image> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.derive_image.ok_or(VaError::Unimplemented)?;
            let mut image = Image::default();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), surface, &mut image).check()?;
            }
            Ok(image)
        })
    }

    pub fn destroy_image(&self, image: ImageId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.destroy_image.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), image).check() }
        })
    }

    pub fn set_image_palette(&self, image: ImageId, palette: &[u8]) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .set_image_palette
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: the palette is read during the call only.
            unsafe { f(driver.core_ptr(), image, palette.as_ptr()).check() }
        })
    }

    /// Reads back the given region of `surface` into `image`.
    pub fn get_image(
        &self,
        surface: SurfaceId,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        image: ImageId,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.get_image.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), surface, x, y, width, height, image).check() }
        })
    }

    pub fn put_image(
        &self,
        surface: SurfaceId,
        image: ImageId,
        src: Rectangle,
        dest: Rectangle,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver.vtable()?.put_image.ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe {
                f(
                    driver.core_ptr(),
                    surface,
                    image,
                    src.x as c_int,
                    src.y as c_int,
                    src.width as u32,
                    src.height as u32,
                    dest.x as c_int,
                    dest.y as c_int,
                    dest.width as u32,
                    dest.height as u32,
                )
                .check()
            }
        })
    }

    /// Returns the supported subpicture formats with their usage flags.
    pub fn query_subpicture_formats(&self) -> VaResult<Vec<(ImageFormat, u32)>> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_subpicture_formats
                .ok_or(VaError::Unimplemented)?;

            let capacity = driver.core().max_subpic_formats as usize;
            let mut formats = Vec::with_capacity(capacity);
            let mut flags = vec![0u32; capacity];
            let mut num = 0u32;
            // SAFETY: both arrays hold `max_subpic_formats` entries, the
            // documented bound on what the driver may write.
            unsafe {
                f(
                    driver.core_ptr(),
                    formats.as_mut_ptr(),
                    flags.as_mut_ptr(),
                    &mut num,
                )
                .check()?;
                formats.set_len(num as usize);
            }
            flags.truncate(num as usize);
            Ok(formats.into_iter().zip(flags).collect())
        })
    }

    pub fn create_subpicture(&self, image: ImageId) -> VaResult<SubpictureId> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .create_subpicture
                .ok_or(VaError::Unimplemented)?;
            let mut subpicture = SubpictureId::default();
            // SAFETY: out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), image, &mut subpicture).check()?;
            }
            Ok(subpicture)
        })
    }

    pub fn destroy_subpicture(&self, subpicture: SubpictureId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .destroy_subpicture
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), subpicture).check() }
        })
    }

    pub fn set_subpicture_image(&self, subpicture: SubpictureId, image: ImageId) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .set_subpicture_image
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), subpicture, image).check() }
        })
    }

    pub fn set_subpicture_chromakey(
        &self,
        subpicture: SubpictureId,
        chromakey_min: u32,
        chromakey_max: u32,
        chromakey_mask: u32,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .set_subpicture_chromakey
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe {
                f(
                    driver.core_ptr(),
                    subpicture,
                    chromakey_min,
                    chromakey_max,
                    chromakey_mask,
                )
                .check()
            }
        })
    }

    pub fn set_subpicture_global_alpha(
        &self,
        subpicture: SubpictureId,
        global_alpha: f32,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .set_subpicture_global_alpha
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: plain forward.
            unsafe { f(driver.core_ptr(), subpicture, global_alpha).check() }
        })
    }

    /// Composites `subpicture` onto the listed surfaces: `src` selects the
    /// subpicture region, `dest` where it lands on each surface.
    pub fn associate_subpicture(
        &self,
        subpicture: SubpictureId,
        target_surfaces: &[SurfaceId],
        src: Rectangle,
        dest: Rectangle,
        flags: u32,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .associate_subpicture
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: surface list is read-only and outlives the call.
            unsafe {
                f(
                    driver.core_ptr(),
                    subpicture,
                    target_surfaces.as_ptr(),
                    target_surfaces.len() as c_int,
                    src.x,
                    src.y,
                    src.width,
                    src.height,
                    dest.x,
                    dest.y,
                    dest.width,
                    dest.height,
                    flags,
                )
                .check()
            }
        })
    }

    pub fn deassociate_subpicture(
        &self,
        subpicture: SubpictureId,
        target_surfaces: &[SurfaceId],
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .deassociate_subpicture
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: surface list is read-only and outlives the call.
            unsafe {
                f(
                    driver.core_ptr(),
                    subpicture,
                    target_surfaces.as_ptr(),
                    target_surfaces.len() as c_int,
                )
                .check()
            }
        })
    }

    pub fn query_display_attributes(&self) -> VaResult<Vec<DisplayAttribute>> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_display_attributes
                .ok_or(VaError::Unimplemented)?;

            let mut num = driver.core().max_display_attributes;
            let mut attributes = Vec::with_capacity(num as usize);
            // SAFETY: capacity bounds the driver's writes.
            unsafe {
                f(driver.core_ptr(), attributes.as_mut_ptr(), &mut num).check()?;
                attributes.set_len(num as usize);
            }
            Ok(attributes)
        })
    }

    /// Fills in the current value of each listed attribute.
    pub fn get_display_attributes(&self, attributes: &mut [DisplayAttribute]) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .get_display_attributes
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: the slice length bounds the driver's writes.
            unsafe {
                f(
                    driver.core_ptr(),
                    attributes.as_mut_ptr(),
                    attributes.len() as c_int,
                )
                .check()
            }
        })
    }

    pub fn set_display_attributes(&self, attributes: &[DisplayAttribute]) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .set_display_attributes
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: attribute list is read-only.
            unsafe {
                f(
                    driver.core_ptr(),
                    attributes.as_ptr(),
                    attributes.len() as c_int,
                )
                .check()
            }
        })
    }

    /// Estimated processing rate for `config` under the given parameters.
    /// Optional entry.
    pub fn query_processing_rate(
        &self,
        config: ConfigId,
        parameter: &ProcessingRateParameter,
    ) -> VaResult<u32> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .query_processing_rate
                .ok_or(VaError::Unimplemented)?;
            let mut rate = 0;
            // SAFETY: parameter is read-only; out-pointer to a local.
            unsafe {
                f(driver.core_ptr(), config, parameter, &mut rate).check()?;
            }
            Ok(rate)
        })
    }

    /// Exports `surface` as a memory handle of `mem_type`, writing the
    /// type-specific descriptor into `descriptor`. Optional entry.
    pub fn export_surface_handle<T>(
        &self,
        surface: SurfaceId,
        mem_type: u32,
        flags: u32,
        descriptor: &mut T,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable()?
                .export_surface_handle
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: the caller picks T to match `mem_type`'s descriptor
            // layout, per the ABI contract.
            unsafe {
                f(
                    driver.core_ptr(),
                    surface,
                    mem_type,
                    flags,
                    descriptor as *mut T as *mut c_void,
                )
                .check()
            }
        })
    }

    /// Presents `surface` into the window-system drawable `draw`.
    ///
    /// Only meaningful on displays whose window system can present; a
    /// headless display reports the not-implemented status. The drawable is
    /// registered in the cache on first use, so repeated presentation to the
    /// same target issues no further protocol registration traffic.
    pub fn put_surface(
        &self,
        surface: SurfaceId,
        draw: DrawableId,
        src: Rectangle,
        dest: Rectangle,
        cliprects: &[Rectangle],
        flags: u32,
    ) -> VaResult<()> {
        let ctx = self.context()?;

        {
            let mut wsi = ctx.wsi.lock().unwrap();
            let Some(cache) = wsi.drawables() else {
                return Err(VaError::Unimplemented);
            };
            cache.lookup_or_create(draw)?;
        }

        ctx.with_driver(|driver| {
            let f = driver.vtable()?.put_surface.ok_or(VaError::Unimplemented)?;
            // SAFETY: the drawable id travels as an opaque pointer-sized
            // value, as the ABI specifies; cliprects are read-only.
            unsafe {
                f(
                    driver.core_ptr(),
                    surface,
                    draw.0 as usize as *mut c_void,
                    src.x,
                    src.y,
                    src.width,
                    src.height,
                    dest.x,
                    dest.y,
                    dest.width,
                    dest.height,
                    cliprects.as_ptr(),
                    cliprects.len() as u32,
                    flags,
                )
                .check()
            }
        })
    }

    /// Lists the video-processing filters `context` supports, writing them
    /// into `filters` and returning how many were written.
    pub fn query_video_proc_filters(
        &self,
        context: ContextId,
        filters: &mut [i32],
    ) -> VaResult<usize> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable_vpp()?
                .query_video_proc_filters
                .ok_or(VaError::Unimplemented)?;
            let mut num = filters.len() as u32;
            // SAFETY: `num` carries the slice length in, the written count
            // out.
            unsafe {
                f(driver.core_ptr(), context, filters.as_mut_ptr(), &mut num).check()?;
            }
            Ok(num as usize)
        })
    }

    /// Queries the capabilities of one filter type. `T` is the cap structure
    /// matching `filter_type`; returns how many entries were written.
    pub fn query_video_proc_filter_caps<T>(
        &self,
        context: ContextId,
        filter_type: i32,
        caps: &mut [T],
    ) -> VaResult<usize> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable_vpp()?
                .query_video_proc_filter_caps
                .ok_or(VaError::Unimplemented)?;
            let mut num = caps.len() as u32;
            // SAFETY: the caller picks T per `filter_type`; `num` bounds the
            // driver's writes.
            unsafe {
                f(
                    driver.core_ptr(),
                    context,
                    filter_type,
                    caps.as_mut_ptr() as *mut c_void,
                    &mut num,
                )
                .check()?;
            }
            Ok(num as usize)
        })
    }

    /// Queries the combined pipeline capabilities of a filter chain. `T` is
    /// the pipeline-caps structure of the ABI version in use.
    pub fn query_video_proc_pipeline_caps<T>(
        &self,
        context: ContextId,
        filters: &[BufferId],
        pipeline_caps: &mut T,
    ) -> VaResult<()> {
        self.context()?.with_driver(|driver| {
            let f = driver
                .vtable_vpp()?
                .query_video_proc_pipeline_caps
                .ok_or(VaError::Unimplemented)?;
            // SAFETY: filter list is read-only; T is the ABI's caps layout.
            unsafe {
                f(
                    driver.core_ptr(),
                    context,
                    filters.as_ptr(),
                    filters.len() as u32,
                    pipeline_caps as *mut T as *mut c_void,
                )
                .check()
            }
        })
    }
}
