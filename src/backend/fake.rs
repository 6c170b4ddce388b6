// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! In-process fake driver for tests.
//!
//! A complete vtable whose entries are ordinary `extern "C"` functions, plus
//! canned init entry points with interesting defects, a fake dynamic-linker
//! seam, and a minimal window system. Entries encode the arguments they
//! receive into their outputs where dispatch behavior (ordering, forwarding)
//! needs to be observable from the outside.

use std::collections::HashMap;
use std::ffi::c_int;
use std::ffi::c_void;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::backend::CoreContext;
use crate::backend::DisplayAttribute;
use crate::backend::DriverInit;
use crate::backend::Image;
use crate::backend::ImageFormat;
use crate::backend::ProcessingRateParameter;
use crate::backend::SurfaceAttrib;
use crate::backend::SurfaceStatus;
use crate::backend::VTable;
use crate::backend::DISPLAY_DRM_RENDER_NODES;
use crate::drawable::Attachment;
use crate::drawable::BufferReply;
use crate::drawable::DrawableBackend;
use crate::drawable::DrawableCache;
use crate::drawable::RenderBuffer;
use crate::loader::DriverOpener;
use crate::loader::OpenError;
use crate::loader::OpenedDriver;
use crate::message::Messenger;
use crate::status::VaError;
use crate::status::VaResult;
use crate::status::VaStatus;
use crate::wsi::NameProbe;
use crate::wsi::ProbeChain;
use crate::wsi::WindowSystem;
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

pub(crate) const VENDOR: &[u8] = b"va-dispatch fake driver\0";

/// Native-display values whose drivers saw their terminate entry run.
pub(crate) static TERMINATED: Mutex<Vec<usize>> = Mutex::new(Vec::new());

unsafe extern "C" fn terminate(ctx: *mut CoreContext) -> VaStatus {
    TERMINATED.lock().unwrap().push((*ctx).native_display as usize);
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_config_profiles(
    _ctx: *mut CoreContext,
    profile_list: *mut Profile,
    num_profiles: *mut c_int,
) -> VaStatus {
    *profile_list = Profile(13);
    *profile_list.add(1) = Profile(19);
    *num_profiles = 2;
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_config_entrypoints(
    _ctx: *mut CoreContext,
    profile: Profile,
    entrypoint_list: *mut Entrypoint,
    num_entrypoints: *mut c_int,
) -> VaStatus {
    // Echo the profile so forwarding is visible.
    *entrypoint_list = Entrypoint(profile.0 + 1);
    *num_entrypoints = 1;
    VaStatus::SUCCESS
}

unsafe extern "C" fn get_config_attributes(
    _ctx: *mut CoreContext,
    _profile: Profile,
    _entrypoint: Entrypoint,
    attrib_list: *mut crate::backend::ConfigAttrib,
    num_attribs: c_int,
) -> VaStatus {
    for i in 0..num_attribs as usize {
        (*attrib_list.add(i)).value = 0x10;
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_config(
    _ctx: *mut CoreContext,
    _profile: Profile,
    _entrypoint: Entrypoint,
    _attrib_list: *const crate::backend::ConfigAttrib,
    _num_attribs: c_int,
    config_id: *mut ConfigId,
) -> VaStatus {
    *config_id = ConfigId(7);
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_config(_ctx: *mut CoreContext, _config_id: ConfigId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_config_attributes(
    _ctx: *mut CoreContext,
    _config_id: ConfigId,
    profile: *mut Profile,
    entrypoint: *mut Entrypoint,
    _attrib_list: *mut crate::backend::ConfigAttrib,
    num_attribs: *mut c_int,
) -> VaStatus {
    *profile = Profile(13);
    *entrypoint = Entrypoint(14);
    *num_attribs = 0;
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_surfaces(
    _ctx: *mut CoreContext,
    format: c_int,
    width: c_int,
    height: c_int,
    num_surfaces: c_int,
    surfaces: *mut SurfaceId,
) -> VaStatus {
    // Encode the received argument order into the ids so dispatch's
    // reordering from the public signature is observable.
    for i in 0..num_surfaces as usize {
        let id = match i {
            0 => format as u32,
            1 => width as u32,
            2 => height as u32,
            _ => 1000 + i as u32,
        };
        *surfaces.add(i) = SurfaceId(id);
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_surfaces2(
    _ctx: *mut CoreContext,
    width: u32,
    height: u32,
    format: u32,
    surfaces: *mut SurfaceId,
    num_surfaces: u32,
    _attrib_list: *const SurfaceAttrib,
    num_attribs: u32,
) -> VaStatus {
    for i in 0..num_surfaces as usize {
        let id = match i {
            0 => width,
            1 => height,
            2 => format,
            3 => num_attribs,
            _ => 2000 + i as u32,
        };
        *surfaces.add(i) = SurfaceId(id);
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_surfaces(
    _ctx: *mut CoreContext,
    _surface_list: *mut SurfaceId,
    _num_surfaces: c_int,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_context(
    _ctx: *mut CoreContext,
    _config_id: ConfigId,
    _picture_width: c_int,
    _picture_height: c_int,
    _flag: c_int,
    _render_targets: *mut SurfaceId,
    _num_render_targets: c_int,
    context: *mut ContextId,
) -> VaStatus {
    *context = ContextId(42);
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_context(_ctx: *mut CoreContext, _context: ContextId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_buffer(
    _ctx: *mut CoreContext,
    _context: ContextId,
    _type_: c_int,
    size: u32,
    num_elements: u32,
    _data: *const c_void,
    buf_id: *mut BufferId,
) -> VaStatus {
    *buf_id = BufferId(size * num_elements);
    VaStatus::SUCCESS
}

unsafe extern "C" fn buffer_set_num_elements(
    _ctx: *mut CoreContext,
    _buf_id: BufferId,
    _num_elements: u32,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn map_buffer(
    ctx: *mut CoreContext,
    _buf_id: BufferId,
    pbuf: *mut *mut c_void,
) -> VaStatus {
    *pbuf = ctx as *mut c_void;
    VaStatus::SUCCESS
}

unsafe extern "C" fn unmap_buffer(_ctx: *mut CoreContext, _buf_id: BufferId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_buffer(_ctx: *mut CoreContext, _buffer_id: BufferId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn begin_picture(
    _ctx: *mut CoreContext,
    _context: ContextId,
    _render_target: SurfaceId,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn render_picture(
    _ctx: *mut CoreContext,
    _context: ContextId,
    _buffers: *const BufferId,
    num_buffers: c_int,
) -> VaStatus {
    // Gives pass-through tests a driver-originated error to observe.
    if num_buffers == 0 {
        return VaStatus(VaError::InvalidBuffer.code());
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn end_picture(_ctx: *mut CoreContext, _context: ContextId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn sync_surface(_ctx: *mut CoreContext, _render_target: SurfaceId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_surface_status(
    _ctx: *mut CoreContext,
    _render_target: SurfaceId,
    status: *mut SurfaceStatus,
) -> VaStatus {
    *status = SurfaceStatus(4);
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_image_formats(
    _ctx: *mut CoreContext,
    format_list: *mut ImageFormat,
    num_formats: *mut c_int,
) -> VaStatus {
    *format_list = ImageFormat::new(u32::from_le_bytes(*b"NV12"), 1, 12);
    *num_formats = 1;
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_image(
    _ctx: *mut CoreContext,
    format: *const ImageFormat,
    width: c_int,
    height: c_int,
    image: *mut Image,
) -> VaStatus {
    (*image).image_id = ImageId(5);
    (*image).format = *format;
    (*image).width = width as u16;
    (*image).height = height as u16;
    VaStatus::SUCCESS
}

unsafe extern "C" fn derive_image(
    _ctx: *mut CoreContext,
    surface: SurfaceId,
    image: *mut Image,
) -> VaStatus {
    (*image).image_id = ImageId(surface.0 + 1);
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_image(_ctx: *mut CoreContext, _image: ImageId) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn set_image_palette(
    _ctx: *mut CoreContext,
    _image: ImageId,
    _palette: *const u8,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn get_image(
    _ctx: *mut CoreContext,
    _surface: SurfaceId,
    _x: c_int,
    _y: c_int,
    _width: u32,
    _height: u32,
    _image: ImageId,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn put_image(
    _ctx: *mut CoreContext,
    _surface: SurfaceId,
    _image: ImageId,
    _src_x: c_int,
    _src_y: c_int,
    _src_width: u32,
    _src_height: u32,
    _dest_x: c_int,
    _dest_y: c_int,
    _dest_width: u32,
    _dest_height: u32,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_subpicture_formats(
    _ctx: *mut CoreContext,
    format_list: *mut ImageFormat,
    flags: *mut u32,
    num_formats: *mut u32,
) -> VaStatus {
    *format_list = ImageFormat::new(u32::from_le_bytes(*b"AI44"), 1, 4);
    *flags = 3;
    *num_formats = 1;
    VaStatus::SUCCESS
}

unsafe extern "C" fn create_subpicture(
    _ctx: *mut CoreContext,
    _image: ImageId,
    subpicture: *mut SubpictureId,
) -> VaStatus {
    *subpicture = SubpictureId(9);
    VaStatus::SUCCESS
}

unsafe extern "C" fn destroy_subpicture(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn set_subpicture_image(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
    _image: ImageId,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn set_subpicture_chromakey(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
    _chromakey_min: u32,
    _chromakey_max: u32,
    _chromakey_mask: u32,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn set_subpicture_global_alpha(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
    _global_alpha: f32,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn associate_subpicture(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
    _target_surfaces: *const SurfaceId,
    _num_surfaces: c_int,
    _src_x: i16,
    _src_y: i16,
    _src_width: u16,
    _src_height: u16,
    _dest_x: i16,
    _dest_y: i16,
    _dest_width: u16,
    _dest_height: u16,
    _flags: u32,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn deassociate_subpicture(
    _ctx: *mut CoreContext,
    _subpicture: SubpictureId,
    _target_surfaces: *const SurfaceId,
    _num_surfaces: c_int,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_display_attributes(
    _ctx: *mut CoreContext,
    attr_list: *mut DisplayAttribute,
    num_attributes: *mut c_int,
) -> VaStatus {
    *attr_list = DisplayAttribute {
        type_: 0,
        min_value: 0,
        max_value: 100,
        value: 50,
        flags: 3,
        ..Default::default()
    };
    *num_attributes = 1;
    VaStatus::SUCCESS
}

unsafe extern "C" fn get_display_attributes(
    _ctx: *mut CoreContext,
    attr_list: *mut DisplayAttribute,
    num_attributes: c_int,
) -> VaStatus {
    for i in 0..num_attributes as usize {
        (*attr_list.add(i)).value = 1;
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn set_display_attributes(
    _ctx: *mut CoreContext,
    _attr_list: *const DisplayAttribute,
    _num_attributes: c_int,
) -> VaStatus {
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_processing_rate(
    _ctx: *mut CoreContext,
    _config_id: ConfigId,
    _proc_buf: *const ProcessingRateParameter,
    processing_rate: *mut u32,
) -> VaStatus {
    *processing_rate = 480;
    VaStatus::SUCCESS
}

unsafe extern "C" fn put_surface(
    _ctx: *mut CoreContext,
    _surface: SurfaceId,
    draw: *mut c_void,
    _srcx: i16,
    _srcy: i16,
    _srcw: u16,
    _srch: u16,
    _destx: i16,
    _desty: i16,
    _destw: u16,
    _desth: u16,
    _cliprects: *const Rectangle,
    _number_cliprects: u32,
    _flags: u32,
) -> VaStatus {
    if draw.is_null() {
        return VaStatus(VaError::InvalidParameter.code());
    }
    VaStatus::SUCCESS
}

unsafe extern "C" fn query_video_proc_filters(
    _ctx: *mut CoreContext,
    _context: ContextId,
    filters: *mut i32,
    num_filters: *mut u32,
) -> VaStatus {
    if *num_filters < 1 {
        return VaStatus(VaError::MaxNumExceeded.code());
    }
    *filters = 8;
    *num_filters = 1;
    VaStatus::SUCCESS
}

/// Number of mandatory vtable entries; [`knock_out`] accepts `0..this`.
pub(crate) const MANDATORY_ENTRIES: usize = 39;

const KNOCKOUTS: [fn(&mut VTable); MANDATORY_ENTRIES] = [
    |vt| vt.terminate = None,
    |vt| vt.query_config_profiles = None,
    |vt| vt.query_config_entrypoints = None,
    |vt| vt.query_config_attributes = None,
    |vt| vt.create_config = None,
    |vt| vt.destroy_config = None,
    |vt| vt.get_config_attributes = None,
    |vt| vt.create_surfaces = None,
    |vt| vt.destroy_surfaces = None,
    |vt| vt.create_context = None,
    |vt| vt.destroy_context = None,
    |vt| vt.create_buffer = None,
    |vt| vt.buffer_set_num_elements = None,
    |vt| vt.map_buffer = None,
    |vt| vt.unmap_buffer = None,
    |vt| vt.destroy_buffer = None,
    |vt| vt.begin_picture = None,
    |vt| vt.render_picture = None,
    |vt| vt.end_picture = None,
    |vt| vt.sync_surface = None,
    |vt| vt.query_surface_status = None,
    |vt| vt.query_image_formats = None,
    |vt| vt.create_image = None,
    |vt| vt.derive_image = None,
    |vt| vt.destroy_image = None,
    |vt| vt.set_image_palette = None,
    |vt| vt.get_image = None,
    |vt| vt.put_image = None,
    |vt| vt.query_subpicture_formats = None,
    |vt| vt.create_subpicture = None,
    |vt| vt.destroy_subpicture = None,
    |vt| vt.set_subpicture_image = None,
    |vt| vt.set_subpicture_chromakey = None,
    |vt| vt.set_subpicture_global_alpha = None,
    |vt| vt.associate_subpicture = None,
    |vt| vt.deassociate_subpicture = None,
    |vt| vt.query_display_attributes = None,
    |vt| vt.get_display_attributes = None,
    |vt| vt.set_display_attributes = None,
];

/// Nulls the `index`-th mandatory entry.
pub(crate) fn knock_out(vtable: &mut VTable, index: usize) {
    KNOCKOUTS[index](vtable);
}

/// Fills `core` and `vtable` the way a well-behaved driver's init would.
pub(crate) fn populate(core: &mut CoreContext, vtable: &mut VTable) {
    core.max_profiles = 2;
    core.max_entrypoints = 3;
    core.max_attributes = 4;
    core.max_image_formats = 5;
    core.max_subpic_formats = 6;
    core.max_display_attributes = 7;
    core.str_vendor = VENDOR.as_ptr() as *const _;

    vtable.terminate = Some(terminate);
    vtable.query_config_profiles = Some(query_config_profiles);
    vtable.query_config_entrypoints = Some(query_config_entrypoints);
    vtable.query_config_attributes = Some(query_config_attributes);
    vtable.create_config = Some(create_config);
    vtable.destroy_config = Some(destroy_config);
    vtable.get_config_attributes = Some(get_config_attributes);
    vtable.create_surfaces = Some(create_surfaces);
    vtable.destroy_surfaces = Some(destroy_surfaces);
    vtable.create_context = Some(create_context);
    vtable.destroy_context = Some(destroy_context);
    vtable.create_buffer = Some(create_buffer);
    vtable.buffer_set_num_elements = Some(buffer_set_num_elements);
    vtable.map_buffer = Some(map_buffer);
    vtable.unmap_buffer = Some(unmap_buffer);
    vtable.destroy_buffer = Some(destroy_buffer);
    vtable.begin_picture = Some(begin_picture);
    vtable.render_picture = Some(render_picture);
    vtable.end_picture = Some(end_picture);
    vtable.sync_surface = Some(sync_surface);
    vtable.query_surface_status = Some(query_surface_status);
    vtable.query_image_formats = Some(query_image_formats);
    vtable.create_image = Some(create_image);
    vtable.derive_image = Some(derive_image);
    vtable.destroy_image = Some(destroy_image);
    vtable.set_image_palette = Some(set_image_palette);
    vtable.get_image = Some(get_image);
    vtable.put_image = Some(put_image);
    vtable.query_subpicture_formats = Some(query_subpicture_formats);
    vtable.create_subpicture = Some(create_subpicture);
    vtable.destroy_subpicture = Some(destroy_subpicture);
    vtable.set_subpicture_image = Some(set_subpicture_image);
    vtable.set_subpicture_chromakey = Some(set_subpicture_chromakey);
    vtable.set_subpicture_global_alpha = Some(set_subpicture_global_alpha);
    vtable.associate_subpicture = Some(associate_subpicture);
    vtable.deassociate_subpicture = Some(deassociate_subpicture);
    vtable.query_display_attributes = Some(query_display_attributes);
    vtable.get_display_attributes = Some(get_display_attributes);
    vtable.set_display_attributes = Some(set_display_attributes);
}

/// Init entry of a well-behaved driver covering the mandatory surface only.
pub(crate) unsafe extern "C" fn init_full(ctx: *mut CoreContext) -> VaStatus {
    let core = &mut *ctx;
    let vtable = &mut *core.vtable;
    populate(core, vtable);
    VaStatus::SUCCESS
}

/// Like [`init_full`] but also provides the optional modern entries.
pub(crate) unsafe extern "C" fn init_modern(ctx: *mut CoreContext) -> VaStatus {
    let core = &mut *ctx;
    let vtable = &mut *core.vtable;
    populate(core, vtable);
    vtable.create_surfaces2 = Some(create_surfaces2);
    vtable.put_surface = Some(put_surface);
    vtable.query_processing_rate = Some(query_processing_rate);
    (*core.vtable_vpp).query_video_proc_filters = Some(query_video_proc_filters);
    VaStatus::SUCCESS
}

/// Reports success but leaves one mandatory entry unset.
pub(crate) unsafe extern "C" fn init_missing_terminate(ctx: *mut CoreContext) -> VaStatus {
    let core = &mut *ctx;
    let vtable = &mut *core.vtable;
    populate(core, vtable);
    vtable.terminate = None;
    VaStatus::SUCCESS
}

/// Reports success but leaves a capability maximum at zero.
pub(crate) unsafe extern "C" fn init_zero_max(ctx: *mut CoreContext) -> VaStatus {
    let core = &mut *ctx;
    let vtable = &mut *core.vtable;
    populate(core, vtable);
    core.max_profiles = 0;
    VaStatus::SUCCESS
}

/// Fails outright.
pub(crate) unsafe extern "C" fn init_fails(_ctx: *mut CoreContext) -> VaStatus {
    VaStatus(VaError::OperationFailed.code())
}

/// Behavior of one path in the fake linker.
pub(crate) enum FakeLib {
    /// Exists but is not a loadable object.
    OpenFails,
    /// Loadable, but exports no compatible init symbol.
    NoInitSymbol,
    /// A driver exporting `init` at minor version `minor`.
    Driver { init: DriverInit, minor: u32 },
}

impl FakeLib {
    pub(crate) fn driver(init: DriverInit) -> FakeLib {
        FakeLib::Driver {
            init,
            minor: VA_MINOR_VERSION,
        }
    }

    pub(crate) fn driver_at_minor(init: DriverInit, minor: u32) -> FakeLib {
        FakeLib::Driver { init, minor }
    }
}

/// Fake dynamic linker: a map from path to canned behavior, recording every
/// open attempt.
#[derive(Default)]
pub(crate) struct FakeOpener {
    libs: HashMap<PathBuf, FakeLib>,
    attempts: Mutex<Vec<PathBuf>>,
}

impl FakeOpener {
    pub(crate) fn insert<P: AsRef<Path>>(&mut self, path: P, lib: FakeLib) {
        self.libs.insert(path.as_ref().to_owned(), lib);
    }

    pub(crate) fn attempts(&self) -> Vec<PathBuf> {
        self.attempts.lock().unwrap().clone()
    }
}

impl DriverOpener for FakeOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn OpenedDriver>, OpenError> {
        self.attempts.lock().unwrap().push(path.to_owned());
        match self.libs.get(path) {
            None => Err(OpenError::NotFound),
            Some(FakeLib::OpenFails) => Err(OpenError::Failed("invalid ELF header".to_owned())),
            Some(FakeLib::NoInitSymbol) => Ok(Box::new(FakeDriverLib { init: None, minor: 0 })),
            Some(FakeLib::Driver { init, minor }) => Ok(Box::new(FakeDriverLib {
                init: Some(*init),
                minor: *minor,
            })),
        }
    }
}

struct FakeDriverLib {
    init: Option<DriverInit>,
    minor: u32,
}

impl OpenedDriver for FakeDriverLib {
    fn init_symbol(&self, major: u32, minor: u32) -> Option<DriverInit> {
        if major == VA_MAJOR_VERSION && minor == self.minor {
            self.init
        } else {
            None
        }
    }

    fn symbol(&self, _name: &str) -> Option<*const c_void> {
        None
    }
}

/// Protocol backend that answers every request; enough for cache semantics.
#[derive(Default)]
struct CountingDrawableBackend;

impl DrawableBackend for CountingDrawableBackend {
    fn create_drawable(&mut self, _drawable: DrawableId) -> VaResult<()> {
        Ok(())
    }

    fn destroy_drawable(&mut self, _drawable: DrawableId) {}

    fn is_window(&mut self, _drawable: DrawableId) -> bool {
        true
    }

    fn query_buffers(
        &mut self,
        _drawable: DrawableId,
        _attachments: &[Attachment],
    ) -> VaResult<BufferReply> {
        Ok(BufferReply {
            buffers: vec![RenderBuffer {
                attachment: Attachment::Back,
                name: 1,
                pitch: 256,
                cpp: 4,
                flags: 0,
            }],
            width: 64,
            height: 64,
        })
    }

    fn swap_available(&self) -> bool {
        true
    }

    fn swap_buffers(&mut self, _drawable: DrawableId) -> VaResult<u64> {
        Ok(1)
    }

    fn copy_region(&mut self, _drawable: DrawableId, _region: Rectangle) -> VaResult<()> {
        Ok(())
    }
}

/// Minimal window system for loader and dispatch tests.
pub(crate) struct FakeWsi {
    native: usize,
    candidates: VaResult<Vec<String>>,
    probes: Option<ProbeChain>,
    drawables: Option<DrawableCache>,
}

impl FakeWsi {
    pub(crate) fn new(native: usize) -> FakeWsi {
        FakeWsi {
            native,
            candidates: Ok(vec!["iHD".to_owned()]),
            probes: None,
            drawables: None,
        }
    }

    pub(crate) fn with_candidates(native: usize, candidates: VaResult<Vec<String>>) -> FakeWsi {
        FakeWsi {
            native,
            candidates,
            probes: None,
            drawables: None,
        }
    }

    pub(crate) fn with_probes(native: usize, probes: Vec<Box<dyn NameProbe>>) -> FakeWsi {
        FakeWsi {
            native,
            candidates: Ok(vec![]),
            probes: Some(ProbeChain::new(probes)),
            drawables: None,
        }
    }

    pub(crate) fn with_drawables(native: usize) -> FakeWsi {
        FakeWsi {
            native,
            candidates: Ok(vec!["iHD".to_owned()]),
            probes: None,
            drawables: Some(DrawableCache::new(Box::<CountingDrawableBackend>::default())),
        }
    }
}

impl WindowSystem for FakeWsi {
    fn native_handle(&self) -> usize {
        self.native
    }

    fn display_type(&self) -> u32 {
        DISPLAY_DRM_RENDER_NODES
    }

    fn driver_candidates(&mut self, messenger: &Messenger) -> VaResult<Vec<String>> {
        match &mut self.probes {
            Some(chain) => chain.run(messenger),
            None => self.candidates.clone(),
        }
    }

    fn drawables(&mut self) -> Option<&mut DrawableCache> {
        self.drawables.as_mut()
    }
}
