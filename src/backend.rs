// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! The driver-facing ABI.
//!
//! A vendor driver is a shared object exporting a versioned init symbol
//! (`__vaDriverInit_<major>_<minor>`). The loader calls it with a pointer to
//! a [`CoreContext`]; the driver fills in its capability maxima, vendor
//! string and the function tables, and from then on every public entry point
//! forwards through [`VTable`]/[`VTableVpp`].
//!
//! Everything in this module is `repr(C)` with a fixed layout. Evolution
//! rules: fields are only ever appended, the reserved tails shrink to make
//! room, and the init symbol minor version is bumped; a driver built
//! against an older minor keeps loading.

use std::ffi::c_char;
use std::ffi::c_int;
use std::ffi::c_void;

use crate::message::Messenger;
use crate::status::VaError;
use crate::status::VaResult;
use crate::status::VaStatus;
use crate::BufferId;
use crate::ConfigId;
use crate::ContextId;
use crate::Entrypoint;
use crate::ImageId;
use crate::Profile;
use crate::Rectangle;
use crate::SubpictureId;
use crate::SurfaceId;

#[cfg(test)]
pub(crate) mod fake;

/// Structural version tag of [`VTableVpp`].
pub const VTABLE_VPP_VERSION: u32 = 1;

/// Display types reported to drivers through [`CoreContext::display_type`].
pub const DISPLAY_X11: u32 = 0x10;
pub const DISPLAY_DRM: u32 = 0x30;
pub const DISPLAY_DRM_RENDER_NODES: u32 = 0x31;
pub const DISPLAY_WAYLAND: u32 = 0x40;

/// Builds the versioned init symbol name a driver must export.
pub fn driver_init_symbol(major: u32, minor: u32) -> String {
    format!("__vaDriverInit_{}_{}", major, minor)
}

/// Type of the driver init entry point.
pub type DriverInit = unsafe extern "C" fn(ctx: *mut CoreContext) -> VaStatus;

/// A configuration attribute, exchanged verbatim with drivers.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfigAttrib {
    pub type_: i32,
    pub value: u32,
}

/// Value payload of a [`SurfaceAttrib`].
#[repr(C)]
#[derive(Copy, Clone)]
pub union GenericValueUnion {
    pub i: i32,
    pub f: f32,
    pub p: *mut c_void,
}

/// Typed generic value: `value_type` selects the active union member.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct GenericValue {
    pub value_type: i32,
    pub value: GenericValueUnion,
}

/// A per-surface creation attribute.
#[repr(C)]
#[derive(Copy, Clone)]
pub struct SurfaceAttrib {
    pub type_: i32,
    pub flags: u32,
    pub value: GenericValue,
}

/// Pixel format descriptor for images and subpictures.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ImageFormat {
    pub fourcc: u32,
    pub byte_order: u32,
    pub bits_per_pixel: u32,
    pub depth: u32,
    pub red_mask: u32,
    pub green_mask: u32,
    pub blue_mask: u32,
    pub alpha_mask: u32,
    va_reserved: [u32; 4],
}

impl ImageFormat {
    pub fn new(fourcc: u32, byte_order: u32, bits_per_pixel: u32) -> Self {
        ImageFormat {
            fourcc,
            byte_order,
            bits_per_pixel,
            ..Default::default()
        }
    }
}

/// An image descriptor, filled by the driver on create/derive.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct Image {
    pub image_id: ImageId,
    pub format: ImageFormat,
    /// Buffer holding the image data; mapped through the buffer entry points.
    pub buf: BufferId,
    pub width: u16,
    pub height: u16,
    pub data_size: u32,
    pub num_planes: u32,
    pub pitches: [u32; 3],
    pub offsets: [u32; 3],
    pub num_palette_entries: i32,
    pub entry_bytes: i32,
    pub component_order: [u8; 4],
    va_reserved: [u32; 4],
}

/// A display attribute (brightness, hue, ...), exchanged verbatim.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct DisplayAttribute {
    pub type_: i32,
    pub min_value: i32,
    pub max_value: i32,
    pub value: i32,
    pub flags: u32,
    va_reserved: [u32; 4],
}

/// Driver-reported status of a surface's pending operations.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SurfaceStatus(pub i32);

/// Processing-rate query parameter for encode use cases.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcessingRateParameterEnc {
    pub level_idc: u8,
    reserved: [u8; 3],
    pub quality_level: u32,
    pub intra_period: u32,
    pub ip_period: u32,
}

/// Processing-rate query parameter for decode use cases.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct ProcessingRateParameterDec {
    pub level_idc: u8,
    reserved: [u8; 3],
}

/// Parameter of the optional processing-rate query; the config's entry point
/// selects the active member.
#[repr(C)]
#[derive(Copy, Clone)]
pub union ProcessingRateParameter {
    pub proc_buf_enc: ProcessingRateParameterEnc,
    pub proc_buf_dec: ProcessingRateParameterDec,
}

/// The context structure shared with the loaded driver.
///
/// The dispatch side allocates it (and the vtables) and keeps it at a stable
/// address for the lifetime of the driver binding; the driver fills in the
/// capability fields during init and may stash its own state in
/// `driver_data`.
#[repr(C)]
pub struct CoreContext {
    /// Driver-private data; owned and interpreted by the driver alone.
    pub driver_data: *mut c_void,
    pub vtable: *mut VTable,
    pub vtable_vpp: *mut VTableVpp,
    /// Native window-system connection handle, if any.
    pub native_display: *mut c_void,
    pub display_type: u32,
    pub version_major: c_int,
    pub version_minor: c_int,
    pub max_profiles: c_int,
    pub max_entrypoints: c_int,
    pub max_attributes: c_int,
    pub max_image_formats: c_int,
    pub max_subpic_formats: c_int,
    pub max_display_attributes: c_int,
    pub str_vendor: *const c_char,
    /// DRM device fd, when the display is a DRM connection; -1 otherwise.
    pub drm_fd: c_int,
    /// Authentication cookie type used on the DRM fd, 0 for none.
    pub drm_auth_type: u32,
    reserved: [usize; 16],
}

impl CoreContext {
    pub fn new(display_type: u32) -> CoreContext {
        CoreContext {
            driver_data: std::ptr::null_mut(),
            vtable: std::ptr::null_mut(),
            vtable_vpp: std::ptr::null_mut(),
            native_display: std::ptr::null_mut(),
            display_type,
            version_major: crate::VA_MAJOR_VERSION as c_int,
            version_minor: crate::VA_MINOR_VERSION as c_int,
            max_profiles: 0,
            max_entrypoints: 0,
            max_attributes: 0,
            max_image_formats: 0,
            max_subpic_formats: 0,
            max_display_attributes: 0,
            str_vendor: std::ptr::null(),
            drm_fd: -1,
            drm_auth_type: 0,
            reserved: [0; 16],
        }
    }
}

/// The core function table a driver populates during init.
///
/// The config/surface/context/buffer/picture/image/subpicture/display
/// attribute surface (about forty entries) is mandatory (see
/// [`validate_driver`]); the rest are optional and checked by dispatch
/// before each call.
#[repr(C)]
pub struct VTable {
    pub terminate: Option<unsafe extern "C" fn(ctx: *mut CoreContext) -> VaStatus>,

    pub query_config_profiles: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            profile_list: *mut Profile,
            num_profiles: *mut c_int,
        ) -> VaStatus,
    >,

    pub query_config_entrypoints: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            profile: Profile,
            entrypoint_list: *mut Entrypoint,
            num_entrypoints: *mut c_int,
        ) -> VaStatus,
    >,

    pub get_config_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            profile: Profile,
            entrypoint: Entrypoint,
            attrib_list: *mut ConfigAttrib,
            num_attribs: c_int,
        ) -> VaStatus,
    >,

    pub create_config: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            profile: Profile,
            entrypoint: Entrypoint,
            attrib_list: *const ConfigAttrib,
            num_attribs: c_int,
            config_id: *mut ConfigId,
        ) -> VaStatus,
    >,

    pub destroy_config:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, config_id: ConfigId) -> VaStatus>,

    pub query_config_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            config_id: ConfigId,
            profile: *mut Profile,
            entrypoint: *mut Entrypoint,
            attrib_list: *mut ConfigAttrib,
            num_attribs: *mut c_int,
        ) -> VaStatus,
    >,

    /// Legacy surface creation. Takes the format ahead of the geometry,
    /// unlike the public call; dispatch reorders the arguments.
    pub create_surfaces: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            format: c_int,
            width: c_int,
            height: c_int,
            num_surfaces: c_int,
            surfaces: *mut SurfaceId,
        ) -> VaStatus,
    >,

    pub destroy_surfaces: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface_list: *mut SurfaceId,
            num_surfaces: c_int,
        ) -> VaStatus,
    >,

    pub create_context: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            config_id: ConfigId,
            picture_width: c_int,
            picture_height: c_int,
            flag: c_int,
            render_targets: *mut SurfaceId,
            num_render_targets: c_int,
            context: *mut ContextId,
        ) -> VaStatus,
    >,

    pub destroy_context:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, context: ContextId) -> VaStatus>,

    pub create_buffer: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            type_: c_int,
            size: u32,
            num_elements: u32,
            data: *const c_void,
            buf_id: *mut BufferId,
        ) -> VaStatus,
    >,

    pub buffer_set_num_elements: Option<
        unsafe extern "C" fn(ctx: *mut CoreContext, buf_id: BufferId, num_elements: u32) -> VaStatus,
    >,

    pub map_buffer: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            buf_id: BufferId,
            pbuf: *mut *mut c_void,
        ) -> VaStatus,
    >,

    pub unmap_buffer:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, buf_id: BufferId) -> VaStatus>,

    pub destroy_buffer:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, buffer_id: BufferId) -> VaStatus>,

    pub begin_picture: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            render_target: SurfaceId,
        ) -> VaStatus,
    >,

    pub render_picture: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            buffers: *const BufferId,
            num_buffers: c_int,
        ) -> VaStatus,
    >,

    pub end_picture:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, context: ContextId) -> VaStatus>,

    pub sync_surface:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, render_target: SurfaceId) -> VaStatus>,

    pub query_surface_status: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            render_target: SurfaceId,
            status: *mut SurfaceStatus,
        ) -> VaStatus,
    >,

    pub query_surface_error: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            render_target: SurfaceId,
            error_status: VaStatus,
            error_info: *mut *mut c_void,
        ) -> VaStatus,
    >,

    pub put_surface: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface: SurfaceId,
            draw: *mut c_void,
            srcx: i16,
            srcy: i16,
            srcw: u16,
            srch: u16,
            destx: i16,
            desty: i16,
            destw: u16,
            desth: u16,
            cliprects: *const Rectangle,
            number_cliprects: u32,
            flags: u32,
        ) -> VaStatus,
    >,

    pub query_image_formats: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            format_list: *mut ImageFormat,
            num_formats: *mut c_int,
        ) -> VaStatus,
    >,

    pub create_image: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            format: *const ImageFormat,
            width: c_int,
            height: c_int,
            image: *mut Image,
        ) -> VaStatus,
    >,

    pub derive_image: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface: SurfaceId,
            image: *mut Image,
        ) -> VaStatus,
    >,

    pub destroy_image:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, image: ImageId) -> VaStatus>,

    pub set_image_palette: Option<
        unsafe extern "C" fn(ctx: *mut CoreContext, image: ImageId, palette: *const u8) -> VaStatus,
    >,

    pub get_image: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface: SurfaceId,
            x: c_int,
            y: c_int,
            width: u32,
            height: u32,
            image: ImageId,
        ) -> VaStatus,
    >,

    pub put_image: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface: SurfaceId,
            image: ImageId,
            src_x: c_int,
            src_y: c_int,
            src_width: u32,
            src_height: u32,
            dest_x: c_int,
            dest_y: c_int,
            dest_width: u32,
            dest_height: u32,
        ) -> VaStatus,
    >,

    pub query_subpicture_formats: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            format_list: *mut ImageFormat,
            flags: *mut u32,
            num_formats: *mut u32,
        ) -> VaStatus,
    >,

    pub create_subpicture: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            image: ImageId,
            subpicture: *mut SubpictureId,
        ) -> VaStatus,
    >,

    pub destroy_subpicture:
        Option<unsafe extern "C" fn(ctx: *mut CoreContext, subpicture: SubpictureId) -> VaStatus>,

    pub set_subpicture_image: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            subpicture: SubpictureId,
            image: ImageId,
        ) -> VaStatus,
    >,

    pub set_subpicture_chromakey: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            subpicture: SubpictureId,
            chromakey_min: u32,
            chromakey_max: u32,
            chromakey_mask: u32,
        ) -> VaStatus,
    >,

    pub set_subpicture_global_alpha: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            subpicture: SubpictureId,
            global_alpha: f32,
        ) -> VaStatus,
    >,

    pub associate_subpicture: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            subpicture: SubpictureId,
            target_surfaces: *const SurfaceId,
            num_surfaces: c_int,
            src_x: i16,
            src_y: i16,
            src_width: u16,
            src_height: u16,
            dest_x: i16,
            dest_y: i16,
            dest_width: u16,
            dest_height: u16,
            flags: u32,
        ) -> VaStatus,
    >,

    pub deassociate_subpicture: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            subpicture: SubpictureId,
            target_surfaces: *const SurfaceId,
            num_surfaces: c_int,
        ) -> VaStatus,
    >,

    pub query_display_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            attr_list: *mut DisplayAttribute,
            num_attributes: *mut c_int,
        ) -> VaStatus,
    >,

    pub get_display_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            attr_list: *mut DisplayAttribute,
            num_attributes: c_int,
        ) -> VaStatus,
    >,

    pub set_display_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            attr_list: *const DisplayAttribute,
            num_attributes: c_int,
        ) -> VaStatus,
    >,

    pub buffer_info: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            buf_id: BufferId,
            type_: *mut c_int,
            size: *mut u32,
            num_elements: *mut u32,
        ) -> VaStatus,
    >,

    /// Supersedes `create_surfaces` when per-surface attributes are in play;
    /// uses the public argument order, so no reordering happens here.
    pub create_surfaces2: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            width: u32,
            height: u32,
            format: u32,
            surfaces: *mut SurfaceId,
            num_surfaces: u32,
            attrib_list: *const SurfaceAttrib,
            num_attribs: u32,
        ) -> VaStatus,
    >,

    pub query_surface_attributes: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            config: ConfigId,
            attrib_list: *mut SurfaceAttrib,
            num_attribs: *mut u32,
        ) -> VaStatus,
    >,

    pub query_processing_rate: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            config_id: ConfigId,
            proc_buf: *const ProcessingRateParameter,
            processing_rate: *mut u32,
        ) -> VaStatus,
    >,

    pub export_surface_handle: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface_id: SurfaceId,
            mem_type: u32,
            flags: u32,
            descriptor: *mut c_void,
        ) -> VaStatus,
    >,

    pub sync_surface2: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            surface: SurfaceId,
            timeout_ns: u64,
        ) -> VaStatus,
    >,

    pub sync_buffer: Option<
        unsafe extern "C" fn(ctx: *mut CoreContext, buf_id: BufferId, timeout_ns: u64) -> VaStatus,
    >,

    /// Reserved for future entries, must be zero.
    reserved: [usize; 50],
}

impl Default for VTable {
    fn default() -> Self {
        // A zeroed table is the all-entries-absent table: `None` of a
        // function-pointer `Option` is the null pointer.
        unsafe { std::mem::zeroed() }
    }
}

/// The video-post-processing function table, versioned separately.
#[repr(C)]
pub struct VTableVpp {
    pub version: u32,

    pub query_video_proc_filters: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            filters: *mut i32,
            num_filters: *mut u32,
        ) -> VaStatus,
    >,

    pub query_video_proc_filter_caps: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            type_: i32,
            filter_caps: *mut c_void,
            num_filter_caps: *mut u32,
        ) -> VaStatus,
    >,

    pub query_video_proc_pipeline_caps: Option<
        unsafe extern "C" fn(
            ctx: *mut CoreContext,
            context: ContextId,
            filters: *const BufferId,
            num_filters: u32,
            pipeline_caps: *mut c_void,
        ) -> VaStatus,
    >,

    reserved: [usize; 16],
}

impl Default for VTableVpp {
    fn default() -> Self {
        VTableVpp {
            version: VTABLE_VPP_VERSION,
            query_video_proc_filters: None,
            query_video_proc_filter_caps: None,
            query_video_proc_pipeline_caps: None,
            reserved: [0; 16],
        }
    }
}

/// Checks a freshly initialized driver binding against the mandatory
/// capability surface.
///
/// Deliberately runs through every check even after the first failure so a
/// driver author gets the complete list of missing pieces in one pass, then
/// reports a single overall status. Any failure rejects the driver as a
/// whole; there is no partially-usable binding.
pub fn validate_driver(core: &CoreContext, vtable: &VTable, messenger: &Messenger) -> VaResult<()> {
    let mut result = Ok(());

    let mut check_maximum = |value: c_int, name: &str| {
        if value == 0 {
            messenger.error(&format!("driver init left max_{} at zero", name));
            result = Err(VaError::Unknown);
        }
    };
    check_maximum(core.max_profiles, "profiles");
    check_maximum(core.max_entrypoints, "entrypoints");
    check_maximum(core.max_attributes, "attributes");
    check_maximum(core.max_image_formats, "image_formats");
    check_maximum(core.max_subpic_formats, "subpic_formats");
    check_maximum(core.max_display_attributes, "display_attributes");

    if core.str_vendor.is_null() {
        messenger.error("driver init left the vendor string unset");
        result = Err(VaError::Unknown);
    }

    macro_rules! check_vtable {
        ($($field:ident),+ $(,)?) => {
            $(
                if vtable.$field.is_none() {
                    messenger.error(&format!(
                        "no valid vtable entry for {}",
                        stringify!($field)
                    ));
                    result = Err(VaError::Unimplemented);
                }
            )+
        };
    }

    check_vtable!(
        terminate,
        query_config_profiles,
        query_config_entrypoints,
        query_config_attributes,
        create_config,
        destroy_config,
        get_config_attributes,
        create_surfaces,
        destroy_surfaces,
        create_context,
        destroy_context,
        create_buffer,
        buffer_set_num_elements,
        map_buffer,
        unmap_buffer,
        destroy_buffer,
        begin_picture,
        render_picture,
        end_picture,
        sync_surface,
        query_surface_status,
        query_image_formats,
        create_image,
        derive_image,
        destroy_image,
        set_image_palette,
        get_image,
        put_image,
        query_subpicture_formats,
        create_subpicture,
        destroy_subpicture,
        set_subpicture_image,
        set_subpicture_chromakey,
        set_subpicture_global_alpha,
        associate_subpicture,
        deassociate_subpicture,
        query_display_attributes,
        get_display_attributes,
        set_display_attributes,
    );

    result
}
