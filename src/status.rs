// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Status codes exchanged with drivers and the error type of this crate.
//!
//! Drivers report results as raw `i32` codes across the ABI. [`VaStatus`]
//! wraps one of those; [`VaStatus::check`] converts it into the crate-wide
//! [`VaError`], which mirrors the code catalogue one-to-one so driver results
//! pass through to callers unreinterpreted.

use enumn::N;
use thiserror::Error;

/// Result type returned by every public entry point.
pub type VaResult<T> = std::result::Result<T, VaError>;

/// A raw status code as returned by a driver across the ABI.
#[repr(transparent)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VaStatus(pub i32);

impl VaStatus {
    pub const SUCCESS: VaStatus = VaStatus(0);

    /// Turns a driver return into a `VaResult`, keeping error codes intact.
    pub fn check(self) -> VaResult<()> {
        if self.0 == 0 {
            Ok(())
        } else {
            Err(VaError::from_code(self.0))
        }
    }
}

impl From<VaError> for VaStatus {
    fn from(e: VaError) -> Self {
        VaStatus(e as i32)
    }
}

/// Errors reported by this library or passed through from a driver.
///
/// The discriminants are the on-ABI status codes; [`VaError::code`] recovers
/// the raw value for callers that need it.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Error, N)]
pub enum VaError {
    #[error("operation failed")]
    OperationFailed = 0x0001,
    #[error("resource allocation failed")]
    AllocationFailed = 0x0002,
    #[error("invalid VADisplay")]
    InvalidDisplay = 0x0003,
    #[error("invalid VAConfigID")]
    InvalidConfig = 0x0004,
    #[error("invalid VAContextID")]
    InvalidContext = 0x0005,
    #[error("invalid VASurfaceID")]
    InvalidSurface = 0x0006,
    #[error("invalid VABufferID")]
    InvalidBuffer = 0x0007,
    #[error("invalid VAImageID")]
    InvalidImage = 0x0008,
    #[error("invalid VASubpictureID")]
    InvalidSubpicture = 0x0009,
    #[error("attribute not supported")]
    AttrNotSupported = 0x000a,
    #[error("list argument exceeds maximum number")]
    MaxNumExceeded = 0x000b,
    #[error("the requested VAProfile is not supported")]
    UnsupportedProfile = 0x000c,
    #[error("the requested VAEntrypoint is not supported")]
    UnsupportedEntrypoint = 0x000d,
    #[error("the requested RT format is not supported")]
    UnsupportedRtFormat = 0x000e,
    #[error("the requested VABufferType is not supported")]
    UnsupportedBufferType = 0x000f,
    #[error("surface is in use")]
    SurfaceBusy = 0x0010,
    #[error("flag not supported")]
    FlagNotSupported = 0x0011,
    #[error("invalid parameter")]
    InvalidParameter = 0x0012,
    #[error("resolution not supported")]
    ResolutionNotSupported = 0x0013,
    #[error("the requested function is not implemented")]
    Unimplemented = 0x0014,
    #[error("surface is in displaying (may be overlay)")]
    SurfaceInDisplaying = 0x0015,
    #[error("invalid VAImageFormat")]
    InvalidImageFormat = 0x0016,
    #[error("internal decoding error")]
    DecodingError = 0x0017,
    #[error("internal encoding error")]
    EncodingError = 0x0018,
    #[error("an invalid/unsupported value was supplied")]
    InvalidValue = 0x0019,
    #[error("the requested filter is not supported")]
    UnsupportedFilter = 0x0020,
    #[error("an invalid filter chain was supplied")]
    InvalidFilterChain = 0x0021,
    #[error("HW busy now")]
    HwBusy = 0x0022,
    #[error("an unsupported memory type was supplied")]
    UnsupportedMemoryType = 0x0024,
    #[error("allocated memory size is not enough for input or output")]
    NotEnoughBuffer = 0x0025,
    #[error("unknown libva error")]
    Unknown = -1,
}

impl VaError {
    /// Maps a raw driver code to the catalogue. Codes outside the catalogue
    /// collapse to [`VaError::Unknown`].
    pub fn from_code(code: i32) -> VaError {
        VaError::n(code).unwrap_or(VaError::Unknown)
    }

    /// The raw on-ABI status code.
    pub fn code(self) -> i32 {
        self as i32
    }
}
