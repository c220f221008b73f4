//! NDI SDK struct and function bindings.
//!
//! These mirror the subset of the NDI SDK's C ABI actually used: source
//! discovery and audio-only receive. The library is loaded dynamically via
//! `libloading` rather than linked at build time, so the gateway can run
//! against whichever NDI runtime is installed on the host (or a path given
//! via `NDI_LIB`).

use libloading::{Library, Symbol};
use std::ffi::{c_char, c_int, c_void};
use std::path::Path;

pub type NdiBool = bool;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NdiSource {
    pub p_ndi_name: *const c_char,
    pub p_url_address: *const c_char,
}

impl Default for NdiSource {
    fn default() -> Self {
        NdiSource {
            p_ndi_name: std::ptr::null(),
            p_url_address: std::ptr::null(),
        }
    }
}

#[repr(C)]
pub struct NdiFindCreate {
    pub show_local_sources: NdiBool,
    pub p_groups: *const c_char,
    pub p_extra_ips: *const c_char,
}

pub type NdiRecvColorFormat = c_int;
pub type NdiRecvBandwidth = c_int;

#[repr(C)]
pub struct NdiRecvCreateV3 {
    pub source_to_connect_to: NdiSource,
    pub color_format: NdiRecvColorFormat,
    pub bandwidth: NdiRecvBandwidth,
    pub allow_video_fields: NdiBool,
    pub p_ndi_recv_name: *const c_char,
}

pub type NdiFrameType = c_int;

pub const FRAME_TYPE_NONE: NdiFrameType = 0;
pub const FRAME_TYPE_VIDEO: NdiFrameType = 1;
pub const FRAME_TYPE_AUDIO: NdiFrameType = 2;
pub const FRAME_TYPE_METADATA: NdiFrameType = 3;
pub const FRAME_TYPE_ERROR: NdiFrameType = 4;
pub const FRAME_TYPE_STATUS_CHANGE: NdiFrameType = 100;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NdiAudioFrameV2 {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *mut f32,
    pub channel_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for NdiAudioFrameV2 {
    fn default() -> Self {
        NdiAudioFrameV2 {
            sample_rate: 0,
            no_channels: 0,
            no_samples: 0,
            timecode: 0,
            p_data: std::ptr::null_mut(),
            channel_stride_in_bytes: 0,
            p_metadata: std::ptr::null(),
            timestamp: 0,
        }
    }
}

type FnInitialize = unsafe extern "C" fn() -> NdiBool;
type FnFindCreateV2 = unsafe extern "C" fn(*const NdiFindCreate) -> *mut c_void;
type FnFindDestroy = unsafe extern "C" fn(*mut c_void);
type FnFindWaitForSources = unsafe extern "C" fn(*mut c_void, u32) -> NdiBool;
type FnFindGetCurrentSources = unsafe extern "C" fn(*mut c_void, *mut u32) -> *const NdiSource;
type FnRecvCreateV3 = unsafe extern "C" fn(*const NdiRecvCreateV3) -> *mut c_void;
type FnRecvDestroy = unsafe extern "C" fn(*mut c_void);
type FnRecvConnect = unsafe extern "C" fn(*mut c_void, *const NdiSource);
type FnRecvCaptureV2 =
    unsafe extern "C" fn(*mut c_void, *mut c_void, *mut NdiAudioFrameV2, *mut c_void, u32) -> NdiFrameType;
type FnRecvFreeAudioV2 = unsafe extern "C" fn(*mut c_void, *const NdiAudioFrameV2);

/// Resolved entry points into the NDI shared library. Kept alongside the
/// `Library` handle so the symbols never outlive it.
pub struct NdiLib {
    _lib: Library,
    pub initialize: FnInitialize,
    pub find_create_v2: FnFindCreateV2,
    pub find_destroy: FnFindDestroy,
    pub find_wait_for_sources: FnFindWaitForSources,
    pub find_get_current_sources: FnFindGetCurrentSources,
    pub recv_create_v3: FnRecvCreateV3,
    pub recv_destroy: FnRecvDestroy,
    pub recv_connect: FnRecvConnect,
    pub recv_capture_v2: FnRecvCaptureV2,
    pub recv_free_audio_v2: FnRecvFreeAudioV2,
}

/// Fallback library names tried when `NDI_LIB` is unset, mirroring the
/// original loader's search order.
const FALLBACK_NAMES: &[&str] = &["libndi.so", "/usr/local/lib/libndi.so", "/usr/lib/libndi.so"];

impl NdiLib {
    /// Loads the NDI shared library and resolves every symbol this crate
    /// needs. `ndi_lib_override` takes priority (set from `NDI_LIB`); absent
    /// that, the platform default search names are tried in turn.
    pub fn load(ndi_lib_override: Option<&str>) -> Result<Self, String> {
        let lib = Self::open_library(ndi_lib_override)?;

        unsafe {
            macro_rules! sym {
                ($name:literal) => {{
                    let symbol: Symbol<_> = lib
                        .get($name)
                        .map_err(|e| format!("missing NDI symbol {}: {e}", stringify!($name)))?;
                    *symbol
                }};
            }

            let initialize: FnInitialize = sym!(b"NDIlib_initialize\0");
            let find_create_v2: FnFindCreateV2 = sym!(b"NDIlib_find_create_v2\0");
            let find_destroy: FnFindDestroy = sym!(b"NDIlib_find_destroy\0");
            let find_wait_for_sources: FnFindWaitForSources = sym!(b"NDIlib_find_wait_for_sources\0");
            let find_get_current_sources: FnFindGetCurrentSources = sym!(b"NDIlib_find_get_current_sources\0");
            let recv_create_v3: FnRecvCreateV3 = sym!(b"NDIlib_recv_create_v3\0");
            let recv_destroy: FnRecvDestroy = sym!(b"NDIlib_recv_destroy\0");
            let recv_connect: FnRecvConnect = sym!(b"NDIlib_recv_connect\0");
            let recv_capture_v2: FnRecvCaptureV2 = sym!(b"NDIlib_recv_capture_v2\0");
            let recv_free_audio_v2: FnRecvFreeAudioV2 = sym!(b"NDIlib_recv_free_audio_v2\0");

            if !initialize() {
                return Err("NDIlib_initialize() returned false".to_string());
            }

            Ok(NdiLib {
                _lib: lib,
                initialize,
                find_create_v2,
                find_destroy,
                find_wait_for_sources,
                find_get_current_sources,
                recv_create_v3,
                recv_destroy,
                recv_connect,
                recv_capture_v2,
                recv_free_audio_v2,
            })
        }
    }

    fn open_library(ndi_lib_override: Option<&str>) -> Result<Library, String> {
        if let Some(path) = ndi_lib_override {
            if Path::new(path).exists() {
                return unsafe { Library::new(path) }.map_err(|e| format!("failed to load {path}: {e}"));
            }
            return Err(format!("NDI_LIB path does not exist: {path}"));
        }

        for name in FALLBACK_NAMES {
            if let Ok(lib) = unsafe { Library::new(name) } {
                return Ok(lib);
            }
        }

        Err("could not load libndi; set NDI_LIB=/path/to/libndi.so".to_string())
    }
}
