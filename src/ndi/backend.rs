//! Safe wrapper around [`ffi::NdiLib`]: source discovery and audio receive.

use super::ffi::{
    NdiAudioFrameV2, NdiFindCreate, NdiLib, NdiRecvCreateV3, NdiSource, FRAME_TYPE_AUDIO,
    FRAME_TYPE_ERROR,
};
use crate::audio_frame::AudioFrame;
use std::ffi::{CStr, CString};
use std::os::raw::c_void;
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

/// Loads the NDI SDK once and hands out receivers against it.
pub struct NdiBackend {
    lib: Arc<NdiLib>,
}

impl NdiBackend {
    pub fn load(ndi_lib_override: Option<&str>) -> Result<Self, String> {
        let lib = NdiLib::load(ndi_lib_override)?;
        Ok(NdiBackend { lib: Arc::new(lib) })
    }

    /// Discovers NDI sources currently visible on the network.
    pub fn list_sources(&self, timeout: Duration) -> Result<Vec<String>, String> {
        let finder = Finder::create(&self.lib)?;
        finder.wait_for_sources(timeout);
        let mut names: Vec<String> = finder.current_sources().into_iter().map(|(name, _)| name).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Best-effort lookup of a source's `p_url_address`, used so a connect
    /// doesn't have to hold onto finder-owned pointers (see [`NdiReceiver::connect`]).
    fn lookup_source_url(&self, name: &str, timeout: Duration) -> Option<String> {
        let finder = Finder::create(&self.lib).ok()?;
        finder.wait_for_sources(timeout);
        finder
            .current_sources()
            .into_iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, url)| url)
    }

    /// Connects to a named NDI source and returns a receiver positioned to
    /// yield audio frames.
    pub fn connect(&self, source_name: &str, recv_name: &str) -> Result<NdiReceiver, String> {
        let url = self.lookup_source_url(source_name, Duration::from_millis(500));

        // Own the name/url bytes ourselves: the NDIlib_source_t returned by
        // the finder must not be reused once its finder is destroyed.
        let name_c = CString::new(source_name).map_err(|e| e.to_string())?;
        let url_c = url.map(|u| CString::new(u).map_err(|e| e.to_string())).transpose()?;
        let recv_name_c = CString::new(recv_name).map_err(|e| e.to_string())?;

        let source = NdiSource {
            p_ndi_name: name_c.as_ptr(),
            p_url_address: url_c.as_ref().map(|u| u.as_ptr()).unwrap_or(ptr::null()),
        };

        let create = NdiRecvCreateV3 {
            source_to_connect_to: source,
            color_format: 0,
            bandwidth: 0,
            allow_video_fields: false,
            p_ndi_recv_name: recv_name_c.as_ptr(),
        };

        let handle = unsafe { (self.lib.recv_create_v3)(&create) };
        if handle.is_null() {
            return Err(format!("NDIlib_recv_create_v3 failed for source '{source_name}'"));
        }
        unsafe { (self.lib.recv_connect)(handle, &source) };

        Ok(NdiReceiver {
            lib: self.lib.clone(),
            handle,
            _name_c: name_c,
            _url_c: url_c,
            running: true,
        })
    }
}

/// RAII wrapper around `NDIlib_find_create_v2`/`find_destroy`.
struct Finder<'a> {
    lib: &'a NdiLib,
    handle: *mut c_void,
}

impl<'a> Finder<'a> {
    fn create(lib: &'a NdiLib) -> Result<Self, String> {
        let settings = NdiFindCreate {
            show_local_sources: true,
            p_groups: ptr::null(),
            p_extra_ips: ptr::null(),
        };
        let handle = unsafe { (lib.find_create_v2)(&settings) };
        if handle.is_null() {
            return Err("NDIlib_find_create_v2 failed".to_string());
        }
        Ok(Finder { lib, handle })
    }

    fn wait_for_sources(&self, timeout: Duration) {
        unsafe { (self.lib.find_wait_for_sources)(self.handle, timeout.as_millis() as u32) };
    }

    fn current_sources(&self) -> Vec<(String, Option<String>)> {
        let mut count: u32 = 0;
        let sources = unsafe { (self.lib.find_get_current_sources)(self.handle, &mut count) };
        if sources.is_null() || count == 0 {
            return Vec::new();
        }
        let mut out = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            let src = unsafe { &*sources.add(i) };
            if src.p_ndi_name.is_null() {
                continue;
            }
            let name = unsafe { CStr::from_ptr(src.p_ndi_name) }.to_string_lossy().into_owned();
            let url = if src.p_url_address.is_null() {
                None
            } else {
                Some(unsafe { CStr::from_ptr(src.p_url_address) }.to_string_lossy().into_owned())
            };
            out.push((name, url));
        }
        out
    }
}

impl Drop for Finder<'_> {
    fn drop(&mut self) {
        unsafe { (self.lib.find_destroy)(self.handle) };
    }
}

/// An open receive connection to one NDI source.
///
/// Carries its own owned copies of the connected source's name/url bytes
/// (`_name_c`/`_url_c`) for the lifetime of the connection, rather than
/// pointers borrowed from a (by-then-destroyed) finder.
pub struct NdiReceiver {
    lib: Arc<NdiLib>,
    handle: *mut c_void,
    _name_c: CString,
    _url_c: Option<CString>,
    running: bool,
}

// The handle is an opaque pointer the SDK itself treats as thread-affine
// only in the sense of "one thread capturing at a time", which is exactly
// how this type is used: moved once into a single blocking worker thread.
unsafe impl Send for NdiReceiver {}

impl NdiReceiver {
    /// Captures the next frame, blocking up to `timeout`. Returns `Ok(None)`
    /// for non-audio frame types (video/metadata/status-change/none, none of
    /// which this gateway carries) and for unsupported audio formats.
    pub fn next_frame(&mut self, timeout: Duration) -> Result<Option<AudioFrame>, String> {
        if !self.running {
            return Err("receiver not connected".to_string());
        }

        let mut audio = NdiAudioFrameV2::default();
        let frame_type = unsafe {
            (self.lib.recv_capture_v2)(
                self.handle,
                ptr::null_mut(),
                &mut audio,
                ptr::null_mut(),
                timeout.as_millis() as u32,
            )
        };

        if frame_type != FRAME_TYPE_AUDIO {
            if frame_type == FRAME_TYPE_ERROR {
                return Err("NDI stream reported a fatal frame error".to_string());
            }
            return Ok(None);
        }

        let frame = decode_audio_frame(&audio);
        unsafe { (self.lib.recv_free_audio_v2)(self.handle, &audio) };
        Ok(frame)
    }

    pub fn close(&mut self) {
        if self.running {
            unsafe { (self.lib.recv_destroy)(self.handle) };
            self.running = false;
        }
    }
}

impl Drop for NdiReceiver {
    fn drop(&mut self) {
        self.close();
    }
}

/// Converts one captured `NDIlib_audio_frame_v2_t` into an owned [`AudioFrame`],
/// rejecting frames the repacketizer could never use (mono, empty, no data).
/// Free function (no `NdiLib` dependency) so it's testable without a loaded
/// NDI shared library.
fn decode_audio_frame(audio: &NdiAudioFrameV2) -> Option<AudioFrame> {
    if audio.no_samples <= 0 || audio.p_data.is_null() || audio.no_channels < 2 {
        return None;
    }
    let stride_floats = (audio.channel_stride_in_bytes / 4).max(audio.no_samples) as usize;
    let no_channels = audio.no_channels as usize;
    let no_samples = audio.no_samples as usize;
    let total = stride_floats * no_channels;

    let planes = unsafe { std::slice::from_raw_parts(audio.p_data, total) }.to_vec();

    Some(AudioFrame::from_planar(
        audio.sample_rate as u32,
        no_channels as u16,
        no_samples,
        stride_floats,
        planes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with(planes: &mut [f32], no_channels: i32, no_samples: i32, stride_bytes: i32) -> NdiAudioFrameV2 {
        NdiAudioFrameV2 {
            sample_rate: 48_000,
            no_channels,
            no_samples,
            timecode: 0,
            p_data: planes.as_mut_ptr(),
            channel_stride_in_bytes: stride_bytes,
            p_metadata: ptr::null(),
            timestamp: 0,
        }
    }

    #[test]
    fn decodes_tightly_packed_stereo_frame() {
        let mut planes = vec![0.1f32, 0.2, 0.3, -0.1, -0.2, -0.3];
        let audio = frame_with(&mut planes, 2, 3, 3 * 4);
        let frame = decode_audio_frame(&audio).unwrap();
        assert_eq!(frame.sample_rate, 48_000);
        assert_eq!(frame.channel_count, 2);
        assert_eq!(frame.samples_per_channel, 3);
        assert_eq!(frame.channel(0), &[0.1, 0.2, 0.3]);
        assert_eq!(frame.channel(1), &[-0.1, -0.2, -0.3]);
    }

    #[test]
    fn decodes_padded_channel_stride() {
        // stride is 4 floats/channel but only 3 samples are valid.
        let mut planes = vec![1.0f32, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0];
        let audio = frame_with(&mut planes, 2, 3, 4 * 4);
        let frame = decode_audio_frame(&audio).unwrap();
        assert_eq!(frame.channel(0), &[1.0, 2.0, 3.0]);
        assert_eq!(frame.channel(1), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn rejects_mono_and_empty_frames() {
        let mut mono = vec![0.0f32; 4];
        let mono_frame = frame_with(&mut mono, 1, 4, 4 * 4);
        assert!(decode_audio_frame(&mono_frame).is_none());

        let mut stereo = vec![0.0f32; 4];
        let empty_frame = frame_with(&mut stereo, 2, 0, 4 * 4);
        assert!(decode_audio_frame(&empty_frame).is_none());

        let null_frame = NdiAudioFrameV2 { no_samples: 4, no_channels: 2, ..NdiAudioFrameV2::default() };
        assert!(decode_audio_frame(&null_frame).is_none());
    }
}
