//! Multimodal sub-context management

use crate::error::MtmdError;
use crate::model::LlamaModel;
use llama_mtmd_sys as sys;
use std::ffi::{CStr, CString};
use std::ptr::NonNull;
use std::sync::Arc;

/// Parameters for creating a multimodal sub-context
#[derive(Debug, Clone)]
pub struct MtmdParams {
    /// Whether to run the projector on the GPU
    pub use_gpu: bool,
    /// Whether to print timing information
    pub print_timings: bool,
    /// Number of threads for media preprocessing
    pub n_threads: i32,
    /// Verbosity level for native logging (0..=4)
    pub verbosity: i32,
    /// Media marker in prompt text; `None` keeps the library default
    pub media_marker: Option<String>,
}

impl Default for MtmdParams {
    fn default() -> Self {
        Self {
            use_gpu: true,
            print_timings: false,
            n_threads: 4,
            verbosity: 0,
            media_marker: None,
        }
    }
}

/// The multimodal sub-context: projector weights plus the media tokenizer.
///
/// Required for any bitmap, tokenize, or evaluate operation. Keeps the text
/// model alive for as long as the projector references its vocabulary.
#[derive(Debug)]
pub struct MtmdContext {
    ptr: NonNull<sys::mtmd_context>,
    _model: Arc<LlamaModel>,
}

impl MtmdContext {
    /// Load a multimodal projector (mmproj GGUF) and bind it to `model`
    pub fn new_from_file(
        mmproj_path: &str,
        model: Arc<LlamaModel>,
        params: MtmdParams,
    ) -> Result<Self, MtmdError> {
        let c_path = CString::new(mmproj_path)?;

        let mut sys_params = unsafe { sys::mtmd_context_params_default() };
        sys_params.use_gpu = params.use_gpu;
        sys_params.print_timings = params.print_timings;
        sys_params.n_threads = params.n_threads;
        sys_params.verbosity = params.verbosity.clamp(0, 4) as sys::ggml_log_level;

        // The CString must outlive the init call.
        let c_marker = params
            .media_marker
            .map(CString::new)
            .transpose()?;

        if let Some(ref marker) = c_marker {
            sys_params.media_marker = marker.as_ptr();
        }

        tracing::debug!(mmproj_path, "loading multimodal projector");

        let ctx = unsafe {
            sys::mtmd_init_from_file(c_path.as_ptr(), model.as_ptr().as_ptr(), sys_params)
        };

        NonNull::new(ctx)
            .map(|ptr| Self { ptr, _model: model })
            .ok_or(MtmdError::InitializationFailed)
    }

    /// Whether the projector accepts image input
    pub fn supports_vision(&self) -> bool {
        unsafe { sys::mtmd_support_vision(self.ptr.as_ptr()) }
    }

    /// Whether the projector accepts audio input
    pub fn supports_audio(&self) -> bool {
        unsafe { sys::mtmd_support_audio(self.ptr.as_ptr()) }
    }

    /// Expected audio sample rate in Hz, or `None` without audio support
    pub fn audio_bitrate(&self) -> Option<i32> {
        let bitrate = unsafe { sys::mtmd_get_audio_bitrate(self.ptr.as_ptr()) };
        (bitrate >= 0).then_some(bitrate)
    }

    /// Whether decoding needs a non-causal attention mask
    pub fn decode_use_non_causal(&self) -> bool {
        unsafe { sys::mtmd_decode_use_non_causal(self.ptr.as_ptr()) }
    }

    /// Whether the model positions media tokens with M-RoPE
    pub fn decode_use_mrope(&self) -> bool {
        unsafe { sys::mtmd_decode_use_mrope(self.ptr.as_ptr()) }
    }

    /// The default media marker string recognized in prompts
    pub fn default_marker() -> &'static str {
        unsafe {
            let ptr = sys::mtmd_default_marker();
            CStr::from_ptr(ptr).to_str().unwrap_or("<__media__>")
        }
    }

    /// Get the raw pointer for FFI calls
    pub(crate) fn as_ptr(&self) -> NonNull<sys::mtmd_context> {
        self.ptr
    }
}

impl Drop for MtmdContext {
    fn drop(&mut self) {
        unsafe {
            sys::mtmd_free(self.ptr.as_ptr());
        }
    }
}

// Safety: MtmdContext can be sent between threads
unsafe impl Send for MtmdContext {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_default_to_gpu_and_default_marker() {
        let params = MtmdParams::default();
        assert!(params.use_gpu);
        assert!(!params.print_timings);
        assert_eq!(params.n_threads, 4);
        assert!(params.media_marker.is_none());
    }
}
