//! Model loading and backend lifecycle

use crate::error::MtmdError;
use llama_mtmd_sys as sys;
use std::ffi::CString;
use std::ptr::NonNull;
use std::sync::Once;

static BACKEND_INIT: Once = Once::new();

/// Initialize the llama.cpp backend.
///
/// Called automatically by [`LlamaModel::load_from_file`]; calling it again is
/// a no-op.
pub fn backend_init() {
    BACKEND_INIT.call_once(|| unsafe {
        sys::llama_backend_init();
    });
}

/// Parameters for loading a model
#[derive(Debug, Clone)]
pub struct LlamaModelParams {
    /// Number of layers to offload to the GPU
    pub n_gpu_layers: i32,
    /// Memory-map the model file instead of reading it
    pub use_mmap: bool,
}

impl LlamaModelParams {
    /// Set the number of GPU layers
    pub fn with_n_gpu_layers(mut self, n: i32) -> Self {
        self.n_gpu_layers = n;
        self
    }

    /// Set whether the model file is memory-mapped
    pub fn with_use_mmap(mut self, mmap: bool) -> Self {
        self.use_mmap = mmap;
        self
    }
}

impl Default for LlamaModelParams {
    fn default() -> Self {
        Self {
            n_gpu_layers: 0,
            use_mmap: true,
        }
    }
}

/// A loaded text model, exclusive owner of the native `llama_model` handle.
///
/// Shared via `Arc` so the multimodal sub-context can keep the model alive
/// for as long as it needs the text vocabulary.
#[derive(Debug)]
pub struct LlamaModel {
    ptr: NonNull<sys::llama_model>,
}

impl LlamaModel {
    /// Load a GGUF model from disk
    pub fn load_from_file(path: &str, params: LlamaModelParams) -> Result<Self, MtmdError> {
        backend_init();

        let c_path = CString::new(path)?;

        let mut sys_params = unsafe { sys::llama_model_default_params() };
        sys_params.n_gpu_layers = params.n_gpu_layers;
        sys_params.use_mmap = params.use_mmap;

        tracing::debug!(path, n_gpu_layers = params.n_gpu_layers, "loading model");

        let model = unsafe { sys::llama_model_load_from_file(c_path.as_ptr(), sys_params) };

        NonNull::new(model)
            .map(|ptr| Self { ptr })
            .ok_or_else(|| MtmdError::ModelLoadFailed {
                path: path.to_string(),
            })
    }

    /// Get the raw pointer for FFI calls
    pub(crate) fn as_ptr(&self) -> NonNull<sys::llama_model> {
        self.ptr
    }
}

impl Drop for LlamaModel {
    fn drop(&mut self) {
        unsafe {
            sys::llama_model_free(self.ptr.as_ptr());
        }
    }
}

// Safety: LlamaModel can be sent between threads
unsafe impl Send for LlamaModel {}
// Safety: the native model is immutable after loading
unsafe impl Sync for LlamaModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_params_defaults() {
        let params = LlamaModelParams::default();
        assert_eq!(params.n_gpu_layers, 0);
        assert!(params.use_mmap);
    }

    #[test]
    fn model_params_builder() {
        let params = LlamaModelParams::default()
            .with_n_gpu_layers(32)
            .with_use_mmap(false);
        assert_eq!(params.n_gpu_layers, 32);
        assert!(!params.use_mmap);
    }
}
