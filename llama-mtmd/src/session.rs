//! Session contexts: model context, sequence position, multimodal sub-context

use crate::context::{MtmdContext, MtmdParams};
use crate::error::MtmdError;
use crate::model::LlamaModel;
use llama_mtmd_sys as sys;
use std::ptr::NonNull;
use std::sync::Arc;

/// Parameters for creating a session context
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Context window size in tokens (0 uses the model's training value)
    pub n_ctx: u32,
    /// Logical batch size for prompt processing
    pub n_batch: u32,
    /// Number of threads for generation
    pub n_threads: i32,
}

impl SessionParams {
    /// Set the context window size
    pub fn with_n_ctx(mut self, n_ctx: u32) -> Self {
        self.n_ctx = n_ctx;
        self
    }

    /// Set the batch size
    pub fn with_n_batch(mut self, n_batch: u32) -> Self {
        self.n_batch = n_batch;
        self
    }

    /// Set the thread count
    pub fn with_n_threads(mut self, n_threads: i32) -> Self {
        self.n_threads = n_threads;
        self
    }
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            n_ctx: 2048,
            n_batch: 512,
            n_threads: 4,
        }
    }
}

/// One running generation: the model context, its sequence position counter,
/// and the optional multimodal sub-context.
///
/// The position counter tracks how many positions have been committed to the
/// running generation; the tokenize/evaluate bridge reads it as the start
/// position and overwrites it on successful evaluation. `SessionContext` is
/// deliberately not `Sync`: every bridge call takes `&mut self`, so at most
/// one call is in flight per session without internal locking.
#[derive(Debug)]
pub struct SessionContext {
    ctx: NonNull<sys::llama_context>,
    mtmd: Option<MtmdContext>,
    model: Arc<LlamaModel>,
    n_past: sys::llama_pos,
    n_batch: u32,
}

impl SessionContext {
    /// Create a session over `model`
    pub fn new(model: Arc<LlamaModel>, params: SessionParams) -> Result<Self, MtmdError> {
        let mut sys_params = unsafe { sys::llama_context_default_params() };
        sys_params.n_ctx = params.n_ctx;
        sys_params.n_batch = params.n_batch;
        sys_params.n_threads = params.n_threads;
        sys_params.n_threads_batch = params.n_threads;

        let ctx = unsafe { sys::llama_init_from_model(model.as_ptr().as_ptr(), sys_params) };
        let ctx = NonNull::new(ctx).ok_or(MtmdError::ContextCreationFailed)?;

        // The engine may clamp the requested batch size; read back what it
        // actually configured.
        let n_batch = unsafe { sys::llama_n_batch(ctx.as_ptr()) };

        tracing::debug!(n_batch, "session context created");

        Ok(Self {
            ctx,
            mtmd: None,
            model,
            n_past: 0,
            n_batch,
        })
    }

    /// Load a multimodal projector and bind it to this session.
    ///
    /// Replaces any previously bound sub-context.
    pub fn attach_multimodal(
        &mut self,
        mmproj_path: &str,
        params: MtmdParams,
    ) -> Result<(), MtmdError> {
        let mtmd = MtmdContext::new_from_file(mmproj_path, Arc::clone(&self.model), params)?;
        self.mtmd = Some(mtmd);
        Ok(())
    }

    /// The bound multimodal sub-context, if any
    pub fn multimodal(&self) -> Option<&MtmdContext> {
        self.mtmd.as_ref()
    }

    /// The sub-context, or the error every multimodal operation reports
    /// when none is bound
    pub(crate) fn multimodal_required(&self) -> Result<&MtmdContext, MtmdError> {
        self.mtmd.as_ref().ok_or(MtmdError::MissingMultimodalContext)
    }

    /// Positions committed to the running generation so far
    pub fn n_past(&self) -> i32 {
        self.n_past
    }

    pub(crate) fn set_n_past(&mut self, n_past: sys::llama_pos) {
        self.n_past = n_past;
    }

    /// The configured batch size
    pub fn n_batch(&self) -> u32 {
        self.n_batch
    }

    /// The context window size in tokens
    pub fn n_ctx(&self) -> u32 {
        unsafe { sys::llama_n_ctx(self.ctx.as_ptr()) }
    }

    /// Get the raw context pointer for FFI calls
    pub(crate) fn ctx_ptr(&self) -> NonNull<sys::llama_context> {
        self.ctx
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        // The sub-context references the model, not the context; drop order
        // does not matter here.
        unsafe {
            sys::llama_free(self.ctx.as_ptr());
        }
    }
}

// Safety: SessionContext can be sent between threads; it is !Sync because the
// engine is not thread-safe per session.
unsafe impl Send for SessionContext {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_params_defaults() {
        let params = SessionParams::default();
        assert_eq!(params.n_ctx, 2048);
        assert_eq!(params.n_batch, 512);
        assert_eq!(params.n_threads, 4);
    }

    #[test]
    fn session_params_builder() {
        let params = SessionParams::default()
            .with_n_ctx(8192)
            .with_n_batch(1024)
            .with_n_threads(8);
        assert_eq!(params.n_ctx, 8192);
        assert_eq!(params.n_batch, 1024);
        assert_eq!(params.n_threads, 8);
    }
}
