//! Error types for the multimodal bridge

use std::ffi::NulError;
use thiserror::Error;

/// Errors that can occur in multimodal bridge operations
#[derive(Debug, Error)]
pub enum MtmdError {
    /// Operation on a bitmap whose native handle was already released
    #[error("Bitmap has been disposed or was not initialized")]
    BitmapDisposed,

    /// The session has no multimodal projector bound
    #[error("No multimodal projector is bound to this session. Load one with attach_multimodal before using bitmaps")]
    MissingMultimodalContext,

    /// Failed to initialize the multimodal context
    #[error("Failed to initialize multimodal context")]
    InitializationFailed,

    /// Failed to load a model file
    #[error("Failed to load model from {path}")]
    ModelLoadFailed { path: String },

    /// Failed to create a llama context from the model
    #[error("Failed to create llama context")]
    ContextCreationFailed,

    /// The external decoder rejected an encoded media buffer
    #[error("Failed to decode media buffer; the format may be unsupported or the data corrupted")]
    DecodeFailed,

    /// RGB buffer length does not match the stated dimensions
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidImageDimensions {
        /// Stated width in pixels
        width: u32,
        /// Stated height in pixels
        height: u32,
    },

    /// Audio sample slice is empty
    #[error("Invalid audio sample count: {count}")]
    InvalidAudioSamples {
        /// Number of samples provided
        count: usize,
    },

    /// Number of bitmaps does not match media markers in the prompt
    #[error("Number of bitmaps does not match the media markers in the prompt")]
    ChunkCountMismatch,

    /// Image preprocessing failed inside the tokenizer
    #[error("Image preprocessing failed")]
    ImagePreprocessingFailed,

    /// Tokenizer returned an unrecognized nonzero status
    #[error("Failed to tokenize multimodal input. Error code: {code}")]
    TokenizeFailed {
        /// Status code returned by the native tokenizer
        code: i32,
    },

    /// Evaluator returned a nonzero status; the session position is unchanged
    #[error("Failed to evaluate multimodal chunks. Error code: {code}")]
    EvalFailed {
        /// Status code returned by the native evaluator
        code: i32,
    },

    /// Null pointer where the native library promised a handle
    #[error("Null pointer encountered")]
    NullPointer,

    /// String conversion error
    #[error("Failed to convert C string: {0}")]
    StringConversion(#[from] NulError),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_codes_are_surfaced_in_messages() {
        let err = MtmdError::TokenizeFailed { code: 7 };
        assert!(err.to_string().contains("7"));

        let err = MtmdError::EvalFailed { code: -3 };
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn disposed_error_mentions_disposal() {
        assert!(MtmdError::BitmapDisposed.to_string().contains("disposed"));
    }

    #[test]
    fn nul_error_converts() {
        let nul = std::ffi::CString::new("a\0b").unwrap_err();
        let err: MtmdError = nul.into();
        assert!(matches!(err, MtmdError::StringConversion(_)));
    }
}
