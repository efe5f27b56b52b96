//! Tokenization output: native chunk lists and their flattened form

use crate::error::MtmdError;
use llama_mtmd_sys as sys;
use std::ffi::CStr;
use std::ptr::NonNull;

/// A single text token id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token(pub sys::llama_token);

/// Metadata describing an image or audio token block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaChunkInfo {
    /// Number of tokens the block occupies in the sequence
    pub token_count: usize,
    /// Spatial width in tokens (0 for audio)
    pub nx: usize,
    /// Spatial height in tokens (0 for audio)
    pub ny: usize,
    /// Identifier carried over from the source bitmap, if any
    pub id: Option<String>,
    /// Number of sequence positions the block contributes
    pub n_pos: i32,
}

/// One unit of tokenized input.
///
/// Chunk order matches the order text and media markers appear in the source
/// prompt; evaluation replays chunks in this order to keep sequence positions
/// consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    /// A run of text tokens
    Text {
        /// Token ids in prompt order
        tokens: Vec<Token>,
    },
    /// An image token block
    Image {
        /// Block metadata from the vision encoder
        info: MediaChunkInfo,
    },
    /// An audio token block
    Audio {
        /// Block metadata from the audio encoder
        info: MediaChunkInfo,
    },
}

impl Chunk {
    /// Number of tokens this chunk occupies
    pub fn token_count(&self) -> usize {
        match self {
            Chunk::Text { tokens } => tokens.len(),
            Chunk::Image { info } | Chunk::Audio { info } => info.token_count,
        }
    }

    /// Whether this is a text chunk
    pub fn is_text(&self) -> bool {
        matches!(self, Chunk::Text { .. })
    }
}

/// Exclusive owner of a native `mtmd_input_chunks` list
#[derive(Debug)]
pub(crate) struct InputChunks {
    ptr: NonNull<sys::mtmd_input_chunks>,
}

impl InputChunks {
    pub(crate) fn new() -> Result<Self, MtmdError> {
        let ptr = unsafe { sys::mtmd_input_chunks_init() };
        NonNull::new(ptr)
            .map(|ptr| Self { ptr })
            .ok_or(MtmdError::InitializationFailed)
    }

    pub(crate) fn as_ptr(&self) -> NonNull<sys::mtmd_input_chunks> {
        self.ptr
    }

    pub(crate) fn len(&self) -> usize {
        unsafe { sys::mtmd_input_chunks_size(self.ptr.as_ptr()) }
    }

    /// Total token count across all chunks
    pub(crate) fn total_tokens(&self) -> usize {
        unsafe { sys::mtmd_helper_get_n_tokens(self.ptr.as_ptr()) }
    }

    /// Flatten the native list into owned [`Chunk`] values, preserving order
    pub(crate) fn flatten(&self) -> Result<Vec<Chunk>, MtmdError> {
        let mut out = Vec::with_capacity(self.len());

        for i in 0..self.len() {
            let chunk = unsafe { sys::mtmd_input_chunks_get(self.ptr.as_ptr(), i) };
            if chunk.is_null() {
                return Err(MtmdError::NullPointer);
            }
            out.push(unsafe { flatten_chunk(chunk) }?);
        }

        Ok(out)
    }
}

impl Drop for InputChunks {
    fn drop(&mut self) {
        unsafe {
            sys::mtmd_input_chunks_free(self.ptr.as_ptr());
        }
    }
}

// Safety: InputChunks exclusively owns its native list
unsafe impl Send for InputChunks {}

unsafe fn flatten_chunk(chunk: *const sys::mtmd_input_chunk) -> Result<Chunk, MtmdError> {
    match sys::mtmd_input_chunk_get_type(chunk) {
        sys::mtmd_input_chunk_type::MTMD_INPUT_CHUNK_TYPE_TEXT => {
            let mut n_tokens = 0usize;
            let tokens_ptr = sys::mtmd_input_chunk_get_tokens_text(chunk, &mut n_tokens);

            let tokens = if tokens_ptr.is_null() || n_tokens == 0 {
                Vec::new()
            } else {
                std::slice::from_raw_parts(tokens_ptr, n_tokens)
                    .iter()
                    .map(|&t| Token(t))
                    .collect()
            };

            Ok(Chunk::Text { tokens })
        }
        sys::mtmd_input_chunk_type::MTMD_INPUT_CHUNK_TYPE_IMAGE => {
            let image = sys::mtmd_input_chunk_get_tokens_image(chunk);
            if image.is_null() {
                return Err(MtmdError::NullPointer);
            }

            Ok(Chunk::Image {
                info: MediaChunkInfo {
                    token_count: sys::mtmd_image_tokens_get_n_tokens(image),
                    nx: sys::mtmd_image_tokens_get_nx(image),
                    ny: sys::mtmd_image_tokens_get_ny(image),
                    id: c_str_to_owned(sys::mtmd_image_tokens_get_id(image))?,
                    n_pos: sys::mtmd_image_tokens_get_n_pos(image),
                },
            })
        }
        sys::mtmd_input_chunk_type::MTMD_INPUT_CHUNK_TYPE_AUDIO => {
            // Audio blocks have no spatial grid; the generic chunk accessors
            // carry everything else.
            Ok(Chunk::Audio {
                info: MediaChunkInfo {
                    token_count: sys::mtmd_input_chunk_get_n_tokens(chunk),
                    nx: 0,
                    ny: 0,
                    id: c_str_to_owned(sys::mtmd_input_chunk_get_id(chunk))?,
                    n_pos: sys::mtmd_input_chunk_get_n_pos(chunk),
                },
            })
        }
    }
}

unsafe fn c_str_to_owned(ptr: *const std::os::raw::c_char) -> Result<Option<String>, MtmdError> {
    if ptr.is_null() {
        Ok(None)
    } else {
        Ok(Some(CStr::from_ptr(ptr).to_str()?.to_string()))
    }
}

/// The result of tokenizing a (prompt, bitmap collection) pair.
///
/// Holds the flattened chunk descriptions alongside the live native chunk
/// list, so a later [`evaluate`](crate::eval::evaluate) call can feed the
/// original chunks to the engine instead of reconstructing them.
#[derive(Debug)]
pub struct TokenizedPrompt {
    chunks: Vec<Chunk>,
    native: InputChunks,
}

impl TokenizedPrompt {
    pub(crate) fn new(chunks: Vec<Chunk>, native: InputChunks) -> Self {
        Self { chunks, native }
    }

    /// The chunks in prompt order
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether tokenization produced no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Total token count across all chunks
    pub fn total_tokens(&self) -> usize {
        self.native.total_tokens()
    }

    pub(crate) fn native(&self) -> &InputChunks {
        &self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_token_count_covers_both_variants() {
        let text = Chunk::Text {
            tokens: vec![Token(1), Token(2), Token(3)],
        };
        assert_eq!(text.token_count(), 3);
        assert!(text.is_text());

        let image = Chunk::Image {
            info: MediaChunkInfo {
                token_count: 256,
                nx: 16,
                ny: 16,
                id: Some("img-0".to_string()),
                n_pos: 256,
            },
        };
        assert_eq!(image.token_count(), 256);
        assert!(!image.is_text());
    }

    #[test]
    fn audio_chunks_have_no_spatial_grid() {
        let audio = Chunk::Audio {
            info: MediaChunkInfo {
                token_count: 100,
                nx: 0,
                ny: 0,
                id: None,
                n_pos: 100,
            },
        };
        match audio {
            Chunk::Audio { info } => {
                assert_eq!(info.nx, 0);
                assert_eq!(info.ny, 0);
            }
            _ => unreachable!(),
        }
    }
}
