//! Safe multimodal tokenization and evaluation bindings for llama.cpp.
//!
//! This crate bridges prompt text and decoded media buffers into the engine's
//! multimodal (`mtmd`) pipeline: images and audio become [`Bitmap`]s, batches
//! of bitmaps become [`BitmapCollection`]s, and a prompt plus a collection
//! tokenizes into ordered [`Chunk`]s that are evaluated against a
//! [`SessionContext`], advancing its sequence position.
//!
//! The heavy lifting (vision encoding, token-to-embedding evaluation,
//! KV-cache management, batching) happens inside the native library; this
//! layer owns the marshaling and the lifecycle/sequencing contract around it.
//!
//! ```no_run
//! use llama_mtmd::{
//!     tokenize_and_evaluate, Bitmap, BitmapCollection, LlamaModel, LlamaModelParams,
//!     MtmdParams, SessionContext, SessionParams,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), llama_mtmd::MtmdError> {
//! let model = Arc::new(LlamaModel::load_from_file(
//!     "model.gguf",
//!     LlamaModelParams::default(),
//! )?);
//! let mut session = SessionContext::new(model, SessionParams::default())?;
//! session.attach_multimodal("mmproj.gguf", MtmdParams::default())?;
//!
//! let bitmap = Bitmap::from_encoded_buffer(&session, &std::fs::read("cat.jpg").unwrap())?;
//! let mut bitmaps = BitmapCollection::new();
//! bitmaps.add(&bitmap)?;
//!
//! let report = tokenize_and_evaluate(
//!     &mut session,
//!     "Describe this image: <__media__>",
//!     &bitmaps,
//! )?;
//! println!("processed {} tokens", report.tokens_processed);
//! # Ok(())
//! # }
//! ```

pub mod bitmap;
pub mod chunks;
pub mod collection;
pub mod context;
pub mod error;
pub mod eval;
pub mod model;
pub mod session;

pub use bitmap::{Bitmap, BitmapKind};
pub use chunks::{Chunk, MediaChunkInfo, Token, TokenizedPrompt};
pub use collection::BitmapCollection;
pub use context::{MtmdContext, MtmdParams};
pub use error::MtmdError;
pub use eval::{evaluate, tokenize, tokenize_and_evaluate, EvalReport};
pub use model::{backend_init, LlamaModel, LlamaModelParams};
pub use session::{SessionContext, SessionParams};
