//! The tokenize-and-evaluate protocol.
//!
//! Couples two native calls through the session's position counter: the
//! tokenizer turns a (prompt, bitmap collection) pair into ordered chunks,
//! and the evaluator feeds those chunks to the model starting at the
//! session's current position. On evaluator success the counter is
//! overwritten with the returned position; on any failure it is left exactly
//! as it was.

use crate::chunks::{InputChunks, TokenizedPrompt};
use crate::collection::BitmapCollection;
use crate::error::MtmdError;
use crate::session::SessionContext;
use llama_mtmd_sys as sys;
use std::ffi::CString;
use tracing::{debug, warn};

/// Multimodal evaluation always runs on sequence 0; multi-sequence
/// evaluation is not supported by this bridge.
const SEQ_ID: sys::llama_seq_id = 0;

/// Summary of a successful evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalReport {
    /// Positions consumed by this call
    pub tokens_processed: i32,
    /// The session position after the call
    pub new_sequence_length: i32,
    /// The session position before the call
    pub previous_sequence_length: i32,
}

/// Tokenize a prompt together with a bitmap collection.
///
/// The prompt is treated as a complete, specially-delimited unit: special
/// tokens are always added and parsed. Media markers in the text are matched
/// against the collection's bitmaps in order. Session state is never touched
/// by this call.
pub fn tokenize(
    session: &mut SessionContext,
    text: &str,
    bitmaps: &BitmapCollection,
) -> Result<TokenizedPrompt, MtmdError> {
    let mctx = session.multimodal_required()?.as_ptr();

    let c_text = CString::new(text)?;
    let input = sys::mtmd_input_text {
        text: c_text.as_ptr(),
        add_special: true,
        parse_special: true,
    };

    let native = InputChunks::new()?;

    // Pointers are borrowed from the collection for the duration of the
    // call; the collection keeps owning the buffers.
    let snapshot = bitmaps.pointer_snapshot();

    debug!(n_bitmaps = snapshot.len(), "tokenizing multimodal prompt");

    let status = unsafe {
        sys::mtmd_tokenize(
            mctx.as_ptr(),
            native.as_ptr().as_ptr(),
            &input,
            snapshot.as_ptr(),
            snapshot.len(),
        )
    };

    match status {
        0 => {}
        1 => return Err(MtmdError::ChunkCountMismatch),
        2 => return Err(MtmdError::ImagePreprocessingFailed),
        code => {
            warn!(code, "tokenizer rejected multimodal input");
            return Err(MtmdError::TokenizeFailed { code });
        }
    }

    let chunks = native.flatten()?;
    debug!(n_chunks = chunks.len(), "tokenized");

    Ok(TokenizedPrompt::new(chunks, native))
}

/// Evaluate a tokenized prompt against the session, advancing its position.
///
/// Chunks are replayed in tokenization order on sequence 0, with logits
/// requested only for the final chunk. On failure the position counter is
/// unchanged; the engine's internal caches may have partially advanced, which
/// this bridge neither observes nor rolls back.
pub fn evaluate(
    session: &mut SessionContext,
    prompt: &TokenizedPrompt,
) -> Result<EvalReport, MtmdError> {
    let mctx = session.multimodal_required()?.as_ptr();
    let lctx = session.ctx_ptr();

    let n_past = session.n_past();
    let n_batch = i32::try_from(session.n_batch()).unwrap_or(i32::MAX);
    let mut new_n_past: sys::llama_pos = 0;

    debug!(n_past, n_batch, "evaluating chunks");

    let status = unsafe {
        sys::mtmd_helper_eval_chunks(
            mctx.as_ptr(),
            lctx.as_ptr(),
            prompt.native().as_ptr().as_ptr(),
            n_past,
            SEQ_ID,
            n_batch,
            true,
            &mut new_n_past,
        )
    };

    if status != 0 {
        warn!(code = status, n_past, "evaluation failed; position unchanged");
        return Err(MtmdError::EvalFailed { code: status });
    }

    session.set_n_past(new_n_past);

    Ok(EvalReport {
        tokens_processed: new_n_past - n_past,
        new_sequence_length: new_n_past,
        previous_sequence_length: n_past,
    })
}

/// Tokenize a prompt and immediately evaluate the resulting chunks.
///
/// The transient chunk list is released before returning regardless of
/// outcome. A tokenizer failure leaves the session untouched; an evaluator
/// failure leaves the position counter at its pre-call value.
pub fn tokenize_and_evaluate(
    session: &mut SessionContext,
    text: &str,
    bitmaps: &BitmapCollection,
) -> Result<EvalReport, MtmdError> {
    let prompt = tokenize(session, text, bitmaps)?;
    evaluate(session, &prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_arithmetic_holds() {
        let report = EvalReport {
            tokens_processed: 300,
            new_sequence_length: 342,
            previous_sequence_length: 42,
        };
        assert_eq!(
            report.new_sequence_length - report.previous_sequence_length,
            report.tokens_processed
        );
        assert!(report.tokens_processed >= 0);
    }

    #[test]
    fn evaluation_is_pinned_to_sequence_zero() {
        assert_eq!(SEQ_ID, 0);
    }
}
