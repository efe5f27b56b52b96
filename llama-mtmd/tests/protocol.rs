//! End-to-end protocol tests against a real model.
//!
//! These need the native libraries plus a vision model; point
//! `LLAMA_MTMD_TEST_MODEL` at a GGUF text model and
//! `LLAMA_MTMD_TEST_MMPROJ` at its multimodal projector to enable them.
//! Without both variables the tests pass vacuously.

use llama_mtmd::{
    evaluate, tokenize, tokenize_and_evaluate, Bitmap, BitmapCollection, Chunk, LlamaModel,
    LlamaModelParams, MtmdContext, MtmdError, MtmdParams, SessionContext, SessionParams,
};
use std::sync::Arc;

fn test_session() -> Option<SessionContext> {
    let model_path = std::env::var("LLAMA_MTMD_TEST_MODEL").ok()?;
    let mmproj_path = std::env::var("LLAMA_MTMD_TEST_MMPROJ").ok()?;

    let model = Arc::new(
        LlamaModel::load_from_file(&model_path, LlamaModelParams::default())
            .expect("test model should load"),
    );
    let mut session = SessionContext::new(model, SessionParams::default())
        .expect("session should initialize");
    session
        .attach_multimodal(&mmproj_path, MtmdParams::default())
        .expect("projector should load");
    Some(session)
}

/// A flat 8x8 RGB test card
fn test_image() -> Bitmap {
    Bitmap::from_rgb(8, 8, &[128u8; 8 * 8 * 3]).expect("raw RGB bitmap")
}

fn native_env_available() -> bool {
    std::env::var("LLAMA_MTMD_TEST_MODEL").is_ok()
        && std::env::var("LLAMA_MTMD_TEST_MMPROJ").is_ok()
}

#[test]
fn bitmap_reports_dimensions_and_fixed_pixel_size() {
    if !native_env_available() {
        return;
    }

    let bitmap = test_image();
    let (width, height) = bitmap.dimensions().unwrap();
    assert_eq!((width, height), (8, 8));

    let data = bitmap.data().unwrap();
    assert_eq!(data.len(), width as usize * height as usize * 3);
}

#[test]
fn disposed_bitmap_fails_all_accessors_and_dispose_stays_silent() {
    if !native_env_available() {
        return;
    }

    let mut bitmap = test_image();
    bitmap.dispose();
    bitmap.dispose();

    assert!(matches!(bitmap.data(), Err(MtmdError::BitmapDisposed)));
    assert!(matches!(bitmap.dimensions(), Err(MtmdError::BitmapDisposed)));
    assert!(matches!(bitmap.id(), Err(MtmdError::BitmapDisposed)));
}

#[test]
fn collection_copy_survives_source_disposal() {
    if !native_env_available() {
        return;
    }

    let mut bitmap = test_image();
    bitmap.set_id("card-1").unwrap();

    let mut collection = BitmapCollection::new();
    collection.add(&bitmap).unwrap();
    bitmap.dispose();

    assert_eq!(collection.len(), 1);
    // The copy is independently owned; clearing releases it without touching
    // the (already disposed) source.
    collection.clear();
    assert!(collection.is_empty());
}

#[test]
fn empty_prompt_with_empty_collection_tokenizes_cleanly() {
    let Some(mut session) = test_session() else {
        return;
    };

    let bitmaps = BitmapCollection::new();
    let prompt = tokenize(&mut session, "", &bitmaps).unwrap();

    // Zero chunks, or a single text chunk holding only special tokens.
    assert!(prompt.len() <= 1);
    if let Some(Chunk::Text { .. }) = prompt.chunks().first() {
    } else {
        assert!(prompt.is_empty());
    }
}

#[test]
fn single_marker_prompt_yields_chunks_in_source_order() {
    let Some(mut session) = test_session() else {
        return;
    };

    let bitmap = test_image();
    let mut bitmaps = BitmapCollection::new();
    bitmaps.add(&bitmap).unwrap();

    let marker = MtmdContext::default_marker();
    let text = format!("Describe this image: {marker} in one word.");
    let prompt = tokenize(&mut session, &text, &bitmaps).unwrap();

    let media_positions: Vec<usize> = prompt
        .chunks()
        .iter()
        .enumerate()
        .filter(|(_, c)| !c.is_text())
        .map(|(i, _)| i)
        .collect();
    assert_eq!(media_positions.len(), 1, "exactly one media chunk expected");

    // [text?, image, text?]: everything around the media chunk is text.
    for (i, chunk) in prompt.chunks().iter().enumerate() {
        if i != media_positions[0] {
            assert!(chunk.is_text());
        }
    }

    match &prompt.chunks()[media_positions[0]] {
        Chunk::Image { info } => {
            assert!(info.token_count > 0);
            assert!(info.nx > 0 && info.ny > 0);
            assert!(info.n_pos >= 0);
        }
        Chunk::Audio { info } => {
            assert!(info.token_count > 0);
        }
        Chunk::Text { .. } => unreachable!(),
    }
}

#[test]
fn marker_count_mismatch_is_a_distinct_error() {
    let Some(mut session) = test_session() else {
        return;
    };

    // One marker, zero bitmaps.
    let bitmaps = BitmapCollection::new();
    let marker = MtmdContext::default_marker();
    let err = tokenize(&mut session, &format!("look: {marker}"), &bitmaps).unwrap_err();
    assert!(matches!(err, MtmdError::ChunkCountMismatch));
    // Tokenize failures never move the position counter.
    assert_eq!(session.n_past(), 0);
}

#[test]
fn evaluation_advances_the_position_counter_consistently() {
    let Some(mut session) = test_session() else {
        return;
    };

    let bitmap = test_image();
    let mut bitmaps = BitmapCollection::new();
    bitmaps.add(&bitmap).unwrap();

    let before = session.n_past();
    let marker = MtmdContext::default_marker();
    let report =
        tokenize_and_evaluate(&mut session, &format!("What is {marker}?"), &bitmaps).unwrap();

    assert_eq!(report.previous_sequence_length, before);
    assert_eq!(
        report.new_sequence_length - report.previous_sequence_length,
        report.tokens_processed
    );
    assert!(report.tokens_processed >= 0);
    assert_eq!(session.n_past(), report.new_sequence_length);
}

#[test]
fn separate_tokenize_then_evaluate_consumes_the_original_chunks() {
    let Some(mut session) = test_session() else {
        return;
    };

    let prompt = tokenize(&mut session, "Hello.", &BitmapCollection::new()).unwrap();
    let total = prompt.total_tokens();

    let report = evaluate(&mut session, &prompt).unwrap();
    assert_eq!(report.tokens_processed as usize, total);
    assert_eq!(session.n_past(), report.new_sequence_length);
}

#[test]
fn bitmap_requires_a_bound_projector() {
    let Some(model_path) = std::env::var("LLAMA_MTMD_TEST_MODEL").ok() else {
        return;
    };

    let model = Arc::new(
        LlamaModel::load_from_file(&model_path, LlamaModelParams::default()).unwrap(),
    );
    let session = SessionContext::new(model, SessionParams::default()).unwrap();

    // No attach_multimodal: decode must fail before any native decode call.
    let err = Bitmap::from_encoded_buffer(&session, &[0u8; 16]).unwrap_err();
    assert!(matches!(err, MtmdError::MissingMultimodalContext));
}
