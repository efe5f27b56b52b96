//! Drive the multimodal bridge end to end: load a model and its projector,
//! turn an image file into a bitmap, and tokenize + evaluate a prompt
//! referencing it.

use anyhow::{Context, Result};
use clap::Parser;
use llama_mtmd::{
    tokenize, tokenize_and_evaluate, Bitmap, BitmapCollection, Chunk, LlamaModel,
    LlamaModelParams, MtmdContext, MtmdParams, SessionContext, SessionParams,
};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the main model file (GGUF format)
    #[arg(short, long)]
    model: String,

    /// Path to the multimodal projector file (mmproj GGUF)
    #[arg(short = 'p', long)]
    mmproj: String,

    /// Path to the image file to process
    #[arg(short, long)]
    image: String,

    /// Prompt text (use <__media__> as placeholder for the image)
    #[arg(short = 't', long, default_value = "Describe this image in detail: <__media__>")]
    prompt: String,

    /// Number of threads to use
    #[arg(long, default_value_t = 4)]
    threads: i32,

    /// Context size
    #[arg(short = 'c', long, default_value_t = 2048)]
    ctx_size: u32,

    /// Number of GPU layers
    #[arg(short = 'g', long, default_value_t = 0)]
    n_gpu_layers: i32,

    /// Only tokenize; print the chunk layout without evaluating
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    println!("Loading model from: {}", args.model);
    let model = Arc::new(
        LlamaModel::load_from_file(
            &args.model,
            LlamaModelParams::default().with_n_gpu_layers(args.n_gpu_layers),
        )
        .context("Failed to load model")?,
    );

    let mut session = SessionContext::new(
        model,
        SessionParams::default()
            .with_n_ctx(args.ctx_size)
            .with_n_threads(args.threads),
    )
    .context("Failed to create session")?;

    println!("Loading multimodal projector from: {}", args.mmproj);
    session
        .attach_multimodal(
            &args.mmproj,
            MtmdParams {
                use_gpu: args.n_gpu_layers > 0,
                n_threads: args.threads,
                ..MtmdParams::default()
            },
        )
        .context("Failed to load multimodal projector")?;

    let mtmd = session.multimodal().expect("projector was just attached");
    if !mtmd.supports_vision() {
        anyhow::bail!("Model does not support vision input");
    }
    if mtmd.supports_audio() {
        if let Some(bitrate) = mtmd.audio_bitrate() {
            println!("Audio support enabled ({bitrate} Hz)");
        }
    }

    println!("Loading image from: {}", args.image);
    let img = image::open(&args.image).context("Failed to load image")?;
    let rgb = img.to_rgb8();
    let (width, height) = (rgb.width(), rgb.height());
    println!("Image dimensions: {width}x{height}");

    let mut bitmap =
        Bitmap::from_rgb(width, height, &rgb.into_raw()).context("Failed to create bitmap")?;
    bitmap.set_id(&args.image)?;

    let mut bitmaps = BitmapCollection::new();
    bitmaps.add(&bitmap)?;
    // The collection owns its copy; the original is no longer needed.
    bitmap.dispose();

    let prompt = if args.prompt.contains(MtmdContext::default_marker()) {
        args.prompt.clone()
    } else {
        format!("{} {}", args.prompt, MtmdContext::default_marker())
    };

    if args.dry_run {
        let tokenized = tokenize(&mut session, &prompt, &bitmaps)?;
        println!("Tokenized into {} chunks:", tokenized.len());
        for (i, chunk) in tokenized.chunks().iter().enumerate() {
            match chunk {
                Chunk::Text { tokens } => println!("  chunk {i}: text, {} tokens", tokens.len()),
                Chunk::Image { info } => println!(
                    "  chunk {i}: image, {} tokens ({}x{}), {} positions",
                    info.token_count, info.nx, info.ny, info.n_pos
                ),
                Chunk::Audio { info } => {
                    println!("  chunk {i}: audio, {} tokens", info.token_count);
                }
            }
        }
        println!("Total: {} tokens", tokenized.total_tokens());
        return Ok(());
    }

    let report = tokenize_and_evaluate(&mut session, &prompt, &bitmaps)
        .context("Failed to evaluate prompt")?;

    println!(
        "Evaluated {} tokens (position {} -> {})",
        report.tokens_processed, report.previous_sequence_length, report.new_sequence_length
    );

    Ok(())
}
