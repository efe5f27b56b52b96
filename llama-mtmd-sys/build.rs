use std::env;
use std::path::PathBuf;

/// Locate and link the prebuilt llama.cpp libraries (`libmtmd`, `libllama`,
/// `libggml`). The `dynamic-link` feature (on by default) expects them on the
/// system linker path or under `LLAMA_MTMD_LIB_DIR`.
fn main() {
    println!("cargo:rerun-if-env-changed=LLAMA_MTMD_LIB_DIR");

    if env::var_os("CARGO_FEATURE_DYNAMIC_LINK").is_none() {
        return;
    }

    if let Some(dir) = env::var_os("LLAMA_MTMD_LIB_DIR") {
        let dir = PathBuf::from(dir);
        println!("cargo:rustc-link-search=native={}", dir.display());
    }

    println!("cargo:rustc-link-lib=dylib=mtmd");
    println!("cargo:rustc-link-lib=dylib=llama");
    println!("cargo:rustc-link-lib=dylib=ggml");
}
