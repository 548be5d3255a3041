//! Build script for vcxkit-core.
//!
//! When the `libvcx` feature is enabled this emits the link directives for the
//! native libvcx library. Without the feature nothing is linked and only the
//! in-memory engine is available.

fn main() {
    println!("cargo:rerun-if-env-changed=LIBVCX_DIR");

    #[cfg(feature = "libvcx")]
    link_libvcx();
}

#[cfg(feature = "libvcx")]
fn link_libvcx() {
    if let Ok(dir) = std::env::var("LIBVCX_DIR") {
        println!("cargo:rustc-link-search=native={dir}");
    }

    // iOS ships libvcx as a static archive inside the framework bundle.
    let target_os = std::env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    match target_os.as_str() {
        "ios" => println!("cargo:rustc-link-lib=static=vcx"),
        _ => println!("cargo:rustc-link-lib=dylib=vcx"),
    }
}
