pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Inserted before the extension of the source file name.
pub const OUTPUT_SUFFIX: &str = "-palettize";
