//! Extract every `.npk` file in a directory to sibling output folders.
//!
//! ```sh
//! cargo run --example extract -- ./game_assets
//! ```

use std::path::PathBuf;

use npkit::extract::{ExtractConfig, NullProgress, extract_dir};

fn main() -> npkit::Result<()> {
    tracing_subscriber::fmt::init();

    let dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    let config = ExtractConfig::default();
    extract_dir(&dir, &config, None, Some("de_nxs3"), &NullProgress)?;

    println!("done");
    Ok(())
}
