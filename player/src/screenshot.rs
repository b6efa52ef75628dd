//! PNG frame capture

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use lunaboy_core::FrameSnapshot;

/// Write `frame` to `path` as an 8-bit RGBA PNG.
pub fn save_png(path: &Path, frame: &FrameSnapshot) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create screenshot file {}", path.display()))?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(
        writer,
        FrameSnapshot::WIDTH as u32,
        FrameSnapshot::HEIGHT as u32,
    );
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let mut png_writer = encoder
        .write_header()
        .context("Failed to write PNG header")?;
    png_writer
        .write_image_data(frame.pixels())
        .context("Failed to write PNG data")?;

    tracing::info!("Screenshot saved: {}", path.display());
    Ok(())
}
