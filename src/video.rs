//! The video container: packs an ordered frame sequence into a single file
//! and reads it back, losslessly (spec.md §4.5).
//!
//! GIF is the concrete container: its palette is indexed, and a bilevel QR
//! raster only ever needs two palette entries, so there is no lossy
//! quantization step between a rendered symbol and its on-disk form. This is
//! the same "pick one concrete collaborator, document the choice" move as
//! `symbol`'s QR backend -- see SPEC_FULL.md §10.

use crate::config::EncodingConfiguration;
use crate::error::{Reason, Result};
use crate::symbol::Raster;
use image::GrayImage;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Writes `frames` to `path` as a GIF, one frame per symbol, in order.
/// Every frame must already share one fixed size (`encoder::reference_dimensions`
/// guarantees this); a frame of a different size than frame 0 is resized with
/// nearest-neighbor filtering, which preserves the hard module edges a QR
/// detector relies on, rather than blurring them (spec.md §4.5's defensive
/// resize).
pub fn write(frames: &[Raster], path: &Path, config: &EncodingConfiguration) -> Result<()> {
    if frames.is_empty() {
        return Err(Reason::invariant("cannot write a video with zero frames"));
    }

    let (width, height) = frames[0].dimensions();
    let (width16, height16) = gif_dimensions(width, height)?;
    let delay_centiseconds = centiseconds_per_frame(config.frames_per_second);

    let file = File::create(path)?;
    let mut encoder = gif::Encoder::new(BufWriter::new(file), width16, height16, &GRAYSCALE_PALETTE)
        .map_err(|error| Reason::invariant(format!("failed to start gif encoder: {error}")))?;
    encoder
        .set_repeat(gif::Repeat::Finite(0))
        .map_err(|error| Reason::invariant(format!("failed to configure gif encoder: {error}")))?;

    for raster in frames {
        let owned;
        let matched = if raster.dimensions() == (width, height) {
            raster
        } else {
            owned = resize_nearest(raster, width, height);
            &owned
        };

        let indexed_pixels = luma_to_palette_indices(matched.as_raw());
        let mut frame = gif::Frame::from_indexed_pixels(width16, height16, indexed_pixels, None);
        frame.delay = delay_centiseconds;
        encoder.write_frame(&frame).map_err(|error| Reason::invariant(format!("failed to write gif frame: {error}")))?;
    }

    info!("qrvid: wrote {} frame(s) ({width}x{height}) to {}", frames.len(), path.display());
    Ok(())
}

/// Reads every frame back from `path`, in the order it was written.
pub fn read(path: &Path) -> Result<Vec<Raster>> {
    let file = File::open(path)?;
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);

    let mut decoder = options
        .read_info(BufReader::new(file))
        .map_err(|error| Reason::invariant(format!("failed to start gif decoder: {error}")))?;

    let width = u32::from(decoder.width());
    let height = u32::from(decoder.height());

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().map_err(|error| Reason::invariant(format!("failed to read gif frame: {error}")))? {
        let luma = palette_indices_to_luma(&frame.buffer);
        let raster = GrayImage::from_raw(width, height, luma)
            .ok_or_else(|| Reason::invariant("gif frame buffer did not match declared dimensions"))?;
        frames.push(raster);
    }

    debug!("qrvid: read {} frame(s) ({width}x{height}) from {}", frames.len(), path.display());
    Ok(frames)
}

/// A two-entry grayscale palette: QR modules are bilevel, and the padding
/// canvas in `symbol::render` only ever uses black (0) and white (255).
const GRAYSCALE_PALETTE: [u8; 6] = [0, 0, 0, 255, 255, 255];

/// A symbol raster is bounded by the QR spec's own largest version, so this
/// only fails if a caller feeds in a target frame size far beyond anything
/// `symbol::render` would ever produce.
fn gif_dimensions(width: u32, height: u32) -> Result<(u16, u16)> {
    let width = u16::try_from(width).map_err(|_| Reason::invariant("frame width exceeds GIF's 16-bit dimension limit"))?;
    let height = u16::try_from(height).map_err(|_| Reason::invariant("frame height exceeds GIF's 16-bit dimension limit"))?;
    Ok((width, height))
}

fn centiseconds_per_frame(frames_per_second: u32) -> u16 {
    let fps = f64::from(frames_per_second.max(1));
    let centiseconds = (100.0 / fps).round();
    if centiseconds < 1.0 { 1 } else { centiseconds as u16 }
}

fn resize_nearest(raster: &Raster, width: u32, height: u32) -> Raster {
    image::imageops::resize(raster, width, height, image::imageops::FilterType::Nearest)
}

/// `GRAYSCALE_PALETTE` has black at index 0 and white at index 1; luma values
/// are thresholded rather than matched exactly, since resizing can introduce
/// intermediate gray values at module boundaries.
fn luma_to_palette_indices(luma: &[u8]) -> Vec<u8> {
    luma.iter().map(|&value| u8::from(value >= 128)).collect()
}

fn palette_indices_to_luma(indices: &[u8]) -> Vec<u8> {
    indices.iter().map(|&index| if index == 0 { 0 } else { 255 }).collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ErrorCorrection;
    use crate::encoder;
    use image::Luma;
    use tempfile_dir::TempDir;

    mod tempfile_dir {
        use std::path::{Path, PathBuf};

        /// A directory under the OS temp root, removed when dropped. Avoids
        /// pulling in a dev-dependency just for test scaffolding.
        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new(label: &str) -> Self {
                let mut path = std::env::temp_dir();
                path.push(format!("qrvid-{label}-{}", std::process::id()));
                std::fs::create_dir_all(&path).unwrap();
                TempDir(path)
            }

            pub fn path(&self) -> &Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    fn config() -> EncodingConfiguration {
        EncodingConfiguration { error_correction: ErrorCorrection::M, enable_multiprocessing: false, ..Default::default() }
    }

    #[test]
    fn frames_round_trip_through_a_gif_losslessly() {
        let dir = TempDir::new("roundtrip");
        let path = dir.path().join("video.gif");

        let config = config();
        let frames = encoder::encode(b"a lossless bilevel round trip", &config).unwrap();
        write(&frames, &path, &config).unwrap();
        let recovered = read(&path).unwrap();

        assert_eq!(recovered.len(), frames.len());
        for (original, recovered) in frames.iter().zip(recovered.iter()) {
            assert_eq!(original.as_raw(), recovered.as_raw());
        }
    }

    #[test]
    fn writing_zero_frames_is_rejected() {
        let dir = TempDir::new("empty");
        let path = dir.path().join("empty.gif");
        let result = write(&[], &path, &config());
        assert!(matches!(result, Err(Reason::InvariantViolation(_))));
    }

    #[test]
    fn a_mismatched_frame_is_resized_to_match_frame_zero_instead_of_failing() {
        let dir = TempDir::new("mismatch");
        let path = dir.path().join("video.gif");

        let first = GrayImage::from_pixel(100, 100, Luma([0]));
        let mismatched = GrayImage::from_pixel(50, 50, Luma([255]));

        write(&[first, mismatched], &path, &config()).unwrap();
        let recovered = read(&path).unwrap();

        assert_eq!(recovered.len(), 2);
        assert_eq!(recovered[0].dimensions(), (100, 100));
        assert_eq!(recovered[1].dimensions(), (100, 100));
    }

    #[test]
    fn frame_rate_sets_the_gif_frame_delay() {
        let mut config = config();
        config.frames_per_second = 25;
        assert_eq!(centiseconds_per_frame(config.frames_per_second), 4);

        config.frames_per_second = 1;
        assert_eq!(centiseconds_per_frame(config.frames_per_second), 100);
    }
}
