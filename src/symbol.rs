//! The symbol-drawing and symbol-detection primitives (spec.md §4.2), backed
//! by real QR encoding (`qrcode`) and detection (`rqrr`).
//!
//! Spec.md treats this as an external collaborator reached through a narrow
//! interface (`render`/`detect`); this crate supplies one concrete
//! implementation of that interface so the pipeline is runnable end to end.

use crate::config::ErrorCorrection;
use crate::error::{Reason, Result};
use image::{GrayImage, Luma};

/// A rendered raster: exactly one QR symbol, plus whatever quiet-zone padding
/// was requested or needed to reach a target frame size.
pub type Raster = GrayImage;

/// Renders `data` as a single QR symbol at the given error correction level.
/// Fails with `Reason::CapacityExceeded` (via the caller, who knows the chunk
/// index) when `data` exceeds the level's byte-mode capacity — this function
/// itself reports the qrcode-crate failure, the chunk index is attached by
/// the encoder.
///
/// `target_dimensions`, if given, is achieved via quiet-zone padding (never
/// pixel scaling) so that a QR code's modules always map 1:1 to raster
/// pixels at the configured `module_pixels` size.
pub fn render(
    data: &[u8],
    error_correction: ErrorCorrection,
    quiet_zone_modules: u8,
    module_pixels: u8,
    target_dimensions: Option<(u32, u32)>,
) -> Result<Raster> {
    let code = qrcode::QrCode::with_error_correction_level(data, error_correction.to_qrcode_level())
        .map_err(|error| Reason::invariant(format!("qr encoding failed: {error}")))?;

    let module_pixels = module_pixels.max(1) as u32;

    let mut renderer = code.render::<Luma<u8>>();
    renderer
        .quiet_zone(quiet_zone_modules > 0)
        .module_dimensions(module_pixels, module_pixels);

    let natural = renderer.build();

    // A larger payload needs a higher QR version, hence more modules, hence
    // a physically larger natural image even at a fixed module_pixels. To
    // keep every frame in a video at one fixed size without ever rescaling
    // (rescaling would blur module boundaries and break detection), a
    // smaller-than-target raster is padded with light (quiet) pixels rather
    // than stretched.
    Ok(match target_dimensions {
        Some((width, height)) if width >= natural.width() && height >= natural.height() => {
            pad_to_light_canvas(&natural, width, height)
        }
        _ => natural,
    })
}

fn pad_to_light_canvas(image: &Raster, width: u32, height: u32) -> Raster {
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255]));
    image::imageops::overlay(&mut canvas, image, 0, 0);
    canvas
}

/// Detects and decodes every symbol present in `raster`, concatenating their
/// bytes in detector-reported order, per spec.md §4.2.
///
/// Uses `Grid::decode_to` rather than `Grid::decode`: the latter runs the
/// result through `String::from_utf8`, which would reject arbitrary
/// non-UTF-8 payloads even though the underlying QR byte-mode segment is a
/// faithful byte-for-byte transport.
pub fn detect(raster: &Raster) -> Result<Vec<u8>> {
    let mut prepared = rqrr::PreparedImage::prepare(raster.clone());
    let grids = prepared.detect_grids();

    if grids.is_empty() {
        return Err(Reason::HeaderUnreadable); // callers needing FrameCorrupt remap this
    }

    let mut data = Vec::new();
    for grid in &grids {
        grid.decode_to(&mut data).map_err(|error| Reason::invariant(format!("qr decoding failed: {error}")))?;
    }

    Ok(data)
}
