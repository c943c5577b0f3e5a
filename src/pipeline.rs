//! The orchestrator tying `serializer`, `symbol`, `encoder`, and `video`
//! together into the encode/decode/run operations of spec.md §4.4.

use crate::config::EncodingConfiguration;
use crate::encoder;
use crate::error::{Reason, Result};
use crate::serializer::{IdentitySerializer, Serializer};
use crate::symbol::{self, Raster};
use crate::video;
use log::{debug, info, warn};
use std::path::Path;

/// Overrides applied to the configuration recovered from frame 0 at decode
/// time. Only the two fields that affect observability, never output bytes,
/// are overridable -- see `EncodingConfiguration`'s invariant doc comment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigOverride {
    pub show_decoding_window: Option<bool>,
    pub verbose: Option<bool>,
}

impl ConfigOverride {
    fn apply(self, config: &mut EncodingConfiguration) {
        if let Some(value) = self.show_decoding_window {
            config.show_decoding_window = value;
        }
        if let Some(value) = self.verbose {
            config.verbose = value;
        }
    }
}

/// Renders the header blob at its own natural QR size. The header blob is
/// never chunked -- `render` always produces exactly one raster per call --
/// so the "exactly one header frame" invariant of spec.md §4.4 holds by
/// construction; we still check blob size against capacity explicitly,
/// since a schema change that grows the header blob should fail loudly
/// rather than silently wrapping into a second frame that nothing
/// downstream expects.
///
/// Returns the natural, unpadded raster alongside the blob: the header's own
/// QR version is independent of `effective_segment_size`, so its natural
/// size can exceed the payload frames' reference size, and the caller needs
/// both sizes to settle on one target that bounds both.
fn render_header_natural(config: &EncodingConfiguration) -> Result<(Vec<u8>, Raster)> {
    let blob = config.write_header_frame_payload()?;
    let max = config.error_correction.max_bytes();
    if blob.len() > max {
        return Err(Reason::CapacityExceeded { chunk_index: 0, len: blob.len(), max });
    }

    let natural = symbol::render(&blob, config.error_correction, config.quiet_zone_modules, config.module_pixels, None)?;
    Ok((blob, natural))
}

fn read_header_frame(frame: &Raster) -> Result<EncodingConfiguration> {
    let bytes = symbol::detect(frame).map_err(|_| Reason::HeaderUnreadable)?;
    EncodingConfiguration::read_header_frame_payload(&bytes)
}

/// The full pipeline: a byte/wire-form `Serializer` plus a pluggable
/// round-trip validator (spec.md §4.4's `run`, default bytewise equality).
pub struct Pipeline<S: Serializer = IdentitySerializer> {
    serializer: S,
    validate: Box<dyn Fn(&[u8], &[u8]) -> bool>,
}

impl<S: Serializer + std::fmt::Debug> std::fmt::Debug for Pipeline<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline").field("serializer", &self.serializer).finish_non_exhaustive()
    }
}

impl Default for Pipeline<IdentitySerializer> {
    fn default() -> Self {
        Pipeline::new(IdentitySerializer)
    }
}

impl<S: Serializer> Pipeline<S> {
    pub fn new(serializer: S) -> Self {
        Pipeline { serializer, validate: Box::new(|input, output| input == output) }
    }

    pub fn with_validation(serializer: S, validate: impl Fn(&[u8], &[u8]) -> bool + 'static) -> Self {
        Pipeline { serializer, validate: Box::new(validate) }
    }

    /// Frame 0 (the header) followed by one frame per payload chunk, per
    /// spec.md §4.4 step "Encode".
    ///
    /// The header and payload frames are rendered to one shared target size:
    /// the header blob's own QR version is independent of
    /// `effective_segment_size` and can naturally need more modules than a
    /// payload chunk, so the target is the larger of the two natural sizes,
    /// not just the payload's (spec.md §3's "all frames in one video have
    /// identical dimensions" invariant).
    pub fn encode_to_frames(&self, payload: &[u8], config: &EncodingConfiguration) -> Result<Vec<Raster>> {
        let wire_bytes = self.serializer.serialize(payload);

        let (blob, header_natural) = render_header_natural(config)?;
        let payload_reference = encoder::reference_dimensions(config)?;

        let header_dimensions = header_natural.dimensions();
        let target = (header_dimensions.0.max(payload_reference.0), header_dimensions.1.max(payload_reference.1));
        debug!("qrvid: header natural size {header_dimensions:?}, payload reference size {payload_reference:?}, target {target:?}");

        let header_frame = if header_dimensions == target {
            header_natural
        } else {
            symbol::render(&blob, config.error_correction, config.quiet_zone_modules, config.module_pixels, Some(target))?
        };

        let mut frames = Vec::with_capacity(1);
        frames.push(header_frame);
        frames.extend(encoder::encode_with_target(&wire_bytes, config, target)?);

        info!("qrvid: encoded {} payload byte(s) into {} frame(s)", payload.len(), frames.len());
        Ok(frames)
    }

    /// Encodes `payload` and writes the resulting frames to `path` as a
    /// video.
    pub fn encode(&self, payload: &[u8], config: &EncodingConfiguration, path: &Path) -> Result<()> {
        let frames = self.encode_to_frames(payload, config)?;
        video::write(&frames, path, config)
    }

    /// Recovers the original payload from an in-memory frame sequence: reads
    /// frame 0 to recover the configuration used at encode, applies
    /// `overrides`, then decodes and deserializes the remaining frames.
    pub fn decode_from_frames(&self, frames: &[Raster], overrides: ConfigOverride) -> Result<Vec<u8>> {
        let (header, payload_frames) = frames.split_first().ok_or(Reason::EmptyInput)?;

        let mut config = read_header_frame(header)?;
        overrides.apply(&mut config);
        debug!("qrvid: recovered header config {config:?}, decoding {} payload frame(s)", payload_frames.len());

        let wire_bytes = encoder::decode(payload_frames, 1, &config)?;
        let payload = self.serializer.deserialize(&wire_bytes)?;
        info!("qrvid: decoded {} frame(s) into {} payload byte(s)", frames.len(), payload.len());
        Ok(payload)
    }

    /// Recovers the original payload either from an already-loaded frame
    /// sequence or, failing that, by reading `path`. Per spec.md §4.4,
    /// calling this with neither is `EmptyInput`.
    pub fn decode(&self, path: Option<&Path>, frames: Option<&[Raster]>, overrides: ConfigOverride) -> Result<Vec<u8>> {
        match frames {
            Some(frames) => self.decode_from_frames(frames, overrides),
            None => {
                let path = path.ok_or(Reason::EmptyInput)?;
                let frames = video::read(path)?;
                self.decode_from_frames(&frames, overrides)
            }
        }
    }

    /// Encodes `payload` to `path`, decodes it back, and validates the
    /// round trip.
    ///
    /// `mock`, when true, still runs the payload through the real
    /// serializer/symbol/encoder stages -- `encode_to_frames` then
    /// `decode_from_frames` on that same in-memory frame sequence -- but
    /// skips only step 2 of spec.md §4.4's `run`: the `video_handler.write`
    /// then `video_handler.read` round trip through `path` that checks the
    /// container's own losslessness. This is what makes the §8
    /// "losslessness propagation" property (`run(mock=true) ==
    /// run(mock=false)`) an actual test of the container boundary in
    /// isolation, rather than a test that never touches the QR/frame path.
    pub fn run(&self, payload: &[u8], path: &Path, config: &EncodingConfiguration, mock: bool) -> Result<Vec<u8>> {
        let recovered = if mock {
            let frames = self.encode_to_frames(payload, config)?;
            self.decode_from_frames(&frames, ConfigOverride::default())?
        } else {
            self.encode(payload, config, path)?;
            self.decode(Some(path), None, ConfigOverride::default())?
        };

        if (self.validate)(payload, &recovered) {
            Ok(recovered)
        } else {
            warn!("qrvid: round trip validation failed for a {}-byte payload (mock={mock})", payload.len());
            Err(Reason::ValidationFailed)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ErrorCorrection;
    use crate::serializer::Base64Serializer;
    use std::path::PathBuf;

    struct TempFile(PathBuf);

    impl TempFile {
        fn new(label: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("qrvid-pipeline-{label}-{}.gif", std::process::id()));
            TempFile(path)
        }
    }

    impl Drop for TempFile {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn config(error_correction: ErrorCorrection) -> EncodingConfiguration {
        EncodingConfiguration { error_correction, enable_multiprocessing: false, ..Default::default() }
    }

    #[test]
    fn header_frame_is_larger_than_a_tiny_payload_chunk_but_frames_still_match_and_decode() {
        // A small chunk_size keeps every payload frame at QR's smallest
        // version, while the header blob (several fixed fields plus the
        // 4-byte length prefix) naturally needs a larger version -- the
        // header must not be left unpadded and bigger than the payload
        // frames it travels alongside.
        let pipeline = Pipeline::default();
        let config = EncodingConfiguration {
            error_correction: ErrorCorrection::M,
            chunk_size: Some(8),
            enable_multiprocessing: false,
            ..Default::default()
        };

        let frames = pipeline.encode_to_frames(b"tiny chunks, big header", &config).unwrap();
        assert!(frames.len() > 1);

        let first_dims = frames[0].dimensions();
        assert!(frames.iter().all(|frame| frame.dimensions() == first_dims), "every frame, header included, must share one size");

        let recovered = pipeline.decode_from_frames(&frames, ConfigOverride::default()).unwrap();
        assert_eq!(recovered, b"tiny chunks, big header");
    }

    #[test]
    fn header_frame_is_always_exactly_one_frame() {
        let pipeline = Pipeline::default();
        let config = config(ErrorCorrection::M);
        let frames = pipeline.encode_to_frames(b"", &config).unwrap();
        assert_eq!(frames.len(), 1, "empty payload still carries exactly the header frame");
    }

    #[test]
    fn empty_payload_round_trips_to_an_empty_payload() {
        let file = TempFile::new("empty");
        let pipeline = Pipeline::default();
        let config = config(ErrorCorrection::M);

        let recovered = pipeline.run(b"", &file.0, &config, false).unwrap();
        assert_eq!(recovered, Vec::<u8>::new());
    }

    #[test]
    fn hello_world_round_trips_at_level_m() {
        let file = TempFile::new("hello");
        let pipeline = Pipeline::default();
        let config = config(ErrorCorrection::M);

        let recovered = pipeline.run(b"Hello World", &file.0, &config, false).unwrap();
        assert_eq!(recovered, b"Hello World");
    }

    #[test]
    fn byte_restricted_payload_round_trips_with_base64_at_level_h() {
        let file = TempFile::new("base64");
        let pipeline = Pipeline::new(Base64Serializer);
        let config = config(ErrorCorrection::H);

        let payload = [0xff_u8, 0xfe, 0xfd, 0xfa, 0x00, 0x01, 0xf0, 0xc1, 0xc0, 0x80];
        let recovered = pipeline.run(&payload, &file.0, &config, false).unwrap();
        assert_eq!(recovered, payload);
    }

    #[test]
    fn decode_with_neither_path_nor_frames_is_empty_input() {
        let pipeline = Pipeline::default();
        let result = pipeline.decode(None, None, ConfigOverride::default());
        assert!(matches!(result, Err(Reason::EmptyInput)));
    }

    #[test]
    fn config_override_changes_only_observability_fields() {
        let file = TempFile::new("override");
        let pipeline = Pipeline::default();
        let mut config = config(ErrorCorrection::M);
        config.verbose = false;

        pipeline.encode(b"override probe", &config, &file.0).unwrap();

        let overrides = ConfigOverride { verbose: Some(true), show_decoding_window: Some(true) };
        let recovered = pipeline.decode(Some(&file.0), None, overrides).unwrap();
        assert_eq!(recovered, b"override probe");
    }

    #[test]
    fn mock_run_exercises_the_real_frame_path_without_touching_disk() {
        let pipeline = Pipeline::new(Base64Serializer);
        let config = config(ErrorCorrection::L);
        let missing_path = PathBuf::from("/nonexistent/path/should/not/be/touched.gif");

        let recovered = pipeline.run(b"mock path never touches disk", &missing_path, &config, true).unwrap();
        assert_eq!(recovered, b"mock path never touches disk");
        assert!(!missing_path.exists());
    }

    #[test]
    fn mock_run_matches_encode_to_frames_then_decode_from_frames_directly() {
        // mock=true must be exactly `encode_to_frames` then
        // `decode_from_frames` on that in-memory sequence, not a shortcut
        // around the serializer/symbol/encoder stages.
        let payload = b"tiny chunks of a multi-frame payload".to_vec();
        let config = config(ErrorCorrection::M);
        let pipeline = Pipeline::default();
        let missing_path = PathBuf::from("/nonexistent/path/should/not/be/touched.gif");

        let frames = pipeline.encode_to_frames(&payload, &config).unwrap();
        let expected = pipeline.decode_from_frames(&frames, ConfigOverride::default()).unwrap();

        let recovered = pipeline.run(&payload, &missing_path, &config, true).unwrap();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn losslessness_propagation_mock_matches_non_mock() {
        // spec.md §8's "losslessness propagation" property: run(mock=true)
        // and run(mock=false) must agree for every valid payload/config.
        let file = TempFile::new("losslessness-propagation");
        let pipeline = Pipeline::default();
        let config = config(ErrorCorrection::M);
        let payload = b"losslessness propagation across the container boundary";

        let mocked = pipeline.run(payload, &file.0, &config, true).unwrap();
        let real = pipeline.run(payload, &file.0, &config, false).unwrap();
        assert_eq!(mocked, real);
    }

    #[test]
    fn custom_validation_function_can_reject_a_correct_round_trip() {
        let file = TempFile::new("custom-validate");
        let pipeline = Pipeline::with_validation(IdentitySerializer, |_, _| false);
        let config = config(ErrorCorrection::M);

        let result = pipeline.run(b"always rejected", &file.0, &config, false);
        assert!(matches!(result, Err(Reason::ValidationFailed)));
    }

    #[test]
    fn a_corrupted_header_frame_fails_with_header_unreadable() {
        let pipeline = Pipeline::default();
        let config = config(ErrorCorrection::M);

        let mut frames = pipeline.encode_to_frames(b"corrupt me", &config).unwrap();
        let (w, h) = frames[0].dimensions();
        frames[0] = image::GrayImage::from_pixel(w, h, image::Luma([255]));

        let result = pipeline.decode_from_frames(&frames, ConfigOverride::default());
        assert!(matches!(result, Err(Reason::HeaderUnreadable)));
    }
}
