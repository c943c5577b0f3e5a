//! The `EncodingConfiguration` value object and the header-frame wire codec.
//!
//! The header blob format is a hand-written, versioned tagged record (spec.md
//! §9's first Open Question, resolved): no reflection, no external schema
//! crate, just a fixed field order read/written through the `io::Data`
//! primitives. This is the direct generalization of the teacher's own
//! "one `Data` impl per primitive, structs write their fields in order"
//! idiom to our own, much smaller, struct.

use crate::error::{Reason, Result};
use crate::io::{self, Data};
use std::io::{Read, Write};

/// Per-level maximum bytes per symbol, the maxima across all QR versions in
/// byte mode. See spec.md §4.2.
pub const MAX_BYTES_L: usize = 2953;
pub const MAX_BYTES_M: usize = 2331;
pub const MAX_BYTES_Q: usize = 1663;
pub const MAX_BYTES_H: usize = 1273;

/// QR error correction level. Trades per-symbol byte capacity for resilience
/// to a damaged raster; since our container is lossless (spec.md §4.5), the
/// practical effect here is purely on capacity and thus on chunk count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCorrection { L, M, Q, H }

impl ErrorCorrection {
    /// Maximum bytes a single symbol at this level can carry.
    pub const fn max_bytes(self) -> usize {
        match self {
            ErrorCorrection::L => MAX_BYTES_L,
            ErrorCorrection::M => MAX_BYTES_M,
            ErrorCorrection::Q => MAX_BYTES_Q,
            ErrorCorrection::H => MAX_BYTES_H,
        }
    }

    pub const fn to_qrcode_level(self) -> qrcode::EcLevel {
        match self {
            ErrorCorrection::L => qrcode::EcLevel::L,
            ErrorCorrection::M => qrcode::EcLevel::M,
            ErrorCorrection::Q => qrcode::EcLevel::Q,
            ErrorCorrection::H => qrcode::EcLevel::H,
        }
    }

    const fn tag(self) -> u8 {
        match self {
            ErrorCorrection::L => 0,
            ErrorCorrection::M => 1,
            ErrorCorrection::Q => 2,
            ErrorCorrection::H => 3,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(ErrorCorrection::L),
            1 => Ok(ErrorCorrection::M),
            2 => Ok(ErrorCorrection::Q),
            3 => Ok(ErrorCorrection::H),
            other => Err(Reason::invariant(format!("unknown error correction tag {other}"))),
        }
    }
}

/// The knobs that must travel with the payload from encode to decode.
/// See spec.md §3.
///
/// Invariant: the configuration recovered at decode is byte-for-byte
/// identical to the one used at encode, except that `show_decoding_window`
/// and `verbose` may be overridden by the decoder's caller (they only affect
/// observability, never output bytes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodingConfiguration {
    pub error_correction: ErrorCorrection,

    /// Caller-requested segment size; the effective segment is
    /// `min(chunk_size, error_correction.max_bytes())`.
    pub chunk_size: Option<u32>,

    pub frames_per_second: u32,
    pub enable_multiprocessing: bool,
    pub max_workers: Option<u32>,

    /// Whether to draw the light quiet zone surrounding the QR matrix
    /// (0 disables it, any other value enables the standard-width zone --
    /// the underlying renderer does not expose a custom zone width).
    pub quiet_zone_modules: u8,

    /// Edge length, in pixels, of a single QR module.
    pub module_pixels: u8,

    pub show_decoding_window: bool,
    pub verbose: bool,
}

impl Default for EncodingConfiguration {
    fn default() -> Self {
        EncodingConfiguration {
            error_correction: ErrorCorrection::M,
            chunk_size: None,
            frames_per_second: 24,
            enable_multiprocessing: true,
            max_workers: None,
            quiet_zone_modules: 4,
            module_pixels: 8,
            show_decoding_window: false,
            verbose: false,
        }
    }
}

impl EncodingConfiguration {
    /// `min(chunk_size, capacity(error_correction))`, per spec.md §4.3 step 1.
    pub fn effective_segment_size(&self) -> usize {
        let capacity = self.error_correction.max_bytes();
        match self.chunk_size {
            Some(requested) => (requested as usize).min(capacity),
            None => capacity,
        }
    }

    /// Resolved worker count for the parallel encoder/decoder. `None` means
    /// "implementation chooses" and defaults to the logical core count.
    pub fn resolved_worker_count(&self) -> usize {
        match self.max_workers {
            Some(workers) => workers.max(1) as usize,
            None => std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }

    const SCHEMA_VERSION: u8 = 1;

    /// Serializes this configuration into the opaque blob carried by frame 0,
    /// without the mandatory 4-byte length prefix (that prefix is written by
    /// the caller, see `write_header_frame_payload`).
    fn write_blob(&self, write: &mut impl Write) -> Result<()> {
        Self::SCHEMA_VERSION.write(write)?;
        self.error_correction.tag().write(write)?;
        self.chunk_size.write(write)?;
        self.frames_per_second.write(write)?;
        self.enable_multiprocessing.write(write)?;
        self.max_workers.write(write)?;
        self.quiet_zone_modules.write(write)?;
        self.module_pixels.write(write)?;
        self.show_decoding_window.write(write)?;
        self.verbose.write(write)?;
        Ok(())
    }

    fn read_blob(read: &mut impl Read) -> Result<Self> {
        let version = u8::read(read)?;
        if version != Self::SCHEMA_VERSION {
            return Err(Reason::invariant(format!(
                "unsupported configuration schema version {version}"
            )));
        }

        Ok(EncodingConfiguration {
            error_correction: ErrorCorrection::from_tag(u8::read(read)?)?,
            chunk_size: Option::<u32>::read(read)?,
            frames_per_second: u32::read(read)?,
            enable_multiprocessing: bool::read(read)?,
            max_workers: Option::<u32>::read(read)?,
            quiet_zone_modules: u8::read(read)?,
            module_pixels: u8::read(read)?,
            show_decoding_window: bool::read(read)?,
            verbose: bool::read(read)?,
        })
    }

    /// Produces the full frame-0 payload: `[4-byte BE length][blob]`, per
    /// spec.md §3's HeaderFrame wire form.
    pub fn write_header_frame_payload(&self) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        self.write_blob(&mut blob)?;

        let mut framed = Vec::with_capacity(4 + blob.len());
        io::write_length_prefix(&mut framed, blob.len() as u32)?;
        framed.extend_from_slice(&blob);
        Ok(framed)
    }

    /// Parses a full frame-0 payload, validating the length prefix before
    /// touching the blob. A truncated blob yields `HeaderTruncated`.
    pub fn read_header_frame_payload(bytes: &[u8]) -> Result<Self> {
        let mut cursor = bytes;
        let length = io::read_length_prefix(&mut cursor)? as usize;

        if cursor.len() < length {
            return Err(Reason::HeaderTruncated);
        }

        Self::read_blob(&mut &cursor[..length])
    }
}
