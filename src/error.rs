//! Error taxonomy for the codec pipeline.
//!
//! Modeled on the teacher crate's minimal `Error` enum, but finished with a
//! real `Display`/`std::error::Error` impl (the teacher leaves a `// TODO
//! derive Display?` on its own enum) because this crate is meant to be
//! embedded in other binaries.

use std::fmt;

pub type Result<T> = std::result::Result<T, Reason>;
pub type UnitResult = Result<()>;

pub use std::io::Error as IoError;

/// Every way the pipeline can fail. All variants are fatal: the pipeline
/// never retries and never silently substitutes a default.
#[derive(Debug)]
pub enum Reason {
    /// A chunk is larger than the symbol capacity for the configured error
    /// correction level. Carries the offending chunk index, its length, and
    /// the capacity it exceeded.
    CapacityExceeded { chunk_index: usize, len: usize, max: usize },

    /// The header blob is shorter than the 4-byte length prefix announces,
    /// or shorter than the prefix itself.
    HeaderTruncated,

    /// Frame 0 did not detect as a symbol.
    HeaderUnreadable,

    /// A payload frame at the given index did not detect.
    FrameCorrupt(usize),

    /// Decode was called with neither a file path nor a non-empty frame
    /// stream.
    EmptyInput,

    /// An internal invariant was violated, e.g. the header serializer
    /// produced more than one frame.
    InvariantViolation(String),

    /// `validation_fn(input, output)` returned false.
    ValidationFailed,

    /// The container failed to read or write.
    Io(IoError),
}

impl Reason {
    pub fn invariant(message: impl Into<String>) -> Self {
        Reason::InvariantViolation(message.into())
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::CapacityExceeded { chunk_index, len, max } => write!(
                f, "chunk {chunk_index} is {len} bytes, exceeds the {max}-byte symbol capacity"
            ),
            Reason::HeaderTruncated => write!(f, "header blob is shorter than its announced length"),
            Reason::HeaderUnreadable => write!(f, "frame 0 did not decode as a header symbol"),
            Reason::FrameCorrupt(index) => write!(f, "payload frame {index} did not decode"),
            Reason::EmptyInput => write!(f, "decode called with no file path and no frames"),
            Reason::InvariantViolation(message) => write!(f, "invariant violated: {message}"),
            Reason::ValidationFailed => write!(f, "round-trip validation failed"),
            Reason::Io(error) => write!(f, "container I/O error: {error}"),
        }
    }
}

impl std::error::Error for Reason {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Reason::Io(error) => Some(error),
            _ => None,
        }
    }
}

/// Enable using the `?` operator on `io::Result`.
impl From<IoError> for Reason {
    fn from(error: IoError) -> Self {
        Reason::Io(error)
    }
}
