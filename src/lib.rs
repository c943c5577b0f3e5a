#![warn(
    rust_2018_idioms,
    future_incompatible,
    unused_extern_crates,
    unused,

    missing_copy_implementations,
    missing_debug_implementations,

    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
)]

#![deny(
    unused_variables,
    unused_assignments,
    dead_code,
    unused_must_use,
    trivial_numeric_casts,
    redundant_semicolons
)]

#![forbid(unsafe_code)]

// TODO #![warn(missing_docs)]

pub mod config;
pub mod encoder;
pub mod error;
pub mod io;
pub mod pipeline;
pub mod serializer;
pub mod symbol;
pub mod video;

/// Re-exports of the types needed for a typical encode/decode round trip.
pub mod prelude {
    pub use crate::config::{EncodingConfiguration, ErrorCorrection};
    pub use crate::error::{Reason, Result, UnitResult};
    pub use crate::pipeline::Pipeline;
    pub use crate::serializer::{Base64Serializer, IdentitySerializer, Serializer};
}
