//! Bijections between payload bytes and the byte form fed to the symbol
//! encoder. See spec.md §4.1.

use crate::error::{Reason, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;

/// `deserialize(serialize(b)) == b` for every byte sequence `b`.
pub trait Serializer {
    fn serialize(&self, payload: &[u8]) -> Vec<u8>;
    fn deserialize(&self, wire_bytes: &[u8]) -> Result<Vec<u8>>;
}

/// `serialize(b) = b`. Valid whenever the symbol encoder round-trips
/// arbitrary bytes losslessly; see `symbol::detect`'s use of `decode_to`
/// rather than `decode` for why that holds for this crate's own QR detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentitySerializer;

impl Serializer for IdentitySerializer {
    fn serialize(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }

    fn deserialize(&self, wire_bytes: &[u8]) -> Result<Vec<u8>> {
        Ok(wire_bytes.to_vec())
    }
}

/// Standard base64 with padding, in both directions. Use when the symbol
/// encoder's byte mode has byte-value restrictions, or when URL/text-safety
/// matters downstream.
///
/// Per spec.md §9's second Open Question: pads correctly per the base64
/// standard and never appends pad bytes unconditionally (the `base64` crate's
/// standard engine already does this correctly; there is no workaround to
/// carry over).
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Serializer;

impl Serializer for Base64Serializer {
    fn serialize(&self, payload: &[u8]) -> Vec<u8> {
        BASE64_STANDARD.encode(payload).into_bytes()
    }

    fn deserialize(&self, wire_bytes: &[u8]) -> Result<Vec<u8>> {
        let text = std::str::from_utf8(wire_bytes).map_err(|_| Reason::invariant("base64 payload is not utf-8"))?;
        BASE64_STANDARD.decode(text).map_err(|_| Reason::invariant("malformed base64 payload"))
    }
}
