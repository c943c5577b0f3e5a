//! Primitive byte reading/writing helpers used by the header codec.
//!
//! Mirrors the teacher crate's `io::Data` extension-trait idiom (one trait,
//! implemented per primitive, used everywhere a struct needs to serialize
//! itself), scaled down to the handful of primitives the header actually
//! needs.

pub use std::io::{Read, Write};
use crate::error::{Reason, Result};

/// A primitive that can read and write itself to/from a byte stream.
///
/// The 4-byte header length prefix is explicitly big-endian per spec; every
/// other primitive in the header blob is written little-endian, matching the
/// teacher's choice of a single consistent byte order for its own `Data`
/// primitives.
pub trait Data: Sized {
    fn read(read: &mut impl Read) -> Result<Self>;
    fn write(self, write: &mut impl Write) -> Result<()>;
}

impl Data for u8 {
    fn read(read: &mut impl Read) -> Result<Self> {
        let mut byte = [0_u8; 1];
        read.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write(self, write: &mut impl Write) -> Result<()> {
        write.write_all(&[self])?;
        Ok(())
    }
}

impl Data for bool {
    fn read(read: &mut impl Read) -> Result<Self> {
        Ok(u8::read(read)? != 0)
    }

    fn write(self, write: &mut impl Write) -> Result<()> {
        (self as u8).write(write)
    }
}

impl Data for u32 {
    fn read(read: &mut impl Read) -> Result<Self> {
        let mut bytes = [0_u8; 4];
        read.read_exact(&mut bytes)?;
        Ok(u32::from_le_bytes(bytes))
    }

    fn write(self, write: &mut impl Write) -> Result<()> {
        write.write_all(&self.to_le_bytes())?;
        Ok(())
    }
}

impl<T: Data> Data for Option<T> {
    fn read(read: &mut impl Read) -> Result<Self> {
        if bool::read(read)? { Ok(Some(T::read(read)?)) } else { Ok(None) }
    }

    fn write(self, write: &mut impl Write) -> Result<()> {
        self.is_some().write(write)?;
        if let Some(value) = self { value.write(write)?; }
        Ok(())
    }
}

/// Reads the mandatory 4-byte big-endian length prefix described in spec.md
/// §3/§6. Big-endian here, unlike every other header primitive, because the
/// prefix must be parseable before the rest of the blob's byte order is even
/// known to be self-describing.
pub fn read_length_prefix(read: &mut impl Read) -> Result<u32> {
    let mut bytes = [0_u8; 4];
    read.read_exact(&mut bytes).map_err(|_| Reason::HeaderTruncated)?;
    Ok(u32::from_be_bytes(bytes))
}

pub fn write_length_prefix(write: &mut impl Write, length: u32) -> Result<()> {
    write.write_all(&length.to_be_bytes())?;
    Ok(())
}
