//! Frame header with zero-copy parsing.
//!
//! The `FrameHeader` is a fixed 12-byte structure serialized as raw binary
//! (Big Endian). It only delimits frames; event routing is decided by the
//! CBOR payload.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::{ProtocolError, Result};

/// Fixed 12-byte frame header (Big Endian network byte order).
///
/// Fields are stored as raw byte arrays, so the struct has alignment 1 and
/// every 12-byte pattern is a valid value. Parsing is a cast followed by
/// validation of magic, version and payload size.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable)]
pub struct FrameHeader {
    magic: [u8; 4], // 0x5350494E ("SPIN" in ASCII)
    version: u8,    // 0x01
    flags: u8,      // reserved, always zero
    reserved: [u8; 2],
    pub(crate) payload_size: [u8; 4],
}

impl FrameHeader {
    /// Size of the serialized header.
    pub const SIZE: usize = 12;

    /// Magic number: "SPIN" in ASCII.
    pub const MAGIC: u32 = 0x5350_494E;

    /// Current protocol version.
    pub const VERSION: u8 = 0x01;

    /// Maximum payload size (64 KiB).
    ///
    /// The largest legitimate payload is a roster or stats snapshot; both are
    /// bounded by the number of connected players.
    pub const MAX_PAYLOAD_SIZE: u32 = 64 * 1024;

    /// Create a header for an empty payload.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: Self::MAGIC.to_be_bytes(),
            version: Self::VERSION,
            flags: 0,
            reserved: [0; 2],
            payload_size: [0; 4],
        }
    }

    /// Parse header from network bytes (zero-copy).
    ///
    /// Trailing bytes after the header are ignored.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::FrameTooShort` if fewer than [`Self::SIZE`] bytes
    /// - `ProtocolError::InvalidMagic` if the magic number does not match
    /// - `ProtocolError::UnsupportedVersion` for any other version byte
    /// - `ProtocolError::PayloadTooLarge` if the claimed size exceeds
    ///   [`Self::MAX_PAYLOAD_SIZE`]
    pub fn from_bytes(bytes: &[u8]) -> Result<&Self> {
        let (header, _) = Self::ref_from_prefix(bytes)
            .map_err(|_| ProtocolError::FrameTooShort { expected: Self::SIZE, actual: bytes.len() })?;

        if u32::from_be_bytes(header.magic) != Self::MAGIC {
            return Err(ProtocolError::InvalidMagic);
        }

        if header.version != Self::VERSION {
            return Err(ProtocolError::UnsupportedVersion(header.version));
        }

        let payload_size = u32::from_be_bytes(header.payload_size);
        if payload_size > Self::MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge {
                size: payload_size as usize,
                max: Self::MAX_PAYLOAD_SIZE as usize,
            });
        }

        Ok(header)
    }

    /// Serialize header to bytes.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut arr = [0u8; Self::SIZE];
        arr.copy_from_slice(IntoBytes::as_bytes(self));
        arr
    }

    /// Protocol magic number.
    #[must_use]
    pub fn magic(&self) -> u32 {
        u32::from_be_bytes(self.magic)
    }

    /// Protocol version byte.
    #[must_use]
    pub fn version(&self) -> u8 {
        self.version
    }

    /// Payload length in bytes.
    #[must_use]
    pub fn payload_size(&self) -> u32 {
        u32::from_be_bytes(self.payload_size)
    }
}

impl Default for FrameHeader {
    fn default() -> Self {
        Self::new()
    }
}
