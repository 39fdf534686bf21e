//! Fuzz target for frame header boundary conditions
//!
//! # Strategy
//!
//! - Magic bytes: valid, off-by-one, all-zeros, random
//! - Version: valid (0x01), zero, random
//! - Payload size: zero, small, at-max, just-over-max, u32::MAX, random
//! - Actual payload shorter or longer than claimed
//!
//! # Invariants
//!
//! - `payload_size > MAX_PAYLOAD_SIZE` MUST return `PayloadTooLarge`
//! - Invalid magic MUST return `InvalidMagic`
//! - Fewer bytes than claimed MUST return `FrameTruncated`
//! - Never panic

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spinwheel_proto::{Frame, FrameHeader, ProtocolError};

#[derive(Debug, Clone, Arbitrary)]
struct BoundaryFrame {
    magic: MagicBytes,
    version: VersionByte,
    payload_size: PayloadSize,
    /// Signed difference between bytes present and bytes claimed
    slack: i8,
}

#[derive(Debug, Clone, Arbitrary)]
enum MagicBytes {
    Valid,
    OffByOne(u8),
    AllZeros,
    Random([u8; 4]),
}

#[derive(Debug, Clone, Arbitrary)]
enum VersionByte {
    Valid,
    Zero,
    Random(u8),
}

#[derive(Debug, Clone, Arbitrary)]
enum PayloadSize {
    Zero,
    Small(u8),
    AtMax,
    JustOverMax,
    MaxU32,
    Random(u32),
}

fuzz_target!(|boundary: BoundaryFrame| {
    let max = FrameHeader::MAX_PAYLOAD_SIZE;
    let claimed = match boundary.payload_size {
        PayloadSize::Zero => 0,
        PayloadSize::Small(s) => u32::from(s),
        PayloadSize::AtMax => max,
        PayloadSize::JustOverMax => max + 1,
        PayloadSize::MaxU32 => u32::MAX,
        PayloadSize::Random(r) => r,
    };

    let magic = FrameHeader::MAGIC.to_be_bytes();
    let magic_bytes = match boundary.magic {
        MagicBytes::Valid => magic,
        MagicBytes::OffByOne(offset) => {
            let mut bytes = magic;
            let idx = (offset % 4) as usize;
            bytes[idx] = bytes[idx].wrapping_add(1);
            bytes
        },
        MagicBytes::AllZeros => [0; 4],
        MagicBytes::Random(bytes) => bytes,
    };
    let version = match boundary.version {
        VersionByte::Valid => FrameHeader::VERSION,
        VersionByte::Zero => 0,
        VersionByte::Random(v) => v,
    };

    let present = (claimed.min(max + 64) as i64 + i64::from(boundary.slack)).max(0) as usize;
    let mut buffer = vec![0xAB; FrameHeader::SIZE + present];
    buffer[0..4].copy_from_slice(&magic_bytes);
    buffer[4] = version;
    buffer[5] = 0;
    buffer[6..8].fill(0);
    buffer[8..12].copy_from_slice(&claimed.to_be_bytes());

    match Frame::decode(&buffer) {
        Ok(frame) => {
            assert_eq!(magic_bytes, magic);
            assert_eq!(version, FrameHeader::VERSION);
            assert!(claimed <= max);
            assert_eq!(frame.payload.len(), claimed as usize);
            assert_eq!(frame.header.payload_size(), claimed);
        },
        Err(ProtocolError::InvalidMagic) => assert_ne!(magic_bytes, magic),
        Err(ProtocolError::UnsupportedVersion(v)) => {
            assert_eq!(magic_bytes, magic);
            assert_eq!(v, version);
        },
        Err(ProtocolError::PayloadTooLarge { size, .. }) => {
            assert!(claimed > max);
            assert_eq!(size, claimed as usize);
        },
        Err(ProtocolError::FrameTruncated { expected, actual }) => {
            assert_eq!(expected, claimed as usize);
            assert!(actual < expected);
        },
        Err(other) => panic!("unexpected error for a full header: {other}"),
    }
});
