//! Fuzz target for Frame::decode
//!
//! Arbitrary bytes must never panic the decoder. A successful decode must
//! re-encode to exactly the bytes it consumed.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spinwheel_proto::{Frame, FrameHeader};

fuzz_target!(|data: &[u8]| {
    let Ok(frame) = Frame::decode(data) else {
        return;
    };

    let consumed = FrameHeader::SIZE + frame.payload.len();
    assert!(consumed <= data.len());

    let mut encoded = Vec::new();
    frame.encode(&mut encoded).expect("decoded frame must re-encode");
    assert_eq!(encoded, &data[..consumed]);
});
