//! Frame type combining header and payload.
//!
//! Layout on the wire: `[FrameHeader: 12 bytes] + [payload: variable bytes]`.
//! A `Frame` holds raw payload bytes; use
//! [`ClientMessage::from_frame`](crate::ClientMessage::from_frame) and
//! friends for the typed view.

use bytes::{BufMut, Bytes};

use crate::{
    FrameHeader,
    errors::{ProtocolError, Result},
};

/// Complete protocol frame.
///
/// # Invariants
///
/// - `payload.len()` matches `header.payload_size()`. Enforced by
///   [`Frame::new`] and verified by [`Frame::decode`].
/// - Encoding rejects payloads over [`FrameHeader::MAX_PAYLOAD_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Frame header
    pub header: FrameHeader,

    /// Raw payload bytes (CBOR-encoded message)
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame, setting the header's payload size.
    ///
    /// Does not enforce the size limit; oversized frames are rejected by
    /// [`Frame::encode`].
    #[must_use]
    pub fn new(payload: impl Into<Bytes>) -> Self {
        let payload = payload.into();

        // INVARIANT: payloads are built from in-memory buffers far below 4 GiB.
        #[allow(clippy::expect_used)]
        let payload_len = u32::try_from(payload.len())
            .expect("invariant: payload length fits in u32 (bounded by protocol limit)");

        let mut header = FrameHeader::new();
        header.payload_size = payload_len.to_be_bytes();

        debug_assert_eq!(header.payload_size(), payload_len);

        Self { header, payload }
    }

    /// Total bytes this frame occupies on the wire.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.len()
    }

    /// Encode frame into buffer.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::PayloadTooLarge` if the payload exceeds
    ///   [`FrameHeader::MAX_PAYLOAD_SIZE`]
    pub fn encode(&self, dst: &mut impl BufMut) -> Result<()> {
        debug_assert_eq!(self.payload.len(), self.header.payload_size() as usize);

        if self.payload.len() > FrameHeader::MAX_PAYLOAD_SIZE as usize {
            return Err(ProtocolError::PayloadTooLarge {
                size: self.payload.len(),
                max: FrameHeader::MAX_PAYLOAD_SIZE as usize,
            });
        }

        dst.put_slice(&self.header.to_bytes());
        dst.put_slice(&self.payload);

        Ok(())
    }

    /// Decode frame from wire format.
    ///
    /// Validates the header before touching the payload. Trailing bytes after
    /// the claimed payload are ignored.
    ///
    /// # Errors
    ///
    /// - Any header error from [`FrameHeader::from_bytes`]
    /// - `ProtocolError::FrameTruncated` if fewer payload bytes are present
    ///   than the header claims
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let header = FrameHeader::from_bytes(bytes)?;

        let payload_size = header.payload_size() as usize;
        let total_size = FrameHeader::SIZE + payload_size;

        let Some(payload) = bytes.get(FrameHeader::SIZE..total_size) else {
            return Err(ProtocolError::FrameTruncated {
                expected: payload_size,
                actual: bytes.len().saturating_sub(FrameHeader::SIZE),
            });
        };

        Ok(Self { header: *header, payload: Bytes::copy_from_slice(payload) })
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn frame_round_trip(payload in prop::collection::vec(any::<u8>(), 0..2048)) {
            let frame = Frame::new(payload);
            let mut wire = Vec::new();
            frame.encode(&mut wire).expect("should encode");

            prop_assert_eq!(wire.len(), frame.encoded_len());

            let parsed = Frame::decode(&wire).expect("should decode");
            prop_assert_eq!(frame, parsed);
        }

        #[test]
        fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let _ = Frame::decode(&bytes);
        }
    }

    #[test]
    fn frame_sets_payload_size() {
        let frame = Frame::new(vec![1, 2, 3, 4]);
        assert_eq!(frame.header.payload_size(), 4);
    }

    #[test]
    fn reject_truncated_frame() {
        let frame = Frame::new(vec![0u8; 100]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        wire.truncate(FrameHeader::SIZE + 40);

        assert_eq!(
            Frame::decode(&wire),
            Err(ProtocolError::FrameTruncated { expected: 100, actual: 40 })
        );
    }

    #[test]
    fn reject_oversized_payload_on_encode() {
        let frame = Frame::new(vec![0u8; FrameHeader::MAX_PAYLOAD_SIZE as usize + 1]);
        let mut wire = Vec::new();

        assert!(matches!(frame.encode(&mut wire), Err(ProtocolError::PayloadTooLarge { .. })));
        assert!(wire.is_empty());
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let frame = Frame::new(vec![9, 9]);
        let mut wire = Vec::new();
        frame.encode(&mut wire).unwrap();
        wire.extend_from_slice(&[0xFF; 7]);

        let parsed = Frame::decode(&wire).unwrap();
        assert_eq!(parsed.payload.as_ref(), &[9, 9]);
    }
}
