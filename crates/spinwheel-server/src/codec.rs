//! Frame codec over async byte streams.
//!
//! Shared by the QUIC runtime and the simulation harness so both delimit
//! frames identically. The header is validated before any payload is read,
//! so an oversized claim never allocates.

use bytes::BytesMut;
use spinwheel_proto::{Frame, FrameHeader};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::ServerError;

/// Read one frame.
///
/// Returns `Ok(None)` on a clean end of stream at a frame boundary.
///
/// # Errors
///
/// - `ServerError::Protocol` for a bad header (magic, version, size). The
///   stream can no longer be delimited and must be dropped.
/// - `ServerError::Transport` for I/O errors, including EOF mid-frame.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Frame>, ServerError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(FrameHeader::SIZE);

    let first = reader.read(&mut buf[..]).await?;
    if first == 0 {
        return Ok(None);
    }
    if first < FrameHeader::SIZE {
        reader.read_exact(&mut buf[first..]).await?;
    }

    let payload_size = FrameHeader::from_bytes(&buf)?.payload_size() as usize;

    if payload_size > 0 {
        buf.resize(FrameHeader::SIZE + payload_size, 0);
        reader.read_exact(&mut buf[FrameHeader::SIZE..]).await?;
    }

    Ok(Some(Frame::decode(&buf)?))
}

/// Write one frame and flush.
///
/// # Errors
///
/// - `ServerError::Protocol` if the frame exceeds the payload limit
/// - `ServerError::Transport` for I/O errors
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), ServerError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(frame.encoded_len());
    frame.encode(&mut buf)?;

    writer.write_all(&buf).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use spinwheel_proto::ClientMessage;

    use super::*;

    #[tokio::test]
    async fn round_trip_over_duplex() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let frame = ClientMessage::AdminRequestStats.to_frame().unwrap();

        write_frame(&mut client, &frame).await.unwrap();
        write_frame(&mut client, &frame).await.unwrap();
        drop(client);

        assert_eq!(read_frame(&mut server).await.unwrap(), Some(frame.clone()));
        assert_eq!(read_frame(&mut server).await.unwrap(), Some(frame));
        assert_eq!(read_frame(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn header_split_across_writes() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let frame = ClientMessage::Logout.to_frame().unwrap();
        let mut bytes = Vec::new();
        frame.encode(&mut bytes).unwrap();

        let reader = tokio::spawn(async move { read_frame(&mut server).await });

        client.write_all(&bytes[..5]).await.unwrap();
        client.flush().await.unwrap();
        client.write_all(&bytes[5..]).await.unwrap();

        assert_eq!(reader.await.unwrap().unwrap(), Some(frame));
    }

    #[tokio::test]
    async fn bad_magic_is_protocol_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        client.write_all(&[0u8; FrameHeader::SIZE]).await.unwrap();

        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(ServerError::Protocol(_))));
    }

    #[tokio::test]
    async fn eof_mid_payload_is_transport_error() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let frame = ClientMessage::Logout.to_frame().unwrap();
        let mut bytes = Vec::new();
        frame.encode(&mut bytes).unwrap();

        client.write_all(&bytes[..bytes.len() - 1]).await.unwrap();
        drop(client);

        let result = read_frame(&mut server).await;
        assert!(matches!(result, Err(ServerError::Transport(_))));
    }
}
