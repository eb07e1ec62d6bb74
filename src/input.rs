//! Framed reading from sockets.
//!
//! Both the client-facing connection handler and the follower's leader
//! connection read through here, so every consumer gets the same byte-accurate
//! framing.

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::AsyncReadExt;

use crate::resp::{RespError, RespValue};

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("RESP protocol error: {0}")]
    Protocol(#[from] RespError),
}

/// Reads one complete RESP frame, returning the value and its exact encoded
/// length in bytes.
///
/// Unconsumed bytes stay in `buffer` for the next call, so pipelined commands
/// arriving in a single TCP segment are framed one at a time.
pub async fn read_frame<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<(RespValue, usize), FrameError>
where
    R: AsyncReadExt + Unpin,
{
    loop {
        if let Some((value, consumed)) = RespValue::decode(&buffer[..])? {
            buffer.advance(consumed);
            return Ok((value, consumed));
        }

        let bytes_read = reader.read_buf(buffer).await?;
        if bytes_read == 0 {
            return Err(FrameError::ConnectionClosed);
        }
    }
}

/// Reads the RDB frame a leader sends after `FULLRESYNC`.
///
/// The frame is `$<len>\r\n` followed by exactly `len` raw bytes with no
/// trailing CRLF, so it cannot be decoded as a regular bulk string.
pub async fn read_rdb_frame<R>(
    reader: &mut R,
    buffer: &mut BytesMut,
) -> Result<Vec<u8>, FrameError>
where
    R: AsyncReadExt + Unpin,
{
    loop {
        if let Some(frame) = parse_rdb_frame(buffer)? {
            return Ok(frame);
        }

        let bytes_read = reader.read_buf(buffer).await?;
        if bytes_read == 0 {
            return Err(FrameError::ConnectionClosed);
        }
    }
}

fn parse_rdb_frame(buffer: &mut BytesMut) -> Result<Option<Vec<u8>>, FrameError> {
    let Some(&prefix) = buffer.first() else {
        return Ok(None);
    };

    if prefix != b'$' {
        return Err(FrameError::Protocol(RespError::InvalidBulkString));
    }

    let Some(header_end) = buffer
        .windows(2)
        .position(|window| window == b"\r\n")
    else {
        return Ok(None);
    };

    let declared_length = str::from_utf8(&buffer[1..header_end])
        .map_err(|_| FrameError::Protocol(RespError::InvalidUtf8))?
        .parse::<usize>()
        .map_err(|_| FrameError::Protocol(RespError::InvalidBulkString))?;

    let payload_start = header_end + 2;
    if buffer.len() < payload_start + declared_length {
        return Ok(None);
    }

    let payload = buffer[payload_start..payload_start + declared_length].to_vec();
    buffer.advance(payload_start + declared_length);

    Ok(Some(payload))
}

#[cfg(test)]
mod tests {
    use bytes::BytesMut;

    use super::{FrameError, read_frame, read_rdb_frame};
    use crate::resp::RespValue;

    #[tokio::test]
    async fn test_read_frame_splits_pipelined_commands() {
        let input: &[u8] = b"*1\r\n$4\r\nPING\r\n*2\r\n$4\r\nECHO\r\n$2\r\nhi\r\n";
        let mut reader = input;
        let mut buffer = BytesMut::new();

        let (first, first_len) = read_frame(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(first, RespValue::command(&["PING"]));
        assert_eq!(first_len, 14);

        let (second, second_len) = read_frame(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(second, RespValue::command(&["ECHO", "hi"]));
        assert_eq!(second_len, 22);

        let eof = read_frame(&mut reader, &mut buffer).await;
        assert!(matches!(eof, Err(FrameError::ConnectionClosed)));
    }

    #[tokio::test]
    async fn test_read_rdb_frame_has_no_trailing_crlf() {
        // An RDB payload followed directly by a propagated command.
        let mut input = Vec::new();
        input.extend_from_slice(b"$5\r\nREDIS");
        input.extend_from_slice(b"*1\r\n$4\r\nPING\r\n");

        let mut reader = input.as_slice();
        let mut buffer = BytesMut::new();

        let payload = read_rdb_frame(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(payload, b"REDIS");

        let (next, _) = read_frame(&mut reader, &mut buffer).await.unwrap();
        assert_eq!(next, RespValue::command(&["PING"]));
    }

    #[tokio::test]
    async fn test_read_rdb_frame_rejects_non_bulk_prefix() {
        let mut reader: &[u8] = b"+OK\r\n";
        let mut buffer = BytesMut::new();

        let result = read_rdb_frame(&mut reader, &mut buffer).await;
        assert!(matches!(result, Err(FrameError::Protocol(_))));
    }
}
