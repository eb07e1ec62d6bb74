//! RESP (Redis Serialization Protocol) values, encoding and decoding.
//!
//! The decoder is byte-framed rather than line-based: bulk-string payloads
//! are bounded by their declared length and may contain any bytes at all,
//! CR and LF included. Every successful decode reports how many bytes of the
//! input it consumed, which the replication client needs for offset
//! accounting.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum RespError {
    #[error("invalid UTF-8 sequence")]
    InvalidUtf8,
    #[error("unknown RESP type prefix")]
    UnknownPrefix,
    #[error("failed to parse integer")]
    FailedToParseInteger,
    #[error("invalid bulk string")]
    InvalidBulkString,
    #[error("invalid array")]
    InvalidArray,
}

/// A single RESP value, possibly nested.
///
/// Bulk strings carry raw bytes: RESP is binary-safe, so payload content is
/// never validated as text. Simple strings and errors are line-based and stay
/// `String`. `NullBulkString` and `NullArray` are the `$-1` and `*-1` wire
/// forms; they are distinct variants rather than an `Option` so that encoding
/// stays a pure function of the tree.
#[derive(Debug, PartialEq, Clone)]
pub enum RespValue {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Vec<u8>),
    NullBulkString,
    Array(Vec<RespValue>),
    NullArray,
}

impl RespValue {
    /// Builds the canonical client-command form: an array of bulk strings.
    pub fn command<S: AsRef<str>>(parts: &[S]) -> RespValue {
        RespValue::Array(
            parts
                .iter()
                .map(|part| RespValue::BulkString(part.as_ref().as_bytes().to_vec()))
                .collect(),
        )
    }

    /// Serialises the value recursively into its RESP wire form.
    pub fn encode(&self) -> Vec<u8> {
        match self {
            RespValue::SimpleString(content) => format!("+{}\r\n", content).into_bytes(),
            RespValue::Error(content) => format!("-{}\r\n", content).into_bytes(),
            RespValue::Integer(value) => format!(":{}\r\n", value).into_bytes(),
            RespValue::BulkString(content) => {
                let mut encoded = format!("${}\r\n", content.len()).into_bytes();
                encoded.extend_from_slice(content);
                encoded.extend_from_slice(b"\r\n");
                encoded
            }
            RespValue::NullBulkString => b"$-1\r\n".to_vec(),
            RespValue::Array(elements) => {
                let mut encoded = format!("*{}\r\n", elements.len()).into_bytes();
                for element in elements {
                    encoded.extend_from_slice(&element.encode());
                }
                encoded
            }
            RespValue::NullArray => b"*-1\r\n".to_vec(),
        }
    }

    /// Decodes one full frame from the front of `buffer`.
    ///
    /// Returns `Ok(Some((value, consumed)))` when a complete frame is
    /// available, `Ok(None)` when more bytes are needed, and `Err` on input
    /// that can never become a valid frame. Callers keep unconsumed bytes in
    /// the buffer and retry after the next socket read.
    pub fn decode(buffer: &[u8]) -> Result<Option<(RespValue, usize)>, RespError> {
        Self::decode_at(buffer, 0)
    }

    fn decode_at(buffer: &[u8], start: usize) -> Result<Option<(RespValue, usize)>, RespError> {
        let Some(&prefix) = buffer.get(start) else {
            return Ok(None);
        };

        let Some(line_end) = find_crlf(buffer, start + 1) else {
            return Ok(None);
        };

        let header =
            str::from_utf8(&buffer[start + 1..line_end]).map_err(|_| RespError::InvalidUtf8)?;
        let after_header = line_end + 2;

        match prefix {
            b'+' => Ok(Some((
                RespValue::SimpleString(header.to_string()),
                after_header,
            ))),
            b'-' => Ok(Some((RespValue::Error(header.to_string()), after_header))),
            b':' => {
                let value = header
                    .parse::<i64>()
                    .map_err(|_| RespError::FailedToParseInteger)?;
                Ok(Some((RespValue::Integer(value), after_header)))
            }
            b'$' => {
                if header == "-1" {
                    return Ok(Some((RespValue::NullBulkString, after_header)));
                }

                let declared_length = header
                    .parse::<usize>()
                    .map_err(|_| RespError::InvalidBulkString)?;

                let content_end = after_header + declared_length;
                if buffer.len() < content_end + 2 {
                    return Ok(None);
                }

                if &buffer[content_end..content_end + 2] != b"\r\n" {
                    return Err(RespError::InvalidBulkString);
                }

                Ok(Some((
                    RespValue::BulkString(buffer[after_header..content_end].to_vec()),
                    content_end + 2,
                )))
            }
            b'*' => {
                if header == "-1" {
                    return Ok(Some((RespValue::NullArray, after_header)));
                }

                let declared_length = header
                    .parse::<usize>()
                    .map_err(|_| RespError::InvalidArray)?;

                let mut elements = Vec::with_capacity(declared_length);
                let mut cursor = after_header;

                for _ in 0..declared_length {
                    match Self::decode_at(buffer, cursor)? {
                        Some((element, next_cursor)) => {
                            elements.push(element);
                            cursor = next_cursor;
                        }
                        None => return Ok(None),
                    }
                }

                Ok(Some((RespValue::Array(elements), cursor)))
            }
            _ => Err(RespError::UnknownPrefix),
        }
    }
}

fn find_crlf(buffer: &[u8], from: usize) -> Option<usize> {
    buffer
        .get(from..)?
        .windows(2)
        .position(|window| window == b"\r\n")
        .map(|position| from + position)
}
