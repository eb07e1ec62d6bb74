//! RDB length and string encodings.
//!
//! The top two bits of the first byte select the form: `00` is a 6-bit
//! length, `01` a 14-bit length using the next byte, `10` a 32-bit big-endian
//! length in the next four bytes, and `11` a special string encoding whose
//! low six bits select an 8-bit, 16-bit little-endian or 32-bit little-endian
//! integer rendered as its decimal string.

use super::file::RdbError;

#[derive(Debug, PartialEq)]
pub(super) enum LengthEncoding {
    Length(usize),
    Int8,
    Int16,
    Int32,
    Unsupported(u8),
}

pub(super) fn get_slice<'a>(
    bytes: &'a [u8],
    cursor: usize,
    length: usize,
) -> Result<&'a [u8], RdbError> {
    bytes
        .get(cursor..cursor + length)
        .ok_or(RdbError::UnexpectedEof)
}

/// Reads a length encoding, returning the form and the bytes consumed.
pub(super) fn read_length_encoding(
    bytes: &[u8],
    cursor: usize,
) -> Result<(LengthEncoding, usize), RdbError> {
    let first = get_slice(bytes, cursor, 1)?[0];

    match first >> 6 {
        0b00 => Ok((LengthEncoding::Length((first & 0b0011_1111) as usize), 1)),
        0b01 => {
            let second = get_slice(bytes, cursor + 1, 1)?[0];
            let length = (((first & 0b0011_1111) as usize) << 8) | second as usize;
            Ok((LengthEncoding::Length(length), 2))
        }
        0b10 => {
            let slice = get_slice(bytes, cursor + 1, 4)?;
            let four_bytes: [u8; 4] = slice.try_into().map_err(|_| RdbError::UnexpectedEof)?;
            Ok((
                LengthEncoding::Length(u32::from_be_bytes(four_bytes) as usize),
                5,
            ))
        }
        _ => match first & 0b0011_1111 {
            0 => Ok((LengthEncoding::Int8, 1)),
            1 => Ok((LengthEncoding::Int16, 1)),
            2 => Ok((LengthEncoding::Int32, 1)),
            other => Ok((LengthEncoding::Unsupported(other), 1)),
        },
    }
}

/// Reads a length-encoded integer (database selectors, hash-table hints).
pub(super) fn read_integer(bytes: &[u8], cursor: usize) -> Result<(usize, usize), RdbError> {
    match read_length_encoding(bytes, cursor)? {
        (LengthEncoding::Length(value), consumed) => Ok((value, consumed)),
        (encoding, _) => Err(RdbError::UnexpectedEncoding(format!("{:?}", encoding))),
    }
}

/// Reads a string value in any of the supported encodings, returning the
/// string and the bytes consumed. Unknown special encodings decode as an
/// empty string so the opcode walk can continue past them.
pub(super) fn read_string(bytes: &[u8], cursor: usize) -> Result<(String, usize), RdbError> {
    let (encoding, header_len) = read_length_encoding(bytes, cursor)?;
    let payload_cursor = cursor + header_len;

    match encoding {
        LengthEncoding::Length(length) => {
            let slice = get_slice(bytes, payload_cursor, length)?;
            let value = String::from_utf8(slice.to_vec()).map_err(|_| RdbError::InvalidUtf8)?;
            Ok((value, header_len + length))
        }
        LengthEncoding::Int8 => {
            let slice = get_slice(bytes, payload_cursor, 1)?;
            Ok(((slice[0] as i8).to_string(), header_len + 1))
        }
        LengthEncoding::Int16 => {
            let slice = get_slice(bytes, payload_cursor, 2)?;
            let two_bytes: [u8; 2] = slice.try_into().map_err(|_| RdbError::UnexpectedEof)?;
            Ok((i16::from_le_bytes(two_bytes).to_string(), header_len + 2))
        }
        LengthEncoding::Int32 => {
            let slice = get_slice(bytes, payload_cursor, 4)?;
            let four_bytes: [u8; 4] = slice.try_into().map_err(|_| RdbError::UnexpectedEof)?;
            Ok((i32::from_le_bytes(four_bytes).to_string(), header_len + 4))
        }
        LengthEncoding::Unsupported(_) => Ok((String::new(), header_len)),
    }
}

#[cfg(test)]
mod tests {
    use super::{LengthEncoding, read_length_encoding, read_string};
    use crate::rdb::RdbError;

    #[test]
    fn test_read_length_encoding() {
        let test_cases: Vec<(&[u8], LengthEncoding, usize, &str)> = vec![
            (&[0x0A], LengthEncoding::Length(10), 1, "6-bit length"),
            (&[0x3F], LengthEncoding::Length(63), 1, "maximum 6-bit length"),
            (
                &[0x4A, 0xCC],
                LengthEncoding::Length(0x0ACC),
                2,
                "14-bit length",
            ),
            (
                &[0x80, 0x00, 0x01, 0x00, 0x00],
                LengthEncoding::Length(65536),
                5,
                "32-bit big-endian length",
            ),
            (&[0xC0], LengthEncoding::Int8, 1, "8-bit integer marker"),
            (&[0xC1], LengthEncoding::Int16, 1, "16-bit integer marker"),
            (&[0xC2], LengthEncoding::Int32, 1, "32-bit integer marker"),
            (
                &[0xC3],
                LengthEncoding::Unsupported(3),
                1,
                "compressed string marker",
            ),
        ];

        for (input, expected, expected_consumed, description) in test_cases {
            let (encoding, consumed) = read_length_encoding(input, 0).unwrap();
            assert_eq!(encoding, expected, "decoding {}", description);
            assert_eq!(consumed, expected_consumed, "consumed for {}", description);
        }
    }

    #[test]
    fn test_read_string() {
        let test_cases: Vec<(Vec<u8>, &str, &str)> = vec![
            (
                {
                    let mut bytes = vec![0x05];
                    bytes.extend_from_slice(b"hello");
                    bytes
                },
                "hello",
                "length-prefixed string",
            ),
            (vec![0xC0, 0x7B], "123", "8-bit integer string"),
            (vec![0xC0, 0xFF], "-1", "negative 8-bit integer string"),
            (vec![0xC1, 0x39, 0x30], "12345", "16-bit little-endian integer"),
            (
                vec![0xC2, 0x40, 0xE2, 0x01, 0x00],
                "123456",
                "32-bit little-endian integer",
            ),
        ];

        for (input, expected, description) in test_cases {
            let (value, consumed) = read_string(&input, 0).unwrap();
            assert_eq!(value, expected, "decoding {}", description);
            assert_eq!(consumed, input.len(), "consumed for {}", description);
        }
    }

    #[test]
    fn test_read_string_truncated_input() {
        assert_eq!(read_string(&[0x05, b'h', b'i'], 0), Err(RdbError::UnexpectedEof));
    }

    #[test]
    fn test_unsupported_special_encoding_reads_as_empty_string() {
        assert_eq!(read_string(&[0xC3, 0x12], 0), Ok((String::new(), 1)));
    }
}
