//! RDB file parsing.
//!
//! The loader walks the opcode stream and collects string entries with their
//! optional millisecond expiries. An unknown opcode or a truncated entry
//! aborts the walk but keeps everything already loaded, so a damaged snapshot
//! still lets the server start.

use std::collections::HashMap;

use jiff::Timestamp;
use thiserror::Error;
use tracing::warn;

use super::length::{get_slice, read_integer, read_string};

/// The snapshot a leader sends after `FULLRESYNC`: header, version 11, an
/// empty database selector, the end-of-file opcode and its checksum.
pub const EMPTY_RDB: [u8; 20] =
    *b"REDIS0011\xFE\x00\xFF\x6B\xFD\x95\x24\x0E\x87\xF2\x93";

const OPCODE_METADATA: u8 = 0xFA;
const OPCODE_RESIZE_DB: u8 = 0xFB;
const OPCODE_EXPIRY_MILLISECONDS: u8 = 0xFC;
const OPCODE_EXPIRY_SECONDS: u8 = 0xFD;
const OPCODE_SELECT_DB: u8 = 0xFE;
const OPCODE_END_OF_FILE: u8 = 0xFF;
const VALUE_TYPE_STRING: u8 = 0x00;

#[derive(Error, Debug, PartialEq)]
pub enum RdbError {
    #[error("not enough bytes in RDB input")]
    UnexpectedEof,
    #[error("invalid RDB magic string")]
    InvalidMagic,
    #[error("invalid RDB version")]
    InvalidVersion,
    #[error("invalid UTF-8 in RDB string")]
    InvalidUtf8,
    #[error("unexpected encoding: {0}")]
    UnexpectedEncoding(String),
    #[error("unknown opcode 0x{0:02X}")]
    UnknownOpcode(u8),
    #[error("unsupported value type 0x{0:02X}")]
    UnsupportedValueType(u8),
    #[error("invalid expiry timestamp")]
    InvalidExpiry,
}

#[derive(Debug, PartialEq)]
pub struct RdbEntry {
    pub key: String,
    pub value: String,
    pub expires_at: Option<Timestamp>,
}

#[derive(Debug, Default, PartialEq)]
pub struct RdbFile {
    pub version: String,
    pub metadata: HashMap<String, String>,
    pub entries: Vec<RdbEntry>,
}

impl RdbFile {
    /// Parses a full RDB byte stream.
    ///
    /// A bad header is a hard error. Anything that goes wrong after the
    /// header aborts the walk gracefully: the result carries every entry
    /// read up to that point.
    pub fn parse(bytes: &[u8]) -> Result<RdbFile, RdbError> {
        let magic = get_slice(bytes, 0, 5)?;
        if magic != b"REDIS" {
            return Err(RdbError::InvalidMagic);
        }

        let version = String::from_utf8(get_slice(bytes, 5, 4)?.to_vec())
            .map_err(|_| RdbError::InvalidVersion)?;
        version
            .parse::<u32>()
            .map_err(|_| RdbError::InvalidVersion)?;

        let mut file = RdbFile {
            version,
            metadata: HashMap::new(),
            entries: Vec::new(),
        };

        let mut cursor = 9;
        loop {
            match file.parse_opcode(bytes, cursor) {
                Ok(Some(consumed)) => cursor += consumed,
                Ok(None) => break,
                Err(error) => {
                    warn!(
                        %error,
                        loaded = file.entries.len(),
                        "aborting RDB load, keeping entries read so far"
                    );
                    break;
                }
            }
        }

        Ok(file)
    }

    /// Handles one opcode at `cursor`. Returns the bytes consumed, or `None`
    /// at the end-of-file opcode.
    fn parse_opcode(&mut self, bytes: &[u8], cursor: usize) -> Result<Option<usize>, RdbError> {
        let opcode = get_slice(bytes, cursor, 1)?[0];
        let mut consumed = 1;

        match opcode {
            OPCODE_METADATA => {
                let (name, name_len) = read_string(bytes, cursor + consumed)?;
                consumed += name_len;
                let (value, value_len) = read_string(bytes, cursor + consumed)?;
                consumed += value_len;

                self.metadata.insert(name, value);
            }
            OPCODE_SELECT_DB => {
                let (_database_number, int_len) = read_integer(bytes, cursor + consumed)?;
                consumed += int_len;
            }
            OPCODE_RESIZE_DB => {
                let (_key_count, keys_len) = read_integer(bytes, cursor + consumed)?;
                consumed += keys_len;
                let (_expire_count, expires_len) = read_integer(bytes, cursor + consumed)?;
                consumed += expires_len;
            }
            OPCODE_EXPIRY_MILLISECONDS => {
                let slice = get_slice(bytes, cursor + consumed, 8)?;
                let raw: [u8; 8] = slice.try_into().map_err(|_| RdbError::UnexpectedEof)?;
                consumed += 8;

                let expires_at = Timestamp::from_millisecond(u64::from_le_bytes(raw) as i64)
                    .map_err(|_| RdbError::InvalidExpiry)?;
                consumed += self.parse_typed_entry(bytes, cursor + consumed, Some(expires_at))?;
            }
            OPCODE_EXPIRY_SECONDS => {
                let slice = get_slice(bytes, cursor + consumed, 4)?;
                let raw: [u8; 4] = slice.try_into().map_err(|_| RdbError::UnexpectedEof)?;
                consumed += 4;

                let expires_at =
                    Timestamp::from_millisecond(u32::from_le_bytes(raw) as i64 * 1000)
                        .map_err(|_| RdbError::InvalidExpiry)?;
                consumed += self.parse_typed_entry(bytes, cursor + consumed, Some(expires_at))?;
            }
            VALUE_TYPE_STRING => {
                let (key, key_len) = read_string(bytes, cursor + consumed)?;
                consumed += key_len;
                let (value, value_len) = read_string(bytes, cursor + consumed)?;
                consumed += value_len;

                self.entries.push(RdbEntry {
                    key,
                    value,
                    expires_at: None,
                });
            }
            OPCODE_END_OF_FILE => return Ok(None),
            other => return Err(RdbError::UnknownOpcode(other)),
        }

        Ok(Some(consumed))
    }

    /// An expiry opcode is followed by a value-type byte, key and value.
    fn parse_typed_entry(
        &mut self,
        bytes: &[u8],
        cursor: usize,
        expires_at: Option<Timestamp>,
    ) -> Result<usize, RdbError> {
        let value_type = get_slice(bytes, cursor, 1)?[0];
        if value_type != VALUE_TYPE_STRING {
            return Err(RdbError::UnsupportedValueType(value_type));
        }

        let mut consumed = 1;
        let (key, key_len) = read_string(bytes, cursor + consumed)?;
        consumed += key_len;
        let (value, value_len) = read_string(bytes, cursor + consumed)?;
        consumed += value_len;

        self.entries.push(RdbEntry {
            key,
            value,
            expires_at,
        });

        Ok(consumed)
    }
}
