//! CBOR processing for `WebAuthn`
//!
//! This module implements the small subset of CBOR (RFC 8949) that appears in
//! attestation objects and COSE keys: unsigned and negative integers, byte
//! strings, text strings, arrays and maps, all definite-length. Tags, floats,
//! simple values and indefinite-length items are rejected instead of being
//! misparsed.

use std::collections::BTreeMap;

/// Maximum nesting of arrays and maps accepted by the decoder
pub const MAX_NESTING_DEPTH: usize = 16;

const MAJOR_UNSIGNED: u8 = 0;
const MAJOR_NEGATIVE: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_TEXT: u8 = 3;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;

/// CBOR decoding failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CborError {
    #[error("unexpected end of CBOR data")]
    UnexpectedEndOfData,

    /// Major type or additional information outside the supported subset
    #[error("unsupported CBOR item (initial byte {0:#04x})")]
    UnsupportedType(u8),

    #[error("invalid CBOR data: {0}")]
    InvalidData(String),

    #[error("CBOR nesting deeper than {MAX_NESTING_DEPTH} levels")]
    DepthLimitExceeded,
}

/// Map key reduced to a comparable scalar
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MapKey {
    Integer(i128),
    Text(String),
}

impl From<i64> for MapKey {
    fn from(value: i64) -> Self {
        MapKey::Integer(i128::from(value))
    }
}

impl From<&str> for MapKey {
    fn from(value: &str) -> Self {
        MapKey::Text(value.to_string())
    }
}

/// A decoded CBOR data item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CborValue {
    Unsigned(u64),
    /// Negative integer, already converted from the encoded `-1 - n` form
    Negative(i128),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<CborValue>),
    Map(BTreeMap<MapKey, CborValue>),
}

impl CborValue {
    /// Integer value of a major type 0 or 1 item
    #[must_use]
    pub fn as_integer(&self) -> Option<i128> {
        match self {
            CborValue::Unsigned(value) => Some(i128::from(*value)),
            CborValue::Negative(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            CborValue::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CborValue::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[CborValue]> {
        match self {
            CborValue::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<MapKey, CborValue>> {
        match self {
            CborValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a map entry; `None` for missing keys and for non-map values
    pub fn get(&self, key: impl Into<MapKey>) -> Option<&CborValue> {
        self.as_map().and_then(|map| map.get(&key.into()))
    }

    fn into_map_key(self) -> Result<MapKey, CborError> {
        match self {
            CborValue::Unsigned(value) => Ok(MapKey::Integer(i128::from(value))),
            CborValue::Negative(value) => Ok(MapKey::Integer(value)),
            CborValue::Text(text) => Ok(MapKey::Text(text)),
            _ => Err(CborError::InvalidData(
                "map key must be an integer or a text string".to_string(),
            )),
        }
    }
}

/// Decode the data item at the start of `bytes`
///
/// Bytes following the first complete item are ignored.
///
/// # Errors
///
/// Returns an error if the buffer ends mid-item, uses an unsupported major
/// type or length encoding, contains a map key that is not an integer or text,
/// contains invalid UTF-8 text, or nests deeper than [`MAX_NESTING_DEPTH`].
pub fn decode(bytes: &[u8]) -> Result<CborValue, CborError> {
    decode_prefix(bytes).map(|(value, _)| value)
}

/// Decode the data item at the start of `bytes` and report how many bytes it used
///
/// # Errors
///
/// See [`decode`].
pub fn decode_prefix(bytes: &[u8]) -> Result<(CborValue, usize), CborError> {
    let mut decoder = Decoder {
        input: bytes,
        offset: 0,
    };
    let value = decoder.decode_item(0)?;
    Ok((value, decoder.offset))
}

struct Decoder<'a> {
    input: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], CborError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(CborError::UnexpectedEndOfData)?;
        let bytes = self
            .input
            .get(self.offset..end)
            .ok_or(CborError::UnexpectedEndOfData)?;
        self.offset = end;
        Ok(bytes)
    }

    fn remaining(&self) -> usize {
        self.input.len().saturating_sub(self.offset)
    }

    fn decode_item(&mut self, depth: usize) -> Result<CborValue, CborError> {
        let initial = self.take(1)?[0];
        let major = initial >> 5;
        // Tags and simple values are rejected before their argument bytes are read
        if major > MAJOR_MAP {
            return Err(CborError::UnsupportedType(initial));
        }
        let argument = self.read_argument(initial)?;

        match major {
            MAJOR_UNSIGNED => Ok(CborValue::Unsigned(argument)),
            MAJOR_NEGATIVE => Ok(CborValue::Negative(-1 - i128::from(argument))),
            MAJOR_BYTES => Ok(CborValue::Bytes(self.take(length(argument)?)?.to_vec())),
            MAJOR_TEXT => {
                let bytes = self.take(length(argument)?)?;
                let text = std::str::from_utf8(bytes)
                    .map_err(|e| CborError::InvalidData(format!("text string is not UTF-8: {e}")))?;
                Ok(CborValue::Text(text.to_string()))
            }
            MAJOR_ARRAY => {
                let depth = nested(depth)?;
                let count = length(argument)?;
                // Every item takes at least one byte
                let mut items = Vec::with_capacity(count.min(self.remaining()));
                for _ in 0..count {
                    items.push(self.decode_item(depth)?);
                }
                Ok(CborValue::Array(items))
            }
            MAJOR_MAP => {
                let depth = nested(depth)?;
                let count = length(argument)?;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key = self.decode_item(depth)?.into_map_key()?;
                    let value = self.decode_item(depth)?;
                    map.insert(key, value);
                }
                Ok(CborValue::Map(map))
            }
            _ => Err(CborError::UnsupportedType(initial)),
        }
    }

    /// Read the argument encoded in the low five bits of the initial byte
    fn read_argument(&mut self, initial: u8) -> Result<u64, CborError> {
        match initial & 0x1f {
            info @ 0..=23 => Ok(u64::from(info)),
            24 => Ok(u64::from(self.take(1)?[0])),
            25 => {
                let b = self.take(2)?;
                Ok(u64::from(u16::from_be_bytes([b[0], b[1]])))
            }
            26 => {
                let b = self.take(4)?;
                Ok(u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
            }
            27 => {
                let b = self.take(8)?;
                Ok(u64::from_be_bytes([
                    b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
                ]))
            }
            // 28..=30 are reserved, 31 is indefinite length
            _ => Err(CborError::UnsupportedType(initial)),
        }
    }
}

fn nested(depth: usize) -> Result<usize, CborError> {
    let depth = depth + 1;
    if depth > MAX_NESTING_DEPTH {
        return Err(CborError::DepthLimitExceeded);
    }
    Ok(depth)
}

/// Lengths that do not fit in memory cannot be satisfied by the buffer either
fn length(argument: u64) -> Result<usize, CborError> {
    usize::try_from(argument).map_err(|_| CborError::UnexpectedEndOfData)
}
