//! Base64URL codec
//!
//! All binary `WebAuthn` fields travel as unpadded, URL-safe base64. Decoding
//! also accepts correctly padded input since some platforms emit it.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;

/// URL-safe engine that never pads on encode and tolerates padding on decode.
/// Non-canonical trailing bits are rejected so that decode/encode stays a bijection.
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Encode bytes as unpadded base64url text
#[must_use]
pub fn encode(bytes: &[u8]) -> String {
    BASE64URL.encode(bytes)
}

/// Decode base64url text into bytes
///
/// # Errors
///
/// Returns an error if the input contains characters outside the URL-safe
/// alphabet or has a length that cannot be produced by any byte sequence.
pub fn decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64URL.decode(input)
}
