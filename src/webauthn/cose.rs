//! Authenticator data and COSE public key extraction
//!
//! The authenticator data embedded in an attestation object has the layout:
//! - 32 bytes: RP ID hash
//! - 1 byte: flags
//! - 4 bytes: signature counter
//! - variable: attested credential data (if flag AT, bit 6, is set)
//!   - 16 bytes: AAGUID
//!   - 2 bytes: credential ID length (L), big-endian
//!   - L bytes: credential ID
//!   - variable: COSE public key (CBOR map)
//!
//! Only EC2 keys on P-256 used with ES256 are supported. The public key is
//! reported as the raw `x || y` coordinates without a leading format byte.

use super::cbor::{self, CborError, CborValue};

/// Length of the fixed authenticator data header
pub const AUTH_DATA_MIN_LEN: usize = 37;

const FLAGS_OFFSET: usize = 32;
const FLAG_ATTESTED_CREDENTIAL_DATA: u8 = 0x40;
const AAGUID_LEN: usize = 16;
const P256_COORDINATE_LEN: usize = 32;

// COSE key parameters (RFC 9053)
const COSE_KEY_TYPE: i64 = 1;
const COSE_ALGORITHM: i64 = 3;
const COSE_EC2_CURVE: i64 = -1;
const COSE_EC2_X: i64 = -2;
const COSE_EC2_Y: i64 = -3;

const KEY_TYPE_EC2: i128 = 2;
const CURVE_P256: i128 = 1;
/// ECDSA with SHA-256
pub const ALGORITHM_ES256: i64 = -7;

/// Public key extraction failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractionError {
    #[error("invalid CBOR: {0}")]
    Cbor(#[from] CborError),

    #[error("invalid attestation data: {0}")]
    InvalidData(String),

    #[error("authenticator data too short")]
    TooShort,

    #[error("no attested credential data present")]
    NoAttestedCredentialData,

    #[error("COSE key is missing the {0} parameter")]
    MissingKeyComponent(&'static str),

    #[error("only EC2 P-256 ES256 public keys are supported")]
    UnsupportedKeyType,
}

/// EC2 public key read from a COSE key map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoseKey {
    pub key_type: i128,
    pub curve: i128,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
    pub algorithm: i128,
}

impl CoseKey {
    /// Read and validate an EC2/P-256 key from a decoded COSE map
    ///
    /// # Errors
    ///
    /// Returns an error if a required parameter is missing or has the wrong
    /// type, or if the key is not an ES256 key on P-256.
    pub fn from_cbor(value: &CborValue) -> Result<Self, ExtractionError> {
        if value.as_map().is_none() {
            return Err(ExtractionError::InvalidData(
                "COSE key is not a map".to_string(),
            ));
        }

        let key_type = integer_param(value, COSE_KEY_TYPE, "kty")?;
        let algorithm = integer_param(value, COSE_ALGORITHM, "alg")?;
        if key_type != KEY_TYPE_EC2 {
            return Err(ExtractionError::UnsupportedKeyType);
        }

        let curve = integer_param(value, COSE_EC2_CURVE, "crv")?;
        if curve != CURVE_P256 || algorithm != i128::from(ALGORITHM_ES256) {
            return Err(ExtractionError::UnsupportedKeyType);
        }

        let x = bytes_param(value, COSE_EC2_X, "x")?;
        let y = bytes_param(value, COSE_EC2_Y, "y")?;
        if x.len() != P256_COORDINATE_LEN || y.len() != P256_COORDINATE_LEN {
            return Err(ExtractionError::InvalidData(format!(
                "P-256 coordinates must be {P256_COORDINATE_LEN} bytes, got {} and {}",
                x.len(),
                y.len()
            )));
        }

        Ok(Self {
            key_type,
            curve,
            x,
            y,
            algorithm,
        })
    }

    /// Uncompressed point without the leading format byte
    #[must_use]
    pub fn public_key_bytes(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(self.x.len() + self.y.len());
        key.extend_from_slice(&self.x);
        key.extend_from_slice(&self.y);
        key
    }

    /// COSE algorithm identifier as reported in `publicKeyAlgorithm`
    #[must_use]
    pub fn algorithm_id(&self) -> Option<i64> {
        i64::try_from(self.algorithm).ok()
    }
}

/// Attested credential data section of the authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttestedCredentialData {
    pub aaguid: [u8; AAGUID_LEN],
    pub credential_id: Vec<u8>,
    pub credential_public_key: CborValue,
}

/// Parsed authenticator data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatorData {
    pub rp_id_hash: [u8; 32],
    pub flags: u8,
    pub sign_count: u32,
    pub attested_credential_data: Option<AttestedCredentialData>,
}

impl AuthenticatorData {
    /// Parse raw authenticator data bytes
    ///
    /// # Errors
    ///
    /// Returns an error if the data is shorter than its declared layout or the
    /// embedded COSE key is not valid CBOR.
    pub fn parse(auth_data: &[u8]) -> Result<Self, ExtractionError> {
        if auth_data.len() < AUTH_DATA_MIN_LEN {
            return Err(ExtractionError::TooShort);
        }

        let mut rp_id_hash = [0u8; 32];
        rp_id_hash.copy_from_slice(&auth_data[..FLAGS_OFFSET]);
        let flags = auth_data[FLAGS_OFFSET];
        let sign_count = u32::from_be_bytes([
            auth_data[33],
            auth_data[34],
            auth_data[35],
            auth_data[36],
        ]);

        let attested_credential_data = if flags & FLAG_ATTESTED_CREDENTIAL_DATA == 0 {
            None
        } else {
            Some(parse_attested_credential_data(
                &auth_data[AUTH_DATA_MIN_LEN..],
            )?)
        };

        Ok(Self {
            rp_id_hash,
            flags,
            sign_count,
            attested_credential_data,
        })
    }
}

fn parse_attested_credential_data(data: &[u8]) -> Result<AttestedCredentialData, ExtractionError> {
    // AAGUID and credential ID length
    let header = AAGUID_LEN + 2;
    if data.len() < header {
        return Err(ExtractionError::TooShort);
    }

    let mut aaguid = [0u8; AAGUID_LEN];
    aaguid.copy_from_slice(&data[..AAGUID_LEN]);
    let id_len = usize::from(u16::from_be_bytes([data[AAGUID_LEN], data[AAGUID_LEN + 1]]));

    let Some(credential_id) = data.get(header..header + id_len) else {
        return Err(ExtractionError::TooShort);
    };

    // The rest is the COSE public key, possibly followed by extension data
    let key_bytes = &data[header + id_len..];
    if key_bytes.is_empty() {
        return Err(ExtractionError::TooShort);
    }
    let (credential_public_key, _) = cbor::decode_prefix(key_bytes)?;

    Ok(AttestedCredentialData {
        aaguid,
        credential_id: credential_id.to_vec(),
        credential_public_key,
    })
}

/// Extract the raw `authData` bytes from an attestation object
///
/// # Errors
///
/// Returns an error if the attestation object is not valid CBOR or lacks an
/// `authData` byte string.
pub fn extract_authenticator_data(attestation_object: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let attestation = cbor::decode(attestation_object)?;

    let Some(auth_data) = attestation.get("authData").and_then(CborValue::as_bytes) else {
        return Err(ExtractionError::InvalidData(
            "missing authData in attestation".to_string(),
        ));
    };

    Ok(auth_data.to_vec())
}

/// Extract and validate the credential's COSE key from an attestation object
///
/// # Errors
///
/// See [`extract_public_key`].
pub fn extract_cose_key(attestation_object: &[u8]) -> Result<CoseKey, ExtractionError> {
    let auth_data = extract_authenticator_data(attestation_object)?;
    let parsed = AuthenticatorData::parse(&auth_data)?;

    let Some(attested) = parsed.attested_credential_data else {
        return Err(ExtractionError::NoAttestedCredentialData);
    };

    CoseKey::from_cbor(&attested.credential_public_key)
}

/// Extract the credential public key (`x || y`) from an attestation object
///
/// # Errors
///
/// Returns an error if:
/// - The attestation object or embedded key is not valid CBOR
/// - `authData` is missing or shorter than its declared layout
/// - The AT flag is clear
/// - The COSE key lacks a parameter or is not an EC2 P-256 ES256 key
pub fn extract_public_key(attestation_object: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    extract_cose_key(attestation_object).map(|key| key.public_key_bytes())
}

fn integer_param(key: &CborValue, label: i64, name: &'static str) -> Result<i128, ExtractionError> {
    key.get(label)
        .and_then(CborValue::as_integer)
        .ok_or(ExtractionError::MissingKeyComponent(name))
}

fn bytes_param(key: &CborValue, label: i64, name: &'static str) -> Result<Vec<u8>, ExtractionError> {
    key.get(label)
        .and_then(CborValue::as_bytes)
        .map(<[u8]>::to_vec)
        .ok_or(ExtractionError::MissingKeyComponent(name))
}
