//! Fluent builders for attestation objects
//!
//! Attestation objects are encoded with `ciborium` so that tests exercise the
//! decoder against an independent encoder rather than hand-written bytes.

use ciborium::value::Value;
use sha2::{Digest, Sha256};

use super::constants::{TEST_CREDENTIAL_ID, TEST_KEY_X, TEST_KEY_Y, TEST_RP_ID};

/// User present, user verified and attested credential data included
pub const DEFAULT_FLAGS: u8 = 0x45;

/// Encode a CBOR value
///
/// # Panics
///
/// Panics if `ciborium` fails to serialize the value.
#[must_use]
pub fn encode_cbor(value: &Value) -> Vec<u8> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(value, &mut bytes).unwrap();
    bytes
}

/// COSE map for an EC2 P-256 ES256 key
#[must_use]
pub fn es256_cose_key(x: &[u8], y: &[u8]) -> Value {
    Value::Map(vec![
        (Value::Integer(1i64.into()), Value::Integer(2i64.into())),
        (Value::Integer(3i64.into()), Value::Integer((-7i64).into())),
        (Value::Integer((-1i64).into()), Value::Integer(1i64.into())),
        (Value::Integer((-2i64).into()), Value::Bytes(x.to_vec())),
        (Value::Integer((-3i64).into()), Value::Bytes(y.to_vec())),
    ])
}

/// Builder for attestation objects with a `none` attestation statement
pub struct AttestationObjectBuilder {
    rp_id: String,
    flags: u8,
    sign_count: u32,
    aaguid: [u8; 16],
    credential_id: Vec<u8>,
    credential_public_key: Option<Value>,
    extensions: Option<Value>,
}

impl AttestationObjectBuilder {
    /// Create a builder for the fixture ES256 credential
    #[must_use]
    pub fn new() -> Self {
        Self {
            rp_id: TEST_RP_ID.to_string(),
            flags: DEFAULT_FLAGS,
            sign_count: 0,
            aaguid: [0; 16],
            credential_id: TEST_CREDENTIAL_ID.to_vec(),
            credential_public_key: Some(es256_cose_key(&TEST_KEY_X, &TEST_KEY_Y)),
            extensions: None,
        }
    }

    #[must_use]
    pub fn rp_id(mut self, rp_id: &str) -> Self {
        self.rp_id = rp_id.to_string();
        self
    }

    /// Override the flags byte verbatim
    #[must_use]
    pub fn flags(mut self, flags: u8) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn sign_count(mut self, sign_count: u32) -> Self {
        self.sign_count = sign_count;
        self
    }

    #[must_use]
    pub fn aaguid(mut self, aaguid: [u8; 16]) -> Self {
        self.aaguid = aaguid;
        self
    }

    #[must_use]
    pub fn credential_id(mut self, credential_id: &[u8]) -> Self {
        self.credential_id = credential_id.to_vec();
        self
    }

    /// Replace the COSE key map
    #[must_use]
    pub fn credential_public_key(mut self, key: Value) -> Self {
        self.credential_public_key = Some(key);
        self
    }

    /// Drop attested credential data and clear its flag
    #[must_use]
    pub fn without_attested_credential_data(mut self) -> Self {
        self.flags &= !0x40;
        self.credential_public_key = None;
        self
    }

    /// Append an extension map after the credential and set the ED flag
    #[must_use]
    pub fn extensions(mut self, extensions: Value) -> Self {
        self.flags |= 0x80;
        self.extensions = Some(extensions);
        self
    }

    /// Raw authenticator data
    ///
    /// # Panics
    ///
    /// Panics if the credential id is longer than `u16::MAX` bytes.
    #[must_use]
    pub fn authenticator_data(&self) -> Vec<u8> {
        let mut data = Sha256::digest(self.rp_id.as_bytes()).to_vec();
        data.push(self.flags);
        data.extend_from_slice(&self.sign_count.to_be_bytes());
        if let Some(key) = &self.credential_public_key {
            data.extend_from_slice(&self.aaguid);
            let length = u16::try_from(self.credential_id.len()).unwrap();
            data.extend_from_slice(&length.to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            data.extend_from_slice(&encode_cbor(key));
        }
        if let Some(extensions) = &self.extensions {
            data.extend_from_slice(&encode_cbor(extensions));
        }
        data
    }

    /// Encoded attestation object
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        encode_cbor(&Value::Map(vec![
            (Value::Text("fmt".to_string()), Value::Text("none".to_string())),
            (Value::Text("attStmt".to_string()), Value::Map(Vec::new())),
            (
                Value::Text("authData".to_string()),
                Value::Bytes(self.authenticator_data()),
            ),
        ]))
    }
}

impl Default for AttestationObjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}
