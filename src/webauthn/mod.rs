//! `WebAuthn` building blocks
//!
//! Pure, stateless pieces shared by the marshaller and the ceremony
//! orchestrator: the base64url codec, a CBOR decoder limited to the subset
//! attestation objects use, COSE public-key extraction and the JSON wire types.

pub mod base64url;
pub mod cbor;
pub mod cose;
pub mod types;

// Re-exports for public use
pub use cbor::{CborError, CborValue, MapKey};
pub use cose::{
    extract_authenticator_data, extract_cose_key, extract_public_key, AuthenticatorData,
    CoseKey, ExtractionError,
};
pub use types::*;
