//! Test fixtures providing pre-built test objects
//!
//! Options, provider results and platform errors shared by unit and
//! integration tests.

use serde_json::json;

use crate::passkey::error_map::{NativeErrorCode, PlatformError};
use crate::passkey::model::{
    AssertionResult, AuthenticatorAttachment, AuthenticatorTransport, CeremonyResult,
    ExtensionOutputs, RegistrationResult,
};
use crate::webauthn::base64url;
use crate::webauthn::types::{
    PublicKeyCredentialCreationOptionsJson, PublicKeyCredentialDescriptorJson,
    PublicKeyCredentialParametersJson, PublicKeyCredentialRequestOptionsJson, RelyingPartyJson,
    UserEntityJson, PUBLIC_KEY_TYPE,
};

use super::builders::AttestationObjectBuilder;
use super::constants::{
    TEST_CREDENTIAL_ID, TEST_KEY_X, TEST_KEY_Y, TEST_ORIGIN, TEST_RP_ID, TEST_USER_ID,
};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Creation options for the fixture user with an ES256 parameter
    #[must_use]
    pub fn creation_options(challenge: &[u8]) -> PublicKeyCredentialCreationOptionsJson {
        PublicKeyCredentialCreationOptionsJson {
            rp: RelyingPartyJson {
                name: "Example".to_string(),
                id: Some(TEST_RP_ID.to_string()),
            },
            user: UserEntityJson {
                id: Some(base64url::encode(TEST_USER_ID)),
                name: "alice@example.com".to_string(),
                display_name: "Alice".to_string(),
            },
            challenge: Some(base64url::encode(challenge)),
            pub_key_cred_params: vec![PublicKeyCredentialParametersJson {
                r#type: PUBLIC_KEY_TYPE.to_string(),
                alg: -7,
            }],
            ..PublicKeyCredentialCreationOptionsJson::default()
        }
    }

    /// Request options allowing the fixture credential
    #[must_use]
    pub fn request_options(challenge: &[u8]) -> PublicKeyCredentialRequestOptionsJson {
        PublicKeyCredentialRequestOptionsJson {
            challenge: Some(base64url::encode(challenge)),
            rp_id: Some(TEST_RP_ID.to_string()),
            allow_credentials: Some(vec![PublicKeyCredentialDescriptorJson {
                id: base64url::encode(TEST_CREDENTIAL_ID),
                r#type: PUBLIC_KEY_TYPE.to_string(),
                transports: Some(vec!["internal".to_string(), "hybrid".to_string()]),
            }]),
            ..PublicKeyCredentialRequestOptionsJson::default()
        }
    }

    /// Client data JSON bytes for a ceremony type such as `webauthn.create`
    #[must_use]
    pub fn client_data_json(ceremony_type: &str, challenge: &[u8]) -> Vec<u8> {
        json!({
            "type": ceremony_type,
            "challenge": base64url::encode(challenge),
            "origin": TEST_ORIGIN,
            "crossOrigin": false
        })
        .to_string()
        .into_bytes()
    }

    /// Expected `x || y` of the fixture key
    #[must_use]
    pub fn expected_public_key() -> Vec<u8> {
        [TEST_KEY_X.as_slice(), TEST_KEY_Y.as_slice()].concat()
    }

    /// Registration result carrying the given attestation object
    #[must_use]
    pub fn registration_result_with(attestation_object: Vec<u8>) -> CeremonyResult {
        CeremonyResult::Registration(RegistrationResult {
            credential_id: TEST_CREDENTIAL_ID.to_vec(),
            attestation_object,
            client_data_json: Self::client_data_json("webauthn.create", b"fizz"),
            attachment: Some(AuthenticatorAttachment::Platform),
            transports: Some(vec![
                AuthenticatorTransport::Internal,
                AuthenticatorTransport::Hybrid,
            ]),
            extensions: ExtensionOutputs::default(),
        })
    }

    /// Registration result for the fixture ES256 credential
    #[must_use]
    pub fn registration_result() -> CeremonyResult {
        Self::registration_result_with(AttestationObjectBuilder::new().build())
    }

    /// Assertion result for the fixture credential
    #[must_use]
    pub fn assertion_result() -> CeremonyResult {
        let auth_data = AttestationObjectBuilder::new()
            .without_attested_credential_data()
            .sign_count(1)
            .authenticator_data();
        CeremonyResult::Assertion(AssertionResult {
            credential_id: TEST_CREDENTIAL_ID.to_vec(),
            authenticator_data: auth_data,
            client_data_json: Self::client_data_json("webauthn.get", b"fizz"),
            signature: vec![0x30, 0x44, 0x02, 0x20, 0x01],
            user_handle: Some(TEST_USER_ID.to_vec()),
            attachment: Some(AuthenticatorAttachment::Platform),
            extensions: ExtensionOutputs::default(),
        })
    }

    /// Apple "user cancelled" failure
    #[must_use]
    pub fn cancelled_error() -> PlatformError {
        PlatformError::new(
            NativeErrorCode::AuthorizationServices(1001),
            "The operation couldn't be completed.",
        )
    }
}
