//! `WebAuthn` JSON marshaller
//!
//! Converts between the canonical JSON wire shapes and the internal byte
//! model. Every validation failure is reported here, before a request can
//! reach an authenticator provider.

use log::{debug, warn};

use crate::error::{ErrorKind, PasskeyError};
use crate::webauthn::base64url;
use crate::webauthn::cose::{extract_authenticator_data, extract_cose_key};
use crate::webauthn::types::{
    AuthenticationResponseJson, AuthenticatorAssertionResponseJson,
    AuthenticatorAttestationResponseJson, AuthenticatorSelectionCriteriaJson,
    PublicKeyCredentialCreationOptionsJson, PublicKeyCredentialDescriptorJson,
    PublicKeyCredentialParametersJson, PublicKeyCredentialRequestOptionsJson,
    RegistrationResponseJson, RelyingPartyJson, UserEntityJson, PUBLIC_KEY_TYPE,
};

use super::extensions;
use super::model::{
    AssertionRequest, AssertionResult, AttestationConveyance, AuthenticatorAttachment,
    AuthenticatorSelection, AuthenticatorTransport, CreationRequest, CredentialDescriptor,
    CredentialParameters, RegistrationResult, RelyingParty, ResidentKeyRequirement, UserEntity,
    UserVerificationRequirement,
};

/// Assertion timeout applied when the request does not carry one
pub const DEFAULT_ASSERTION_TIMEOUT_MS: u32 = 60_000;

fn decode_field(value: &str, field: &str) -> Result<Vec<u8>, PasskeyError> {
    base64url::decode(value).map_err(|_| PasskeyError::invalid_encoding(field))
}

fn decode_challenge(challenge: Option<&str>) -> Result<Vec<u8>, PasskeyError> {
    let challenge = challenge.ok_or_else(|| {
        PasskeyError::new(ErrorKind::InvalidChallenge, "'challenge' is required")
    })?;
    let bytes = decode_field(challenge, "challenge")?;
    if bytes.is_empty() {
        return Err(PasskeyError::new(
            ErrorKind::InvalidChallenge,
            "'challenge' must not be empty",
        ));
    }
    Ok(bytes)
}

fn malformed_json(error: &serde_json::Error) -> PasskeyError {
    PasskeyError::new(
        ErrorKind::InvalidEncoding,
        format!("Malformed request JSON: {error}"),
    )
}

/// Parse creation options from JSON text
///
/// # Errors
///
/// Returns `InvalidEncoding` if the text is not a valid options document.
pub fn parse_creation_options(
    json: &str,
) -> Result<PublicKeyCredentialCreationOptionsJson, PasskeyError> {
    serde_json::from_str(json).map_err(|e| malformed_json(&e))
}

/// Parse request (assertion) options from JSON text
///
/// # Errors
///
/// Returns `InvalidEncoding` if the text is not a valid options document.
pub fn parse_request_options(
    json: &str,
) -> Result<PublicKeyCredentialRequestOptionsJson, PasskeyError> {
    serde_json::from_str(json).map_err(|e| malformed_json(&e))
}

fn transports_from_json(transports: Option<&[String]>) -> Vec<AuthenticatorTransport> {
    transports
        .unwrap_or_default()
        .iter()
        .filter_map(|transport| {
            let parsed = AuthenticatorTransport::from_wire(transport);
            if parsed.is_none() {
                debug!("Dropping unknown transport hint '{transport}'");
            }
            parsed
        })
        .collect()
}

fn transports_to_json(transports: &[AuthenticatorTransport]) -> Option<Vec<String>> {
    if transports.is_empty() {
        None
    } else {
        Some(transports.iter().map(ToString::to_string).collect())
    }
}

fn descriptors_from_json(
    descriptors: Option<&[PublicKeyCredentialDescriptorJson]>,
    field: &str,
) -> Result<Vec<CredentialDescriptor>, PasskeyError> {
    let mut parsed = Vec::new();
    for descriptor in descriptors.unwrap_or_default() {
        if descriptor.r#type != PUBLIC_KEY_TYPE {
            debug!(
                "Skipping {field} entry with unsupported type '{}'",
                descriptor.r#type
            );
            continue;
        }
        parsed.push(CredentialDescriptor {
            id: decode_field(&descriptor.id, &format!("{field}.id"))?,
            transports: transports_from_json(descriptor.transports.as_deref()),
        });
    }
    Ok(parsed)
}

fn descriptors_to_json(
    descriptors: &[CredentialDescriptor],
) -> Option<Vec<PublicKeyCredentialDescriptorJson>> {
    if descriptors.is_empty() {
        return None;
    }
    Some(
        descriptors
            .iter()
            .map(|descriptor| PublicKeyCredentialDescriptorJson {
                id: base64url::encode(&descriptor.id),
                r#type: PUBLIC_KEY_TYPE.to_string(),
                transports: transports_to_json(&descriptor.transports),
            })
            .collect(),
    )
}

fn selection_from_json(selection: &AuthenticatorSelectionCriteriaJson) -> AuthenticatorSelection {
    AuthenticatorSelection {
        attachment: selection
            .authenticator_attachment
            .as_deref()
            .and_then(AuthenticatorAttachment::from_wire),
        resident_key: selection
            .resident_key
            .as_deref()
            .and_then(ResidentKeyRequirement::from_wire),
        require_resident_key: selection.require_resident_key,
        user_verification: selection
            .user_verification
            .as_deref()
            .and_then(UserVerificationRequirement::from_wire),
    }
}

/// Build a validated registration request from its JSON options
///
/// # Errors
///
/// - `InvalidChallenge` if the challenge is missing or empty
/// - `MissingUserId` / `InvalidUserId` if `user.id` is absent or empty
/// - `NotSupported` if no `public-key` credential parameters remain
/// - `InvalidEncoding` naming the field if any base64url value is malformed
/// - extension errors from [`extensions::registration_inputs_from_json`]
pub fn creation_request_from_json(
    options: &PublicKeyCredentialCreationOptionsJson,
) -> Result<CreationRequest, PasskeyError> {
    let challenge = decode_challenge(options.challenge.as_deref())?;

    let user_id = match options.user.id.as_deref() {
        None => return Err(ErrorKind::MissingUserId.into()),
        Some(id) => decode_field(id, "user.id")?,
    };
    if user_id.is_empty() {
        return Err(PasskeyError::new(
            ErrorKind::InvalidUserId,
            "'user.id' must not be empty",
        ));
    }

    let pub_key_cred_params: Vec<CredentialParameters> = options
        .pub_key_cred_params
        .iter()
        .filter(|param| param.r#type == PUBLIC_KEY_TYPE)
        .map(|param| CredentialParameters { alg: param.alg })
        .collect();
    if pub_key_cred_params.is_empty() {
        return Err(PasskeyError::new(
            ErrorKind::NotSupported,
            "'pubKeyCredParams' contains no supported credential types",
        ));
    }

    Ok(CreationRequest {
        rp: RelyingParty {
            name: options.rp.name.clone(),
            id: options.rp.id.clone(),
        },
        user: UserEntity {
            id: user_id,
            name: options.user.name.clone(),
            display_name: options.user.display_name.clone(),
        },
        challenge,
        pub_key_cred_params,
        timeout_ms: options.timeout,
        exclude_credentials: descriptors_from_json(
            options.exclude_credentials.as_deref(),
            "excludeCredentials",
        )?,
        authenticator_selection: options
            .authenticator_selection
            .as_ref()
            .map(selection_from_json),
        attestation: options
            .attestation
            .as_deref()
            .and_then(AttestationConveyance::from_wire),
        extensions: extensions::registration_inputs_from_json(options.extensions.as_ref())?,
    })
}

/// Build a validated assertion request from its JSON options
///
/// # Errors
///
/// - `InvalidChallenge` if the challenge is missing or empty
/// - `InvalidEncoding` naming the field if any base64url value is malformed
/// - extension errors from [`extensions::assertion_inputs_from_json`]
pub fn assertion_request_from_json(
    options: &PublicKeyCredentialRequestOptionsJson,
) -> Result<AssertionRequest, PasskeyError> {
    let challenge = decode_challenge(options.challenge.as_deref())?;
    let allow_credentials =
        descriptors_from_json(options.allow_credentials.as_deref(), "allowCredentials")?;
    // Only descriptors that survive the type filter count as allowed
    let allow_ids: Vec<String> = options
        .allow_credentials
        .iter()
        .flatten()
        .filter(|descriptor| descriptor.r#type == PUBLIC_KEY_TYPE)
        .map(|descriptor| descriptor.id.clone())
        .collect();

    Ok(AssertionRequest {
        challenge,
        rp_id: options.rp_id.clone(),
        timeout_ms: options.timeout.unwrap_or(DEFAULT_ASSERTION_TIMEOUT_MS),
        allow_credentials,
        user_verification: options
            .user_verification
            .as_deref()
            .and_then(UserVerificationRequirement::from_wire),
        extensions: extensions::assertion_inputs_from_json(options.extensions.as_ref(), &allow_ids)?,
    })
}

/// Convert a registration request back to JSON options for JSON-native providers
#[must_use]
pub fn creation_request_to_json(request: &CreationRequest) -> PublicKeyCredentialCreationOptionsJson {
    PublicKeyCredentialCreationOptionsJson {
        rp: RelyingPartyJson {
            name: request.rp.name.clone(),
            id: request.rp.id.clone(),
        },
        user: UserEntityJson {
            id: Some(base64url::encode(&request.user.id)),
            name: request.user.name.clone(),
            display_name: request.user.display_name.clone(),
        },
        challenge: Some(base64url::encode(&request.challenge)),
        pub_key_cred_params: request
            .pub_key_cred_params
            .iter()
            .map(|param| PublicKeyCredentialParametersJson {
                r#type: PUBLIC_KEY_TYPE.to_string(),
                alg: param.alg,
            })
            .collect(),
        timeout: request.timeout_ms,
        exclude_credentials: descriptors_to_json(&request.exclude_credentials),
        authenticator_selection: request.authenticator_selection.as_ref().map(|selection| {
            AuthenticatorSelectionCriteriaJson {
                authenticator_attachment: selection.attachment.map(|a| a.as_str().to_string()),
                resident_key: selection.resident_key.map(|r| r.as_str().to_string()),
                require_resident_key: selection.require_resident_key,
                user_verification: selection.user_verification.map(|u| u.as_str().to_string()),
            }
        }),
        attestation: request.attestation.map(|a| a.as_str().to_string()),
        extensions: extensions::registration_inputs_to_json(&request.extensions),
    }
}

/// Convert an assertion request back to JSON options for JSON-native providers
#[must_use]
pub fn assertion_request_to_json(request: &AssertionRequest) -> PublicKeyCredentialRequestOptionsJson {
    PublicKeyCredentialRequestOptionsJson {
        challenge: Some(base64url::encode(&request.challenge)),
        rp_id: request.rp_id.clone(),
        timeout: Some(request.timeout_ms),
        allow_credentials: descriptors_to_json(&request.allow_credentials),
        user_verification: request.user_verification.map(|u| u.as_str().to_string()),
        extensions: extensions::assertion_inputs_to_json(&request.extensions),
    }
}

/// Serialize a registration result
///
/// `authenticatorData`, `publicKeyAlgorithm` and `publicKey` are derived from
/// the attestation object. If it cannot be decoded the registration is still
/// reported and those fields are omitted.
#[must_use]
pub fn registration_result_to_json(result: &RegistrationResult) -> RegistrationResponseJson {
    let id = base64url::encode(&result.credential_id);

    let authenticator_data = match extract_authenticator_data(&result.attestation_object) {
        Ok(auth_data) => Some(base64url::encode(&auth_data)),
        Err(e) => {
            warn!("Could not read authenticator data from attestation object: {e}");
            None
        }
    };

    let (public_key, public_key_algorithm) = match extract_cose_key(&result.attestation_object) {
        Ok(key) => (
            Some(base64url::encode(&key.public_key_bytes())),
            key.algorithm_id(),
        ),
        Err(e) => {
            warn!("Could not derive public key for credential {id}: {e}");
            (None, None)
        }
    };

    RegistrationResponseJson {
        raw_id: id.clone(),
        id,
        response: AuthenticatorAttestationResponseJson {
            client_data_json: base64url::encode(&result.client_data_json),
            attestation_object: base64url::encode(&result.attestation_object),
            authenticator_data,
            transports: result
                .transports
                .as_ref()
                .map(|transports| transports.iter().map(ToString::to_string).collect()),
            public_key_algorithm,
            public_key,
        },
        authenticator_attachment: result.attachment.map(|a| a.as_str().to_string()),
        client_extension_results: extensions::outputs_to_json(&result.extensions),
        r#type: PUBLIC_KEY_TYPE.to_string(),
    }
}

/// Serialize an assertion result
#[must_use]
pub fn assertion_result_to_json(result: &AssertionResult) -> AuthenticationResponseJson {
    let id = base64url::encode(&result.credential_id);
    AuthenticationResponseJson {
        raw_id: Some(id.clone()),
        id,
        response: AuthenticatorAssertionResponseJson {
            authenticator_data: base64url::encode(&result.authenticator_data),
            client_data_json: base64url::encode(&result.client_data_json),
            signature: base64url::encode(&result.signature),
            user_handle: result.user_handle.as_deref().map(base64url::encode),
        },
        authenticator_attachment: result.attachment.map(|a| a.as_str().to_string()),
        client_extension_results: extensions::outputs_to_json(&result.extensions),
        r#type: PUBLIC_KEY_TYPE.to_string(),
    }
}

/// Decode a registration response produced by a JSON-native provider
///
/// The derived `publicKey` field is ignored; it is recomputed on serialization.
///
/// # Errors
///
/// Returns `InvalidEncoding` naming the first malformed base64url field.
pub fn registration_result_from_json(
    response: &RegistrationResponseJson,
) -> Result<RegistrationResult, PasskeyError> {
    Ok(RegistrationResult {
        credential_id: decode_field(&response.raw_id, "rawId")?,
        attestation_object: decode_field(
            &response.response.attestation_object,
            "response.attestationObject",
        )?,
        client_data_json: decode_field(
            &response.response.client_data_json,
            "response.clientDataJSON",
        )?,
        attachment: response
            .authenticator_attachment
            .as_deref()
            .and_then(AuthenticatorAttachment::from_wire),
        transports: response
            .response
            .transports
            .as_deref()
            .map(|transports| transports_from_json(Some(transports))),
        extensions: extensions::outputs_from_json(&response.client_extension_results)?,
    })
}

/// Decode an assertion response produced by a JSON-native provider
///
/// # Errors
///
/// Returns `InvalidEncoding` naming the first malformed base64url field.
pub fn assertion_result_from_json(
    response: &AuthenticationResponseJson,
) -> Result<AssertionResult, PasskeyError> {
    let credential_id = match response.raw_id.as_deref() {
        Some(raw_id) => decode_field(raw_id, "rawId")?,
        None => decode_field(&response.id, "id")?,
    };
    Ok(AssertionResult {
        credential_id,
        authenticator_data: decode_field(
            &response.response.authenticator_data,
            "response.authenticatorData",
        )?,
        client_data_json: decode_field(
            &response.response.client_data_json,
            "response.clientDataJSON",
        )?,
        signature: decode_field(&response.response.signature, "response.signature")?,
        user_handle: response
            .response
            .user_handle
            .as_deref()
            .map(|handle| decode_field(handle, "response.userHandle"))
            .transpose()?,
        attachment: response
            .authenticator_attachment
            .as_deref()
            .and_then(AuthenticatorAttachment::from_wire),
        extensions: extensions::outputs_from_json(&response.client_extension_results)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::model::ExtensionOutputs;
    use serde_json::json;

    fn creation_options(value: serde_json::Value) -> PublicKeyCredentialCreationOptionsJson {
        serde_json::from_value(value).unwrap()
    }

    fn valid_creation_json() -> serde_json::Value {
        json!({
            "rp": {"name": "Example", "id": "example.com"},
            "user": {"id": "dXNlcg", "name": "alice", "displayName": "Alice"},
            "challenge": "Zml6eg",
            "pubKeyCredParams": [{"type": "public-key", "alg": -7}]
        })
    }

    #[test]
    fn test_creation_request_decodes_binary_fields() {
        let request = creation_request_from_json(&creation_options(valid_creation_json())).unwrap();
        assert_eq!(request.challenge, b"fizz");
        assert_eq!(request.user.id, b"user");
        assert_eq!(request.pub_key_cred_params, vec![CredentialParameters { alg: -7 }]);
        assert_eq!(request.rp.id.as_deref(), Some("example.com"));
        assert!(request.exclude_credentials.is_empty());
    }

    #[test]
    fn test_creation_request_user_id_errors() {
        let mut value = valid_creation_json();
        value["user"]["id"] = json!("");
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidUserId);

        let mut value = valid_creation_json();
        value["user"].as_object_mut().unwrap().remove("id");
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::MissingUserId);

        let mut value = valid_creation_json();
        value["user"]["id"] = json!("not+base64url");
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidEncoding);
        assert!(error.message().contains("user.id"));
    }

    #[test]
    fn test_creation_request_challenge_errors() {
        let mut value = valid_creation_json();
        value["challenge"] = json!("");
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidChallenge);

        let mut value = valid_creation_json();
        value.as_object_mut().unwrap().remove("challenge");
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidChallenge);
    }

    #[test]
    fn test_creation_request_requires_public_key_params() {
        let mut value = valid_creation_json();
        value["pubKeyCredParams"] = json!([]);
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotSupported);

        let mut value = valid_creation_json();
        value["pubKeyCredParams"] = json!([{"type": "password", "alg": -7}]);
        let error = creation_request_from_json(&creation_options(value)).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotSupported);
    }

    #[test]
    fn test_unknown_transports_are_dropped() {
        let mut value = valid_creation_json();
        value["excludeCredentials"] = json!([
            {"id": "AQID", "type": "public-key", "transports": ["usb", "telepathy", "hybrid"]}
        ]);
        let request = creation_request_from_json(&creation_options(value)).unwrap();
        assert_eq!(
            request.exclude_credentials,
            vec![CredentialDescriptor {
                id: vec![1, 2, 3],
                transports: vec![AuthenticatorTransport::Usb, AuthenticatorTransport::Hybrid],
            }]
        );
    }

    #[test]
    fn test_descriptor_id_encoding_error_names_field() {
        let options: PublicKeyCredentialRequestOptionsJson = serde_json::from_value(json!({
            "challenge": "Zml6eg",
            "allowCredentials": [{"id": "***", "type": "public-key"}]
        }))
        .unwrap();
        let error = assertion_request_from_json(&options).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidEncoding);
        assert!(error.message().contains("allowCredentials.id"));
    }

    #[test]
    fn test_prf_keys_only_match_public_key_descriptors() {
        let options: PublicKeyCredentialRequestOptionsJson = serde_json::from_value(json!({
            "challenge": "Zml6eg",
            "allowCredentials": [{"id": "AQID", "type": "password"}],
            "extensions": {"prf": {"evalByCredential": {"AQID": {"first": "c2FsdA"}}}}
        }))
        .unwrap();
        let error = assertion_request_from_json(&options).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidPrfInput);

        let options: PublicKeyCredentialRequestOptionsJson = serde_json::from_value(json!({
            "challenge": "Zml6eg",
            "allowCredentials": [
                {"id": "BAUG", "type": "public-key"},
                {"id": "AQID", "type": "password"}
            ],
            "extensions": {"prf": {"evalByCredential": {"AQID": {"first": "c2FsdA"}}}}
        }))
        .unwrap();
        let error = assertion_request_from_json(&options).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidPrfInput);
    }

    #[test]
    fn test_assertion_request_defaults_timeout() {
        let options: PublicKeyCredentialRequestOptionsJson =
            serde_json::from_value(json!({"challenge": "Zml6eg", "rpId": "example.com"})).unwrap();
        let request = assertion_request_from_json(&options).unwrap();
        assert_eq!(request.timeout_ms, DEFAULT_ASSERTION_TIMEOUT_MS);
        assert_eq!(request.rp_id.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_malformed_json_is_invalid_encoding() {
        let error = parse_creation_options("{\"challenge\": ").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidEncoding);

        let error = parse_request_options("42").unwrap_err();
        assert_eq!(error.kind(), ErrorKind::InvalidEncoding);
    }

    #[test]
    fn test_registration_result_degrades_without_public_key() {
        let result = RegistrationResult {
            credential_id: vec![1, 2, 3],
            attestation_object: vec![0xa0],
            client_data_json: b"{}".to_vec(),
            attachment: Some(AuthenticatorAttachment::Platform),
            transports: Some(vec![AuthenticatorTransport::Internal]),
            extensions: ExtensionOutputs::default(),
        };
        let response = registration_result_to_json(&result);
        assert_eq!(response.id, "AQID");
        assert_eq!(response.raw_id, "AQID");
        assert_eq!(response.response.public_key, None);
        assert_eq!(response.response.public_key_algorithm, None);
        assert_eq!(response.response.authenticator_data, None);
        assert_eq!(response.response.attestation_object, "oA");
        assert_eq!(
            response.response.transports,
            Some(vec!["internal".to_string()])
        );
        assert_eq!(response.authenticator_attachment.as_deref(), Some("platform"));
    }

    #[test]
    fn test_empty_transports_are_distinct_from_absent() {
        let mut result = RegistrationResult {
            credential_id: vec![1, 2, 3],
            attestation_object: vec![0xa0],
            client_data_json: b"{}".to_vec(),
            attachment: None,
            transports: Some(Vec::new()),
            extensions: ExtensionOutputs::default(),
        };
        let value = serde_json::to_value(registration_result_to_json(&result)).unwrap();
        assert_eq!(value["response"]["transports"], json!([]));
        let parsed: RegistrationResponseJson = serde_json::from_value(value).unwrap();
        assert_eq!(
            registration_result_from_json(&parsed).unwrap().transports,
            Some(Vec::new())
        );

        result.transports = None;
        let value = serde_json::to_value(registration_result_to_json(&result)).unwrap();
        assert!(!value["response"].as_object().unwrap().contains_key("transports"));
    }

    #[test]
    fn test_assertion_result_from_json_prefers_raw_id() {
        let response: AuthenticationResponseJson = serde_json::from_value(json!({
            "id": "BAUG",
            "rawId": "AQID",
            "response": {
                "authenticatorData": "AA",
                "clientDataJSON": "e30",
                "signature": "AQ",
                "userHandle": "dXNlcg"
            },
            "clientExtensionResults": {},
            "type": "public-key"
        }))
        .unwrap();
        let result = assertion_result_from_json(&response).unwrap();
        assert_eq!(result.credential_id, vec![1, 2, 3]);
        assert_eq!(result.user_handle, Some(b"user".to_vec()));
        assert_eq!(result.client_data_json, b"{}");
    }
}
