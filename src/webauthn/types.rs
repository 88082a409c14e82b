//! `WebAuthn` JSON wire types
//!
//! These mirror the `*JSON` dictionaries of WebAuthn Level 3: every binary
//! field is a base64url string. Optional members are skipped when absent so
//! that "not requested / not supported" never turns into `null`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Credential type string, the only one defined by `WebAuthn`
pub const PUBLIC_KEY_TYPE: &str = "public-key";

fn public_key_type() -> String {
    PUBLIC_KEY_TYPE.to_string()
}

/// `PublicKeyCredentialCreationOptionsJSON`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialCreationOptionsJson {
    #[serde(default)]
    pub rp: RelyingPartyJson,
    #[serde(default)]
    pub user: UserEntityJson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>, // Base64URL-encoded challenge
    #[serde(default)]
    pub pub_key_cred_params: Vec<PublicKeyCredentialParametersJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>, // Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_credentials: Option<Vec<PublicKeyCredentialDescriptorJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelectionCriteriaJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<String>, // "none", "indirect", "direct", "enterprise"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputsJson>,
}

/// `PublicKeyCredentialRequestOptionsJSON`
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyCredentialRequestOptionsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<String>, // Base64URL-encoded challenge
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rp_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>, // Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_credentials: Option<Vec<PublicKeyCredentialDescriptorJson>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>, // "required", "preferred", "discouraged"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<ExtensionInputsJson>,
}

/// `WebAuthn` relying party information
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RelyingPartyJson {
    #[serde(default)]
    pub name: String, // Display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>, // Domain name (e.g., "example.com")
}

/// `WebAuthn` user entity
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserEntityJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>, // Base64URL-encoded user handle
    #[serde(default)]
    pub name: String, // Username (e.g., email)
    #[serde(default)]
    pub display_name: String,
}

/// Public key credential parameters
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PublicKeyCredentialParametersJson {
    #[serde(rename = "type", default = "public_key_type")]
    pub r#type: String, // Always "public-key"
    pub alg: i64, // COSE algorithm identifier (-7 for ES256, -257 for RS256)
}

/// Authenticator selection criteria
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelectionCriteriaJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>, // "platform", "cross-platform"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<String>, // "discouraged", "preferred", "required"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<String>,
}

/// Public key credential descriptor
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PublicKeyCredentialDescriptorJson {
    pub id: String, // Base64URL-encoded credential ID
    #[serde(rename = "type", default = "public_key_type")]
    pub r#type: String, // Always "public-key"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
}

/// `AuthenticationExtensionsClientInputsJSON` for the supported extensions
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionInputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_blob: Option<LargeBlobInputsJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prf: Option<PrfInputsJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<bool>,
}

/// largeBlob inputs; `support` at creation, `read` or `write` at assertion
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LargeBlobInputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<String>, // "preferred", "required"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<String>, // Base64URL-encoded blob
}

/// PRF inputs
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrfInputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval: Option<PrfValuesJson>,
    /// Keyed by base64url credential ID, which must appear in `allowCredentials`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eval_by_credential: Option<BTreeMap<String, PrfValuesJson>>,
}

/// PRF salt inputs or evaluated outputs
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PrfValuesJson {
    pub first: String, // Base64URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<String>, // Base64URL
}

/// `RegistrationResponseJSON`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponseJson {
    pub id: String,     // Base64URL-encoded credential ID
    pub raw_id: String, // Base64URL-encoded raw credential ID
    pub response: AuthenticatorAttestationResponseJson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: ExtensionOutputsJson,
    #[serde(rename = "type", default = "public_key_type")]
    pub r#type: String, // Always "public-key"
}

/// `AuthenticatorAttestationResponseJSON`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAttestationResponseJson {
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    pub attestation_object: String, // Base64URL-encoded attestation object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key_algorithm: Option<i64>,
    /// Base64URL `x || y` of the credential's P-256 key, when it could be derived
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

/// `AuthenticationResponseJSON`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponseJson {
    pub id: String, // Base64URL-encoded credential ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_id: Option<String>,
    pub response: AuthenticatorAssertionResponseJson,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<String>,
    #[serde(default)]
    pub client_extension_results: ExtensionOutputsJson,
    #[serde(rename = "type", default = "public_key_type")]
    pub r#type: String, // Always "public-key"
}

/// `AuthenticatorAssertionResponseJSON`
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorAssertionResponseJson {
    pub authenticator_data: String, // Base64URL-encoded authenticator data
    #[serde(rename = "clientDataJSON")]
    pub client_data_json: String, // Base64URL-encoded client data JSON
    pub signature: String,          // Base64URL-encoded signature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_handle: Option<String>, // Base64URL-encoded user handle
}

/// `AuthenticationExtensionsClientOutputsJSON` for the supported extensions
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionOutputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub large_blob: Option<LargeBlobOutputsJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prf: Option<PrfOutputsJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<CredentialPropertiesJson>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LargeBlobOutputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported: Option<bool>, // Registration only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob: Option<String>, // Base64URL, assertion with read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub written: Option<bool>, // Assertion with write
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct PrfOutputsJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>, // Registration only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<PrfValuesJson>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CredentialPropertiesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rk: Option<bool>,
}
