//! Internal request/response model
//!
//! Byte-oriented counterparts of the JSON wire types. Everything here has
//! already been validated and decoded, so binary fields are raw bytes and
//! string enumerations are closed Rust enums.

use std::collections::BTreeMap;
use std::fmt;

/// Which ceremony a request or result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CeremonyKind {
    Registration,
    Assertion,
}

impl fmt::Display for CeremonyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CeremonyKind::Registration => f.write_str("registration"),
            CeremonyKind::Assertion => f.write_str("assertion"),
        }
    }
}

/// Declares a string-backed enum with its `WebAuthn` wire names. Unknown
/// wire values parse to `None` so callers can drop them.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Parse a wire value, returning `None` for values this crate does not know
            #[must_use]
            pub fn from_wire(value: &str) -> Option<Self> {
                match value {
                    $($wire => Some($name::$variant),)+
                    _ => None,
                }
            }

            #[must_use]
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum!(
    /// Transport hint attached to a credential descriptor
    AuthenticatorTransport {
        Usb => "usb",
        Nfc => "nfc",
        Ble => "ble",
        SmartCard => "smart-card",
        Hybrid => "hybrid",
        Internal => "internal",
    }
);

wire_enum!(
    AuthenticatorAttachment {
        Platform => "platform",
        CrossPlatform => "cross-platform",
    }
);

wire_enum!(
    ResidentKeyRequirement {
        Discouraged => "discouraged",
        Preferred => "preferred",
        Required => "required",
    }
);

wire_enum!(
    UserVerificationRequirement {
        Required => "required",
        Preferred => "preferred",
        Discouraged => "discouraged",
    }
);

wire_enum!(
    AttestationConveyance {
        None => "none",
        Indirect => "indirect",
        Direct => "direct",
        Enterprise => "enterprise",
    }
);

wire_enum!(
    /// largeBlob support preference at registration
    LargeBlobSupport {
        Preferred => "preferred",
        Required => "required",
    }
);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelyingParty {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserEntity {
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// A `public-key` credential parameter; only the COSE algorithm varies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CredentialParameters {
    pub alg: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialDescriptor {
    pub id: Vec<u8>,
    pub transports: Vec<AuthenticatorTransport>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticatorSelection {
    pub attachment: Option<AuthenticatorAttachment>,
    pub resident_key: Option<ResidentKeyRequirement>,
    pub require_resident_key: Option<bool>,
    pub user_verification: Option<UserVerificationRequirement>,
}

/// PRF salts or evaluated secrets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrfValues {
    pub first: Vec<u8>,
    pub second: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrfInputs {
    pub eval: Option<PrfValues>,
    /// Keyed by raw credential id; every key is present in the allow-list
    pub eval_by_credential: BTreeMap<Vec<u8>, PrfValues>,
}

/// largeBlob operation at assertion time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LargeBlobOperation {
    Read,
    Write(Vec<u8>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationExtensionInputs {
    pub large_blob: Option<LargeBlobSupport>,
    pub prf: Option<PrfInputs>,
    pub cred_props: bool,
}

impl RegistrationExtensionInputs {
    /// Names of the extensions this request asks for
    #[must_use]
    pub fn requested(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.large_blob.is_some() {
            names.push("largeBlob");
        }
        if self.prf.is_some() {
            names.push("prf");
        }
        if self.cred_props {
            names.push("credProps");
        }
        names
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssertionExtensionInputs {
    pub large_blob: Option<LargeBlobOperation>,
    pub prf: Option<PrfInputs>,
}

impl AssertionExtensionInputs {
    /// Names of the extensions this request asks for
    #[must_use]
    pub fn requested(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.large_blob.is_some() {
            names.push("largeBlob");
        }
        if self.prf.is_some() {
            names.push("prf");
        }
        names
    }
}

/// Validated registration request handed to the authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationRequest {
    pub rp: RelyingParty,
    pub user: UserEntity,
    pub challenge: Vec<u8>,
    pub pub_key_cred_params: Vec<CredentialParameters>,
    pub timeout_ms: Option<u32>,
    pub exclude_credentials: Vec<CredentialDescriptor>,
    pub authenticator_selection: Option<AuthenticatorSelection>,
    pub attestation: Option<AttestationConveyance>,
    pub extensions: RegistrationExtensionInputs,
}

impl CreationRequest {
    #[must_use]
    pub fn attachment(&self) -> Option<AuthenticatorAttachment> {
        self.authenticator_selection
            .as_ref()
            .and_then(|selection| selection.attachment)
    }
}

/// Validated assertion request handed to the authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionRequest {
    pub challenge: Vec<u8>,
    pub rp_id: Option<String>,
    pub timeout_ms: u32,
    pub allow_credentials: Vec<CredentialDescriptor>,
    pub user_verification: Option<UserVerificationRequirement>,
    pub extensions: AssertionExtensionInputs,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LargeBlobOutputs {
    pub supported: Option<bool>,
    pub blob: Option<Vec<u8>>,
    pub written: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrfOutputs {
    pub enabled: Option<bool>,
    pub results: Option<PrfValues>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CredentialProperties {
    pub rk: Option<bool>,
}

/// Extension outputs reported by the provider; absent blocks were not produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionOutputs {
    pub large_blob: Option<LargeBlobOutputs>,
    pub prf: Option<PrfOutputs>,
    pub cred_props: Option<CredentialProperties>,
}

impl ExtensionOutputs {
    /// Whether an output block is present for the named extension
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        match name {
            "largeBlob" => self.large_blob.is_some(),
            "prf" => self.prf.is_some(),
            "credProps" => self.cred_props.is_some(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationResult {
    pub credential_id: Vec<u8>,
    pub attestation_object: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub attachment: Option<AuthenticatorAttachment>,
    /// `None` when the provider did not report transports; an empty list is kept as reported
    pub transports: Option<Vec<AuthenticatorTransport>>,
    pub extensions: ExtensionOutputs,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionResult {
    pub credential_id: Vec<u8>,
    pub authenticator_data: Vec<u8>,
    pub client_data_json: Vec<u8>,
    pub signature: Vec<u8>,
    pub user_handle: Option<Vec<u8>>,
    pub attachment: Option<AuthenticatorAttachment>,
    pub extensions: ExtensionOutputs,
}

/// Raw result produced by an authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyResult {
    Registration(RegistrationResult),
    Assertion(AssertionResult),
}

impl CeremonyResult {
    #[must_use]
    pub fn kind(&self) -> CeremonyKind {
        match self {
            CeremonyResult::Registration(_) => CeremonyKind::Registration,
            CeremonyResult::Assertion(_) => CeremonyKind::Assertion,
        }
    }
}
