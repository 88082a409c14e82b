//! Platform targets and capability negotiation
//!
//! Extension and transport support differs per platform and OS version. The
//! capability table is consulted before a request is handed to a provider so
//! that unsupported inputs are dropped with a warning instead of failing, and
//! again afterwards so that unsupported outputs are omitted.

use std::fmt;

use log::{debug, warn};

use super::model::{
    AssertionRequest, AuthenticatorTransport, CreationRequest, CredentialDescriptor,
    ExtensionOutputs,
};

/// Platform family an authenticator provider runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlatformTarget {
    Apple,
    Android,
    Web,
}

impl fmt::Display for PlatformTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformTarget::Apple => f.write_str("Apple"),
            PlatformTarget::Android => f.write_str("Android"),
            PlatformTarget::Web => f.write_str("Web"),
        }
    }
}

/// OS version; Android API levels are expressed as `major` with `minor = 0`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OsVersion {
    pub major: u32,
    pub minor: u32,
}

impl OsVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse `"17"`, `"17.4"` or `"17.4.1"` (patch is ignored)
    #[must_use]
    pub fn parse(version: &str) -> Option<Self> {
        let mut parts = version.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = match parts.next() {
            Some(minor) => minor.parse().ok()?,
            None => 0,
        };
        Some(Self { major, minor })
    }
}

impl fmt::Display for OsVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Minimum Apple OS version with passkey support
pub const APPLE_MINIMUM: OsVersion = OsVersion::new(15, 0);
/// Minimum Android API level with passkey support
pub const ANDROID_MINIMUM: OsVersion = OsVersion::new(28, 0);

/// Runtime facts reported by an authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformEnvironment {
    pub target: PlatformTarget,
    pub os_version: OsVersion,
    pub biometrics_available: bool,
    pub autofill_available: bool,
}

impl PlatformEnvironment {
    #[must_use]
    pub fn apple(os_version: OsVersion) -> Self {
        Self {
            target: PlatformTarget::Apple,
            os_version,
            biometrics_available: true,
            autofill_available: false,
        }
    }

    #[must_use]
    pub fn android(api_level: u32) -> Self {
        Self {
            target: PlatformTarget::Android,
            os_version: OsVersion::new(api_level, 0),
            biometrics_available: true,
            autofill_available: false,
        }
    }

    #[must_use]
    pub fn web() -> Self {
        Self {
            target: PlatformTarget::Web,
            os_version: OsVersion::default(),
            biometrics_available: true,
            autofill_available: false,
        }
    }

    #[must_use]
    pub fn with_biometrics(mut self, available: bool) -> Self {
        self.biometrics_available = available;
        self
    }

    #[must_use]
    pub fn with_autofill(mut self, available: bool) -> Self {
        self.autofill_available = available;
        self
    }

    /// Whether passkeys can be used at all on this platform version
    #[must_use]
    pub fn is_supported(&self) -> bool {
        match self.target {
            PlatformTarget::Apple => self.os_version >= APPLE_MINIMUM,
            PlatformTarget::Android => self.os_version >= ANDROID_MINIMUM,
            PlatformTarget::Web => true,
        }
    }

    /// Conditional mediation (autofill) is only surfaced by web providers
    #[must_use]
    pub fn is_autofill_available(&self) -> bool {
        self.target == PlatformTarget::Web && self.autofill_available
    }
}

impl fmt::Display for PlatformEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            PlatformTarget::Web => write!(f, "{}", self.target),
            PlatformTarget::Android => write!(f, "Android API {}", self.os_version.major),
            PlatformTarget::Apple => write!(f, "{} {}", self.target, self.os_version),
        }
    }
}

const NATIVE_TRANSPORTS: &[AuthenticatorTransport] = &[
    AuthenticatorTransport::Usb,
    AuthenticatorTransport::Nfc,
    AuthenticatorTransport::Ble,
    AuthenticatorTransport::Hybrid,
    AuthenticatorTransport::Internal,
];

const ALL_TRANSPORTS: &[AuthenticatorTransport] = &[
    AuthenticatorTransport::Usb,
    AuthenticatorTransport::Nfc,
    AuthenticatorTransport::Ble,
    AuthenticatorTransport::SmartCard,
    AuthenticatorTransport::Hybrid,
    AuthenticatorTransport::Internal,
];

/// What a given platform and OS version can do
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct PlatformCapabilities {
    pub supported: bool,
    pub large_blob: bool,
    pub prf: bool,
    pub cred_props: bool,
    pub exclude_credentials: bool,
    pub transports: &'static [AuthenticatorTransport],
    environment: String,
}

impl PlatformCapabilities {
    #[must_use]
    pub fn for_environment(environment: &PlatformEnvironment) -> Self {
        let version = environment.os_version;
        let (large_blob, prf, cred_props, exclude_credentials, transports) =
            match environment.target {
                PlatformTarget::Apple => (
                    version >= OsVersion::new(17, 0),
                    version >= OsVersion::new(18, 0),
                    false,
                    version >= OsVersion::new(17, 4),
                    NATIVE_TRANSPORTS,
                ),
                PlatformTarget::Android => (
                    false,
                    version >= OsVersion::new(34, 0),
                    true,
                    true,
                    NATIVE_TRANSPORTS,
                ),
                PlatformTarget::Web => (true, true, true, true, ALL_TRANSPORTS),
            };

        Self {
            supported: environment.is_supported(),
            large_blob,
            prf,
            cred_props,
            exclude_credentials,
            transports,
            environment: environment.to_string(),
        }
    }

    #[must_use]
    pub fn supports_transport(&self, transport: AuthenticatorTransport) -> bool {
        self.transports.contains(&transport)
    }

    fn unsupported(&self, what: &str) {
        warn!("{what} is not supported on {}; ignoring it", self.environment);
    }

    fn filter_descriptors(&self, descriptors: &mut [CredentialDescriptor]) {
        for descriptor in descriptors {
            descriptor.transports.retain(|transport| {
                let keep = self.supports_transport(*transport);
                if !keep {
                    debug!(
                        "Dropping transport hint '{transport}' unsupported on {}",
                        self.environment
                    );
                }
                keep
            });
        }
    }

    /// Drop registration inputs this platform cannot honor
    pub fn filter_creation_request(&self, request: &mut CreationRequest) {
        if request.extensions.large_blob.is_some() && !self.large_blob {
            self.unsupported("The largeBlob extension");
            request.extensions.large_blob = None;
        }
        if request.extensions.prf.is_some() && !self.prf {
            self.unsupported("The prf extension");
            request.extensions.prf = None;
        }
        if request.extensions.cred_props && !self.cred_props {
            self.unsupported("The credProps extension");
            request.extensions.cred_props = false;
        }
        if !request.exclude_credentials.is_empty() && !self.exclude_credentials {
            self.unsupported("excludeCredentials");
            request.exclude_credentials.clear();
        }
        self.filter_descriptors(&mut request.exclude_credentials);
    }

    /// Drop assertion inputs this platform cannot honor
    pub fn filter_assertion_request(&self, request: &mut AssertionRequest) {
        if request.extensions.large_blob.is_some() && !self.large_blob {
            self.unsupported("The largeBlob extension");
            request.extensions.large_blob = None;
        }
        if request.extensions.prf.is_some() && !self.prf {
            self.unsupported("The prf extension");
            request.extensions.prf = None;
        }
        self.filter_descriptors(&mut request.allow_credentials);
    }

    /// Omit outputs for extensions this platform does not support
    pub fn filter_outputs(&self, outputs: &mut ExtensionOutputs) {
        if !self.large_blob {
            outputs.large_blob = None;
        }
        if !self.prf {
            outputs.prf = None;
        }
        if !self.cred_props {
            outputs.cred_props = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passkey::model::{
        AssertionExtensionInputs, CredentialProperties, LargeBlobOperation, LargeBlobOutputs,
        PrfInputs,
    };

    #[test]
    fn test_os_version_parse_and_order() {
        assert_eq!(OsVersion::parse("17.4"), Some(OsVersion::new(17, 4)));
        assert_eq!(OsVersion::parse("18"), Some(OsVersion::new(18, 0)));
        assert_eq!(OsVersion::parse("16.7.2"), Some(OsVersion::new(16, 7)));
        assert_eq!(OsVersion::parse("beta"), None);
        assert_eq!(OsVersion::parse(""), None);
        assert!(OsVersion::new(17, 4) > OsVersion::new(17, 0));
        assert!(OsVersion::new(16, 9) < OsVersion::new(17, 0));
    }

    #[test]
    fn test_minimum_versions() {
        assert!(!PlatformEnvironment::apple(OsVersion::new(14, 8)).is_supported());
        assert!(PlatformEnvironment::apple(OsVersion::new(15, 0)).is_supported());
        assert!(!PlatformEnvironment::android(27).is_supported());
        assert!(PlatformEnvironment::android(28).is_supported());
        assert!(PlatformEnvironment::web().is_supported());
    }

    #[test]
    fn test_autofill_only_on_web() {
        assert!(PlatformEnvironment::web().with_autofill(true).is_autofill_available());
        assert!(!PlatformEnvironment::web().is_autofill_available());
        assert!(!PlatformEnvironment::apple(OsVersion::new(18, 0))
            .with_autofill(true)
            .is_autofill_available());
    }

    #[test]
    fn test_apple_capabilities_by_version() {
        let ios16 = PlatformCapabilities::for_environment(&PlatformEnvironment::apple(
            OsVersion::new(16, 0),
        ));
        assert!(!ios16.large_blob && !ios16.prf && !ios16.exclude_credentials);

        let ios17_4 = PlatformCapabilities::for_environment(&PlatformEnvironment::apple(
            OsVersion::new(17, 4),
        ));
        assert!(ios17_4.large_blob && ios17_4.exclude_credentials && !ios17_4.prf);

        let ios18 = PlatformCapabilities::for_environment(&PlatformEnvironment::apple(
            OsVersion::new(18, 0),
        ));
        assert!(ios18.prf && !ios18.cred_props);
        assert!(!ios18.supports_transport(AuthenticatorTransport::SmartCard));
    }

    #[test]
    fn test_android_and_web_capabilities() {
        let android = PlatformCapabilities::for_environment(&PlatformEnvironment::android(33));
        assert!(!android.large_blob && !android.prf && android.cred_props);
        assert!(
            PlatformCapabilities::for_environment(&PlatformEnvironment::android(34)).prf
        );

        let web = PlatformCapabilities::for_environment(&PlatformEnvironment::web());
        assert!(web.large_blob && web.prf && web.cred_props && web.exclude_credentials);
        assert!(web.supports_transport(AuthenticatorTransport::SmartCard));
    }

    #[test]
    fn test_filter_assertion_request_drops_unsupported() {
        let capabilities = PlatformCapabilities::for_environment(&PlatformEnvironment::apple(
            OsVersion::new(17, 0),
        ));
        let mut request = AssertionRequest {
            challenge: b"fizz".to_vec(),
            rp_id: None,
            timeout_ms: 60_000,
            allow_credentials: vec![CredentialDescriptor {
                id: vec![1],
                transports: vec![AuthenticatorTransport::SmartCard, AuthenticatorTransport::Usb],
            }],
            user_verification: None,
            extensions: AssertionExtensionInputs {
                large_blob: Some(LargeBlobOperation::Read),
                prf: Some(PrfInputs::default()),
            },
        };

        capabilities.filter_assertion_request(&mut request);

        assert_eq!(request.extensions.large_blob, Some(LargeBlobOperation::Read));
        assert_eq!(request.extensions.prf, None);
        assert_eq!(
            request.allow_credentials[0].transports,
            vec![AuthenticatorTransport::Usb]
        );
    }

    #[test]
    fn test_filter_outputs_omits_unsupported_blocks() {
        let capabilities = PlatformCapabilities::for_environment(&PlatformEnvironment::android(34));
        let mut outputs = ExtensionOutputs {
            large_blob: Some(LargeBlobOutputs::default()),
            prf: None,
            cred_props: Some(CredentialProperties { rk: Some(true) }),
        };
        capabilities.filter_outputs(&mut outputs);
        assert_eq!(outputs.large_blob, None);
        assert_eq!(outputs.cred_props, Some(CredentialProperties { rk: Some(true) }));
    }
}
