//! Platform error mapping
//!
//! Providers report failures in their platform's native vocabulary. This
//! module folds those codes onto [`ErrorKind`]. The mapping is total: any
//! unrecognized code becomes `Unknown` and keeps the platform message.

use std::fmt;

use crate::error::{ErrorKind, PasskeyError};

/// Native failure signal as reported by an authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeErrorCode {
    /// Apple `ASAuthorizationError` code
    AuthorizationServices(i64),
    /// Apple `LAError` code from the local authentication check
    LocalAuthentication(i64),
    /// Android Credential Manager exception; DOM exceptions carry their DOM error type
    CredentialManager {
        exception: String,
        dom_error: Option<String>,
    },
    /// Browser `DOMException` name
    Dom(String),
}

impl fmt::Display for NativeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeErrorCode::AuthorizationServices(code) => write!(f, "ASAuthorizationError {code}"),
            NativeErrorCode::LocalAuthentication(code) => write!(f, "LAError {code}"),
            NativeErrorCode::CredentialManager {
                exception,
                dom_error: Some(dom_error),
            } => write!(f, "{exception} ({dom_error})"),
            NativeErrorCode::CredentialManager { exception, .. } => f.write_str(exception),
            NativeErrorCode::Dom(name) => write!(f, "DOMException {name}"),
        }
    }
}

/// A failure reported by an authenticator provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformError {
    pub code: NativeErrorCode,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: NativeErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

fn authorization_services_kind(code: i64) -> ErrorKind {
    match code {
        1001 => ErrorKind::UserCancelled,
        1002 => ErrorKind::InvalidResponse,
        1003 => ErrorKind::NotHandled,
        1004 => ErrorKind::RequestFailed,
        1005 => ErrorKind::NotInteractive,
        1006 => ErrorKind::MatchedExcludedCredential,
        4004 => ErrorKind::NotConfigured,
        _ => ErrorKind::Unknown,
    }
}

fn local_authentication_kind(code: i64) -> ErrorKind {
    match code {
        -1 => ErrorKind::AuthorizationFailed,
        -2 => ErrorKind::UserCancelled,
        -4 => ErrorKind::Interrupted,
        -8..=-6 => ErrorKind::BiometricUnavailable,
        _ => ErrorKind::Unknown,
    }
}

/// Android reports DOM error types as `androidx.credentials.TYPE_NOT_ALLOWED_ERROR`;
/// convert that form to the browser name `NotAllowedError`
fn normalize_dom_name(name: &str) -> String {
    let name = name.rsplit('.').next().unwrap_or(name);
    let Some(words) = name.strip_prefix("TYPE_") else {
        return name.to_string();
    };
    words
        .split('_')
        .map(|word| {
            let lower = word.to_ascii_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn dom_kind(name: &str) -> ErrorKind {
    match normalize_dom_name(name).as_str() {
        "NotAllowedError" => ErrorKind::UserCancelled,
        "AbortError" => ErrorKind::Interrupted,
        "InvalidStateError" => ErrorKind::MatchedExcludedCredential,
        "NotSupportedError" => ErrorKind::NotSupported,
        "SecurityError" => ErrorKind::NotConfigured,
        "ConstraintError" => ErrorKind::RequestFailed,
        _ => ErrorKind::Unknown,
    }
}

fn credential_manager_kind(exception: &str, dom_error: Option<&str>) -> ErrorKind {
    let name = exception.rsplit('.').next().unwrap_or(exception);
    if name == "NoCredentialException" {
        return ErrorKind::NoCredentials;
    }
    if name.ends_with("DomException") {
        return dom_error.map_or(ErrorKind::Unknown, dom_kind);
    }
    if !(name.starts_with("CreateCredential") || name.starts_with("GetCredential")) {
        return ErrorKind::Unknown;
    }
    if name.ends_with("CancellationException") {
        ErrorKind::UserCancelled
    } else if name.ends_with("InterruptedException") {
        ErrorKind::Interrupted
    } else if name.ends_with("ProviderConfigurationException") {
        ErrorKind::NotConfigured
    } else if name.ends_with("UnsupportedException") {
        ErrorKind::NotSupported
    } else {
        ErrorKind::Unknown
    }
}

/// Error kind for a native code
#[must_use]
pub fn error_kind(code: &NativeErrorCode) -> ErrorKind {
    match code {
        NativeErrorCode::AuthorizationServices(code) => authorization_services_kind(*code),
        NativeErrorCode::LocalAuthentication(code) => local_authentication_kind(*code),
        NativeErrorCode::CredentialManager {
            exception,
            dom_error,
        } => credential_manager_kind(exception, dom_error.as_deref()),
        NativeErrorCode::Dom(name) => dom_kind(name),
    }
}

/// Map a native failure to a [`PasskeyError`]
///
/// The platform message is kept when present. For `Unknown` the native code is
/// added so that diagnostics survive the mapping.
#[must_use]
pub fn map_platform_error(code: &NativeErrorCode, message: &str) -> PasskeyError {
    let kind = error_kind(code);
    match (kind, message.is_empty()) {
        (ErrorKind::Unknown, true) => PasskeyError::new(kind, format!("Unrecognized platform error: {code}")),
        (ErrorKind::Unknown, false) => PasskeyError::new(kind, format!("{message} ({code})")),
        (_, true) => kind.into(),
        (_, false) => PasskeyError::new(kind, message),
    }
}
