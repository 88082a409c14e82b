//! Unified passkey error taxonomy
//!
//! Every failure surfaced by the marshaller and the ceremony orchestrator is a
//! [`PasskeyError`] carrying one [`ErrorKind`] from a closed set, no matter which
//! platform produced the underlying failure.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of error kinds reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NotSupported,
    UserCancelled,
    Interrupted,
    NotConfigured,
    PendingRequest,
    BiometricUnavailable,
    InvalidChallenge,
    InvalidUserId,
    MissingUserId,
    RequestFailed,
    AuthorizationFailed,
    NoCredentials,
    #[serde(rename = "InvalidPRFInput")]
    InvalidPrfInput,
    InvalidLargeBlobInput,
    MatchedExcludedCredential,
    InvalidResponse,
    NotHandled,
    NotInteractive,
    InvalidEncoding,
    Unknown,
}

impl ErrorKind {
    /// Wire name of the kind, as serialized to JSON
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NotSupported => "NotSupported",
            ErrorKind::UserCancelled => "UserCancelled",
            ErrorKind::Interrupted => "Interrupted",
            ErrorKind::NotConfigured => "NotConfigured",
            ErrorKind::PendingRequest => "PendingRequest",
            ErrorKind::BiometricUnavailable => "BiometricUnavailable",
            ErrorKind::InvalidChallenge => "InvalidChallenge",
            ErrorKind::InvalidUserId => "InvalidUserId",
            ErrorKind::MissingUserId => "MissingUserId",
            ErrorKind::RequestFailed => "RequestFailed",
            ErrorKind::AuthorizationFailed => "AuthorizationFailed",
            ErrorKind::NoCredentials => "NoCredentials",
            ErrorKind::InvalidPrfInput => "InvalidPRFInput",
            ErrorKind::InvalidLargeBlobInput => "InvalidLargeBlobInput",
            ErrorKind::MatchedExcludedCredential => "MatchedExcludedCredential",
            ErrorKind::InvalidResponse => "InvalidResponse",
            ErrorKind::NotHandled => "NotHandled",
            ErrorKind::NotInteractive => "NotInteractive",
            ErrorKind::InvalidEncoding => "InvalidEncoding",
            ErrorKind::Unknown => "Unknown",
        }
    }

    /// Default human readable description used when no platform message is available
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            ErrorKind::NotSupported => "Passkeys are not supported on this platform version",
            ErrorKind::UserCancelled => "User cancelled the passkey interaction",
            ErrorKind::Interrupted => "The passkey interaction was interrupted",
            ErrorKind::NotConfigured => "The app's relying party association is not configured",
            ErrorKind::PendingRequest => "A passkey request is already in progress",
            ErrorKind::BiometricUnavailable => "Biometric authentication is not available",
            ErrorKind::InvalidChallenge => "The provided challenge was invalid",
            ErrorKind::InvalidUserId => "The provided user id was invalid",
            ErrorKind::MissingUserId => "`user.id` is required",
            ErrorKind::RequestFailed => "The passkey request failed",
            ErrorKind::AuthorizationFailed => "The passkey authorization failed",
            ErrorKind::NoCredentials => "No matching credentials are available",
            ErrorKind::InvalidPrfInput => "The PRF extension input was invalid",
            ErrorKind::InvalidLargeBlobInput => "The largeBlob extension input was invalid",
            ErrorKind::MatchedExcludedCredential => "The authenticator holds an excluded credential",
            ErrorKind::InvalidResponse => "The authenticator returned an invalid response",
            ErrorKind::NotHandled => "The request was not handled by any authenticator",
            ErrorKind::NotInteractive => "The request requires user interaction",
            ErrorKind::InvalidEncoding => "A field contained invalid base64url data",
            ErrorKind::Unknown => "An unknown error occurred",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned by every public passkey operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct PasskeyError {
    kind: ErrorKind,
    message: String,
}

impl PasskeyError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// A base64url field failed to decode
    pub fn invalid_encoding(field: &str) -> Self {
        Self::new(
            ErrorKind::InvalidEncoding,
            format!("'{field}' contains invalid base64url data"),
        )
    }
}

impl From<ErrorKind> for PasskeyError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_serializes_as_wire_name() {
        let json = serde_json::to_string(&ErrorKind::InvalidPrfInput).unwrap();
        assert_eq!(json, "\"InvalidPRFInput\"");

        let json = serde_json::to_string(&ErrorKind::PendingRequest).unwrap();
        assert_eq!(json, format!("\"{}\"", ErrorKind::PendingRequest.name()));
    }

    #[test]
    fn test_error_display_includes_kind_and_message() {
        let error = PasskeyError::invalid_encoding("user.id");
        assert_eq!(error.kind(), ErrorKind::InvalidEncoding);
        assert_eq!(
            error.to_string(),
            "InvalidEncoding: 'user.id' contains invalid base64url data"
        );
    }

    #[test]
    fn test_from_kind_uses_description() {
        let error = PasskeyError::from(ErrorKind::MissingUserId);
        assert_eq!(error.message(), "`user.id` is required");
    }
}
