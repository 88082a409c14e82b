//! Passkey ceremonies
//!
//! This module ties the `WebAuthn` building blocks to an authenticator
//! provider: JSON marshalling, extension negotiation, platform capabilities,
//! error mapping and the single-flight ceremony orchestrator.

mod ceremony;
pub mod error_map;
pub mod extensions;
pub mod marshal;
pub mod model;
pub mod platform;
pub mod provider;

pub use ceremony::PasskeyModule;
pub use error_map::{map_platform_error, NativeErrorCode, PlatformError};
pub use model::*;
pub use platform::{OsVersion, PlatformCapabilities, PlatformEnvironment, PlatformTarget};
pub use provider::{
    AuthenticatorProvider, AuthenticatorRoute, CancellationSignal, CeremonyRequest, Completion,
    Outcome, PreparedRequest,
};
