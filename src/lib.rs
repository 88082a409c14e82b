#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the passkeys crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod passkey;
pub mod settings;
pub mod webauthn;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use error::{ErrorKind, PasskeyError};
pub use passkey::{
    AuthenticatorProvider, CancellationSignal, Completion, PasskeyModule, PlatformEnvironment,
    PreparedRequest,
};
pub use settings::PasskeySettings;
