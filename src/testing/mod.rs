//! Testing utilities for passkey ceremonies
//!
//! ## Organization
//!
//! - [`builders`] - Attestation object builder backed by `ciborium`
//! - [`fixtures`] - Pre-built options, results and platform errors
//! - [`mock`] - Scriptable stub authenticator provider
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use passkeys::passkey::PlatformEnvironment;
//! use passkeys::testing::{fixtures::TestFixtures, mock::{StubBehavior, StubProvider}};
//! use passkeys::{PasskeyModule, PasskeySettings};
//!
//! let provider = StubProvider::new(PlatformEnvironment::web())
//!     .with_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
//! let module = PasskeyModule::new(Arc::new(provider), PasskeySettings::default());
//! assert!(module.is_supported());
//! ```

pub mod builders;
pub mod fixtures;
pub mod mock;

// Re-export commonly used items for convenience
pub use builders::*;
pub use fixtures::TestFixtures;
pub use mock::{StubBehavior, StubProvider};

/// Common test constants
pub mod constants {
    /// Relying party used by all fixtures
    pub const TEST_RP_ID: &str = "example.com";

    /// Origin recorded in fixture client data
    pub const TEST_ORIGIN: &str = "https://example.com";

    /// Raw credential id of the fixture credential
    pub const TEST_CREDENTIAL_ID: &[u8] = &[0x0c, 0x4a, 0x71, 0x29, 0xd3, 0x58, 0x6e, 0x11];

    /// Raw user handle of the fixture user
    pub const TEST_USER_ID: &[u8] = b"user-1234";

    /// x-coordinate of the fixture P-256 key (the curve generator)
    pub const TEST_KEY_X: [u8; 32] = [
        0x6b, 0x17, 0xd1, 0xf2, 0xe1, 0x2c, 0x42, 0x47, 0xf8, 0xbc, 0xe6, 0xe5, 0x63, 0xa4, 0x40,
        0xf2, 0x77, 0x03, 0x7d, 0x81, 0x2d, 0xeb, 0x33, 0xa0, 0xf4, 0xa1, 0x39, 0x45, 0xd8, 0x98,
        0xc2, 0x96,
    ];

    /// y-coordinate of the fixture P-256 key
    pub const TEST_KEY_Y: [u8; 32] = [
        0x4f, 0xe3, 0x42, 0xe2, 0xfe, 0x1a, 0x7f, 0x9b, 0x8e, 0xe7, 0xeb, 0x4a, 0x7c, 0x0f, 0x9e,
        0x16, 0x2b, 0xce, 0x33, 0x57, 0x6b, 0x31, 0x5e, 0xce, 0xcb, 0xb6, 0x40, 0x68, 0x37, 0xbf,
        0x51, 0xf5,
    ];
}
