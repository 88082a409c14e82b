// Integration tests for the ceremony orchestrator against the stub provider
use std::sync::Arc;

use passkeys::error::ErrorKind;
use passkeys::passkey::{
    marshal, AuthenticatorRoute, CancellationSignal, CeremonyRequest, ExtensionOutputs,
    LargeBlobOutputs, NativeErrorCode, OsVersion, PasskeyModule, PlatformEnvironment,
    PlatformError, RegistrationResult,
};
use passkeys::passkey::model::CeremonyResult;
use passkeys::settings::PasskeySettings;
use passkeys::testing::builders::AttestationObjectBuilder;
use passkeys::testing::constants::TEST_CREDENTIAL_ID;
use passkeys::testing::fixtures::TestFixtures;
use passkeys::testing::mock::{StubBehavior, StubProvider};
use passkeys::webauthn::base64url;
use serde_json::json;

fn module_for(provider: &Arc<StubProvider>) -> Arc<PasskeyModule<StubProvider>> {
    Arc::new(PasskeyModule::new(
        Arc::clone(provider),
        PasskeySettings::default(),
    ))
}

fn apple_provider() -> Arc<StubProvider> {
    Arc::new(StubProvider::new(PlatformEnvironment::apple(
        OsVersion::new(18, 0),
    )))
}

async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition was not reached");
}

#[tokio::test]
async fn test_fizz_registration_end_to_end() {
    let provider = apple_provider();
    provider.push_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
    let module = module_for(&provider);

    let options = marshal::parse_creation_options(
        &json!({
            "rp": {"name": "Example", "id": "example.com"},
            "user": {"id": "dXNlci0xMjM0", "name": "alice@example.com", "displayName": "Alice"},
            "challenge": base64url::encode(b"fizz"),
            "pubKeyCredParams": [{"alg": -7, "type": "public-key"}]
        })
        .to_string(),
    )
    .expect("options should parse");

    let response = module.create(&options, None).await.expect("registration should succeed");

    let expected_key = base64url::encode(&TestFixtures::expected_public_key());
    assert_eq!(response.response.public_key.as_deref(), Some(expected_key.as_str()));
    assert_eq!(response.response.public_key_algorithm, Some(-7));
    assert_eq!(response.id, base64url::encode(TEST_CREDENTIAL_ID));
    assert_eq!(response.raw_id, response.id);
    assert_eq!(response.r#type, "public-key");
    assert_eq!(
        response.response.authenticator_data,
        Some(base64url::encode(
            &AttestationObjectBuilder::new().authenticator_data()
        ))
    );

    let submitted = provider.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].route, AuthenticatorRoute::Platform);
    let CeremonyRequest::Registration(request) = &submitted[0].ceremony else {
        panic!("expected a registration request");
    };
    assert_eq!(request.challenge, b"fizz");
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_second_ceremony_while_pending_is_rejected() {
    let provider = apple_provider();
    let module = module_for(&provider);

    let first = {
        let module = Arc::clone(&module);
        tokio::spawn(async move {
            module
                .create(&TestFixtures::creation_options(b"fizz"), None)
                .await
        })
    };
    wait_until(|| module.is_pending()).await;

    let error = module
        .get(&TestFixtures::request_options(b"buzz"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::PendingRequest);
    assert_eq!(provider.submission_count(), 1);

    let completion = provider.take_held().expect("first ceremony should be held");
    assert!(completion.succeed(TestFixtures::registration_result()));

    let response = first.await.unwrap().expect("first ceremony should succeed");
    assert!(response.response.public_key.is_some());
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_cancelled_before_hand_off_never_reaches_provider() {
    let provider = apple_provider();
    let module = module_for(&provider);
    let signal = CancellationSignal::new();
    signal.cancel();

    let error = module
        .create(&TestFixtures::creation_options(b"fizz"), Some(&signal))
        .await
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UserCancelled);
    assert_eq!(provider.submission_count(), 0);
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_cancel_after_hand_off_is_forwarded_to_provider() {
    let provider = apple_provider();
    let module = module_for(&provider);
    let signal = CancellationSignal::new();

    let ceremony = {
        let module = Arc::clone(&module);
        let signal = signal.clone();
        tokio::spawn(async move {
            module
                .get(&TestFixtures::request_options(b"fizz"), Some(&signal))
                .await
        })
    };
    wait_until(|| module.is_pending()).await;

    signal.cancel();
    let error = ceremony.await.unwrap().unwrap_err();

    assert_eq!(error.kind(), ErrorKind::UserCancelled);
    assert_eq!(provider.cancel_count(), 1);
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_cancel_is_best_effort_once_handed_off() {
    let provider = Arc::new(
        StubProvider::new(PlatformEnvironment::web()).ignoring_cancel(),
    );
    let module = module_for(&provider);
    let signal = CancellationSignal::new();

    let ceremony = {
        let module = Arc::clone(&module);
        let signal = signal.clone();
        tokio::spawn(async move {
            module
                .get(&TestFixtures::request_options(b"fizz"), Some(&signal))
                .await
        })
    };
    wait_until(|| module.is_pending()).await;

    signal.cancel();
    wait_until(|| provider.cancel_count() == 1).await;
    assert!(module.is_pending());

    // The provider finished anyway; the ceremony completes normally
    let completion = provider.take_held().unwrap();
    assert!(completion.succeed(TestFixtures::assertion_result()));

    let response = ceremony.await.unwrap().expect("assertion should succeed");
    assert_eq!(response.id, base64url::encode(TEST_CREDENTIAL_ID));
}

#[tokio::test]
async fn test_duplicate_provider_callback_is_discarded() {
    let provider = apple_provider();
    provider.push_behavior(StubBehavior::Duplicate(TestFixtures::registration_result()));
    provider.push_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
    let module = module_for(&provider);

    module
        .create(&TestFixtures::creation_options(b"fizz"), None)
        .await
        .expect("first result is delivered");
    assert!(!module.is_pending());

    module
        .create(&TestFixtures::creation_options(b"buzz"), None)
        .await
        .expect("a fresh ceremony can start");
    assert_eq!(provider.submission_count(), 2);
}

#[tokio::test]
async fn test_late_completion_after_caller_gave_up() {
    let provider = apple_provider();
    let module = module_for(&provider);

    let abandoned = {
        let module = Arc::clone(&module);
        tokio::spawn(async move {
            module
                .create(&TestFixtures::creation_options(b"fizz"), None)
                .await
        })
    };
    wait_until(|| module.is_pending()).await;
    abandoned.abort();
    assert!(abandoned.await.unwrap_err().is_cancelled());
    assert!(!module.is_pending());

    let late = provider.take_held().unwrap();
    assert!(!late.succeed(TestFixtures::registration_result()));

    provider.push_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
    module
        .create(&TestFixtures::creation_options(b"buzz"), None)
        .await
        .expect("module is idle again");
}

#[tokio::test]
async fn test_completion_from_another_thread() {
    let provider = apple_provider();
    let module = module_for(&provider);

    let ceremony = {
        let module = Arc::clone(&module);
        tokio::spawn(async move {
            module
                .create(&TestFixtures::creation_options(b"fizz"), None)
                .await
        })
    };
    wait_until(|| module.is_pending()).await;

    let completion = provider.take_held().unwrap();
    std::thread::spawn(move || {
        assert!(completion.succeed(TestFixtures::registration_result()));
    })
    .join()
    .unwrap();

    let response = ceremony.await.unwrap().unwrap();
    assert!(response.response.public_key.is_some());
}

#[tokio::test]
async fn test_platform_failures_are_mapped() {
    let provider = Arc::new(StubProvider::new(PlatformEnvironment::android(34)));
    provider.push_behavior(StubBehavior::Fail(PlatformError::new(
        NativeErrorCode::CredentialManager {
            exception: "androidx.credentials.exceptions.GetCredentialCancellationException"
                .to_string(),
            dom_error: None,
        },
        "activity is cancelled by the user.",
    )));
    provider.push_behavior(StubBehavior::Fail(PlatformError::new(
        NativeErrorCode::CredentialManager {
            exception: "androidx.credentials.exceptions.SomethingNewException".to_string(),
            dom_error: None,
        },
        "mystery failure",
    )));
    let module = module_for(&provider);

    let error = module
        .get(&TestFixtures::request_options(b"fizz"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::UserCancelled);
    assert_eq!(error.message(), "activity is cancelled by the user.");

    let error = module
        .get(&TestFixtures::request_options(b"fizz"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Unknown);
    assert!(error.message().contains("mystery failure"));
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_unsupported_platform_version() {
    let provider = Arc::new(StubProvider::new(PlatformEnvironment::android(27)));
    let module = module_for(&provider);

    assert!(!module.is_supported());
    let error = module
        .get(&TestFixtures::request_options(b"fizz"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotSupported);
    assert_eq!(provider.submission_count(), 0);
}

#[tokio::test]
async fn test_biometric_guard() {
    let provider = Arc::new(StubProvider::new(
        PlatformEnvironment::apple(OsVersion::new(18, 0)).with_biometrics(false),
    ));
    let module = module_for(&provider);

    let error = module
        .create(&TestFixtures::creation_options(b"fizz"), None)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::BiometricUnavailable);
    assert_eq!(provider.submission_count(), 0);

    // The guard can be switched off
    provider.push_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
    let settings = PasskeySettings {
        require_biometrics: Some(false),
        ..PasskeySettings::default()
    };
    let relaxed = PasskeyModule::new(Arc::clone(&provider), settings);
    relaxed
        .create(&TestFixtures::creation_options(b"fizz"), None)
        .await
        .expect("guard disabled");
}

#[tokio::test]
async fn test_validation_errors_never_reach_provider() {
    let provider = apple_provider();
    let module = module_for(&provider);

    let mut options = TestFixtures::creation_options(b"fizz");
    options.user.id = Some(String::new());
    let error = module.create(&options, None).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidUserId);

    let options = marshal::parse_request_options(
        &json!({
            "challenge": "Zml6eg",
            "allowCredentials": [{"id": base64url::encode(TEST_CREDENTIAL_ID), "type": "public-key"}],
            "extensions": {"prf": {"evalByCredential": {"AQID": {"first": "c2FsdA"}}}}
        })
        .to_string(),
    )
    .unwrap();
    let error = module.get(&options, None).await.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::InvalidPrfInput);

    assert_eq!(provider.submission_count(), 0);
    assert!(!module.is_pending());
}

#[tokio::test]
async fn test_cross_platform_attachment_routes_to_security_key() {
    let provider = Arc::new(StubProvider::new(PlatformEnvironment::web()));
    provider.push_behavior(StubBehavior::Succeed(TestFixtures::registration_result()));
    let module = module_for(&provider);

    let mut value = serde_json::to_value(TestFixtures::creation_options(b"fizz")).unwrap();
    value["authenticatorSelection"] = json!({"authenticatorAttachment": "cross-platform"});
    let options = marshal::parse_creation_options(&value.to_string()).unwrap();

    module.create(&options, None).await.unwrap();
    assert_eq!(provider.submitted()[0].route, AuthenticatorRoute::SecurityKey);
}

#[tokio::test]
async fn test_unsupported_extensions_are_dropped_and_omitted() {
    let provider = Arc::new(StubProvider::new(PlatformEnvironment::apple(
        OsVersion::new(16, 4),
    )));
    let CeremonyResult::Registration(result) = TestFixtures::registration_result() else {
        unreachable!()
    };
    provider.push_behavior(StubBehavior::Succeed(CeremonyResult::Registration(
        RegistrationResult {
            extensions: ExtensionOutputs {
                large_blob: Some(LargeBlobOutputs {
                    supported: Some(true),
                    ..LargeBlobOutputs::default()
                }),
                ..ExtensionOutputs::default()
            },
            ..result
        },
    )));
    let module = module_for(&provider);

    let mut value = serde_json::to_value(TestFixtures::creation_options(b"fizz")).unwrap();
    value["extensions"] = json!({"largeBlob": {"support": "required"}});
    let options = marshal::parse_creation_options(&value.to_string()).unwrap();

    let response = module.create(&options, None).await.unwrap();

    let CeremonyRequest::Registration(request) = &provider.submitted()[0].ceremony else {
        panic!("expected a registration request");
    };
    assert_eq!(request.extensions.large_blob, None);
    assert_eq!(response.client_extension_results.large_blob, None);
}

#[tokio::test]
async fn test_extension_outputs_are_reported() {
    let provider = Arc::new(StubProvider::new(PlatformEnvironment::web()));
    let CeremonyResult::Assertion(result) = TestFixtures::assertion_result() else {
        unreachable!()
    };
    let mut result = result;
    result.extensions.large_blob = Some(LargeBlobOutputs {
        blob: Some(b"fizz".to_vec()),
        ..LargeBlobOutputs::default()
    });
    provider.push_behavior(StubBehavior::Succeed(CeremonyResult::Assertion(result)));
    let module = module_for(&provider);

    let mut options = TestFixtures::request_options(b"fizz");
    options.extensions = Some(
        serde_json::from_value(json!({"largeBlob": {"read": true}})).unwrap(),
    );
    let response = module.get(&options, None).await.unwrap();

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(
        value["clientExtensionResults"],
        json!({"largeBlob": {"blob": "Zml6eg"}})
    );
    assert_eq!(value["response"]["userHandle"], json!("dXNlci0xMjM0"));
}
