//! Ceremony orchestrator
//!
//! [`PasskeyModule`] owns the single in-flight ceremony of one module
//! instance. A call validates and marshals its JSON, hands the prepared
//! request to the provider, suspends until the provider resolves the
//! completion, then post-processes and marshals the result.
//!
//! ```text
//! Idle --create/get--> Pending --succeed--> Completed --> Idle
//!                         \------fail-----> Failed ----> Idle
//! ```

use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{ErrorKind, PasskeyError};
use crate::settings::PasskeySettings;
use crate::webauthn::types::{
    AuthenticationResponseJson, PublicKeyCredentialCreationOptionsJson,
    PublicKeyCredentialRequestOptionsJson, RegistrationResponseJson,
};

use super::error_map::map_platform_error;
use super::extensions::missing_outputs;
use super::marshal;
use super::model::{
    AuthenticatorAttachment, CeremonyKind, CeremonyResult, CreationRequest, ExtensionOutputs,
};
use super::platform::{PlatformCapabilities, PlatformEnvironment};
use super::provider::{
    AuthenticatorProvider, AuthenticatorRoute, CancellationSignal, CeremonyRequest, Completion,
    ContextSlot, Outcome, PreparedRequest,
};

/// Clears the context slot if the caller stops waiting before completion
struct PendingGuard<'a> {
    slot: &'a ContextSlot,
    id: Uuid,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.slot.take(self.id).is_some() {
            debug!("Ceremony {} torn down before the provider finished", self.id);
        }
    }
}

impl AuthenticatorRoute {
    /// Cross-platform attachment asks for a security key; everything else uses the platform
    fn for_creation(request: &CreationRequest) -> Self {
        match request.attachment() {
            Some(AuthenticatorAttachment::CrossPlatform) => AuthenticatorRoute::SecurityKey,
            _ => AuthenticatorRoute::Platform,
        }
    }
}

/// Passkey entry point bound to one authenticator provider
pub struct PasskeyModule<P: AuthenticatorProvider> {
    provider: Arc<P>,
    settings: PasskeySettings,
    slot: ContextSlot,
}

impl<P: AuthenticatorProvider> PasskeyModule<P> {
    pub fn new(provider: Arc<P>, settings: PasskeySettings) -> Self {
        Self {
            provider,
            settings,
            slot: ContextSlot::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PasskeySettings {
        &self.settings
    }

    #[must_use]
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Whether the platform version supports passkeys
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.provider.environment().is_supported()
    }

    /// Whether conditional mediation (autofill) can be used
    #[must_use]
    pub fn is_autofill_available(&self) -> bool {
        self.provider.environment().is_autofill_available()
    }

    /// Whether a ceremony is currently pending
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.slot.is_pending()
    }

    /// Register a new credential
    ///
    /// # Errors
    ///
    /// - `NotSupported` if the platform version cannot create passkeys
    /// - `PendingRequest` if another ceremony is in flight
    /// - `BiometricUnavailable` if biometrics are required but unavailable
    /// - any validation error from [`marshal::creation_request_from_json`]
    /// - `UserCancelled` if `signal` was cancelled before hand-off
    /// - the mapped platform error if the provider reports a failure
    pub async fn create(
        &self,
        options: &PublicKeyCredentialCreationOptionsJson,
        signal: Option<&CancellationSignal>,
    ) -> Result<RegistrationResponseJson, PasskeyError> {
        let environment = self.check_ready(CeremonyKind::Registration)?;
        let capabilities = PlatformCapabilities::for_environment(&environment);

        let mut request = marshal::creation_request_from_json(options)?;
        capabilities.filter_creation_request(&mut request);
        let requested = request.extensions.requested();
        let route = AuthenticatorRoute::for_creation(&request);

        match self
            .run(route, CeremonyRequest::Registration(request), signal)
            .await?
        {
            CeremonyResult::Registration(mut result) => {
                capabilities.filter_outputs(&mut result.extensions);
                self.report_missing(CeremonyKind::Registration, &requested, &result.extensions);
                Ok(marshal::registration_result_to_json(&result))
            }
            CeremonyResult::Assertion(_) => Err(PasskeyError::new(
                ErrorKind::InvalidResponse,
                "Provider returned an assertion for a registration request",
            )),
        }
    }

    /// Authenticate with an existing credential
    ///
    /// # Errors
    ///
    /// Same as [`create`](Self::create), with validation errors from
    /// [`marshal::assertion_request_from_json`].
    pub async fn get(
        &self,
        options: &PublicKeyCredentialRequestOptionsJson,
        signal: Option<&CancellationSignal>,
    ) -> Result<AuthenticationResponseJson, PasskeyError> {
        let environment = self.check_ready(CeremonyKind::Assertion)?;
        let capabilities = PlatformCapabilities::for_environment(&environment);

        let mut request = marshal::assertion_request_from_json(options)?;
        if options.timeout.is_none() {
            request.timeout_ms = self.settings.assertion_timeout_ms;
        }
        if request.rp_id.is_none() {
            request.rp_id.clone_from(&self.settings.default_rp_id);
        }
        capabilities.filter_assertion_request(&mut request);
        let requested = request.extensions.requested();

        match self
            .run(
                AuthenticatorRoute::Any,
                CeremonyRequest::Assertion(request),
                signal,
            )
            .await?
        {
            CeremonyResult::Assertion(mut result) => {
                capabilities.filter_outputs(&mut result.extensions);
                self.report_missing(CeremonyKind::Assertion, &requested, &result.extensions);
                Ok(marshal::assertion_result_to_json(&result))
            }
            CeremonyResult::Registration(_) => Err(PasskeyError::new(
                ErrorKind::InvalidResponse,
                "Provider returned a registration for an assertion request",
            )),
        }
    }

    /// Guards evaluated before any request is built
    fn check_ready(&self, kind: CeremonyKind) -> Result<PlatformEnvironment, PasskeyError> {
        let environment = self.provider.environment();
        if !environment.is_supported() {
            return Err(PasskeyError::new(
                ErrorKind::NotSupported,
                format!("Passkeys are not supported on {environment}"),
            ));
        }
        if self.slot.is_pending() {
            debug!("Rejecting {kind}: a ceremony is already pending");
            return Err(ErrorKind::PendingRequest.into());
        }
        if self.settings.requires_biometrics(environment.target) && !environment.biometrics_available
        {
            return Err(ErrorKind::BiometricUnavailable.into());
        }
        Ok(environment)
    }

    async fn run(
        &self,
        route: AuthenticatorRoute,
        ceremony: CeremonyRequest,
        signal: Option<&CancellationSignal>,
    ) -> Result<CeremonyResult, PasskeyError> {
        let kind = ceremony.kind();
        if signal.is_some_and(CancellationSignal::is_cancelled) {
            info!("{kind} cancelled before it was started");
            return Err(ErrorKind::UserCancelled.into());
        }

        let (id, receiver) = self.slot.begin(kind)?;
        let _guard = PendingGuard {
            slot: &self.slot,
            id,
        };
        info!("Starting {kind} ceremony {id}");

        let completion = Completion::new(id, self.slot.clone());
        self.provider.submit(
            PreparedRequest {
                id,
                route,
                ceremony,
            },
            completion,
        );
        debug!("Handed {kind} ceremony {id} to provider ({route:?})");

        match self.wait(id, receiver, signal).await {
            Outcome::Success(result) => {
                if result.kind() == kind {
                    info!("Completed {kind} ceremony {id}");
                } else {
                    warn!("Provider returned a {} result for {kind} ceremony {id}", result.kind());
                }
                Ok(result)
            }
            Outcome::Failure(failure) => {
                let error = map_platform_error(&failure.code, &failure.message);
                info!("{kind} ceremony {id} failed: {error}");
                Err(error)
            }
            Outcome::Abandoned => Err(PasskeyError::new(
                ErrorKind::RequestFailed,
                "The authenticator provider ended the ceremony without a result",
            )),
        }
    }

    async fn wait(
        &self,
        id: Uuid,
        mut receiver: oneshot::Receiver<Outcome>,
        signal: Option<&CancellationSignal>,
    ) -> Outcome {
        if let Some(signal) = signal {
            tokio::select! {
                outcome = &mut receiver => return outcome.unwrap_or(Outcome::Abandoned),
                () = signal.cancelled() => {
                    info!("Cancellation requested for ceremony {id}");
                    self.provider.cancel(id).await;
                }
            }
        }
        // Still exactly one of success or failure once the provider reacts
        receiver.await.unwrap_or(Outcome::Abandoned)
    }

    fn report_missing(&self, kind: CeremonyKind, requested: &[&'static str], outputs: &ExtensionOutputs) {
        if !self.settings.warn_on_missing_extensions {
            return;
        }
        for name in missing_outputs(requested, outputs) {
            warn!("The {name} extension was requested but the {kind} result does not include it");
        }
    }
}
