//! Authenticator provider seam
//!
//! A provider performs the actual ceremony (UI, biometrics, signing) and
//! reports back through a [`Completion`]. Completions can be cloned and moved
//! to any thread; only the first resolution for the live ceremony is
//! delivered, later ones are logged and discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::error::{ErrorKind, PasskeyError};

use super::error_map::PlatformError;
use super::model::{AssertionRequest, CeremonyKind, CeremonyResult, CreationRequest};
use super::platform::PlatformEnvironment;

/// Which kind of authenticator the provider should offer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticatorRoute {
    /// The platform's own authenticator (passkey manager)
    Platform,
    /// A roaming security key over usb, nfc or ble
    SecurityKey,
    /// Whatever the provider offers
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyRequest {
    Registration(CreationRequest),
    Assertion(AssertionRequest),
}

impl CeremonyRequest {
    #[must_use]
    pub fn kind(&self) -> CeremonyKind {
        match self {
            CeremonyRequest::Registration(_) => CeremonyKind::Registration,
            CeremonyRequest::Assertion(_) => CeremonyKind::Assertion,
        }
    }
}

/// A validated request ready for the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedRequest {
    pub id: Uuid,
    pub route: AuthenticatorRoute,
    pub ceremony: CeremonyRequest,
}

/// Final state of a ceremony as seen by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(CeremonyResult),
    Failure(PlatformError),
    /// Every completion handle was dropped without resolving
    Abandoned,
}

/// Platform-side authenticator. Implementations must not block in `submit`.
#[async_trait]
pub trait AuthenticatorProvider: Send + Sync {
    /// Platform facts used for support and capability checks
    fn environment(&self) -> PlatformEnvironment;

    /// Start the ceremony; resolve `completion` when it finishes
    fn submit(&self, request: PreparedRequest, completion: Completion);

    /// Best-effort request to abort the ceremony with the given id.
    /// Providers that cannot cancel keep the default no-op.
    async fn cancel(&self, ceremony_id: Uuid) {
        debug!("Provider does not support cancelling ceremony {ceremony_id}");
    }
}

/// The single live ceremony of a module
pub(crate) struct CeremonyContext {
    id: Uuid,
    kind: CeremonyKind,
    sender: oneshot::Sender<Outcome>,
}

/// Slot holding at most one [`CeremonyContext`]
#[derive(Clone, Default)]
pub(crate) struct ContextSlot(Arc<Mutex<Option<CeremonyContext>>>);

impl ContextSlot {
    fn lock(&self) -> MutexGuard<'_, Option<CeremonyContext>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.lock().is_some()
    }

    /// Install a fresh context, failing if one is already live
    pub(crate) fn begin(
        &self,
        kind: CeremonyKind,
    ) -> Result<(Uuid, oneshot::Receiver<Outcome>), PasskeyError> {
        let mut slot = self.lock();
        if let Some(current) = slot.as_ref() {
            debug!(
                "Rejecting {kind} while {} ceremony {} is pending",
                current.kind, current.id
            );
            return Err(ErrorKind::PendingRequest.into());
        }
        let id = Uuid::new_v4();
        let (sender, receiver) = oneshot::channel();
        *slot = Some(CeremonyContext { id, kind, sender });
        Ok((id, receiver))
    }

    /// Remove the context if it still belongs to ceremony `id`
    pub(crate) fn take(&self, id: Uuid) -> Option<CeremonyContext> {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|context| context.id == id) {
            slot.take()
        } else {
            None
        }
    }
}

struct CompletionInner {
    id: Uuid,
    slot: ContextSlot,
}

impl Drop for CompletionInner {
    fn drop(&mut self) {
        if let Some(context) = self.slot.take(self.id) {
            warn!(
                "Provider released {} ceremony {} without a result",
                context.kind, context.id
            );
            let _ = context.sender.send(Outcome::Abandoned);
        }
    }
}

/// Handle a provider uses to report the result of one ceremony
#[derive(Clone)]
pub struct Completion {
    inner: Arc<CompletionInner>,
}

impl Completion {
    pub(crate) fn new(id: Uuid, slot: ContextSlot) -> Self {
        Self {
            inner: Arc::new(CompletionInner { id, slot }),
        }
    }

    /// Id of the ceremony this handle belongs to
    #[must_use]
    pub fn ceremony_id(&self) -> Uuid {
        self.inner.id
    }

    /// Report a successful ceremony. Returns `false` if the result was discarded.
    pub fn succeed(&self, result: CeremonyResult) -> bool {
        self.resolve(Outcome::Success(result))
    }

    /// Report a failed ceremony. Returns `false` if the error was discarded.
    pub fn fail(&self, error: PlatformError) -> bool {
        self.resolve(Outcome::Failure(error))
    }

    fn resolve(&self, outcome: Outcome) -> bool {
        let Some(context) = self.inner.slot.take(self.inner.id) else {
            warn!(
                "Discarding result for ceremony {} that is no longer pending",
                self.inner.id
            );
            return false;
        };
        // The receiver is gone only if the caller stopped waiting
        if context.sender.send(outcome).is_err() {
            debug!("Caller of ceremony {} stopped waiting", context.id);
        }
        true
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("ceremony_id", &self.inner.id)
            .finish()
    }
}

/// Caller-side cancellation flag
///
/// Cancelling before hand-off prevents the ceremony from starting. Cancelling
/// afterwards forwards a best-effort request to the provider.
#[derive(Clone, Debug)]
pub struct CancellationSignal {
    sender: Arc<watch::Sender<bool>>,
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut receiver = self.sender.subscribe();
        // The sender lives as long as `self`, so this only returns once cancelled
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }
}
