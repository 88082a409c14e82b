//! Stub authenticator provider
//!
//! [`StubProvider`] replays scripted behaviors, one per submitted request,
//! and records everything it was asked to do.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::passkey::error_map::PlatformError;
use crate::passkey::model::CeremonyResult;
use crate::passkey::platform::PlatformEnvironment;
use crate::passkey::provider::{AuthenticatorProvider, Completion, PreparedRequest};

use super::fixtures::TestFixtures;

/// What the stub does with the next submitted request
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Resolve immediately with the result
    Succeed(CeremonyResult),
    /// Fail immediately with the platform error
    Fail(PlatformError),
    /// Keep the completion until the test resolves it via [`StubProvider::take_held`]
    Hold,
    /// Resolve twice with the same result
    Duplicate(CeremonyResult),
    /// Drop the completion without resolving it
    Drop,
}

pub struct StubProvider {
    environment: Mutex<PlatformEnvironment>,
    behaviors: Mutex<VecDeque<StubBehavior>>,
    submitted: Mutex<Vec<PreparedRequest>>,
    held: Mutex<Vec<Completion>>,
    cancel_calls: AtomicUsize,
    honor_cancel: bool,
}

impl StubProvider {
    /// Create a stub that holds every request until told otherwise
    #[must_use]
    pub fn new(environment: PlatformEnvironment) -> Self {
        Self {
            environment: Mutex::new(environment),
            behaviors: Mutex::new(VecDeque::new()),
            submitted: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
            cancel_calls: AtomicUsize::new(0),
            honor_cancel: true,
        }
    }

    /// Queue a behavior for the next request
    ///
    /// # Panics
    ///
    /// Panics if the behavior queue lock is poisoned.
    #[must_use]
    pub fn with_behavior(self, behavior: StubBehavior) -> Self {
        self.push_behavior(behavior);
        self
    }

    /// Make `cancel` a no-op, like a provider without cancellation support
    #[must_use]
    pub fn ignoring_cancel(mut self) -> Self {
        self.honor_cancel = false;
        self
    }

    /// # Panics
    ///
    /// Panics if the behavior queue lock is poisoned.
    pub fn push_behavior(&self, behavior: StubBehavior) {
        self.behaviors.lock().unwrap().push_back(behavior);
    }

    /// # Panics
    ///
    /// Panics if the environment lock is poisoned.
    pub fn set_environment(&self, environment: PlatformEnvironment) {
        *self.environment.lock().unwrap() = environment;
    }

    /// Requests submitted so far
    ///
    /// # Panics
    ///
    /// Panics if the submission lock is poisoned.
    #[must_use]
    pub fn submitted(&self) -> Vec<PreparedRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// # Panics
    ///
    /// Panics if the submission lock is poisoned.
    #[must_use]
    pub fn submission_count(&self) -> usize {
        self.submitted.lock().unwrap().len()
    }

    /// Oldest held completion, if any
    ///
    /// # Panics
    ///
    /// Panics if the held-completion lock is poisoned.
    #[must_use]
    pub fn take_held(&self) -> Option<Completion> {
        let mut held = self.held.lock().unwrap();
        if held.is_empty() {
            None
        } else {
            Some(held.remove(0))
        }
    }

    #[must_use]
    pub fn cancel_count(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthenticatorProvider for StubProvider {
    fn environment(&self) -> PlatformEnvironment {
        self.environment.lock().unwrap().clone()
    }

    fn submit(&self, request: PreparedRequest, completion: Completion) {
        self.submitted.lock().unwrap().push(request);
        let behavior = self
            .behaviors
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(StubBehavior::Hold);

        match behavior {
            StubBehavior::Succeed(result) => {
                completion.succeed(result);
            }
            StubBehavior::Fail(error) => {
                completion.fail(error);
            }
            StubBehavior::Hold => self.held.lock().unwrap().push(completion),
            StubBehavior::Duplicate(result) => {
                completion.succeed(result.clone());
                completion.succeed(result);
            }
            StubBehavior::Drop => drop(completion),
        }
    }

    async fn cancel(&self, ceremony_id: Uuid) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        if !self.honor_cancel {
            return;
        }
        let completion = {
            let mut held = self.held.lock().unwrap();
            held.iter()
                .position(|completion| completion.ceremony_id() == ceremony_id)
                .map(|index| held.remove(index))
        };
        if let Some(completion) = completion {
            completion.fail(TestFixtures::cancelled_error());
        }
    }
}
