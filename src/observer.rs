//! Write-failure listeners.
//!
//! Repositories return write failures as `WriteError` values. Listeners
//! registered here are told about the same failures as they happen, which
//! is handy for logging or metrics that live away from the call site.
//! Listeners run on their own threads, after the write call has returned.

use std::fmt;
use std::sync::{Arc, Mutex};

use event_emitter_rs::EventEmitter;
use serde::{Deserialize, Serialize};

use crate::error::{WriteError, WriteOperation};

const WRITE_FAILED: &str = "write_failed";

/// Payload delivered to listeners: the failed write and the error it
/// returned to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub collection: String,
    pub operation: WriteOperation,
    pub error: WriteError,
}

/// Listener list shared by all clones of a repository.
#[derive(Clone)]
pub struct FailureObservers {
    emitter: Arc<Mutex<EventEmitter>>,
}

impl FailureObservers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Returns an id for [`FailureObservers::remove`].
    pub fn on<F>(&self, listener: F) -> String
    where
        F: Fn(WriteFailure) + Send + Sync + 'static,
    {
        match self.emitter.lock() {
            Ok(mut emitter) => emitter.on(WRITE_FAILED, listener),
            Err(poisoned) => poisoned.into_inner().on(WRITE_FAILED, listener),
        }
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn remove(&self, id: &str) -> bool {
        match self.emitter.lock() {
            Ok(mut emitter) => emitter.remove_listener(id).is_some(),
            Err(poisoned) => poisoned.into_inner().remove_listener(id).is_some(),
        }
    }

    pub(crate) fn notify(&self, collection: &str, operation: WriteOperation, error: &WriteError) {
        let failure = WriteFailure {
            collection: collection.to_string(),
            operation,
            error: error.clone(),
        };
        match self.emitter.lock() {
            Ok(mut emitter) => {
                emitter.emit(WRITE_FAILED, failure);
            }
            Err(poisoned) => {
                poisoned.into_inner().emit(WRITE_FAILED, failure);
            }
        }
    }
}

impl Default for FailureObservers {
    fn default() -> Self {
        Self {
            emitter: Arc::new(Mutex::new(EventEmitter::new())),
        }
    }
}

impl fmt::Debug for FailureObservers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureObservers").finish_non_exhaustive()
    }
}
