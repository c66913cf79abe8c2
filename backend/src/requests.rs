//! In-flight workflow calls, keyed by client and request id so they can be cancelled.

use shared::{ClientId, RequestId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use tokio::task::{AbortHandle, JoinError};

#[derive(Debug, PartialEq, Eq)]
pub enum CallResult<T> {
    Finished(T),
    Cancelled,
    Panicked(String),
}

#[derive(Default)]
pub struct InFlight {
    handles: Mutex<HashMap<(ClientId, RequestId), AbortHandle>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, key: (ClientId, RequestId), handle: AbortHandle) {
        match self.handles.lock() {
            Ok(mut handles) => {
                handles.insert(key, handle);
            }
            Err(_) => tracing::error!("in-flight registry lock poisoned, call cannot be cancelled"),
        }
    }

    fn remove(&self, key: &(ClientId, RequestId)) -> Option<AbortHandle> {
        self.handles.lock().ok().and_then(|mut handles| handles.remove(key))
    }

    /// Runs `call` on its own task until it finishes or [`InFlight::cancel`] aborts it.
    pub async fn run<F>(&self, client: ClientId, request: RequestId, call: F) -> CallResult<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let key = (client, request);
        let task = tokio::spawn(call);
        self.insert(key.clone(), task.abort_handle());
        let result = task.await;
        self.remove(&key);
        match result {
            Ok(output) => CallResult::Finished(output),
            Err(error) => Self::join_failure(error),
        }
    }

    fn join_failure<T>(error: JoinError) -> CallResult<T> {
        if error.is_cancelled() {
            CallResult::Cancelled
        } else {
            CallResult::Panicked(error.to_string())
        }
    }

    /// Returns `false` when the request already finished or was never started.
    pub fn cancel(&self, client: &ClientId, request: RequestId) -> bool {
        match self.remove(&(client.clone(), request)) {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.lock().map(|handles| handles.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
