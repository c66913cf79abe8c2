//! Reentrancy guard and sequence tagging for one remote resource.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// Monotonically increasing id attached to every outgoing request.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next() -> Self {
        Self(NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Proof that the gate was entered; hand its id to the outgoing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub id: RequestId,
}

/// Allows one request in flight and recognizes only the latest response.
#[derive(Debug, Default, Clone)]
pub struct RequestGate {
    in_flight: Option<RequestId>,
    latest: Option<RequestId>,
}

impl RequestGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` while another request is in flight; the new request is dropped, not queued.
    pub fn begin(&mut self) -> Option<RequestTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        let id = RequestId::next();
        self.in_flight = Some(id);
        self.latest = Some(id);
        Some(RequestTicket { id })
    }

    /// Accepts the response only if it belongs to the request in flight.
    pub fn finish(&mut self, id: RequestId) -> bool {
        if self.in_flight != Some(id) {
            return false;
        }
        self.in_flight = None;
        true
    }

    /// Releases the gate after a failed request. Stale ids are ignored.
    pub fn fail(&mut self, id: RequestId) -> bool {
        self.finish(id)
    }

    /// Abandons the request in flight. Returns its id so the caller can tell the backend.
    pub fn cancel(&mut self) -> Option<RequestId> {
        self.in_flight.take()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<RequestId> {
        self.in_flight
    }

    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }
}
