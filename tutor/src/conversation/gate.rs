//! Per-session single-flight gate.
//!
//! At most one inference request may be outstanding per session. Holding a
//! [`FlightGuard`] is the right to mutate that session's history; dropping it
//! releases the slot.

use std::collections::HashMap;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Tracks which sessions have a request in flight.
#[derive(Debug, Default)]
pub struct FlightGate {
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

impl FlightGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the slot for `session_id`, or fail with [`Error::Busy`].
    pub fn acquire(&self, session_id: &str) -> Result<FlightGuard<'_>> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains_key(session_id) {
            return Err(Error::Busy(session_id.to_string()));
        }
        let token = CancellationToken::new();
        in_flight.insert(session_id.to_string(), token.clone());
        Ok(FlightGuard {
            gate: self,
            session_id: session_id.to_string(),
            token,
        })
    }

    /// Whether a request for `session_id` is outstanding.
    pub fn is_busy(&self, session_id: &str) -> bool {
        self.in_flight.lock().contains_key(session_id)
    }

    /// Cancel the outstanding request for `session_id`, if any.
    pub fn cancel(&self, session_id: &str) -> bool {
        self.in_flight.lock().get(session_id).is_some_and(|token| {
            token.cancel();
            true
        })
    }
}

/// Exclusive claim on a session's in-flight slot.
#[derive(Debug)]
pub struct FlightGuard<'a> {
    gate: &'a FlightGate,
    session_id: String,
    token: CancellationToken,
}

impl FlightGuard<'_> {
    /// Token cancelled by [`FlightGate::cancel`].
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.lock().remove(&self.session_id);
    }
}
