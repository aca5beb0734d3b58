//! Process-wide connection status container.
//!
//! Holds the UI-visible state: connection state, retry attempt, active
//! technique, chart revision and a dropped-frame counter. Clones share the
//! same state. Only the session mutates it; anyone may observe it.

use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::sample::Technique;

/// Connection lifecycle: `Disconnected -> Connecting -> Connected -> Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Disconnected)
                | (Connected, Disconnected)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }
}

/// Point-in-time copy of the status, cheap to hand to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub reconnect_attempt: u32,
    pub retries_exhausted: bool,
    pub last_ack: Option<String>,
    pub active_technique: Option<Technique>,
    pub chart_revision: u64,
    pub dropped_frames: u64,
}

#[derive(Debug)]
struct StatusInner {
    snapshot: StatusSnapshot,
    listeners: Vec<Sender<ConnectionState>>,
}

#[derive(Debug, Clone)]
pub struct ConnectionStatus {
    inner: Arc<Mutex<StatusInner>>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionStatus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusInner {
                snapshot: StatusSnapshot::default(),
                listeners: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StatusInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        self.lock().snapshot.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.lock().snapshot.state
    }

    /// Apply a state transition. Returns `false` for no-ops and illegal moves.
    pub fn transition(&self, next: ConnectionState) -> bool {
        let mut inner = self.lock();
        let current = inner.snapshot.state;
        if current == next {
            return false;
        }
        if !current.can_transition_to(next) {
            warn!(?current, ?next, "ignoring illegal connection state transition");
            return false;
        }
        info!(from = current.label(), to = next.label(), "connection state");
        inner.snapshot.state = next;
        if next == ConnectionState::Connected {
            inner.snapshot.reconnect_attempt = 0;
            inner.snapshot.retries_exhausted = false;
        }
        inner.listeners.retain(|tx| tx.send(next).is_ok());
        true
    }

    pub fn set_reconnect_attempt(&self, attempt: u32) {
        self.lock().snapshot.reconnect_attempt = attempt;
    }

    pub fn set_retries_exhausted(&self, exhausted: bool) {
        self.lock().snapshot.retries_exhausted = exhausted;
    }

    pub fn record_ack(&self, message: String) {
        self.lock().snapshot.last_ack = Some(message);
    }

    pub fn set_active_technique(&self, technique: Option<Technique>) {
        self.lock().snapshot.active_technique = technique;
    }

    pub fn active_technique(&self) -> Option<Technique> {
        self.lock().snapshot.active_technique.clone()
    }

    pub fn set_chart_revision(&self, revision: u64) {
        self.lock().snapshot.chart_revision = revision;
    }

    pub fn record_dropped_frame(&self) {
        self.lock().snapshot.dropped_frames += 1;
    }

    /// Receive every future state change.
    pub fn subscribe(&self) -> Receiver<ConnectionState> {
        let (tx, rx) = std::sync::mpsc::channel();
        self.lock().listeners.push(tx);
        rx
    }
}
