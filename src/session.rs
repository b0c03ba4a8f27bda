use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use derive_more::Display;
use thiserror::Error;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Display, Hash)]
pub struct SessionId(Uuid);
impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}
impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery failed because the peer is gone. The session stays closed
/// permanently; the coordinator reacts by evicting the bound user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session closed")]
pub struct SessionClosed;

/// One connected participant. Cheap to clone; the coordinator keys sessions
/// by [`SessionId`] and owns the only long-lived handles.
#[derive(Debug, Clone)]
pub struct Session {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    id: SessionId,
    tx: mpsc::UnboundedSender<String>,
    closed: AtomicBool,
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.shared.id == other.shared.id
    }
}
impl Eq for Session {}

impl Session {
    /// `tx` is the outbound edge of the connection; frames pushed here are
    /// forwarded to the peer by the transport task.
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        let id = SessionId::new();
        log::trace!("+session {}", id);
        Self {
            shared: Arc::new(Shared {
                id,
                tx,
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Enqueue one serialized frame without blocking. Any failure marks the
    /// session closed for good.
    pub fn deliver(&self, frame: &str) -> Result<(), SessionClosed> {
        if self.is_closed() {
            return Err(SessionClosed);
        }
        match self.shared.tx.send(frame.to_owned()) {
            Ok(()) => Ok(()),
            Err(_) => {
                self.close();
                Err(SessionClosed)
            }
        }
    }

    /// Idempotent teardown; the transport task notices when the sender side
    /// stops producing and the socket drops.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Relaxed);
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> SessionId {
        self.shared.id
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        log::trace!("-session {}", self.id);
    }
}
