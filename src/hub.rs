use std::collections::HashMap;

use bimap::BiMap;

use crate::messages::{ServerMessage, UserId};
use crate::session::{Session, SessionId};

/// Encode a message once for fan-out. Encoding our own types cannot
/// realistically fail, but a broken frame should never take the server down.
pub fn encode(message: &ServerMessage) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(frame) => Some(frame),
        Err(e) => {
            log::error!("failed to encode outbound message: {}", e);
            None
        }
    }
}

/// Registry of live sessions plus the user↔session index. Rooms hold user
/// IDs only; every delivery resolves through here.
#[derive(Debug, Default)]
pub struct Hub {
    sessions: HashMap<SessionId, Session>,
    users: BiMap<UserId, SessionId>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        self.sessions.insert(session.id(), session);
    }

    /// Drop a session and its user binding, if any. Returns the bound user.
    pub fn remove(&mut self, session_id: SessionId) -> Option<UserId> {
        if let Some(session) = self.sessions.remove(&session_id) {
            session.close();
        }
        self.users
            .remove_by_right(&session_id)
            .map(|(user_id, _)| user_id)
    }

    /// Associate a joined user with its session.
    pub fn bind_user(&mut self, user_id: UserId, session_id: SessionId) {
        self.users.insert(user_id, session_id);
    }

    pub fn unbind_user(&mut self, user_id: &UserId) -> Option<SessionId> {
        self.users.remove_by_left(user_id).map(|(_, sid)| sid)
    }

    pub fn user_of(&self, session_id: SessionId) -> Option<&UserId> {
        self.users.get_by_right(&session_id)
    }

    pub fn session_of(&self, user_id: &UserId) -> Option<&Session> {
        let sid = self.users.get_by_left(user_id)?;
        self.sessions.get(sid)
    }

    /// Deliver to one session regardless of user binding. Returns false on
    /// failure so the caller can discard the session.
    pub fn send_to_session(&self, session_id: SessionId, message: &ServerMessage) -> bool {
        let Some(frame) = encode(message) else {
            return true;
        };
        match self.sessions.get(&session_id) {
            Some(session) => session.deliver(&frame).is_ok(),
            None => true,
        }
    }

    /// Deliver to one user. Returns the user back on failure.
    pub fn send_to_user(&self, user_id: &UserId, message: &ServerMessage) -> Option<UserId> {
        let Some(frame) = encode(message) else {
            return None;
        };
        match self.session_of(user_id) {
            Some(session) if session.deliver(&frame).is_err() => Some(user_id.clone()),
            _ => None,
        }
    }

    /// Fan a message out to `recipients`, skipping `exclude`. A failed
    /// delivery never aborts the fan-out; the failing users are returned so
    /// the coordinator can evict them afterwards.
    pub fn broadcast(
        &self,
        recipients: &[UserId],
        exclude: Option<&UserId>,
        message: &ServerMessage,
    ) -> Vec<UserId> {
        let Some(frame) = encode(message) else {
            return Vec::new();
        };
        let mut failed = Vec::new();
        for user_id in recipients {
            if exclude == Some(user_id) {
                continue;
            }
            if let Some(session) = self.session_of(user_id) {
                if session.deliver(&frame).is_err() {
                    failed.push(user_id.clone());
                }
            }
        }
        failed
    }
}
