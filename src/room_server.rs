use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

use crate::clock::Clock;
use crate::hub::Hub;
use crate::ids::IdGenerator;
use crate::messages::{ClientMessage, RoomId, ServerMessage, UserId};
use crate::room::{self, NewTrack, Outbound, Room};
use crate::session::{Session, SessionId};

/// Read-only view of a room for the HTTP surface.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: RoomId,
    pub name: String,
    pub user_count: usize,
}

/// The coordinator: owns every room, every session and the user↔session
/// index. All inbound traffic funnels through [`RoomServer::handle_message`];
/// handlers never block and never perform I/O beyond session delivery, so a
/// single lock serializes the whole engine.
#[derive(Clone)]
pub struct RoomServer {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,
    ids: IdGenerator,
    clock: Arc<dyn Clock>,
}

struct State {
    rooms: HashMap<RoomId, Room>,
    /// user → room they belong to. Paired with the hub's user↔session index
    /// these are the only cross-room structures.
    memberships: HashMap<UserId, RoomId>,
    hub: Hub,
}

impl RoomServer {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    rooms: HashMap::new(),
                    memberships: HashMap::new(),
                    hub: Hub::new(),
                }),
                ids: IdGenerator::new(),
                clock,
            }),
        }
    }

    fn now(&self) -> u64 {
        self.shared.clock.now_ms()
    }

    /// Register a freshly accepted connection. `tx` is the outbound edge
    /// pumped to the socket by the transport task.
    pub fn connect(&self, tx: mpsc::UnboundedSender<String>) -> Session {
        let session = Session::new(tx);
        let mut state = self.shared.state.lock().unwrap();
        state.hub.insert(session.clone());
        session
    }

    /// Tear down a connection; a bound user leaves their room, an unbound
    /// session is simply discarded.
    pub fn disconnect(&self, session_id: SessionId) {
        let mut state = self.shared.state.lock().unwrap();
        if let Some(user_id) = state.hub.remove(session_id) {
            let failed = leave_user(&mut state, &user_id);
            process_evictions(&mut state, failed);
        }
    }

    /// Whether this session has completed a `join`.
    pub fn has_user(&self, session_id: SessionId) -> bool {
        let state = self.shared.state.lock().unwrap();
        state.hub.user_of(session_id).is_some()
    }

    pub fn create_room(&self, name: Option<String>) -> RoomSummary {
        let id = self.shared.ids.room_id();
        let name = room::sanitize_room_name(name.as_deref(), &id);
        let room = Room::new(id.clone(), name.clone(), self.now());
        let mut state = self.shared.state.lock().unwrap();
        state.rooms.insert(id.clone(), room);
        RoomSummary {
            id,
            name,
            user_count: 0,
        }
    }

    pub fn room_summary(&self, room_id: &str) -> Option<RoomSummary> {
        let state = self.shared.state.lock().unwrap();
        let room = state.rooms.get(room_id)?;
        Some(RoomSummary {
            id: room.id().clone(),
            name: room.name().to_owned(),
            user_count: room.user_count(),
        })
    }

    /// Route one decoded client message. Everything except `join` requires
    /// the session to be bound to a user already; unroutable messages are
    /// dropped without an answer.
    pub fn handle_message(&self, session_id: SessionId, message: ClientMessage) {
        match message {
            ClientMessage::Join { room_id, user_name } => {
                self.join(session_id, room_id, user_name)
            }
            ClientMessage::QueueAdd { .. } => {
                // The transport layer resolves URLs and calls add_track; the
                // engine itself never sees an unresolved queue:add.
                log::debug!("dropping unresolved queue:add from {}", session_id);
            }
            ClientMessage::QueueRemove { track_id } => {
                self.with_member(session_id, |room, user_id, now| {
                    room.remove_track(user_id, &track_id, now)
                });
            }
            ClientMessage::Play => {
                self.with_member(session_id, |room, _, now| room.play(now));
            }
            ClientMessage::Pause => {
                self.with_member(session_id, |room, _, now| room.pause(now));
            }
            ClientMessage::Skip => {
                self.with_member(session_id, |room, user_id, now| {
                    room.skip_vote(user_id, now)
                });
            }
            ClientMessage::Seek { time } => {
                let time = time.as_f64().unwrap_or(0.0);
                self.with_member(session_id, |room, _, now| room.seek(time, now));
            }
            ClientMessage::Chat { text } => {
                let text = text.as_str().unwrap_or("").to_owned();
                self.with_member(session_id, |room, user_id, now| {
                    room.chat(user_id, &text, now)
                });
            }
            ClientMessage::Crossfade { duration } => {
                let duration = duration.as_f64().unwrap_or(0.0);
                self.with_member(session_id, |room, _, _| room.set_crossfade(duration));
            }
        }
    }

    /// Append a track whose metadata the transport layer already resolved.
    pub fn add_track(&self, session_id: SessionId, video: NewTrack) {
        let track_id = self.shared.ids.track_id();
        self.with_member(session_id, |room, user_id, now| {
            room.add_track(user_id, track_id, video, now)
        });
    }

    fn join(&self, session_id: SessionId, room_id: RoomId, user_name: Option<String>) {
        let now = self.now();
        let mut state = self.shared.state.lock().unwrap();
        if state.hub.user_of(session_id).is_some() {
            log::debug!("dropping join from already-joined session {}", session_id);
            return;
        }
        let Some(room) = state.rooms.get(&room_id).cloned() else {
            let error = ServerMessage::RoomError {
                message: "Room not found".to_owned(),
            };
            if !state.hub.send_to_session(session_id, &error) {
                state.hub.remove(session_id);
            }
            return;
        };
        let user_id = self.shared.ids.user_id();
        state.hub.bind_user(user_id.clone(), session_id);
        state.memberships.insert(user_id.clone(), room_id);
        let out = room.join(user_id, user_name, now);
        let failed = deliver(&state, &room, out);
        process_evictions(&mut state, failed);
    }

    /// Resolve the session's user and room, run `op` on the room, deliver
    /// its output and evict anyone whose delivery failed.
    fn with_member<F>(&self, session_id: SessionId, op: F)
    where
        F: FnOnce(&Room, &UserId, u64) -> Vec<Outbound>,
    {
        let now = self.now();
        let mut state = self.shared.state.lock().unwrap();
        let Some(user_id) = state.hub.user_of(session_id).cloned() else {
            log::debug!("dropping message from unjoined session {}", session_id);
            return;
        };
        let Some(room_id) = state.memberships.get(&user_id).cloned() else {
            return;
        };
        let Some(room) = state.rooms.get(&room_id).cloned() else {
            return;
        };
        let out = op(&room, &user_id, now);
        let failed = deliver(&state, &room, out);
        process_evictions(&mut state, failed);
    }
}

/// Deliver a room operation's output, returning the users whose sessions
/// failed. Broadcasts resolve the member list at delivery time.
fn deliver(state: &State, room: &Room, out: Vec<Outbound>) -> Vec<UserId> {
    let mut failed = Vec::new();
    for outbound in out {
        match outbound {
            Outbound::Direct(user_id, message) => {
                failed.extend(state.hub.send_to_user(&user_id, &message));
            }
            Outbound::Broadcast { exclude, message } => {
                failed.extend(
                    state
                        .hub
                        .broadcast(&room.user_ids(), exclude.as_ref(), &message),
                );
            }
        }
    }
    failed
}

/// Remove a user from the indices and their room; an emptied room is
/// destroyed on the spot. Returns users whose `user:left` delivery failed.
fn leave_user(state: &mut State, user_id: &UserId) -> Vec<UserId> {
    if let Some(session_id) = state.hub.unbind_user(user_id) {
        state.hub.remove(session_id);
    }
    let Some(room_id) = state.memberships.remove(user_id) else {
        return Vec::new();
    };
    let Some(room) = state.rooms.get(&room_id).cloned() else {
        return Vec::new();
    };
    let (out, empty) = room.leave(user_id);
    let failed = deliver(state, &room, out);
    if empty {
        state.rooms.remove(&room_id);
    }
    failed
}

/// Evicting one user can surface further dead sessions while announcing
/// `user:left`, so failures are drained as a worklist.
fn process_evictions(state: &mut State, mut pending: Vec<UserId>) {
    while let Some(user_id) = pending.pop() {
        log::debug!("evicting {} after failed delivery", user_id);
        pending.extend(leave_user(state, &user_id));
    }
}
