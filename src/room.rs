use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::messages::{
    PlaybackState, RoomId, SerializedRoom, ServerMessage, Track, TrackId, User, UserId,
};

/// Avatar colors handed out by join order.
const PALETTE: [&str; 12] = [
    "#FF5722", "#FF9800", "#FFC107", "#4CAF50", "#2196F3", "#9C27B0", "#E91E63", "#00BCD4",
    "#8BC34A", "#FF5252", "#69F0AE", "#40C4FF",
];

pub const MAX_ROOM_NAME: usize = 64;
pub const MAX_USER_NAME: usize = 24;
pub const MAX_CHAT_LEN: usize = 500;
pub const MAX_CROSSFADE_SECS: f64 = 8.0;

/// Track metadata already resolved by the transport layer; the room never
/// performs I/O itself.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub youtube_id: String,
    pub title: String,
    pub thumbnail: String,
}

/// Output of a room operation. The coordinator resolves user IDs to live
/// sessions and delivers; rooms never hold sessions.
#[derive(Debug)]
pub enum Outbound {
    Direct(UserId, ServerMessage),
    Broadcast {
        exclude: Option<UserId>,
        message: ServerMessage,
    },
}

impl Outbound {
    fn to_all(message: ServerMessage) -> Self {
        Outbound::Broadcast {
            exclude: None,
            message,
        }
    }
}

/// One listening session: participants, queue, virtual playback clock, skip
/// votes and crossfade setting. Cloning shares the same room.
#[derive(Clone)]
pub struct Room {
    shared: Arc<Shared>,
}

struct Shared {
    state: Mutex<State>,

    id: RoomId,
    name: String,
    created_at: u64,
}

struct State {
    host_id: Option<UserId>,
    users: HashMap<UserId, User>,
    /// Join order; drives host migration and color assignment.
    order: Vec<UserId>,
    queue: Vec<Track>,
    /// `None` iff nothing has been scheduled.
    current: Option<usize>,
    playback: PlaybackState,
    /// Virtual-clock anchor, consulted only while playing.
    started_at: u64,
    /// Position in seconds, authoritative only while paused.
    elapsed: f64,
    skip_votes: HashSet<UserId>,
    crossfade: f64,
}

impl Room {
    pub fn new(id: RoomId, name: String, created_at: u64) -> Self {
        log::trace!("+room {}", id);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    host_id: None,
                    users: HashMap::new(),
                    order: Vec::new(),
                    queue: Vec::new(),
                    current: None,
                    playback: PlaybackState::Paused,
                    started_at: 0,
                    elapsed: 0.0,
                    skip_votes: HashSet::new(),
                    crossfade: 0.0,
                }),
                id,
                name,
                created_at,
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.shared.id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn created_at(&self) -> u64 {
        self.shared.created_at
    }

    pub fn user_count(&self) -> usize {
        self.shared.state.lock().unwrap().users.len()
    }

    /// Participants in join order, for broadcast resolution.
    pub fn user_ids(&self) -> Vec<UserId> {
        self.shared.state.lock().unwrap().order.clone()
    }

    pub fn serialize(&self, now: u64) -> SerializedRoom {
        let state = self.shared.state.lock().unwrap();
        state.serialize(&self.shared, now)
    }

    /// Add a participant. The first user becomes host. Sends the full room
    /// snapshot to the joiner and announces them to everyone else.
    pub fn join(&self, user_id: UserId, user_name: Option<String>, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        let name = sanitize_name(user_name.as_deref().unwrap_or(""));
        let color = PALETTE[state.users.len() % PALETTE.len()].to_owned();
        let user = User {
            id: user_id.clone(),
            name,
            color,
        };
        if state.users.is_empty() {
            state.host_id = Some(user_id.clone());
        }
        state.users.insert(user_id.clone(), user.clone());
        state.order.push(user_id.clone());
        log::trace!("+user {} (room {})", user_id, self.shared.id);

        vec![
            Outbound::Direct(
                user_id.clone(),
                ServerMessage::RoomState {
                    room: state.serialize(&self.shared, now),
                    user_id,
                },
            ),
            Outbound::Broadcast {
                exclude: Some(user.id.clone()),
                message: ServerMessage::UserJoined { user },
            },
        ]
    }

    /// Remove a participant, dropping their skip vote and migrating the host
    /// role to the next user in join order. The caller destroys the room
    /// when it reports empty.
    pub fn leave(&self, user_id: &UserId) -> (Vec<Outbound>, bool) {
        let mut state = self.shared.state.lock().unwrap();
        if state.users.remove(user_id).is_none() {
            return (Vec::new(), state.users.is_empty());
        }
        state.order.retain(|id| id != user_id);
        state.skip_votes.remove(user_id);
        if state.host_id.as_ref() == Some(user_id) {
            state.host_id = state.order.first().cloned();
        }
        log::trace!("-user {} (room {})", user_id, self.shared.id);

        let out = vec![Outbound::Broadcast {
            exclude: Some(user_id.clone()),
            message: ServerMessage::UserLeft {
                user_id: user_id.clone(),
            },
        }];
        (out, state.users.is_empty())
    }

    /// Append a track; an idle room starts playing from the top of the queue.
    pub fn add_track(
        &self,
        added_by: &UserId,
        track_id: TrackId,
        video: NewTrack,
        now: u64,
    ) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        let added_by_name = state
            .users
            .get(added_by)
            .map(|u| u.name.clone())
            .unwrap_or_default();
        state.queue.push(Track {
            id: track_id,
            youtube_id: video.youtube_id,
            title: video.title,
            thumbnail: video.thumbnail,
            duration: 0.0,
            added_by: added_by.clone(),
            added_by_name,
        });
        if state.current.is_none() {
            state.start_track(0, now);
        }
        vec![
            Outbound::to_all(state.queue_message()),
            Outbound::to_all(state.sync_message(now)),
        ]
    }

    /// Remove a track. Only the host or the user who added it may remove;
    /// anyone else is a silent no-op.
    pub fn remove_track(&self, user_id: &UserId, track_id: &TrackId, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        let Some(index) = state.queue.iter().position(|t| &t.id == track_id) else {
            return Vec::new();
        };
        let is_host = state.host_id.as_ref() == Some(user_id);
        if !is_host && &state.queue[index].added_by != user_id {
            return Vec::new();
        }
        state.queue.remove(index);

        match state.current {
            Some(current) if index < current => {
                state.current = Some(current - 1);
            }
            Some(current) if index == current => {
                if state.queue.is_empty() {
                    state.stop_all();
                } else {
                    // Either the last track was removed (step back one) or a
                    // later track slid into this slot; both restart at zero.
                    let next = current.min(state.queue.len() - 1);
                    state.start_track(next, now);
                }
            }
            _ => {}
        }
        vec![
            Outbound::to_all(state.queue_message()),
            Outbound::to_all(state.sync_message(now)),
        ]
    }

    /// Resume a paused track, re-anchoring the virtual clock so the position
    /// continues from where it stopped.
    pub fn play(&self, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        if state.current.is_none() || state.playback == PlaybackState::Playing {
            return Vec::new();
        }
        state.started_at = now.saturating_sub((state.elapsed * 1000.0) as u64);
        state.playback = PlaybackState::Playing;
        vec![Outbound::to_all(state.sync_message(now))]
    }

    pub fn pause(&self, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        if state.playback != PlaybackState::Playing {
            return Vec::new();
        }
        state.elapsed = state.position(now);
        state.playback = PlaybackState::Paused;
        vec![Outbound::to_all(state.sync_message(now))]
    }

    pub fn seek(&self, time: f64, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        if state.current.is_none() {
            return Vec::new();
        }
        let time = time.max(0.0);
        match state.playback {
            PlaybackState::Playing => {
                state.started_at = now.saturating_sub((time * 1000.0) as u64);
            }
            PlaybackState::Paused => {
                state.elapsed = time;
            }
        }
        vec![Outbound::to_all(state.sync_message(now))]
    }

    /// Register a skip vote. Votes are a set, so re-voting is idempotent;
    /// reaching `ceil(users / 2)` advances to the next track.
    pub fn skip_vote(&self, user_id: &UserId, now: u64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        if state.current.is_none() {
            return Vec::new();
        }
        state.skip_votes.insert(user_id.clone());
        let current = state.skip_votes.len();
        let needed = state.skip_needed();
        let mut out = vec![Outbound::to_all(ServerMessage::SkipVotes { current, needed })];
        if current >= needed {
            state.next_track(now);
            out.push(Outbound::to_all(state.queue_message()));
            out.push(Outbound::to_all(state.sync_message(now)));
        }
        out
    }

    /// Relay a chat line to the whole room, sender included. Nothing is
    /// stored.
    pub fn chat(&self, user_id: &UserId, text: &str, now: u64) -> Vec<Outbound> {
        let state = self.shared.state.lock().unwrap();
        let text: String = text.trim().chars().take(MAX_CHAT_LEN).collect();
        if text.is_empty() {
            return Vec::new();
        }
        let Some(user) = state.users.get(user_id) else {
            return Vec::new();
        };
        vec![Outbound::to_all(ServerMessage::Chat {
            user_id: user_id.clone(),
            user_name: user.name.clone(),
            text,
            timestamp: now,
        })]
    }

    /// Store the room's crossfade setting, clamped to `[0, 8]` seconds. The
    /// server never acts on it; clients do.
    pub fn set_crossfade(&self, duration: f64) -> Vec<Outbound> {
        let mut state = self.shared.state.lock().unwrap();
        let duration = duration.max(0.0).min(MAX_CROSSFADE_SECS);
        state.crossfade = duration;
        vec![Outbound::to_all(ServerMessage::CrossfadeUpdated { duration })]
    }
}

impl State {
    /// Current track position in seconds under the virtual clock.
    fn position(&self, now: u64) -> f64 {
        match self.playback {
            PlaybackState::Playing => now.saturating_sub(self.started_at) as f64 / 1000.0,
            PlaybackState::Paused => self.elapsed,
        }
    }

    fn skip_needed(&self) -> usize {
        (self.users.len() + 1) / 2
    }

    fn start_track(&mut self, index: usize, now: u64) {
        self.current = Some(index);
        self.elapsed = 0.0;
        self.started_at = now;
        self.playback = PlaybackState::Playing;
        self.skip_votes.clear();
    }

    fn stop_all(&mut self) {
        self.current = None;
        self.playback = PlaybackState::Paused;
        self.elapsed = 0.0;
        self.skip_votes.clear();
    }

    fn next_track(&mut self, now: u64) {
        self.skip_votes.clear();
        match self.current {
            Some(current) if !self.queue.is_empty() && current + 1 < self.queue.len() => {
                self.start_track(current + 1, now);
            }
            _ => self.stop_all(),
        }
    }

    fn current_index(&self) -> i64 {
        self.current.map(|i| i as i64).unwrap_or(-1)
    }

    fn queue_message(&self) -> ServerMessage {
        ServerMessage::QueueUpdated {
            queue: self.queue.clone(),
            current_index: self.current_index(),
        }
    }

    fn sync_message(&self, now: u64) -> ServerMessage {
        ServerMessage::PlaybackSync {
            state: self.playback,
            current_index: self.current_index(),
            elapsed: self.position(now),
            timestamp: now,
            youtube_id: self.current.map(|i| self.queue[i].youtube_id.clone()),
        }
    }

    fn serialize(&self, shared: &Shared, now: u64) -> SerializedRoom {
        SerializedRoom {
            id: shared.id.clone(),
            name: shared.name.clone(),
            host_id: self.host_id.clone(),
            queue: self.queue.clone(),
            current_index: self.current_index(),
            playback_state: self.playback,
            elapsed: self.position(now),
            started_at: self.started_at,
            users: self
                .order
                .iter()
                .filter_map(|id| self.users.get(id).cloned())
                .collect(),
            skip_votes: self.skip_votes.len(),
            skip_needed: self.skip_needed(),
            crossfade_duration: self.crossfade,
        }
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        log::trace!("-room {}", self.id);
    }
}

fn sanitize_name(raw: &str) -> String {
    let name: String = raw.trim().chars().take(MAX_USER_NAME).collect();
    if name.is_empty() {
        "Anonymous".to_owned()
    } else {
        name
    }
}

/// Room names are trimmed, capped and defaulted at creation.
pub fn sanitize_room_name(raw: Option<&str>, id: &RoomId) -> String {
    let name: String = raw.unwrap_or("").trim().chars().take(MAX_ROOM_NAME).collect();
    if name.is_empty() {
        format!("Room {}", id)
    } else {
        name
    }
}
