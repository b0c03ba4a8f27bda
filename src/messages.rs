use serde::{Deserialize, Serialize};
use serde_json::Value;

pub type RoomId = String;
pub type UserId = String;
pub type TrackId = String;

/// One entry in a room's queue. `title` and `thumbnail` are opaque payload
/// carried for the clients; `added_by_name` is snapshotted at insertion and
/// never refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    pub youtube_id: String,
    pub title: String,
    pub thumbnail: String,
    #[serde(default)]
    pub duration: f64,
    pub added_by: UserId,
    pub added_by_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
}

/// Full room snapshot, sent to a client on join. `elapsed` is computed at
/// serialization time so a late joiner sees the live position.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRoom {
    pub id: RoomId,
    pub name: String,
    pub host_id: Option<UserId>,
    pub queue: Vec<Track>,
    pub current_index: i64,
    pub playback_state: PlaybackState,
    pub elapsed: f64,
    pub started_at: u64,
    pub users: Vec<User>,
    pub skip_votes: usize,
    pub skip_needed: usize,
    pub crossfade_duration: f64,
}

/// Messages decoded from client text frames. Anything that fails to decode
/// is dropped by the dispatcher, not answered.
///
/// `time`, `duration` and `text` are deliberately loose: clients may send
/// garbage there and the engine coerces instead of rejecting the frame.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join", rename_all = "camelCase")]
    Join {
        room_id: RoomId,
        #[serde(default)]
        user_name: Option<String>,
    },
    #[serde(rename = "queue:add")]
    QueueAdd { url: String },
    #[serde(rename = "queue:remove", rename_all = "camelCase")]
    QueueRemove { track_id: TrackId },
    #[serde(rename = "playback:play")]
    Play,
    #[serde(rename = "playback:pause")]
    Pause,
    #[serde(rename = "playback:skip")]
    Skip,
    #[serde(rename = "playback:seek")]
    Seek {
        #[serde(default)]
        time: Value,
    },
    #[serde(rename = "chat:message")]
    Chat {
        #[serde(default)]
        text: Value,
    },
    #[serde(rename = "crossfade:set")]
    Crossfade {
        #[serde(default)]
        duration: Value,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "room:state", rename_all = "camelCase")]
    RoomState {
        room: SerializedRoom,
        user_id: UserId,
    },
    #[serde(rename = "room:error")]
    RoomError { message: String },
    #[serde(rename = "queue:updated", rename_all = "camelCase")]
    QueueUpdated {
        queue: Vec<Track>,
        current_index: i64,
    },
    #[serde(rename = "playback:sync", rename_all = "camelCase")]
    PlaybackSync {
        state: PlaybackState,
        current_index: i64,
        elapsed: f64,
        timestamp: u64,
        youtube_id: Option<String>,
    },
    #[serde(rename = "user:joined")]
    UserJoined { user: User },
    #[serde(rename = "user:left", rename_all = "camelCase")]
    UserLeft { user_id: UserId },
    #[serde(rename = "skip:votes")]
    SkipVotes { current: usize, needed: usize },
    #[serde(rename = "chat:message", rename_all = "camelCase")]
    Chat {
        user_id: UserId,
        user_name: String,
        text: String,
        timestamp: u64,
    },
    #[serde(rename = "crossfade:updated")]
    CrossfadeUpdated { duration: f64 },
}
