// Not every test binary uses every helper.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use jukebox_relay::clock::Clock;
use jukebox_relay::messages::{ClientMessage, SerializedRoom, ServerMessage, Track};
use jukebox_relay::room::NewTrack;
use jukebox_relay::room_server::RoomServer;
use jukebox_relay::session::Session;

/// Wall clock under test control; starts at an arbitrary non-zero epoch so
/// subtraction bugs surface.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn advance(&self, ms: u64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: AtomicU64::new(1_000_000),
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub fn server() -> (RoomServer, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    (RoomServer::new(clock.clone()), clock)
}

/// A connected session plus the test's view of every frame delivered to it.
pub struct Tap {
    pub session: Session,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Tap {
    pub fn next(&mut self) -> Option<ServerMessage> {
        let frame = self.rx.try_recv().ok()?;
        Some(serde_json::from_str(&frame).expect("undecodable server frame"))
    }

    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Some(message) = self.next() {
            out.push(message);
        }
        out
    }

    /// Drop the receiving end so the next delivery to this session fails.
    pub fn hang_up(self) -> Session {
        self.session
    }
}

pub fn connect(server: &RoomServer) -> Tap {
    let (tx, rx) = mpsc::unbounded_channel();
    let session = server.connect(tx);
    Tap { session, rx }
}

/// Push a raw client frame through the wire decoder and into the engine,
/// the same path `web` takes.
pub fn send(server: &RoomServer, tap: &Tap, frame: serde_json::Value) {
    let message: ClientMessage = serde_json::from_value(frame).expect("undecodable client frame");
    server.handle_message(tap.session.id(), message);
}

/// Connect and join in one step, returning the tap with its `room:state`
/// already consumed, plus the assigned user ID and the snapshot itself.
pub fn join(server: &RoomServer, room_id: &str, name: &str) -> (Tap, String, SerializedRoom) {
    let mut tap = connect(server);
    send(
        server,
        &tap,
        serde_json::json!({"type": "join", "roomId": room_id, "userName": name}),
    );
    match tap.next() {
        Some(ServerMessage::RoomState { user_id, room }) => (tap, user_id, room),
        other => panic!("expected room:state, got {:?}", other),
    }
}

/// Last `queue:updated` in a batch of frames.
pub fn last_queue(messages: &[ServerMessage]) -> (Vec<Track>, i64) {
    messages
        .iter()
        .rev()
        .find_map(|m| match m {
            ServerMessage::QueueUpdated {
                queue,
                current_index,
            } => Some((queue.clone(), *current_index)),
            _ => None,
        })
        .expect("no queue:updated in batch")
}

pub fn add_track(server: &RoomServer, tap: &Tap, youtube_id: &str) {
    server.add_track(
        tap.session.id(),
        NewTrack {
            youtube_id: youtube_id.to_owned(),
            title: format!("Track {}", youtube_id),
            thumbnail: format!("https://img.youtube.com/vi/{}/mqdefault.jpg", youtube_id),
        },
    );
}
