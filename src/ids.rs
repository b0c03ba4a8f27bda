use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;

/// URL-safe alphabet shared by every generated ID.
const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

pub const ROOM_ID_LEN: usize = 8;
pub const USER_ID_LEN: usize = 10;
pub const TRACK_ID_LEN: usize = 8;

/// Generates opaque random IDs, unique for the lifetime of the process.
#[derive(Debug, Default)]
pub struct IdGenerator {
    issued: Mutex<HashSet<String>>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_id(&self) -> String {
        self.generate(ROOM_ID_LEN)
    }

    pub fn user_id(&self) -> String {
        self.generate(USER_ID_LEN)
    }

    pub fn track_id(&self) -> String {
        self.generate(TRACK_ID_LEN)
    }

    fn generate(&self, len: usize) -> String {
        let mut issued = self.issued.lock().unwrap();
        loop {
            let id = random_id(len);
            if issued.insert(id.clone()) {
                return id;
            }
        }
    }
}

fn random_id(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| CHARS[rng.gen_range(0..CHARS.len())] as char)
        .collect()
}
