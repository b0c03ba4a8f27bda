use std::time::{SystemTime, UNIX_EPOCH};

/// Source of wall-clock time for all playback math.
///
/// Every component takes the clock as a trait object so tests can drive a
/// manual one; production uses [`SystemClock`].
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch, non-decreasing.
    fn now_ms(&self) -> u64;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
