//! Deadline-bounded polling timer

use std::pin::Pin;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant, Sleep};

/// Delay before the first attempt
const FIRST_ATTEMPT_DELAY: Duration = Duration::from_millis(1);

/// Races a fixed polling interval against an overall deadline.
///
/// The deadline is computed once, when the timer is created. The first
/// attempt is due almost immediately; every later attempt is due one
/// interval after the previous [`PollTimer::tick`] returned, so the time
/// spent in an attempt never shortens the gap before the next one. When both
/// are due at once the deadline wins.
pub struct PollTimer {
    deadline: Pin<Box<Sleep>>,
    interval: Duration,
    next_attempt: Option<Instant>,
}

impl PollTimer {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            deadline: Box::pin(sleep(timeout)),
            interval,
            next_attempt: Some(Instant::now() + FIRST_ATTEMPT_DELAY),
        }
    }

    /// Wait for the next attempt.
    ///
    /// Returns `false` once the deadline has passed; the caller must stop
    /// polling and report a timeout.
    pub async fn tick(&mut self) -> bool {
        let due = self
            .next_attempt
            .take()
            .unwrap_or_else(|| Instant::now() + self.interval);

        tokio::select! {
            biased;
            _ = &mut self.deadline => false,
            _ = sleep_until(due) => true,
        }
    }
}
