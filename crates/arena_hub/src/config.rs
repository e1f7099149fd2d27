//! Hub tuning knobs.

use crate::HubConfigError;
use derive_getters::Getters;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Longest accepted read deadline, one day.
pub const MAX_PONG_WAIT_SECS: u64 = 86_400;
/// Longest accepted write deadline, one hour.
pub const MAX_WRITE_WAIT_SECS: u64 = 3_600;

/// Limits and timings for the hub and its clients.
///
/// Passed by value to [`Hub::new`](crate::Hub::new); there is no global
/// configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters, Setters)]
#[serde(default)]
#[setters(prefix = "with_")]
pub struct HubConfig {
    /// Outbound messages buffered per client before it is dropped.
    queue_capacity: usize,
    /// Pending register/unregister/broadcast events.
    inbox_capacity: usize,
    /// Maximum chat content length in characters.
    max_content_chars: usize,
    /// Maximum inbound frame size in bytes.
    max_frame_bytes: usize,
    /// Seconds of inbound silence before a client is considered dead.
    pong_wait_secs: u64,
    /// Seconds allowed for a single outbound write.
    write_wait_secs: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            inbox_capacity: 1024,
            max_content_chars: 200,
            max_frame_bytes: 1024,
            pong_wait_secs: 60,
            write_wait_secs: 10,
        }
    }
}

impl HubConfig {
    /// Checks that every value is usable.
    ///
    /// Capacities, limits and deadlines must be at least 1, and deadlines
    /// at most [`MAX_PONG_WAIT_SECS`] and [`MAX_WRITE_WAIT_SECS`].
    ///
    /// # Errors
    ///
    /// [`HubConfigError`] naming the first offending field.
    pub fn validate(&self) -> Result<(), HubConfigError> {
        let at_least_one = [
            ("queue_capacity", self.queue_capacity as u64),
            ("inbox_capacity", self.inbox_capacity as u64),
            ("max_content_chars", self.max_content_chars as u64),
            ("max_frame_bytes", self.max_frame_bytes as u64),
            ("pong_wait_secs", self.pong_wait_secs),
            ("write_wait_secs", self.write_wait_secs),
        ];
        if let Some((field, _)) = at_least_one.iter().find(|(_, value)| *value == 0) {
            return Err(HubConfigError::new(format!("{} must be at least 1", field)));
        }
        if self.pong_wait_secs > MAX_PONG_WAIT_SECS {
            return Err(HubConfigError::new(format!(
                "pong_wait_secs must be at most {}, got {}",
                MAX_PONG_WAIT_SECS, self.pong_wait_secs
            )));
        }
        if self.write_wait_secs > MAX_WRITE_WAIT_SECS {
            return Err(HubConfigError::new(format!(
                "write_wait_secs must be at most {}, got {}",
                MAX_WRITE_WAIT_SECS, self.write_wait_secs
            )));
        }
        Ok(())
    }

    /// Read deadline, clamped to 1..=[`MAX_PONG_WAIT_SECS`] seconds.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs.clamp(1, MAX_PONG_WAIT_SECS))
    }

    /// Keepalive interval, nine tenths of the read deadline.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait() / 10 * 9
    }

    /// Per-write deadline, clamped to 1..=[`MAX_WRITE_WAIT_SECS`] seconds.
    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs.clamp(1, MAX_WRITE_WAIT_SECS))
    }
}
