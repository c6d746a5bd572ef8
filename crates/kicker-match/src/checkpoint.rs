//! Sensor-log consumption checkpoint.
//!
//! # Invariants
//!
//! - **Non-decreasing**: the checkpoint only ever moves forward. An advance to
//!   an earlier or equal time is a no-op.
//! - **Strictly-after admission**: an event is unseen only if its timestamp is
//!   strictly greater than the checkpoint. Everything at or before it is
//!   treated as consumed, whether or not it was ever acted upon.
//! - **Pure, no IO**: the caller supplies every timestamp.

use crate::{SensorEvent, Timestamp};

/// Result of checking a [`SensorEvent`] against the checkpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Event is strictly after the checkpoint and may be applied.
    Unseen,

    /// Event is at or before the checkpoint and is permanently ignored.
    Consumed {
        checkpoint: Timestamp,
        got: Timestamp,
    },
}

impl Admission {
    pub fn is_unseen(&self) -> bool {
        matches!(self, Admission::Unseen)
    }
}

/// Timestamp boundary up to which the sensor log has been consumed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    last_consumed: Timestamp,
}

impl Checkpoint {
    /// Start consuming strictly after `ts` (typically the match open time).
    pub fn starting_at(ts: Timestamp) -> Self {
        Self { last_consumed: ts }
    }

    /// Admission check. Does not move the checkpoint.
    pub fn check(&self, event: &SensorEvent) -> Admission {
        if event.timestamp > self.last_consumed {
            Admission::Unseen
        } else {
            Admission::Consumed {
                checkpoint: self.last_consumed,
                got: event.timestamp,
            }
        }
    }

    /// Move the checkpoint forward to `ts`.
    ///
    /// Returns `true` if it moved. Earlier timestamps are ignored so a clock
    /// adjustment in the source can never rewind consumption.
    pub fn advance_to(&mut self, ts: Timestamp) -> bool {
        if ts > self.last_consumed {
            self.last_consumed = ts;
            true
        } else {
            false
        }
    }

    pub fn last_consumed(&self) -> Timestamp {
        self.last_consumed
    }
}
