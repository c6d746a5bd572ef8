//! kicker-match
//!
//! Match state reconciliation engine for a sensor-equipped football table.
//!
//! - `state` holds the explicit match state machine. Pure, no IO, no clock.
//! - `checkpoint` is the "already consumed" boundary over the sensor log.
//! - `ports` are the seams to the outside world: the sensor event source,
//!   the match record store and the notification fan-out.
//! - `controller` owns the single `MatchState` behind one lock and drives
//!   reconciliation and the match lifecycle through the ports.

mod checkpoint;
mod controller;
mod error;
mod ports;
mod state;
mod types;

pub use checkpoint::{Admission, Checkpoint};
pub use controller::{
    system_clock, validate_rosters, Clock, MatchController, ReconcileOutcome, ScoreReport,
    MAX_PUSH_SKEW_SECS,
};
pub use error::MatchError;
pub use ports::{
    EventOrder, EventQuery, EventSource, FinalScore, MatchStore, NewMatchRecord, Notifier,
};
pub use state::{MatchState, OpenMatch, ReconcileCursor};
pub use types::*;
