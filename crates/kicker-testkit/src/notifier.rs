use std::sync::Mutex;

use kicker_match::{MatchEvent, Notifier};

/// Notifier that keeps every broadcast in order.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<MatchEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MatchEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MatchEvent::MatchStarted { .. }))
            .count()
    }

    pub fn score_updates(&self) -> Vec<(u32, u32)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                MatchEvent::ScoreUpdated {
                    home_score,
                    away_score,
                    ..
                } => Some((*home_score, *away_score)),
                MatchEvent::MatchStarted { .. } => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn broadcast(&self, event: &MatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
