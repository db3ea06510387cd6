use std::path::PathBuf;

use chrono::{NaiveDateTime, NaiveTime};
use rand::Rng;

use crate::error::PoemError;
use crate::formats::{Poem, TriggerState};
use crate::json_store::{read_json, write_json_atomic};
use crate::selector::PoemService;

/// Parses a wall-clock trigger time such as `09:00`.
pub fn parse_trigger_time(value: &str) -> Result<NaiveTime, PoemError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|err| PoemError::Config(format!("trigger time {value:?} (expected HH:MM): {err}")))
}

/// Fires at most once per calendar day, at or after `at`. The last fired
/// date is persisted so restarts do not fire again.
#[derive(Debug, Clone)]
pub struct DailyTrigger {
    at: NaiveTime,
    state_path: PathBuf,
    state: TriggerState,
}

impl DailyTrigger {
    pub fn new(at: NaiveTime, state_path: impl Into<PathBuf>) -> Self {
        let state_path = state_path.into();
        let state = match read_json::<TriggerState>(&state_path) {
            Ok(state) => state.unwrap_or_default(),
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable trigger state");
                TriggerState::default()
            }
        };
        Self {
            at,
            state_path,
            state,
        }
    }

    pub fn state(&self) -> &TriggerState {
        &self.state
    }

    pub fn is_due(&self, now: NaiveDateTime) -> bool {
        self.state.last_triggered != Some(now.date()) && now.time() >= self.at
    }

    pub fn poll<R: Rng>(
        &mut self,
        now: NaiveDateTime,
        service: &mut PoemService<R>,
        genre_filter: Option<&str>,
    ) -> Option<Poem> {
        if !self.is_due(now) {
            return None;
        }

        let Some(poem) = service.today_poem_on(now.date(), genre_filter) else {
            tracing::warn!(date = %now.date(), "corpus is empty; daily trigger stays due");
            return None;
        };
        self.state.last_triggered = Some(now.date());
        if let Err(err) = write_json_atomic(&self.state_path, &self.state) {
            tracing::warn!(%err, "failed to persist trigger state");
        }
        tracing::info!(date = %now.date(), "daily trigger fired");
        Some(poem)
    }
}
