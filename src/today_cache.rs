use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::PoemError;
use crate::formats::TodaySelection;
use crate::json_store::{read_json, write_json_atomic};

/// Persists the poem of the day so a restarted process can reuse it.
#[derive(Debug, Clone)]
pub struct TodayCache {
    path: PathBuf,
}

impl TodayCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, selection: &TodaySelection) -> Result<(), PoemError> {
        write_json_atomic(&self.path, selection)
    }

    /// Stale, missing and unreadable caches all come back as `None`.
    pub fn load(&self, today: NaiveDate) -> Option<TodaySelection> {
        let selection = match read_json::<TodaySelection>(&self.path) {
            Ok(Some(selection)) => selection,
            Ok(None) => {
                tracing::debug!(path = %self.path.display(), "no today cache");
                return None;
            }
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable today cache");
                return None;
            }
        };

        if selection.date != today {
            tracing::debug!(cached = %selection.date, %today, "today cache is stale");
            return None;
        }
        Some(selection)
    }
}
