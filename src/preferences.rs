use std::path::Path;

use crate::error::PoemError;
use crate::formats::Preferences;
use crate::json_store::{read_json, write_json_atomic};
use crate::selector::normalize_filter;

impl Preferences {
    pub fn load(path: &Path) -> Self {
        match read_json::<Preferences>(path) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => Self::default(),
            Err(err) => {
                tracing::warn!(%err, "ignoring unreadable preferences");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), PoemError> {
        write_json_atomic(path, self)
    }

    /// Explicit choice wins and is remembered; otherwise the saved genre.
    /// `all` clears the remembered genre.
    pub fn resolve_genre(&mut self, requested: Option<&str>) -> (Option<String>, bool) {
        let Some(requested) = requested else {
            return (self.last_genre.clone(), false);
        };
        let next = normalize_filter(Some(requested)).map(str::to_owned);
        let changed = next != self.last_genre;
        self.last_genre = next.clone();
        (next, changed)
    }
}
