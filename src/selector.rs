use chrono::NaiveDate;
use rand::Rng;
use rand::seq::SliceRandom as _;

use crate::error::PoemError;
use crate::formats::{HistoryEntry, Poem, TodaySelection};
use crate::history::HistoryLog;
use crate::loader::Corpus;
use crate::today_cache::TodayCache;

/// Owns the corpus and the poem-of-the-day state. Every poem it hands out
/// is recorded in the history log.
#[derive(Debug)]
pub struct PoemService<R> {
    corpus: Corpus,
    today: Option<TodaySelection>,
    history: HistoryLog,
    cache: TodayCache,
    rng: R,
    warnings: Vec<PoemError>,
}

impl<R: Rng> PoemService<R> {
    pub fn new(corpus: Corpus, history: HistoryLog, cache: TodayCache, rng: R) -> Self {
        Self {
            corpus,
            today: None,
            history,
            cache,
            rng,
            warnings: Vec::new(),
        }
    }

    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    pub fn today_selection(&self) -> Option<&TodaySelection> {
        self.today.as_ref()
    }

    /// Picks up a selection persisted earlier today, if any.
    pub fn restore(&mut self, today: NaiveDate) -> bool {
        match self.cache.load(today) {
            Some(selection) => {
                tracing::debug!(title = %selection.poem.title, "restored poem of the day");
                self.today = Some(selection);
                true
            }
            None => false,
        }
    }

    pub fn reload(&mut self, corpus: Corpus) {
        self.corpus = corpus;
        self.today = None;
    }

    /// Uniform draw over the poems matching `genre_filter`.
    pub fn random_poem(&mut self, genre_filter: Option<&str>) -> Option<Poem> {
        let genre_filter = normalize_filter(genre_filter);
        let poem = self
            .corpus
            .matching(genre_filter)
            .choose(&mut self.rng)
            .map(|poem| (*poem).clone())?;
        self.record(&poem);
        Some(poem)
    }

    pub fn today_poem(&mut self, genre_filter: Option<&str>) -> Option<Poem> {
        let today = chrono::Local::now().date_naive();
        self.today_poem_on(today, genre_filter)
    }

    /// Same poem for every call with the same `today` and filter; a new
    /// date or filter triggers a fresh draw.
    pub fn today_poem_on(&mut self, today: NaiveDate, genre_filter: Option<&str>) -> Option<Poem> {
        let genre_filter = normalize_filter(genre_filter);

        if let Some(selection) = &self.today
            && selection.is_valid_for(today, genre_filter)
        {
            let poem = selection.poem.clone();
            self.record(&poem);
            return Some(poem);
        }

        let poem = self.random_poem(genre_filter)?;
        let selection = TodaySelection {
            date: today,
            genre_filter: genre_filter.map(str::to_owned),
            poem: poem.clone(),
        };
        if let Err(err) = self.cache.save(&selection) {
            tracing::warn!(%err, "failed to persist poem of the day");
            self.warnings.push(err);
        }
        self.today = Some(selection);
        Some(poem)
    }

    /// Persistence failures since the last call. They never stop a poem
    /// from being returned.
    pub fn drain_warnings(&mut self) -> Vec<PoemError> {
        std::mem::take(&mut self.warnings)
    }

    fn record(&mut self, poem: &Poem) {
        let timestamp = chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, false);
        let entry = HistoryEntry::for_poem(poem, timestamp);
        if let Err(err) = self.history.append(&entry) {
            tracing::warn!(%err, "failed to append history");
            self.warnings.push(err);
        }
    }
}

/// Blank filters and `all` mean "no filter".
pub fn normalize_filter(genre_filter: Option<&str>) -> Option<&str> {
    genre_filter
        .map(str::trim)
        .filter(|filter| !filter.is_empty() && !filter.eq_ignore_ascii_case("all"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_filter_drops_blank_and_all() {
        assert_eq!(normalize_filter(None), None);
        assert_eq!(normalize_filter(Some("  ")), None);
        assert_eq!(normalize_filter(Some("ALL")), None);
        assert_eq!(normalize_filter(Some(" 宋词 ")), Some("宋词"));
    }
}
