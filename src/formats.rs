use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const UNTITLED: &str = "无题";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub paragraphs: Vec<String>,
    pub source_path: String,
    pub genre: String,
}

impl Poem {
    #[must_use]
    pub fn first_line(&self) -> &str {
        self.paragraphs.first().map(String::as_str).unwrap_or_default()
    }

    /// Plain-text rendering: title, author, blank line, verse lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title);
        out.push('\n');
        out.push_str(&self.author);
        out.push_str("\n\n");
        for line in &self.paragraphs {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Shape of a record inside a corpus JSON file. Only `paragraphs` is
/// validated strictly; see `loader`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPoemRecord {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub rhythmic: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub paragraphs: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodaySelection {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre_filter: Option<String>,
    pub poem: Poem,
}

impl TodaySelection {
    #[must_use]
    pub fn is_valid_for(&self, today: NaiveDate, genre_filter: Option<&str>) -> bool {
        self.date == today && self.genre_filter.as_deref() == genre_filter
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: String,
    pub source_path: String,
    pub title: String,
    pub author: String,
    pub first_line: String,
}

impl HistoryEntry {
    #[must_use]
    pub fn for_poem(poem: &Poem, timestamp: String) -> Self {
        Self {
            timestamp,
            source_path: poem.source_path.clone(),
            title: poem.title.clone(),
            author: poem.author.clone(),
            first_line: poem.first_line().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_genre: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<NaiveDate>,
}
