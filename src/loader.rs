use std::collections::BTreeMap;
use std::path::{Component, Path};

use crate::error::PoemError;
use crate::formats::{Poem, RawPoemRecord, UNTITLED};

/// Filename prefixes of poem data files in the chinese-poetry corpus, e.g.
/// `全唐诗/poet.tang.0.json`, `宋词/ci.song.0.json`, `诗经/shijing.json`,
/// `元曲/yuanqu.json`, `五代诗词/huajianji/huajianji-1-juan.json`.
pub const POEM_FILE_PREFIXES: &[&str] = &[
    "poet", "poetry", "poetrys", "ci", "song", "tang", "yuan", "yuanqu", "ming", "qing",
    "shijing", "chuci", "lunyu", "wudai", "huajianji", "caocao", "nalan",
];

/// All loaded poems, keyed by genre.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    genres: BTreeMap<String, Vec<Poem>>,
}

impl Corpus {
    pub fn from_poems(poems: impl IntoIterator<Item = Poem>) -> Self {
        let mut genres: BTreeMap<String, Vec<Poem>> = BTreeMap::new();
        for poem in poems {
            genres.entry(poem.genre.clone()).or_default().push(poem);
        }
        Self { genres }
    }

    pub fn len(&self) -> usize {
        self.genres.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.genres.values().all(Vec::is_empty)
    }

    /// Genre names with their poem counts, in sorted order.
    pub fn genres(&self) -> impl Iterator<Item = (&str, usize)> {
        self.genres
            .iter()
            .map(|(genre, poems)| (genre.as_str(), poems.len()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Poem> {
        self.genres.values().flatten()
    }

    /// Poems whose `source_path` or `genre` contains `filter`
    /// (case-insensitive). Falls back to every poem when nothing matches.
    pub fn matching(&self, filter: Option<&str>) -> Vec<&Poem> {
        let Some(filter) = filter else {
            return self.iter().collect();
        };
        let needle = filter.to_lowercase();
        let matched: Vec<&Poem> = self
            .iter()
            .filter(|poem| {
                poem.source_path.to_lowercase().contains(&needle)
                    || poem.genre.to_lowercase().contains(&needle)
            })
            .collect();
        if matched.is_empty() {
            tracing::debug!(filter, "genre filter matched nothing; using whole corpus");
            return self.iter().collect();
        }
        matched
    }
}

/// Walks `root` and parses every recognized poem file. Files that fail to
/// parse are logged and skipped.
pub fn load(root: &Path) -> Corpus {
    let mut poems = Vec::new();
    let mut files = 0usize;
    let mut skipped = 0usize;

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(?err, "walk corpus");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !is_poem_file_name(name) {
            continue;
        }

        match load_file(root, entry.path()) {
            Ok(file_poems) => {
                files += 1;
                poems.extend(file_poems);
            }
            Err(err) => {
                skipped += 1;
                tracing::warn!(%err, "skipping poem file");
            }
        }
    }

    let corpus = Corpus::from_poems(poems);
    if corpus.is_empty() {
        tracing::warn!(root = %root.display(), "no poems loaded from corpus");
    } else {
        tracing::info!(
            poems = corpus.len(),
            files,
            skipped,
            genres = corpus.genres.len(),
            "corpus loaded"
        );
    }
    corpus
}

/// Parses one poem file. Records without a non-empty list of string
/// `paragraphs` are dropped.
pub fn load_file(root: &Path, path: &Path) -> Result<Vec<Poem>, PoemError> {
    let bytes = std::fs::read(path).map_err(|err| PoemError::parse(path, err))?;
    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|err| PoemError::parse(path, err))?;

    let records = match value {
        serde_json::Value::Array(items) => items,
        object @ serde_json::Value::Object(_) => vec![object],
        _ => return Err(PoemError::parse(path, "expected a JSON array of poems")),
    };

    let source_path = relative_source_path(root, path);
    let genre = genre_for(root, path);

    let total = records.len();
    let poems: Vec<Poem> = records
        .into_iter()
        .filter_map(|item| serde_json::from_value::<RawPoemRecord>(item).ok())
        .filter_map(|record| poem_from_record(record, &source_path, &genre))
        .collect();

    if poems.len() < total {
        tracing::debug!(
            path = %path.display(),
            dropped = total - poems.len(),
            "dropped records without paragraphs"
        );
    }
    Ok(poems)
}

fn poem_from_record(record: RawPoemRecord, source_path: &str, genre: &str) -> Option<Poem> {
    let paragraphs = match record.paragraphs? {
        serde_json::Value::Array(lines) if !lines.is_empty() => lines
            .into_iter()
            .map(|line| match line {
                serde_json::Value::String(line) => Some(line),
                _ => None,
            })
            .collect::<Option<Vec<String>>>()?,
        _ => return None,
    };

    let title = [record.title, record.rhythmic]
        .into_iter()
        .flatten()
        .find(|title| !title.trim().is_empty())
        .unwrap_or_else(|| UNTITLED.to_owned());

    Some(Poem {
        title,
        author: record.author.unwrap_or_default(),
        paragraphs,
        source_path: source_path.to_owned(),
        genre: genre.to_owned(),
    })
}

/// `<prefix>.json`, `<prefix>.<anything>.json` or `<prefix>-<anything>.json`
/// with a recognized prefix and no `author*` segment.
pub fn is_poem_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    let Some(stem) = lower.strip_suffix(".json") else {
        return false;
    };
    let segments: Vec<&str> = stem.split(['.', '-']).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return false;
    }
    if segments.iter().any(|s| s.starts_with("author")) {
        return false;
    }
    POEM_FILE_PREFIXES.contains(&segments[0])
}

fn file_prefix(name: &str) -> &str {
    name.split(['.', '-']).next().unwrap_or_default()
}

fn relative_source_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// First directory under the corpus root, or the filename prefix for files
/// that sit directly in it.
fn genre_for(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let mut components = rel.components().filter_map(|c| match c {
        Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
        _ => None,
    });
    let first = components.next().unwrap_or_default();
    if components.next().is_some() {
        return first;
    }
    file_prefix(&first).to_owned()
}
