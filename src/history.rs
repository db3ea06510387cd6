use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};

use crate::error::PoemError;
use crate::formats::HistoryEntry;

/// Append-only, tab-delimited log of every poem shown. Never read back.
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &HistoryEntry) -> Result<(), PoemError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|err| PoemError::persistence(&self.path, err))?;
        }

        let line = format_line(entry);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| PoemError::persistence(&self.path, err))?;
        // One write per line keeps concurrent appends from interleaving.
        file.write_all(line.as_bytes())
            .map_err(|err| PoemError::persistence(&self.path, err))?;
        file.flush()
            .map_err(|err| PoemError::persistence(&self.path, err))?;
        Ok(())
    }
}

fn format_line(entry: &HistoryEntry) -> String {
    let fields = [
        &entry.timestamp,
        &entry.source_path,
        &entry.title,
        &entry.author,
        &entry.first_line,
    ];
    let mut line = fields
        .iter()
        .map(|field| sanitize_field(field))
        .collect::<Vec<_>>()
        .join("\t");
    line.push('\n');
    line
}

fn sanitize_field(field: &str) -> String {
    field
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(title: &str) -> HistoryEntry {
        HistoryEntry {
            timestamp: "2024-03-01T09:00:00+08:00".to_owned(),
            source_path: "全唐诗/poet.tang.0.json".to_owned(),
            title: title.to_owned(),
            author: "李白".to_owned(),
            first_line: "床前明月光，疑是地上霜。".to_owned(),
        }
    }

    #[test]
    fn line_has_five_tab_separated_fields() {
        let line = format_line(&entry("静夜思"));
        assert!(line.ends_with('\n'));
        let fields: Vec<&str> = line.trim_end().split('\t').collect();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[2], "静夜思");
    }

    #[test]
    fn embedded_tabs_and_newlines_are_flattened() {
        let line = format_line(&entry("a\tb\nc"));
        assert_eq!(line.matches('\t').count(), 4);
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn append_never_truncates() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let log = HistoryLog::new(temp.path().join("logs").join("history.log"));
        log.append(&entry("一"))?;
        log.append(&entry("二"))?;

        let contents = fs::read_to_string(log.path())?;
        let titles: Vec<&str> = contents
            .lines()
            .map(|line| line.split('\t').nth(2).unwrap_or_default())
            .collect();
        assert_eq!(titles, ["一", "二"]);
        Ok(())
    }
}
