use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

use crate::cli::GlobalArgs;
use crate::corpus_store::{CorpusStore, DEFAULT_ARCHIVE_URL, DEFAULT_CORPUS_DIR_NAME};
use crate::error::PoemError;
use crate::schedule::parse_trigger_time;

const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 900;
const DEFAULT_TRIGGER_AT: &str = "09:00";

#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub corpus_dir_name: String,
    pub archive_url: String,
    pub download_timeout: Duration,
    pub trigger_at: NaiveTime,
}

impl Settings {
    /// Command-line values win over `DAILYPOEM_*` environment variables,
    /// which win over built-in defaults.
    pub fn resolve(args: &GlobalArgs) -> Result<Self, PoemError> {
        let data_dir = args
            .data_dir
            .clone()
            .or_else(|| std::env::var("DAILYPOEM_DATA_DIR").ok())
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);

        let archive_url = args
            .archive_url
            .clone()
            .or_else(|| std::env::var("DAILYPOEM_ARCHIVE_URL").ok())
            .unwrap_or_else(|| DEFAULT_ARCHIVE_URL.to_owned());

        let download_timeout = match std::env::var("DAILYPOEM_DOWNLOAD_TIMEOUT_SECS") {
            Ok(raw) => Duration::from_secs(raw.trim().parse().map_err(|err| {
                PoemError::Config(format!("DAILYPOEM_DOWNLOAD_TIMEOUT_SECS={raw:?}: {err}"))
            })?),
            Err(_) => Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS),
        };

        let trigger_at = parse_trigger_time(
            &std::env::var("DAILYPOEM_TRIGGER_AT").unwrap_or_else(|_| DEFAULT_TRIGGER_AT.to_owned()),
        )?;

        Ok(Self {
            data_dir,
            corpus_dir_name: DEFAULT_CORPUS_DIR_NAME.to_owned(),
            archive_url,
            download_timeout,
            trigger_at,
        })
    }

    pub fn corpus_store(&self) -> CorpusStore {
        CorpusStore::new(&self.data_dir, &self.corpus_dir_name, &self.archive_url)
            .with_timeout(self.download_timeout)
    }

    pub fn today_cache_path(&self) -> PathBuf {
        self.data_dir.join("today.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.log")
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.data_dir.join("preferences.json")
    }

    pub fn trigger_state_path(&self) -> PathBuf {
        self.data_dir.join("last_trigger.json")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("dailypoem"))
        .unwrap_or_else(|| PathBuf::from("data"))
}
