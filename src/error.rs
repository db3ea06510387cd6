use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoemError {
    /// Network or HTTP failure while downloading the corpus archive.
    #[error("fetch corpus archive from {url}: {message}")]
    Fetch { url: String, message: String },

    /// The archive is corrupt or could not be unpacked into place.
    #[error("extract corpus archive: {message}")]
    Extract { message: String },

    /// A single poem file could not be read or parsed.
    #[error("parse poem file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Writing the history log or a state file failed.
    #[error("persist {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PoemError {
    pub(crate) fn fetch(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Fetch {
            url: url.to_owned(),
            message: err.to_string(),
        }
    }

    pub(crate) fn extract(err: impl std::fmt::Display) -> Self {
        Self::Extract {
            message: err.to_string(),
        }
    }

    pub(crate) fn parse(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }

    pub(crate) fn persistence(path: &Path, err: impl std::fmt::Display) -> Self {
        Self::Persistence {
            path: path.to_path_buf(),
            message: err.to_string(),
        }
    }
}
