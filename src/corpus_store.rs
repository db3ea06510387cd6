use std::fs::{self, File};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::USER_AGENT;
use url::Url;

use crate::error::PoemError;

pub const DEFAULT_ARCHIVE_URL: &str =
    "https://github.com/chinese-poetry/chinese-poetry/archive/refs/heads/master.zip";
pub const DEFAULT_CORPUS_DIR_NAME: &str = "chinese-poetry-master";

const DOWNLOAD_PREFIX: &str = ".corpus-download-";
const STAGING_PREFIX: &str = ".corpus-staging-";
const BACKUP_PREFIX: &str = ".corpus-old-";

/// Owns the extracted corpus directory under `data_dir`. Nothing else writes
/// inside it.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    data_dir: PathBuf,
    corpus_dir: PathBuf,
    archive_url: String,
    timeout: Duration,
}

impl CorpusStore {
    pub fn new(
        data_dir: impl Into<PathBuf>,
        corpus_dir_name: &str,
        archive_url: impl Into<String>,
    ) -> Self {
        let data_dir = data_dir.into();
        let corpus_dir = data_dir.join(corpus_dir_name);
        Self {
            data_dir,
            corpus_dir,
            archive_url: archive_url.into(),
            timeout: Duration::from_secs(900),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    pub fn is_available(&self) -> bool {
        match fs::read_dir(&self.corpus_dir) {
            Ok(mut entries) => entries.next().is_some(),
            Err(_) => false,
        }
    }

    /// Returns the corpus directory, downloading and extracting the archive
    /// first if it is not present yet.
    pub fn ensure_available(&self) -> Result<PathBuf, PoemError> {
        if self.is_available() {
            tracing::debug!(corpus_dir = %self.corpus_dir.display(), "corpus already available");
            return Ok(self.corpus_dir.clone());
        }

        tracing::info!(
            url = %self.archive_url,
            corpus_dir = %self.corpus_dir.display(),
            "corpus not found locally; downloading"
        );
        self.fetch()?;
        Ok(self.corpus_dir.clone())
    }

    /// Downloads the archive again and swaps it in over the existing corpus.
    pub fn refresh(&self) -> Result<PathBuf, PoemError> {
        tracing::info!(url = %self.archive_url, "refreshing corpus");
        self.fetch()?;
        Ok(self.corpus_dir.clone())
    }

    fn fetch(&self) -> Result<(), PoemError> {
        fs::create_dir_all(&self.data_dir).map_err(|err| {
            PoemError::extract(format!(
                "create data dir {}: {err}",
                self.data_dir.display()
            ))
        })?;
        self.sweep_leftovers();

        let archive = self.download()?;

        let staging = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempdir_in(&self.data_dir)
            .map_err(|err| PoemError::extract(format!("create staging dir: {err}")))?;
        let unpacked = staging.path().join("unpacked");
        extract_archive(archive.path(), &unpacked)?;

        let root = extracted_root(&unpacked)?;
        self.swap_into_place(&root)?;

        tracing::info!(corpus_dir = %self.corpus_dir.display(), "corpus extracted");
        Ok(())
    }

    /// Removes downloads, staging dirs and backups left by a fetch that was
    /// killed before its temp files were dropped.
    fn sweep_leftovers(&self) {
        let entries = match fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(?err, data_dir = %self.data_dir.display(), "list data dir");
                return;
            }
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if ![DOWNLOAD_PREFIX, STAGING_PREFIX, BACKUP_PREFIX]
                .iter()
                .any(|prefix| name.starts_with(prefix))
            {
                continue;
            }

            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => fs::remove_dir_all(&path),
                _ => fs::remove_file(&path),
            };
            match removed {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "removed leftover from interrupted fetch");
                }
                Err(err) => tracing::warn!(?err, path = %path.display(), "remove leftover"),
            }
        }
    }

    fn download(&self) -> Result<tempfile::NamedTempFile, PoemError> {
        let url = Url::parse(&self.archive_url)
            .map_err(|err| PoemError::fetch(&self.archive_url, format!("parse url: {err}")))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(PoemError::fetch(
                &self.archive_url,
                "archive url must be http/https",
            ));
        }

        let client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .timeout(self.timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| PoemError::fetch(&self.archive_url, format!("build client: {err}")))?;

        let mut response = client
            .get(url)
            .header(USER_AGENT, concat!("dailypoem/", env!("CARGO_PKG_VERSION")))
            .send()
            .map_err(|err| PoemError::fetch(&self.archive_url, err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(PoemError::fetch(
                &self.archive_url,
                format!("unexpected status {status}"),
            ));
        }

        let mut file = tempfile::Builder::new()
            .prefix(DOWNLOAD_PREFIX)
            .suffix(".zip")
            .tempfile_in(&self.data_dir)
            .map_err(|err| PoemError::fetch(&self.archive_url, format!("create tmp: {err}")))?;
        let bytes = response
            .copy_to(file.as_file_mut())
            .map_err(|err| PoemError::fetch(&self.archive_url, format!("read body: {err}")))?;
        file.as_file_mut()
            .flush()
            .map_err(|err| PoemError::fetch(&self.archive_url, format!("flush tmp: {err}")))?;

        tracing::info!(bytes, "downloaded corpus archive");
        Ok(file)
    }

    fn swap_into_place(&self, new_root: &Path) -> Result<(), PoemError> {
        if !self.corpus_dir.exists() {
            return fs::rename(new_root, &self.corpus_dir).map_err(|err| {
                PoemError::extract(format!(
                    "move corpus into place {}: {err}",
                    self.corpus_dir.display()
                ))
            });
        }

        let backup = self
            .data_dir
            .join(format!("{BACKUP_PREFIX}{}", uuid::Uuid::new_v4().simple()));
        fs::rename(&self.corpus_dir, &backup)
            .map_err(|err| PoemError::extract(format!("move old corpus aside: {err}")))?;

        if let Err(err) = fs::rename(new_root, &self.corpus_dir) {
            let _ = fs::rename(&backup, &self.corpus_dir);
            return Err(PoemError::extract(format!(
                "move corpus into place {}: {err}",
                self.corpus_dir.display()
            )));
        }

        if let Err(err) = fs::remove_dir_all(&backup) {
            tracing::warn!(?err, path = %backup.display(), "remove old corpus");
        }
        Ok(())
    }
}

fn extract_archive(archive_path: &Path, dest: &Path) -> Result<(), PoemError> {
    let file = File::open(archive_path)
        .map_err(|err| PoemError::extract(format!("open archive: {err}")))?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|err| PoemError::extract(format!("read archive: {err}")))?;
    if archive.is_empty() {
        return Err(PoemError::extract("archive is empty"));
    }

    fs::create_dir_all(dest)
        .map_err(|err| PoemError::extract(format!("create {}: {err}", dest.display())))?;
    archive
        .extract(dest)
        .map_err(|err| PoemError::extract(format!("unpack archive: {err}")))?;

    tracing::debug!(entries = archive.len(), "archive unpacked");
    Ok(())
}

/// GitHub archives wrap everything in a single `<repo>-<branch>/` directory;
/// treat that directory as the corpus root when present.
fn extracted_root(unpacked: &Path) -> Result<PathBuf, PoemError> {
    let entries = fs::read_dir(unpacked)
        .map_err(|err| PoemError::extract(format!("list {}: {err}", unpacked.display())))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| PoemError::extract(format!("list {}: {err}", unpacked.display())))?;

    match entries.as_slice() {
        [] => Err(PoemError::extract("archive contains no files")),
        [only] if only.path().is_dir() => Ok(only.path()),
        _ => Ok(unpacked.to_path_buf()),
    }
}
