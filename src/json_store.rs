use std::fs;
use std::path::Path;

use crate::error::PoemError;

/// Reads a small JSON state file. A missing file is `Ok(None)`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, PoemError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(PoemError::persistence(path, err)),
    };
    let value = serde_json::from_slice(&bytes)
        .map_err(|err| PoemError::persistence(path, format!("parse json: {err}")))?;
    Ok(Some(value))
}

/// Writes `value` next to `path` under a unique name, then renames it over
/// `path` so readers only ever see a complete file.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), PoemError> {
    let parent = path
        .parent()
        .ok_or_else(|| PoemError::persistence(path, "path has no parent"))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent).map_err(|err| {
            PoemError::persistence(path, format!("create parent dir {}: {err}", parent.display()))
        })?;
    }

    let tmp_path = path.with_extension(format!("tmp.{}", uuid::Uuid::new_v4().simple()));
    let data = serde_json::to_vec_pretty(value)
        .map_err(|err| PoemError::persistence(path, format!("serialize json: {err}")))?;
    fs::write(&tmp_path, &data).map_err(|err| {
        PoemError::persistence(path, format!("write tmp {}: {err}", tmp_path.display()))
    })?;
    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(PoemError::persistence(
            path,
            format!("rename tmp to final: {err}"),
        ));
    }
    Ok(())
}
