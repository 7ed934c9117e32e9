//! Persisted saved files and user preferences.

/// Key-value preferences and playlists.
pub mod prefs;
/// Saved-file entities.
pub mod store;

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::encode::ffmpeg::ensure_parent_dir;
use crate::foundation::error::{ConvertError, ConvertResult};

/// Read a JSON document, or `None` when the file does not exist yet.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> ConvertResult<Option<T>> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConvertError::io(format!(
                "failed to read '{}': {e}",
                path.display()
            )));
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| ConvertError::serde(format!("'{}': {e}", path.display())))
}

/// Write `data` to a sibling temp file, sync it, then rename over `path`.
pub(crate) fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> ConvertResult<()> {
    let json = serde_json::to_vec_pretty(data).map_err(|e| ConvertError::serde(e.to_string()))?;
    ensure_parent_dir(path)?;
    let tmp = path.with_extension("json.tmp");
    let io_err =
        |e: std::io::Error| ConvertError::io(format!("failed to write '{}': {e}", path.display()));

    let mut file = std::fs::File::create(&tmp).map_err(io_err)?;
    file.write_all(&json).map_err(io_err)?;
    file.sync_all().map_err(io_err)?;
    drop(file);
    std::fs::rename(&tmp, path).map_err(io_err)
}
