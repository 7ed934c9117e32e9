use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use uuid::Uuid;

use crate::format::MediaKind;
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::library::{atomic_write_json, read_json};
use crate::request::ExportResult;

/// One saved export, as persisted in `library.json`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedFile {
    pub id: Uuid,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    pub file_name: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    #[serde(rename = "fileSizeKB")]
    pub file_size_kb: u64,
    /// `mm:ss`.
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_data: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_file_extension: Option<String>,
}

impl SavedFile {
    /// Local path behind [`SavedFile::file_url`].
    pub fn path(&self) -> PathBuf {
        let encoded = self.file_url.strip_prefix("file://").unwrap_or(&self.file_url);
        PathBuf::from(percent_decode_str(encoded).decode_utf8_lossy().into_owned())
    }
}

/// Everything needed to create a [`SavedFile`] except its id and size.
#[derive(Clone, Debug, PartialEq)]
pub struct NewSavedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: MediaKind,
    pub duration: String,
    pub image_data: Option<Vec<u8>>,
    pub image_file_extension: Option<String>,
}

impl NewSavedFile {
    /// Entity for a finished export; image exports carry their encoded bytes.
    pub fn from_export(
        result: &ExportResult,
        name: Option<&str>,
        duration: String,
    ) -> ConvertResult<Self> {
        let file_name = match name {
            Some(n) if !n.trim().is_empty() => n.trim().to_string(),
            _ => result.file_name().unwrap_or_default().to_string(),
        };
        let (image_data, image_file_extension) = if result.kind == MediaKind::Image {
            let bytes = std::fs::read(&result.path).map_err(|e| {
                ConvertError::io(format!("failed to read '{}': {e}", result.path.display()))
            })?;
            (Some(bytes), Some(result.format.extension().to_string()))
        } else {
            (None, None)
        };
        Ok(Self {
            path: result.path.clone(),
            file_name,
            kind: result.kind,
            duration,
            image_data,
            image_file_extension,
        })
    }
}

/// Bytes escaped in the path part of a `file://` URL; `/` stays literal.
const URL_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encoded `file://` URL for an absolute form of `path`.
pub fn file_url(path: &Path) -> ConvertResult<String> {
    let abs = std::path::absolute(path)
        .map_err(|e| ConvertError::io(format!("failed to resolve '{}': {e}", path.display())))?;
    let lossy = abs.to_string_lossy();
    let encoded = utf8_percent_encode(&lossy, URL_PATH);
    Ok(format!("file://{encoded}"))
}

/// Saved-file entities backed by a JSON file (or memory only).
///
/// Shared through `Arc`; every mutation rewrites the file atomically under the lock.
#[derive(Debug)]
pub struct LibraryStore {
    path: Option<PathBuf>,
    files: Mutex<Vec<SavedFile>>,
}

impl LibraryStore {
    /// Load `path`, starting empty when it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> ConvertResult<Self> {
        let path = path.into();
        let files = read_json::<Vec<SavedFile>>(&path)?.unwrap_or_default();
        tracing::debug!(path = %path.display(), count = files.len(), "library loaded");
        Ok(Self {
            path: Some(path),
            files: Mutex::new(files),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            path: None,
            files: Mutex::new(Vec::new()),
        }
    }

    fn persist(&self, files: &[SavedFile]) -> ConvertResult<()> {
        match &self.path {
            Some(path) => atomic_write_json(path, &files),
            None => Ok(()),
        }
    }

    /// Create a new entity with a fresh id. Saving the same output twice yields two entities.
    pub fn add_saved_file(&self, new: NewSavedFile) -> ConvertResult<SavedFile> {
        let meta = std::fs::metadata(&new.path).map_err(|e| {
            ConvertError::io(format!("cannot save '{}': {e}", new.path.display()))
        })?;
        let entity = SavedFile {
            id: Uuid::new_v4(),
            file_url: file_url(&new.path)?,
            file_name: new.file_name,
            kind: new.kind,
            file_size_kb: meta.len() / 1024,
            duration: new.duration,
            image_data: new.image_data,
            image_file_extension: new.image_file_extension,
        };

        let mut files = self.files.lock();
        files.push(entity.clone());
        if let Err(e) = self.persist(&files) {
            files.pop();
            return Err(e);
        }
        tracing::info!(id = %entity.id, name = %entity.file_name, "file saved");
        Ok(entity)
    }

    /// All entities in insertion order.
    pub fn fetch_saved_files(&self) -> Vec<SavedFile> {
        self.files.lock().clone()
    }

    pub fn get(&self, id: Uuid) -> Option<SavedFile> {
        self.files.lock().iter().find(|f| f.id == id).cloned()
    }

    /// Remove the entity; returns `false` when no entity had that id.
    pub fn delete_saved_file(&self, id: Uuid) -> ConvertResult<bool> {
        let mut files = self.files.lock();
        let Some(pos) = files.iter().position(|f| f.id == id) else {
            return Ok(false);
        };
        let removed = files.remove(pos);
        if let Err(e) = self.persist(&files) {
            files.insert(pos, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.files.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/library/store.rs"]
mod tests;
