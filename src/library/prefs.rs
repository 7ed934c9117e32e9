use std::collections::BTreeMap;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::foundation::error::{ConvertError, ConvertResult};
use crate::library::{atomic_write_json, read_json};

pub const FAVORITES_PLAYLIST: &str = "My Favorites";
pub const HIDDEN_PLAYLIST: &str = "Hidden folder";

/// Playlists that always exist, in display order.
pub const BUILTIN_PLAYLISTS: [&str; 2] = [FAVORITES_PLAYLIST, HIDDEN_PLAYLIST];

/// On-disk layout of `prefs.json`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PrefsData {
    #[serde(rename = "hasLaunchedBefore", default)]
    pub has_launched_before: bool,
    #[serde(rename = "isLoggedIn", default)]
    pub is_logged_in: bool,
    #[serde(rename = "SavedPlaylists", default)]
    pub saved_playlists: Vec<String>,
    /// Playlist name to saved-file ids.
    #[serde(rename = "playlistsMapping", default)]
    pub playlists_mapping: BTreeMap<String, Vec<String>>,
}

impl PrefsData {
    /// Insert missing built-in playlists at the front. Returns whether anything changed.
    pub fn ensure_builtin_playlists(&mut self) -> bool {
        let mut changed = false;
        for name in BUILTIN_PLAYLISTS {
            if !self.saved_playlists.iter().any(|p| p == name) {
                self.saved_playlists.insert(0, name.to_string());
                changed = true;
            }
        }
        changed
    }
}

/// Preferences store; same locking and write discipline as the library.
#[derive(Debug)]
pub struct Preferences {
    path: Option<PathBuf>,
    data: Mutex<PrefsData>,
}

impl Preferences {
    pub fn open(path: impl Into<PathBuf>) -> ConvertResult<Self> {
        let path = path.into();
        let mut data = read_json::<PrefsData>(&path)?.unwrap_or_default();
        data.ensure_builtin_playlists();
        Ok(Self {
            path: Some(path),
            data: Mutex::new(data),
        })
    }

    pub fn in_memory() -> Self {
        let mut data = PrefsData::default();
        data.ensure_builtin_playlists();
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    fn update<T>(&self, f: impl FnOnce(&mut PrefsData) -> T) -> ConvertResult<T> {
        let mut data = self.data.lock();
        let before = data.clone();
        let out = f(&mut data);
        if *data != before
            && let Some(path) = &self.path
            && let Err(e) = atomic_write_json(path, &*data)
        {
            *data = before;
            return Err(e);
        }
        Ok(out)
    }

    pub fn snapshot(&self) -> PrefsData {
        self.data.lock().clone()
    }

    pub fn has_launched_before(&self) -> bool {
        self.data.lock().has_launched_before
    }

    pub fn mark_launched(&self) -> ConvertResult<()> {
        self.update(|d| d.has_launched_before = true)
    }

    pub fn is_logged_in(&self) -> bool {
        self.data.lock().is_logged_in
    }

    pub fn set_logged_in(&self, logged_in: bool) -> ConvertResult<()> {
        self.update(|d| d.is_logged_in = logged_in)
    }

    pub fn playlists(&self) -> Vec<String> {
        self.data.lock().saved_playlists.clone()
    }

    /// Append a playlist. Returns `false` if one with that name already exists.
    pub fn create_playlist(&self, name: &str) -> ConvertResult<bool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ConvertError::validation("playlist name must not be empty"));
        }
        self.update(|d| {
            if d.saved_playlists.iter().any(|p| p == name) {
                return false;
            }
            d.saved_playlists.push(name.to_string());
            true
        })
    }

    /// Add `file_id` to `playlist`; adding an id that is already there changes nothing.
    pub fn add_file(&self, playlist: &str, file_id: &str) -> ConvertResult<bool> {
        self.require_playlist(playlist)?;
        self.update(|d| {
            let ids = d.playlists_mapping.entry(playlist.to_string()).or_default();
            if ids.iter().any(|id| id == file_id) {
                return false;
            }
            ids.push(file_id.to_string());
            true
        })
    }

    pub fn remove_file(&self, playlist: &str, file_id: &str) -> ConvertResult<bool> {
        self.update(|d| {
            let Some(ids) = d.playlists_mapping.get_mut(playlist) else {
                return false;
            };
            let before = ids.len();
            ids.retain(|id| id != file_id);
            ids.len() != before
        })
    }

    pub fn file_ids(&self, playlist: &str) -> ConvertResult<Vec<String>> {
        self.require_playlist(playlist)?;
        Ok(self
            .data
            .lock()
            .playlists_mapping
            .get(playlist)
            .cloned()
            .unwrap_or_default())
    }

    fn require_playlist(&self, playlist: &str) -> ConvertResult<()> {
        if self.data.lock().saved_playlists.iter().any(|p| p == playlist) {
            Ok(())
        } else {
            Err(ConvertError::validation(format!(
                "no playlist named '{playlist}'"
            )))
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/library/prefs.rs"]
mod tests;
