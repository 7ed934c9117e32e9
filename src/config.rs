//! Runtime settings.
//!
//! Settings come from an optional JSON file (every field has a default) and a handful of
//! `AVCONVERT_*` environment variables that override the file.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use crate::{
    effects::blur::MAX_BLUR_RADIUS,
    foundation::core::Resolution,
    foundation::error::{ConvertError, ConvertResult},
    request::ExportPreset,
};

pub const ENV_FFMPEG: &str = "AVCONVERT_FFMPEG";
pub const ENV_FFPROBE: &str = "AVCONVERT_FFPROBE";
pub const ENV_OUTPUT_DIR: &str = "AVCONVERT_OUTPUT_DIR";

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// `ffmpeg` executable; a bare name is looked up on `PATH`.
    pub ffmpeg_bin: PathBuf,
    /// `ffprobe` executable; a bare name is looked up on `PATH`.
    pub ffprobe_bin: PathBuf,
    /// Directory receiving every export.
    pub output_dir: PathBuf,
    /// Saved-file store.
    pub library_path: PathBuf,
    /// Preferences and playlists.
    pub prefs_path: PathBuf,
    /// Amplitude count produced for waveform displays.
    pub waveform_samples: usize,
    /// LAME VBR quality, 0 (best) to 9.
    pub mp3_vbr_quality: u8,
    pub default_preset: ExportPreset,
    /// Gaussian radius (px) used when erasing watermarks.
    pub blur_radius: u32,
    pub blur_sigma: f32,
    /// Frame rate used by `compress` when none is requested.
    pub compress_fps: u32,
    pub gif_resolution: Resolution,
    pub gif_fps: u32,
}

impl Default for Settings {
    fn default() -> Self {
        let data_dir = PathBuf::from(".avconvert");
        Self {
            ffmpeg_bin: PathBuf::from("ffmpeg"),
            ffprobe_bin: PathBuf::from("ffprobe"),
            output_dir: std::env::temp_dir().join("avconvert"),
            library_path: data_dir.join("library.json"),
            prefs_path: data_dir.join("prefs.json"),
            waveform_samples: 300,
            mp3_vbr_quality: 4,
            default_preset: ExportPreset::Highest,
            blur_radius: 12,
            blur_sigma: 6.0,
            compress_fps: 15,
            gif_resolution: Resolution::GIF_DEFAULT,
            gif_fps: 10,
        }
    }
}

impl Settings {
    /// Load settings from `path` (or defaults), apply environment overrides and validate.
    #[tracing::instrument(level = "debug")]
    pub fn load(path: Option<&Path>) -> ConvertResult<Self> {
        let mut settings = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var_os(key));
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json_file(path: &Path) -> ConvertResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ConvertError::io(format!("failed to read config '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
            .map_err(|e| ConvertError::serde(format!("config '{}': {e}", path.display())))
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Apply `AVCONVERT_*` overrides; `lookup` is normally `std::env::var_os`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<OsString>) {
        if let Some(v) = lookup(ENV_FFMPEG).filter(|v| !v.is_empty()) {
            self.ffmpeg_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_FFPROBE).filter(|v| !v.is_empty()) {
            self.ffprobe_bin = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_OUTPUT_DIR).filter(|v| !v.is_empty()) {
            self.output_dir = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> ConvertResult<()> {
        if self.ffmpeg_bin.as_os_str().is_empty() || self.ffprobe_bin.as_os_str().is_empty() {
            return Err(ConvertError::validation(
                "ffmpeg_bin/ffprobe_bin must not be empty",
            ));
        }
        if self.output_dir.as_os_str().is_empty() {
            return Err(ConvertError::validation("output_dir must not be empty"));
        }
        if self.waveform_samples == 0 {
            return Err(ConvertError::validation("waveform_samples must be > 0"));
        }
        if self.mp3_vbr_quality > 9 {
            return Err(ConvertError::validation("mp3_vbr_quality must be in 0..=9"));
        }
        if !(1..=MAX_BLUR_RADIUS).contains(&self.blur_radius) {
            return Err(ConvertError::validation(format!(
                "blur_radius must be in 1..={MAX_BLUR_RADIUS}"
            )));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(ConvertError::validation("blur_sigma must be > 0"));
        }
        if self.compress_fps == 0 || self.gif_fps == 0 {
            return Err(ConvertError::validation(
                "compress_fps/gif_fps must be non-zero",
            ));
        }
        if self.gif_resolution.width == 0 || self.gif_resolution.height == 0 {
            return Err(ConvertError::validation("gif_resolution must be non-zero"));
        }
        Ok(())
    }
}
