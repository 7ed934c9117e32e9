use std::{fmt, path::Path, str::FromStr};

use crate::foundation::error::{ConvertError, ConvertResult};

/// Broad category of a media file, as stored in the library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum MediaKind {
    Audio,
    Video,
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MediaKind::Audio => "Audio",
            MediaKind::Video => "Video",
            MediaKind::Image => "Image",
        })
    }
}

/// Every container/codec target the converters can produce or accept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    Mp3,
    Wav,
    M4a,
    Aac,
    Flac,
    Aiff,
    Opus,
    Mp4,
    Mov,
    M4v,
    Gif,
    Webp,
    Heic,
    Jpg,
    Png,
    Pdf,
}

impl MediaFormat {
    pub const ALL: [MediaFormat; 16] = [
        MediaFormat::Mp3,
        MediaFormat::Wav,
        MediaFormat::M4a,
        MediaFormat::Aac,
        MediaFormat::Flac,
        MediaFormat::Aiff,
        MediaFormat::Opus,
        MediaFormat::Mp4,
        MediaFormat::Mov,
        MediaFormat::M4v,
        MediaFormat::Gif,
        MediaFormat::Webp,
        MediaFormat::Heic,
        MediaFormat::Jpg,
        MediaFormat::Png,
        MediaFormat::Pdf,
    ];

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            MediaFormat::Mp3 => "mp3",
            MediaFormat::Wav => "wav",
            MediaFormat::M4a => "m4a",
            MediaFormat::Aac => "aac",
            MediaFormat::Flac => "flac",
            MediaFormat::Aiff => "aiff",
            MediaFormat::Opus => "opus",
            MediaFormat::Mp4 => "mp4",
            MediaFormat::Mov => "mov",
            MediaFormat::M4v => "m4v",
            MediaFormat::Gif => "gif",
            MediaFormat::Webp => "webp",
            MediaFormat::Heic => "heic",
            MediaFormat::Jpg => "jpg",
            MediaFormat::Png => "png",
            MediaFormat::Pdf => "pdf",
        }
    }

    pub fn kind(self) -> MediaKind {
        match self {
            MediaFormat::Mp3
            | MediaFormat::Wav
            | MediaFormat::M4a
            | MediaFormat::Aac
            | MediaFormat::Flac
            | MediaFormat::Aiff
            | MediaFormat::Opus => MediaKind::Audio,
            MediaFormat::Mp4 | MediaFormat::Mov | MediaFormat::M4v => MediaKind::Video,
            MediaFormat::Gif
            | MediaFormat::Webp
            | MediaFormat::Heic
            | MediaFormat::Jpg
            | MediaFormat::Png
            | MediaFormat::Pdf => MediaKind::Image,
        }
    }

    pub fn is_audio(self) -> bool {
        self.kind() == MediaKind::Audio
    }

    pub fn is_video(self) -> bool {
        self.kind() == MediaKind::Video
    }

    /// Guess the format of an existing file from its extension.
    pub fn from_path(path: &Path) -> ConvertResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| {
                ConvertError::input(format!("'{}' has no file extension", path.display()))
            })?;
        ext.parse()
    }

    /// Kind of an input file. Unknown video-ish extensions (`.mkv`, `.webm`, `.avi`) count as
    /// video so they can still be trimmed or converted.
    pub fn kind_of_path(path: &Path) -> Option<MediaKind> {
        match Self::from_path(path) {
            Ok(f) => Some(f.kind()),
            Err(_) => {
                let ext = path.extension()?.to_str()?.to_ascii_lowercase();
                match ext.as_str() {
                    "mkv" | "webm" | "avi" | "3gp" => Some(MediaKind::Video),
                    "ogg" | "wma" | "caf" => Some(MediaKind::Audio),
                    "jpeg" | "bmp" | "tiff" | "tif" => Some(MediaKind::Image),
                    _ => None,
                }
            }
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MediaFormat {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().trim_start_matches('.').to_ascii_lowercase();
        let lower = match lower.as_str() {
            "jpeg" => "jpg",
            "aif" => "aiff",
            "heif" => "heic",
            other => other,
        };
        MediaFormat::ALL
            .iter()
            .copied()
            .find(|f| f.extension() == lower)
            .ok_or_else(|| ConvertError::unsupported(format!("unknown media format '{s}'")))
    }
}
