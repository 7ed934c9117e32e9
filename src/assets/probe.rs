use std::path::{Path, PathBuf};

use crate::foundation::core::{Fps, Resolution, TimeRange};
use crate::foundation::error::{ConvertError, ConvertResult};

/// Video track metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoTrack {
    /// Natural (encoded) width in pixels.
    pub width: u32,
    /// Natural (encoded) height in pixels.
    pub height: u32,
    /// Clockwise display rotation, one of 0/90/180/270.
    pub rotation: u16,
    pub fps: Option<Fps>,
}

/// Audio track metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Probed metadata of a source file. Read-only once created.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaAsset {
    pub path: PathBuf,
    /// Container duration in seconds; 0 for stills.
    pub duration_sec: f64,
    pub video: Option<VideoTrack>,
    pub audio: Option<AudioTrack>,
}

impl MediaAsset {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video.is_some()
    }

    pub fn natural_size(&self) -> Option<Resolution> {
        let v = self.video.as_ref()?;
        Resolution::new(v.width, v.height).ok()
    }

    /// Natural size with the rotation applied, i.e. what a player shows.
    pub fn display_size(&self) -> Option<Resolution> {
        let v = self.video.as_ref()?;
        let (w, h) = match v.rotation {
            90 | 270 => (v.height, v.width),
            _ => (v.width, v.height),
        };
        Resolution::new(w, h).ok()
    }

    pub fn fps(&self) -> Option<Fps> {
        self.video.as_ref().and_then(|v| v.fps)
    }

    pub fn full_range(&self) -> TimeRange {
        TimeRange::whole(self.duration_sec)
    }

    pub fn require_video(&self) -> ConvertResult<&VideoTrack> {
        self.video.as_ref().ok_or_else(|| {
            ConvertError::input(format!("'{}' has no video track", self.path.display()))
        })
    }

    pub fn require_audio(&self) -> ConvertResult<&AudioTrack> {
        self.audio.as_ref().ok_or_else(|| {
            ConvertError::input(format!("'{}' has no audio track", self.path.display()))
        })
    }
}

#[derive(serde::Deserialize)]
struct ProbeSideData {
    rotation: Option<f64>,
}

#[derive(serde::Deserialize)]
struct ProbeTags {
    rotate: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
    tags: Option<ProbeTags>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
    disposition: Option<ProbeDisposition>,
}

#[derive(serde::Deserialize)]
struct ProbeDisposition {
    #[serde(default)]
    attached_pic: u8,
}

#[derive(serde::Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(serde::Deserialize)]
struct ProbeOut {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Probe `source_path` with `ffprobe`.
#[tracing::instrument(level = "debug", skip(ffprobe))]
pub fn probe(ffprobe: &Path, source_path: &Path) -> ConvertResult<MediaAsset> {
    if !source_path.is_file() {
        return Err(ConvertError::input(format!(
            "source '{}' does not exist or is not a file",
            source_path.display()
        )));
    }

    let out = std::process::Command::new(ffprobe)
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(source_path)
        .output()
        .map_err(|e| ConvertError::io(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(ConvertError::input(format!(
            "ffprobe failed for '{}': {}",
            source_path.display(),
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    parse_probe_json(source_path, &out.stdout)
}

/// Build a [`MediaAsset`] from raw `ffprobe -print_format json` output.
pub fn parse_probe_json(source_path: &Path, json: &[u8]) -> ConvertResult<MediaAsset> {
    let parsed: ProbeOut = serde_json::from_slice(json)
        .map_err(|e| ConvertError::input(format!("ffprobe json parse failed: {e}")))?;

    // Embedded cover art shows up as a video stream; it is not a video track.
    let video = parsed
        .streams
        .iter()
        .filter(|s| s.codec_type.as_deref() == Some("video"))
        .find(|s| s.disposition.as_ref().is_none_or(|d| d.attached_pic == 0))
        .map(|s| -> ConvertResult<VideoTrack> {
            let width = s
                .width
                .ok_or_else(|| ConvertError::input("missing video width from ffprobe"))?;
            let height = s
                .height
                .ok_or_else(|| ConvertError::input("missing video height from ffprobe"))?;
            let fps = s
                .avg_frame_rate
                .as_deref()
                .and_then(Fps::parse_ratio)
                .or_else(|| s.r_frame_rate.as_deref().and_then(Fps::parse_ratio));
            Ok(VideoTrack {
                width,
                height,
                rotation: stream_rotation(s),
                fps,
            })
        })
        .transpose()?;

    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"))
        .map(|s| AudioTrack {
            sample_rate: s
                .sample_rate
                .as_deref()
                .and_then(|r| r.parse().ok())
                .unwrap_or(0),
            channels: s.channels.unwrap_or(0),
        });

    if video.is_none() && audio.is_none() {
        return Err(ConvertError::input(format!(
            "'{}' has neither audio nor video streams",
            source_path.display()
        )));
    }

    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d >= 0.0)
        .unwrap_or(0.0);

    Ok(MediaAsset {
        path: source_path.to_path_buf(),
        duration_sec,
        video,
        audio,
    })
}

fn stream_rotation(s: &ProbeStream) -> u16 {
    // Display matrix side data is counter-clockwise; the legacy `rotate` tag is clockwise.
    if let Some(deg) = s.side_data_list.iter().find_map(|d| d.rotation) {
        return normalize_rotation(-deg);
    }
    s.tags
        .as_ref()
        .and_then(|t| t.rotate.as_deref())
        .and_then(|r| r.trim().parse::<f64>().ok())
        .map(normalize_rotation)
        .unwrap_or(0)
}

/// Snap an arbitrary angle to the nearest quarter turn in `0..360`.
pub fn normalize_rotation(deg: f64) -> u16 {
    if !deg.is_finite() {
        return 0;
    }
    let quarter = (deg / 90.0).round() as i64;
    (quarter.rem_euclid(4) * 90) as u16
}

#[cfg(test)]
#[path = "../../tests/unit/assets/probe.rs"]
mod tests;
