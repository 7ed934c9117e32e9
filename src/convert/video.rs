//! Trim, compress and container conversion as single ffmpeg jobs.

use std::ffi::OsString;
use std::path::Path;

use crate::encode::session::os_args;
use crate::format::MediaFormat;
use crate::foundation::core::{Resolution, TimeRange};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::ExportPreset;

/// Preset used when a compress request does not name one.
pub const COMPRESS_PRESET: ExportPreset = ExportPreset::Low;

/// Seek before the input so the cut starts at `range.start_sec` and lasts exactly its length.
fn seek_input(src: &Path, range: Option<TimeRange>) -> Vec<OsString> {
    let mut v = Vec::new();
    if let Some(r) = range {
        v.extend(os_args([
            "-ss".to_string(),
            format!("{:.3}", r.start_sec),
            "-t".to_string(),
            format!("{:.3}", r.duration_sec()),
        ]));
    }
    v.push("-i".into());
    v.push(src.as_os_str().to_os_string());
    v
}

fn h264_aac(preset: ExportPreset) -> Vec<OsString> {
    os_args([
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "medium".to_string(),
        "-crf".to_string(),
        preset.crf().to_string(),
        "-pix_fmt".to_string(),
        "yuv420p".to_string(),
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        preset.audio_bitrate().to_string(),
    ])
}

fn first_streams(has_video: bool) -> Vec<OsString> {
    if has_video {
        os_args(["-map", "0:v:0", "-map", "0:a:0?"])
    } else {
        os_args(["-map", "0:a:0", "-vn"])
    }
}

fn faststart(format: MediaFormat) -> Vec<OsString> {
    match format {
        MediaFormat::Mp4 | MediaFormat::Mov | MediaFormat::M4v | MediaFormat::M4a => {
            os_args(["-movflags", "+faststart"])
        }
        _ => Vec::new(),
    }
}

/// Re-encode `[range.start, range.end)` of `src`.
///
/// Audio-only sources keep only their audio; the caller picks an audio container for those.
pub fn trim_args(
    src: &Path,
    range: TimeRange,
    preset: ExportPreset,
    has_video: bool,
    format: MediaFormat,
) -> ConvertResult<Vec<OsString>> {
    let range = range.require_non_empty()?;
    let mut v = seek_input(src, Some(range));
    v.extend(first_streams(has_video));
    v.extend(h264_aac(preset));
    v.extend(faststart(format));
    Ok(v)
}

/// Compression knobs resolved against the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressPlan {
    pub range: Option<TimeRange>,
    pub resolution: Option<Resolution>,
    pub fps: u32,
    pub preset: ExportPreset,
}

pub fn compress_args(src: &Path, plan: &CompressPlan) -> ConvertResult<Vec<OsString>> {
    if plan.fps == 0 {
        return Err(ConvertError::validation("compress fps must be non-zero"));
    }
    let range = plan.range.map(TimeRange::require_non_empty).transpose()?;
    let mut v = seek_input(src, range);
    v.extend(first_streams(true));

    let mut filters = vec![format!("fps={}", plan.fps)];
    if let Some(res) = plan.resolution {
        let res = res.even();
        filters.push(format!("scale={}:{}", res.width, res.height));
    }
    v.push("-vf".into());
    v.push(filters.join(",").into());
    v.extend(h264_aac(plan.preset));
    v.extend(faststart(MediaFormat::Mp4));
    Ok(v)
}

/// Re-encode into another video container.
pub fn convert_video_args(src: &Path, format: MediaFormat) -> ConvertResult<Vec<OsString>> {
    if !format.is_video() {
        return Err(ConvertError::validation(format!(
            "'{format}' is not a video container"
        )));
    }
    let mut v = seek_input(src, None);
    v.extend(first_streams(true));
    v.extend(h264_aac(ExportPreset::Highest));
    v.extend(faststart(format));
    Ok(v)
}
