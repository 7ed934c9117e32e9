use std::path::{Path, PathBuf};

use crate::{
    format::{MediaFormat, MediaKind},
    foundation::core::{Rect, Resolution, Size, TimeRange, Vec2},
    foundation::error::{ConvertError, ConvertResult},
};

/// Quality preset for re-encoding exports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportPreset {
    #[default]
    Highest,
    Medium,
    Low,
}

impl ExportPreset {
    /// x264 constant rate factor for this preset.
    pub fn crf(self) -> u8 {
        match self {
            ExportPreset::Highest => 18,
            ExportPreset::Medium => 23,
            ExportPreset::Low => 28,
        }
    }

    /// Audio bitrate used next to the video stream.
    pub fn audio_bitrate(self) -> &'static str {
        match self {
            ExportPreset::Highest => "192k",
            ExportPreset::Medium => "128k",
            ExportPreset::Low => "96k",
        }
    }
}

impl std::str::FromStr for ExportPreset {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highest" | "high" => Ok(ExportPreset::Highest),
            "medium" => Ok(ExportPreset::Medium),
            "low" => Ok(ExportPreset::Low),
            other => Err(ConvertError::validation(format!(
                "unknown preset '{other}' (expected highest|medium|low)"
            ))),
        }
    }
}

/// Sound effect rendered into an audio export.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEffect {
    /// Dense short reflections, a medium room.
    Reverb,
    /// One distinct repeat.
    Echo,
    /// Low-shelf boost.
    Bass,
    /// Low-shelf cut.
    Cut,
}

impl AudioEffect {
    pub fn name(self) -> &'static str {
        match self {
            AudioEffect::Reverb => "reverb",
            AudioEffect::Echo => "echo",
            AudioEffect::Bass => "bass",
            AudioEffect::Cut => "cut",
        }
    }
}

impl std::str::FromStr for AudioEffect {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reverb" => Ok(AudioEffect::Reverb),
            "echo" => Ok(AudioEffect::Echo),
            "bass" => Ok(AudioEffect::Bass),
            "cut" => Ok(AudioEffect::Cut),
            other => Err(ConvertError::validation(format!(
                "unknown effect '{other}' (expected reverb|echo|bass|cut)"
            ))),
        }
    }
}

/// Orientation and crop edits for a still image. Applied as mirror, then flip, then crop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ImageEdits {
    /// Swap left and right.
    pub mirror: bool,
    /// Turn upside down.
    pub flip: bool,
    /// Keep the largest centred square.
    pub crop_square: bool,
}

impl ImageEdits {
    pub fn is_empty(self) -> bool {
        !(self.mirror || self.flip || self.crop_square)
    }
}

/// Which rectangles a watermark-erase export should blur.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RegionRequest {
    /// Plan `n` (1..=3) corner regions from the display size.
    Corners(u8),
    /// Explicit rectangles in display-pixel coordinates.
    Rects(Vec<Rect>),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GifOptions {
    /// Source span; for still images only its length matters.
    pub range: TimeRange,
    pub fps: u32,
    /// `None` keeps the source size for videos and uses 480x720 for stills.
    pub resolution: Option<Resolution>,
    /// 0 loops forever, `n` plays `n` extra times.
    pub loop_count: u16,
}

impl GifOptions {
    pub fn frame_count(&self) -> u64 {
        if self.fps == 0 {
            return 0;
        }
        (self.range.duration_sec() * f64::from(self.fps)).floor() as u64
    }
}

/// One export the converters know how to perform.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    ConvertAudio {
        format: MediaFormat,
    },
    ExtractAudio,
    AudioEffect {
        effect: AudioEffect,
        format: MediaFormat,
    },
    ConvertVideo {
        format: MediaFormat,
    },
    AudioToVideo {
        format: MediaFormat,
    },
    Trim {
        range: TimeRange,
        preset: Option<ExportPreset>,
    },
    Compress {
        range: Option<TimeRange>,
        resolution: Option<Resolution>,
        fps: Option<u32>,
    },
    Watermark {
        image: PathBuf,
        /// Offset of the watermark centre from the frame centre, in display pixels.
        offset: Vec2,
        size: Size,
    },
    EraseWatermarks {
        regions: RegionRequest,
    },
    SetCover {
        image: PathBuf,
    },
    GifFromImage(GifOptions),
    GifFromVideo(GifOptions),
    ConvertImage {
        format: MediaFormat,
        resize: Option<Resolution>,
    },
    EditImage {
        format: MediaFormat,
        edits: ImageEdits,
    },
}

impl Operation {
    /// Default watermark size in display pixels.
    pub const WATERMARK_SIZE: Size = Size::new(80.0, 80.0);

    pub fn name(&self) -> &'static str {
        match self {
            Operation::ConvertAudio { .. } => "convert_audio",
            Operation::ExtractAudio => "extract_audio",
            Operation::AudioEffect { .. } => "audio_effect",
            Operation::ConvertVideo { .. } => "convert_video",
            Operation::AudioToVideo { .. } => "audio_to_video",
            Operation::Trim { .. } => "trim",
            Operation::Compress { .. } => "compress",
            Operation::Watermark { .. } => "watermark",
            Operation::EraseWatermarks { .. } => "erase_watermarks",
            Operation::SetCover { .. } => "set_cover",
            Operation::GifFromImage(_) => "gif_from_image",
            Operation::GifFromVideo(_) => "gif_from_video",
            Operation::ConvertImage { .. } => "convert_image",
            Operation::EditImage { .. } => "edit_image",
        }
    }

    /// File-name prefix for outputs of this operation.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Operation::ConvertAudio { .. }
            | Operation::ConvertVideo { .. }
            | Operation::ConvertImage { .. } => "converted_",
            Operation::ExtractAudio => "extracted_",
            Operation::AudioEffect { .. } => "effect_",
            Operation::EditImage { .. } => "edited_",
            Operation::AudioToVideo { .. } => "video_",
            Operation::Trim { .. } => "trimmed_",
            Operation::Compress { .. } => "compressed_",
            Operation::Watermark { .. } => "watermarked_",
            Operation::EraseWatermarks { .. } => "erased_",
            Operation::SetCover { .. } => "covered_",
            Operation::GifFromImage(_) | Operation::GifFromVideo(_) => "gif_",
        }
    }

    /// Format of the file this operation writes.
    pub fn output_format(&self) -> MediaFormat {
        match self {
            Operation::ConvertAudio { format }
            | Operation::ConvertVideo { format }
            | Operation::AudioToVideo { format }
            | Operation::AudioEffect { format, .. }
            | Operation::ConvertImage { format, .. }
            | Operation::EditImage { format, .. } => *format,
            Operation::ExtractAudio => MediaFormat::M4a,
            Operation::Trim { .. }
            | Operation::Compress { .. }
            | Operation::Watermark { .. }
            | Operation::EraseWatermarks { .. }
            | Operation::SetCover { .. } => MediaFormat::Mp4,
            Operation::GifFromImage(_) | Operation::GifFromVideo(_) => MediaFormat::Gif,
        }
    }

    /// Duration the output is expected to have, when the request pins it down.
    pub fn expected_duration(&self) -> Option<f64> {
        self.expected_duration_within(None)
    }

    /// Like [`expected_duration`](Self::expected_duration), with source ranges clamped to a
    /// source of `source_sec` seconds, the span the export actually covers.
    pub fn expected_duration_within(&self, source_sec: Option<f64>) -> Option<f64> {
        let covered = |range: TimeRange| match source_sec {
            Some(d) => range.clamp_to(d).duration_sec(),
            None => range.duration_sec(),
        };
        match self {
            Operation::Trim { range, .. }
            | Operation::Compress {
                range: Some(range), ..
            } => Some(covered(*range)),
            Operation::GifFromVideo(opts) => Some(covered(opts.range)),
            // A still image has no timeline to clamp against.
            Operation::GifFromImage(opts) => Some(opts.range.duration_sec()),
            _ => None,
        }
    }

    /// Parameter checks that need no media access.
    pub fn validate(&self) -> ConvertResult<()> {
        match self {
            Operation::ConvertAudio { format } => {
                if !format.is_audio() {
                    return Err(ConvertError::validation(format!(
                        "'{format}' is not an audio format"
                    )));
                }
            }
            Operation::AudioEffect { format, .. } => {
                if !format.is_audio() {
                    return Err(ConvertError::validation(format!(
                        "'{format}' is not an audio format"
                    )));
                }
            }
            Operation::ConvertVideo { format } | Operation::AudioToVideo { format } => {
                if !format.is_video() {
                    return Err(ConvertError::validation(format!(
                        "'{format}' is not a video container"
                    )));
                }
            }
            Operation::ConvertImage { format, .. } => {
                if format.kind() != MediaKind::Image {
                    return Err(ConvertError::validation(format!(
                        "'{format}' is not an image format"
                    )));
                }
            }
            Operation::EditImage { format, edits } => {
                if format.kind() != MediaKind::Image {
                    return Err(ConvertError::validation(format!(
                        "'{format}' is not an image format"
                    )));
                }
                if edits.is_empty() {
                    return Err(ConvertError::validation(
                        "image edit needs at least one of mirror, flip or crop",
                    ));
                }
            }
            Operation::Trim { range, .. } => {
                range.require_non_empty()?;
            }
            Operation::Compress { range, fps, .. } => {
                if let Some(range) = range {
                    range.require_non_empty()?;
                }
                if *fps == Some(0) {
                    return Err(ConvertError::validation("compress fps must be non-zero"));
                }
            }
            Operation::Watermark { size, .. } => {
                if !(size.width > 0.0 && size.height > 0.0) {
                    return Err(ConvertError::validation("watermark size must be positive"));
                }
            }
            Operation::EraseWatermarks { regions } => {
                if let RegionRequest::Corners(n) = regions
                    && !(1..=3).contains(n)
                {
                    return Err(ConvertError::validation(
                        "watermark count must be between 1 and 3",
                    ));
                }
            }
            Operation::GifFromImage(opts) | Operation::GifFromVideo(opts) => {
                if opts.fps == 0 {
                    return Err(ConvertError::validation("gif fps must be non-zero"));
                }
                if opts.frame_count() == 0 {
                    return Err(ConvertError::validation(
                        "gif must contain at least one frame",
                    ));
                }
            }
            Operation::ExtractAudio | Operation::SetCover { .. } => {}
        }
        Ok(())
    }
}

/// A source file plus what to do with it. Consumed by one export.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversionRequest {
    pub source: PathBuf,
    pub operation: Operation,
}

impl ConversionRequest {
    pub fn new(source: impl Into<PathBuf>, operation: Operation) -> Self {
        Self {
            source: source.into(),
            operation,
        }
    }
}

/// Outcome of a completed export.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ExportResult {
    pub path: PathBuf,
    pub format: MediaFormat,
    pub kind: MediaKind,
    pub duration_sec: Option<f64>,
    /// Length of the source span the export covered, for range-based operations.
    pub requested_sec: Option<f64>,
}

impl ExportResult {
    pub fn new(path: impl Into<PathBuf>, format: MediaFormat, duration_sec: Option<f64>) -> Self {
        Self {
            path: path.into(),
            format,
            kind: format.kind(),
            duration_sec,
            requested_sec: None,
        }
    }

    pub fn with_requested_duration(mut self, requested_sec: Option<f64>) -> Self {
        self.requested_sec = requested_sec;
        self
    }

    /// Duration shown for this output: the covered range when one was requested, otherwise
    /// the measured length.
    pub fn display_duration(&self) -> Option<f64> {
        self.requested_sec.or(self.duration_sec)
    }

    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
