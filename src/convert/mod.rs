//! Request dispatch: turn a [`ConversionRequest`] into an output file.

/// Audio conversion, effects, extraction and audio-to-video argument builders.
pub mod audio;
/// Frame pipeline for watermark, erase and cover exports.
pub mod compose;
/// Trim, compress and container conversion argument builders.
pub mod video;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::assets::decode::decode_image_file;
use crate::assets::probe::{MediaAsset, probe};
use crate::config::Settings;
use crate::encode::gif::{gif_from_image, gif_from_video};
use crate::encode::image::{convert_image_file, edit_image_file, open_image};
use crate::encode::mp3::wav_to_mp3;
use crate::encode::session::{CancelToken, ExportJob, OutputNamer, remove_partial};
use crate::format::{MediaFormat, MediaKind};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::{ConversionRequest, ExportResult, Operation};

use compose::FrameOp;
use video::{COMPRESS_PRESET, CompressPlan};

/// Runs one request to completion. Implementations must be usable from a worker thread.
pub trait Exporter: Send + Sync {
    fn export(
        &self,
        request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> ConvertResult<ExportResult>;
}

/// ffmpeg-backed [`Exporter`] writing into [`Settings::output_dir`].
#[derive(Clone, Debug)]
pub struct Converter {
    settings: Settings,
    namer: OutputNamer,
}

impl Converter {
    pub fn new(settings: Settings) -> Self {
        let namer = OutputNamer::new(settings.output_dir.clone());
        Self { settings, namer }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn probe(&self, path: &Path) -> ConvertResult<MediaAsset> {
        probe(&self.settings.ffprobe_bin, path)
    }

    fn ffmpeg(&self) -> &Path {
        &self.settings.ffmpeg_bin
    }

    fn run_job(&self, args: Vec<OsString>, out: &Path, cancel: &CancelToken) -> ConvertResult<()> {
        ExportJob::new(self.ffmpeg(), args, out).run_checked(cancel)?;
        Ok(())
    }

    /// Format actually written. Trimming an audio-only source yields audio.
    fn resolve_format(op: &Operation, asset: Option<&MediaAsset>) -> MediaFormat {
        match (op, asset) {
            (Operation::Trim { .. }, Some(a)) if !a.has_video() => MediaFormat::M4a,
            _ => op.output_format(),
        }
    }

    fn needs_probe(op: &Operation) -> bool {
        !matches!(
            op,
            Operation::ConvertImage { .. }
                | Operation::EditImage { .. }
                | Operation::GifFromImage(_)
        )
    }

    fn write(
        &self,
        source: &Path,
        op: &Operation,
        probed: Option<&MediaAsset>,
        out_format: MediaFormat,
        out: &Path,
        cancel: &CancelToken,
    ) -> ConvertResult<()> {
        let asset = || probed.ok_or_else(|| ConvertError::input("source was not probed"));
        match op {
            Operation::ConvertAudio { format } => {
                asset()?.require_audio()?;
                if *format == MediaFormat::Mp3 {
                    self.mp3_via_wav(audio::wav_args(source), out, cancel)
                } else {
                    self.run_job(audio::convert_audio_args(source, *format)?, out, cancel)
                }
            }
            Operation::ExtractAudio => {
                let a = asset()?;
                if !a.has_audio() {
                    return Err(ConvertError::input(format!(
                        "'{}' has no audio track to extract",
                        source.display()
                    )));
                }
                self.run_job(audio::extract_audio_args(source), out, cancel)
            }
            Operation::AudioEffect { effect, format } => {
                asset()?.require_audio()?;
                if *format == MediaFormat::Mp3 {
                    let wav_args = audio::effect_args(source, *effect, MediaFormat::Wav)?;
                    self.mp3_via_wav(wav_args, out, cancel)
                } else {
                    self.run_job(audio::effect_args(source, *effect, *format)?, out, cancel)
                }
            }
            Operation::AudioToVideo { format } => {
                asset()?.require_audio()?;
                self.run_job(audio::audio_to_video_args(source, *format)?, out, cancel)
            }
            Operation::ConvertVideo { format } => {
                asset()?.require_video()?;
                self.run_job(video::convert_video_args(source, *format)?, out, cancel)
            }
            Operation::Trim { range, preset } => {
                let a = asset()?;
                let range = range.clamp_to(a.duration_sec);
                let preset = preset.unwrap_or(self.settings.default_preset);
                let args = video::trim_args(source, range, preset, a.has_video(), out_format)?;
                self.run_job(args, out, cancel)
            }
            Operation::Compress {
                range,
                resolution,
                fps,
            } => {
                let a = asset()?;
                a.require_video()?;
                let plan = CompressPlan {
                    range: range.map(|r| r.clamp_to(a.duration_sec)),
                    resolution: *resolution,
                    fps: fps.unwrap_or(self.settings.compress_fps),
                    preset: COMPRESS_PRESET,
                };
                self.run_job(video::compress_args(source, &plan)?, out, cancel)
            }
            Operation::Watermark {
                image,
                offset,
                size,
            } => {
                let a = asset()?;
                let frame = compose::frame_size(a)?;
                let rect = compose::watermark_rect(frame, *offset, *size)?;
                let image = decode_image_file(image)?;
                self.compose(a, &[FrameOp::Overlay { image, rect }], out, cancel)
            }
            Operation::EraseWatermarks { regions } => {
                let a = asset()?;
                let frame = compose::frame_size(a)?;
                let plan = compose::erase_plan(frame, regions)?.require_non_empty()?;
                for skipped in &plan.skipped {
                    tracing::info!(
                        rect = ?skipped.rect,
                        reason = ?skipped.reason,
                        "region skipped"
                    );
                }
                let op = FrameOp::Blur {
                    regions: plan.included,
                    radius: self.settings.blur_radius,
                    sigma: self.settings.blur_sigma,
                };
                self.compose(a, &[op], out, cancel)
            }
            Operation::SetCover { image } => {
                let a = asset()?;
                let frame = compose::frame_size(a)?;
                let image = decode_image_file(image)?;
                let rect = compose::cover_rect(frame, &image);
                self.compose(a, &[FrameOp::Overlay { image, rect }], out, cancel)
            }
            Operation::GifFromImage(opts) => {
                let mut opts = opts.clone();
                opts.resolution = opts.resolution.or(Some(self.settings.gif_resolution));
                let img = open_image(source)?;
                gif_from_image(&img, &opts, out, cancel)?;
                Ok(())
            }
            Operation::GifFromVideo(opts) => {
                let a = asset()?;
                let mut opts = opts.clone();
                opts.range = opts.range.clamp_to(a.duration_sec);
                gif_from_video(self.ffmpeg(), a, &opts, out, cancel)?;
                Ok(())
            }
            Operation::ConvertImage { format, resize } => {
                convert_image_file(source, out, *format, *resize)?;
                Ok(())
            }
            Operation::EditImage { format, edits } => {
                edit_image_file(source, out, *format, *edits)?;
                Ok(())
            }
        }
    }

    fn compose(
        &self,
        asset: &MediaAsset,
        ops: &[FrameOp],
        out: &Path,
        cancel: &CancelToken,
    ) -> ConvertResult<()> {
        compose::compose_video(
            self.ffmpeg(),
            asset,
            ops,
            self.settings.default_preset,
            out,
            cancel,
        )?;
        Ok(())
    }

    /// Render `wav_args` into an intermediate WAV, then feed the PCM chunk loop.
    fn mp3_via_wav(
        &self,
        wav_args: Vec<OsString>,
        out: &Path,
        cancel: &CancelToken,
    ) -> ConvertResult<()> {
        let wav: PathBuf = self.namer.next("pcm_", MediaFormat::Wav);
        let result = self
            .run_job(wav_args, &wav, cancel)
            .and_then(|()| {
                wav_to_mp3(
                    self.ffmpeg(),
                    &wav,
                    out,
                    self.settings.mp3_vbr_quality,
                    cancel,
                )
            });
        remove_partial(&wav);
        result.map(|_| ())
    }

    /// Duration of a finished output: probed for audio/video, requested for GIFs.
    fn output_duration(
        &self,
        requested: Option<f64>,
        format: MediaFormat,
        out: &Path,
    ) -> Option<f64> {
        if format.kind() == MediaKind::Image {
            return requested;
        }
        match self.probe(out) {
            Ok(a) => Some(a.duration_sec),
            Err(e) => {
                tracing::warn!(error = %e, "could not probe export output");
                requested
            }
        }
    }
}

impl Exporter for Converter {
    #[tracing::instrument(
        level = "info",
        skip(self, cancel),
        fields(op = request.operation.name(), src = %request.source.display())
    )]
    fn export(
        &self,
        request: &ConversionRequest,
        cancel: &CancelToken,
    ) -> ConvertResult<ExportResult> {
        let op = &request.operation;
        op.validate()?;
        cancel.check()?;

        let asset = if Self::needs_probe(op) {
            Some(self.probe(&request.source)?)
        } else {
            None
        };
        let format = Self::resolve_format(op, asset.as_ref());
        let out = self.namer.next(op.output_prefix(), format);

        if let Err(e) = self.write(&request.source, op, asset.as_ref(), format, &out, cancel) {
            remove_partial(&out);
            return Err(e);
        }
        if !out.is_file() {
            return Err(ConvertError::export(format!(
                "export reported success but '{}' was not written",
                out.display()
            )));
        }

        let requested = op.expected_duration_within(asset.as_ref().map(|a| a.duration_sec));
        let duration = self.output_duration(requested, format, &out);
        tracing::info!(out = %out.display(), ?duration, ?requested, "export completed");
        Ok(ExportResult::new(out, format, duration).with_requested_duration(requested))
    }
}
