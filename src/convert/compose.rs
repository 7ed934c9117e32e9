//! Per-frame compositing exports: decode RGBA frames, apply [`FrameOp`]s, stream into ffmpeg.

use std::path::Path;

use crate::assets::decode::{FrameReader, FrameReaderOpts, PreparedImage};
use crate::assets::probe::MediaAsset;
use crate::effects::blur::blur_regions_in_place;
use crate::effects::composite::{centered_rect, draw_image_scaled, fit_rect};
use crate::effects::regions::{RegionPlan, plan_corner_regions};
use crate::encode::ffmpeg::{AudioMux, FfmpegSinkOpts, FfmpegVideoSink, FrameSink, SinkConfig};
use crate::encode::session::CancelToken;
use crate::foundation::core::{Fps, FrameRgba, Rect, Resolution, Size, Vec2};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::request::{ExportPreset, RegionRequest};

/// Frame rate used when the source does not report one.
pub const FALLBACK_FPS: u32 = 30;

/// One processing step applied to every frame.
#[derive(Clone, Debug)]
pub enum FrameOp {
    /// Composite `image` scaled into `rect`.
    Overlay { image: PreparedImage, rect: Rect },
    /// Gaussian blur restricted to `regions`.
    Blur {
        regions: Vec<Rect>,
        radius: u32,
        sigma: f32,
    },
}

impl FrameOp {
    pub fn apply(&self, frame: &mut FrameRgba) -> ConvertResult<()> {
        match self {
            FrameOp::Overlay { image, rect } => {
                draw_image_scaled(frame, image, *rect, 1.0)?;
                Ok(())
            }
            FrameOp::Blur {
                regions,
                radius,
                sigma,
            } => blur_regions_in_place(frame, regions, *radius, *sigma),
        }
    }
}

/// Anything that yields fixed-size RGBA frames until exhausted.
pub trait FrameSource {
    fn size(&self) -> Resolution;
    /// Fill `buf` with the next frame; `false` at end of stream.
    fn read_frame(&mut self, buf: &mut Vec<u8>) -> ConvertResult<bool>;
}

impl FrameSource for FrameReader {
    fn size(&self) -> Resolution {
        FrameReader::size(self)
    }

    fn read_frame(&mut self, buf: &mut Vec<u8>) -> ConvertResult<bool> {
        FrameReader::read_frame(self, buf)
    }
}

/// Pull every frame from `source`, apply `ops` in order and push the result into `sink`.
///
/// On any error or cancellation the sink is aborted, which discards its partial output.
pub fn run_frames(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    ops: &[FrameOp],
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let result = pump(source, sink, cfg, ops, cancel);
    if result.is_err() {
        sink.abort();
    }
    result
}

fn pump(
    source: &mut dyn FrameSource,
    sink: &mut dyn FrameSink,
    cfg: SinkConfig,
    ops: &[FrameOp],
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let size = source.size();
    if cfg.size != size {
        return Err(ConvertError::validation(format!(
            "source frames are {size} but the sink expects {}",
            cfg.size
        )));
    }
    sink.begin(cfg)?;

    let mut buf = Vec::with_capacity(size.pixel_count() * 4);
    let mut idx = 0u64;
    loop {
        cancel.check()?;
        if !source.read_frame(&mut buf)? {
            break;
        }
        // Decoded video is opaque, so straight and premultiplied alpha coincide.
        let mut frame = FrameRgba::new(size.width, size.height, std::mem::take(&mut buf))?;
        for op in ops {
            op.apply(&mut frame)?;
        }
        sink.push_frame(idx, &frame)?;
        buf = frame.data;
        idx += 1;
    }
    if idx == 0 {
        return Err(ConvertError::input("video produced no frames"));
    }
    cancel.check()?;
    sink.end()?;
    Ok(idx)
}

/// Even-sized frame the source is decoded at.
pub fn frame_size(asset: &MediaAsset) -> ConvertResult<Resolution> {
    asset.require_video()?;
    asset
        .display_size()
        .map(Resolution::even)
        .ok_or_else(|| ConvertError::input("video has no usable size"))
}

/// Watermark rectangle centred at `frame_center + offset`.
///
/// A placement that misses the frame entirely is rejected rather than exported unchanged.
pub fn watermark_rect(frame: Resolution, offset: Vec2, size: Size) -> ConvertResult<Rect> {
    let rect = centered_rect(frame.size(), offset, size);
    let visible = rect.intersect(frame.size().to_rect());
    if visible.width() <= 0.0 || visible.height() <= 0.0 {
        return Err(ConvertError::validation(format!(
            "watermark at offset ({}, {}) lies entirely outside the {frame} frame",
            offset.x, offset.y
        )));
    }
    Ok(rect)
}

/// Region plan for an erase request against a frame of `frame` size.
pub fn erase_plan(frame: Resolution, regions: &RegionRequest) -> ConvertResult<RegionPlan> {
    match regions {
        RegionRequest::Corners(n) => plan_corner_regions(frame.size(), *n),
        RegionRequest::Rects(rects) => Ok(RegionPlan::from_rects(rects, frame.size().to_rect())),
    }
}

/// Cover image fitted inside the whole frame.
pub fn cover_rect(frame: Resolution, image: &PreparedImage) -> Rect {
    let content = Size::new(f64::from(image.width), f64::from(image.height));
    fit_rect(content, frame.size().to_rect())
}

/// Decode `asset`, run `ops` on every frame and encode to `out` with the source audio.
#[tracing::instrument(
    level = "info",
    skip(ffmpeg, asset, ops, cancel),
    fields(src = %asset.path.display(), ops = ops.len())
)]
pub fn compose_video(
    ffmpeg: &Path,
    asset: &MediaAsset,
    ops: &[FrameOp],
    preset: ExportPreset,
    out: &Path,
    cancel: &CancelToken,
) -> ConvertResult<u64> {
    let size = frame_size(asset)?;
    let fps = asset
        .fps()
        .map(|f| f.as_f64().round() as u32)
        .filter(|f| *f > 0)
        .unwrap_or(FALLBACK_FPS);

    let mut reader = FrameReader::spawn(
        ffmpeg,
        &asset.path,
        &FrameReaderOpts {
            size,
            start_sec: None,
            duration_sec: None,
            fps: Some(fps),
        },
    )?;
    let mut opts = FfmpegSinkOpts::new(ffmpeg, out);
    opts.preset = preset;
    let mut sink = FfmpegVideoSink::new(opts);
    let cfg = SinkConfig {
        size,
        fps: Fps::whole(fps)?,
        audio: asset.has_audio().then(|| AudioMux {
            path: asset.path.clone(),
            start_sec: None,
            duration_sec: None,
        }),
    };

    let frames = run_frames(&mut reader, &mut sink, cfg, ops, cancel)?;
    reader.finish()?;
    tracing::info!(frames, "composited");
    Ok(frames)
}
