use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::assets::decode::join_drain;
use crate::encode::session::remove_partial;
use crate::foundation::core::{Fps, FrameRgba, Resolution};
use crate::foundation::error::{ConvertError, ConvertResult};
use crate::foundation::math::mul_div255_u16;
use crate::request::ExportPreset;

/// Source of the audio muxed next to streamed frames.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioMux {
    pub path: PathBuf,
    pub start_sec: Option<f64>,
    pub duration_sec: Option<f64>,
}

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Clone, Debug, PartialEq)]
pub struct SinkConfig {
    pub size: Resolution,
    pub fps: Fps,
    /// Audio copied from another file (`None` writes a silent video).
    pub audio: Option<AudioMux>,
}

/// Consumer of processed frames in presentation order.
///
/// `push_frame` is called with strictly increasing indices between `begin` and `end`.
pub trait FrameSink: Send {
    fn begin(&mut self, cfg: SinkConfig) -> ConvertResult<()>;
    fn push_frame(&mut self, idx: u64, frame: &FrameRgba) -> ConvertResult<()>;
    fn end(&mut self) -> ConvertResult<()>;
    /// Stop early and discard whatever was produced so far.
    fn abort(&mut self) {}
}

/// In-memory sink for tests and previews.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, FrameRgba)>,
    ended: bool,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    pub fn frames(&self) -> &[(u64, FrameRgba)] {
        &self.frames
    }

    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> ConvertResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRgba) -> ConvertResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> ConvertResult<()> {
        self.ended = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.frames.clear();
    }
}

/// Options for [`FfmpegVideoSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    pub ffmpeg_bin: PathBuf,
    pub out_path: PathBuf,
    pub preset: ExportPreset,
    /// Background used to flatten alpha (RGBA8, straight alpha).
    pub bg_rgba: [u8; 4],
}

impl FfmpegSinkOpts {
    pub fn new(ffmpeg_bin: impl Into<PathBuf>, out_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_bin: ffmpeg_bin.into(),
            out_path: out_path.into(),
            preset: ExportPreset::Highest,
            bg_rgba: [0, 0, 0, 255],
        }
    }
}

/// Spawns `ffmpeg`, streams raw frames to its stdin and muxes audio from a second input.
pub struct FfmpegVideoSink {
    opts: FfmpegSinkOpts,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr_drain: Option<JoinHandle<std::io::Result<Vec<u8>>>>,
    scratch: Vec<u8>,
    cfg: Option<SinkConfig>,
    last_idx: Option<u64>,
}

impl FfmpegVideoSink {
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            child: None,
            stdin: None,
            stderr_drain: None,
            scratch: Vec::new(),
            cfg: None,
            last_idx: None,
        }
    }

    pub fn out_path(&self) -> &Path {
        &self.opts.out_path
    }
}

/// Arguments for an encoder reading raw RGBA from stdin (everything after the program name).
pub fn sink_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<std::ffi::OsString> {
    let mut args: Vec<std::ffi::OsString> = Vec::new();
    let mut push = |s: &str| args.push(s.into());
    for a in [
        "-y",
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s",
    ] {
        push(a);
    }
    push(&cfg.size.to_string());
    // For rawvideo input, `-r` before `-i` sets the input frame rate.
    push("-r");
    push(&cfg.fps.to_string());
    push("-i");
    push("pipe:0");

    if let Some(audio) = cfg.audio.as_ref() {
        if let Some(ss) = audio.start_sec.filter(|s| *s > 0.0) {
            args.push("-ss".into());
            args.push(format!("{ss:.6}").into());
        }
        if let Some(t) = audio.duration_sec {
            args.push("-t".into());
            args.push(format!("{t:.6}").into());
        }
        args.push("-i".into());
        args.push(audio.path.clone().into_os_string());
        for a in ["-map", "0:v:0", "-map", "1:a:0?"] {
            args.push(a.into());
        }
    } else {
        args.push("-an".into());
    }

    for a in ["-c:v", "libx264", "-pix_fmt", "yuv420p", "-crf"] {
        args.push(a.into());
    }
    args.push(opts.preset.crf().to_string().into());
    if cfg.audio.is_some() {
        for a in ["-c:a", "aac", "-b:a", opts.preset.audio_bitrate(), "-shortest"] {
            args.push(a.into());
        }
    }
    args.push("-movflags".into());
    args.push("+faststart".into());
    args.push(opts.out_path.clone().into_os_string());
    args
}

impl FrameSink for FfmpegVideoSink {
    fn begin(&mut self, cfg: SinkConfig) -> ConvertResult<()> {
        if !cfg.size.width.is_multiple_of(2) || !cfg.size.height.is_multiple_of(2) {
            return Err(ConvertError::validation(
                "ffmpeg sink width/height must be even (required for yuv420p mp4 output)",
            ));
        }
        ensure_parent_dir(&self.opts.out_path)?;

        let mut child = Command::new(&self.opts.ffmpeg_bin)
            .args(sink_args(&self.opts, &cfg))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ConvertError::export(format!(
                    "failed to spawn ffmpeg (is it installed and on PATH?): {e}"
                ))
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ConvertError::io("failed to open ffmpeg stdin (unexpected)"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| ConvertError::io("failed to open ffmpeg stderr (unexpected)"))?;
        let stderr_drain = std::thread::spawn(move || {
            let mut stderr_bytes = Vec::new();
            stderr.read_to_end(&mut stderr_bytes)?;
            Ok(stderr_bytes)
        });

        self.scratch = vec![0u8; cfg.size.pixel_count() * 4];
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.stderr_drain = Some(stderr_drain);
        self.cfg = Some(cfg);
        self.last_idx = None;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &FrameRgba) -> ConvertResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| ConvertError::export("ffmpeg sink not started"))?;
        if let Some(last) = self.last_idx
            && idx <= last
        {
            return Err(ConvertError::export(
                "ffmpeg sink received out-of-order frame index",
            ));
        }
        self.last_idx = Some(idx);

        if frame.width != cfg.size.width || frame.height != cfg.size.height {
            return Err(ConvertError::validation(format!(
                "frame size mismatch: got {}x{}, expected {}",
                frame.width, frame.height, cfg.size
            )));
        }

        flatten_premul_over_bg_to_opaque_rgba8(&mut self.scratch, &frame.data, self.opts.bg_rgba)?;

        let Some(stdin) = self.stdin.as_mut() else {
            return Err(ConvertError::export("ffmpeg sink is already finalized"));
        };
        // A broken pipe means ffmpeg died; `end` reports its stderr.
        if let Err(e) = stdin.write_all(&self.scratch) {
            drop(self.stdin.take());
            let detail = self.end().err().map(|e| e.to_string()).unwrap_or_default();
            return Err(ConvertError::export(format!(
                "failed to write frame to ffmpeg stdin: {e}; {detail}"
            )));
        }
        Ok(())
    }

    fn end(&mut self) -> ConvertResult<()> {
        drop(self.stdin.take());
        let mut child = self
            .child
            .take()
            .ok_or_else(|| ConvertError::export("ffmpeg sink not started"))?;

        let status = child
            .wait()
            .map_err(|e| ConvertError::io(format!("failed to wait for ffmpeg to finish: {e}")))?;
        let stderr_bytes = join_drain(self.stderr_drain.take())?;
        self.cfg = None;

        if !status.success() {
            remove_partial(&self.opts.out_path);
            return Err(ConvertError::export(format!(
                "ffmpeg exited with status {}: {}",
                status,
                String::from_utf8_lossy(&stderr_bytes).trim()
            )));
        }
        Ok(())
    }

    fn abort(&mut self) {
        drop(self.stdin.take());
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        let _ = join_drain(self.stderr_drain.take());
        self.cfg = None;
        remove_partial(&self.opts.out_path);
    }
}

impl Drop for FfmpegVideoSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.abort();
        }
    }
}

fn flatten_premul_over_bg_to_opaque_rgba8(
    dst: &mut [u8],
    src_premul: &[u8],
    bg_rgba: [u8; 4],
) -> ConvertResult<()> {
    if dst.len() != src_premul.len() || !dst.len().is_multiple_of(4) {
        return Err(ConvertError::validation(
            "flatten_premul_over_bg_to_opaque_rgba8 expects equal-length rgba8 buffers",
        ));
    }

    let bg_r = bg_rgba[0] as u16;
    let bg_g = bg_rgba[1] as u16;
    let bg_b = bg_rgba[2] as u16;

    for (d, s) in dst.chunks_exact_mut(4).zip(src_premul.chunks_exact(4)) {
        let a = s[3] as u16;
        if a == 255 {
            d.copy_from_slice(s);
            continue;
        }

        let inv = 255u16 - a;
        d[0] = (s[0] as u16 + mul_div255_u16(bg_r, inv)).min(255) as u8;
        d[1] = (s[1] as u16 + mul_div255_u16(bg_g, inv)).min(255) as u8;
        d[2] = (s[2] as u16 + mul_div255_u16(bg_b, inv)).min(255) as u8;
        d[3] = 255;
    }

    Ok(())
}

/// Ensure the parent directory of `path` exists.
pub fn ensure_parent_dir(path: &Path) -> ConvertResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `bin -version` runs successfully.
pub fn is_tool_available(bin: &Path) -> bool {
    Command::new(bin)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
