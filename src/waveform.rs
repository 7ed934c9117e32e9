//! Amplitude envelopes for waveform displays.

use std::path::{Path, PathBuf};
use std::sync::mpsc;

use rayon::prelude::*;

use crate::assets::decode::decode_audio_f32;
use crate::foundation::error::ConvertResult;

/// Mono decode rate used for envelopes; high enough for a few thousand bars.
pub const WAVEFORM_SAMPLE_RATE: u32 = 22_050;

/// Absolute value of every sample.
pub fn extract_amplitudes(samples: &[f32]) -> Vec<f32> {
    samples
        .iter()
        .map(|s| if s.is_finite() { s.abs() } else { 0.0 })
        .collect()
}

/// Reduce `data` to exactly `target` values.
///
/// With fewer targets than samples, value `i` is the maximum over
/// `[i*len/target, (i+1)*len/target)`. Otherwise each value is the sample nearest to its slot
/// centre. Empty input or `target == 0` gives an empty vector.
pub fn downsample(data: &[f32], target: usize) -> Vec<f32> {
    let len = data.len();
    if len == 0 || target == 0 {
        return Vec::new();
    }
    if target >= len {
        return (0..target)
            .map(|i| data[((2 * i + 1) * len / (2 * target)).min(len - 1)])
            .collect();
    }
    (0..target)
        .into_par_iter()
        .map(|i| {
            let start = i * len / target;
            let end = ((i + 1) * len / target).max(start + 1);
            data[start..end].iter().copied().fold(0.0f32, f32::max)
        })
        .collect()
}

/// Decode the audio of `path` and reduce it to `samples` amplitudes.
#[tracing::instrument(level = "debug", skip(ffmpeg))]
pub fn amplitudes(ffmpeg: &Path, path: &Path, samples: usize) -> ConvertResult<Vec<f32>> {
    let pcm = decode_audio_f32(ffmpeg, path, WAVEFORM_SAMPLE_RATE, 1)?;
    let env = downsample(&extract_amplitudes(&pcm.interleaved_f32), samples);
    tracing::debug!(decoded = pcm.frames(), out = env.len(), "waveform ready");
    Ok(env)
}

/// Like [`amplitudes`], but any failure yields an empty envelope.
pub fn amplitudes_or_empty(ffmpeg: &Path, path: &Path, samples: usize) -> Vec<f32> {
    amplitudes(ffmpeg, path, samples).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "waveform unavailable");
        Vec::new()
    })
}

/// Compute [`amplitudes`] on a worker thread; the result arrives on the returned channel.
pub fn spawn_amplitudes(
    ffmpeg: PathBuf,
    path: PathBuf,
    samples: usize,
) -> mpsc::Receiver<ConvertResult<Vec<f32>>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        // The receiver may be gone if the caller lost interest.
        let _ = tx.send(amplitudes(&ffmpeg, &path, samples));
    });
    rx
}
