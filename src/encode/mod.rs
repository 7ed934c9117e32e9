//! Encoders and export sessions.
//!
//! Heavy lifting goes to the system `ffmpeg`; this module owns the process plumbing, the MP3 PCM
//! loop and the still/animated image writers.

/// Frame sinks streaming into `ffmpeg`.
pub mod ffmpeg;
/// Animated GIF writer.
pub mod gif;
/// Still-image encoders.
pub mod image;
/// WAV to MP3 chunk loop.
pub mod mp3;
/// Minimal single-image PDF writer.
pub mod pdf;
/// Cancellable `ffmpeg` jobs and output naming.
pub mod session;
