/// Still-image, PCM and streamed frame decoding.
pub mod decode;
/// `ffprobe` metadata.
pub mod probe;
