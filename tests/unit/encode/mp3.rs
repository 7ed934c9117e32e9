use super::*;

#[derive(Default)]
struct CountingEncoder {
    calls: Vec<usize>,
    samples: Vec<i16>,
    flushes: usize,
}

impl PcmEncoder for CountingEncoder {
    fn encode_interleaved(&mut self, samples: &[i16]) -> ConvertResult<()> {
        assert_eq!(self.flushes, 0, "encode after flush");
        self.calls.push(samples.len());
        self.samples.extend_from_slice(samples);
        Ok(())
    }

    fn flush(&mut self) -> ConvertResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

fn write_wav(path: &Path, spec: hound::WavSpec, frames: usize) {
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames * usize::from(spec.channels) {
        match spec.sample_format {
            hound::SampleFormat::Int => w.write_sample((i % 1000) as i16).unwrap(),
            hound::SampleFormat::Float => w.write_sample(0.5f32).unwrap(),
        }
    }
    w.finalize().unwrap();
}

fn stereo_16() -> hound::WavSpec {
    hound::WavSpec {
        channels: 2,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    }
}

#[test]
fn chunks_are_fixed_size_and_flush_happens_once() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("in.wav");
    let frames = PCM_CHUNK_FRAMES * 2 + 100;
    write_wav(&wav, stereo_16(), frames);

    let mut enc = CountingEncoder::default();
    let n = encode_wav(&wav, &mut enc, &CancelToken::new()).unwrap();

    assert_eq!(n, frames as u64);
    assert_eq!(enc.flushes, 1);
    assert_eq!(
        enc.calls,
        vec![PCM_CHUNK_FRAMES * 2, PCM_CHUNK_FRAMES * 2, 200]
    );
    assert_eq!(enc.samples[..3], [0, 1, 2]);
}

#[test]
fn empty_wav_still_flushes_once() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("empty.wav");
    write_wav(&wav, stereo_16(), 0);

    let mut enc = CountingEncoder::default();
    assert_eq!(encode_wav(&wav, &mut enc, &CancelToken::new()).unwrap(), 0);
    assert!(enc.calls.is_empty());
    assert_eq!(enc.flushes, 1);
}

#[test]
fn float_samples_are_converted() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("f.wav");
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 8_000,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    write_wav(&wav, spec, 10);

    let mut enc = CountingEncoder::default();
    encode_wav(&wav, &mut enc, &CancelToken::new()).unwrap();
    assert!(enc.samples.iter().all(|s| *s == 16384));
}

#[test]
fn cancelled_encode_never_flushes() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("in.wav");
    write_wav(&wav, stereo_16(), 16);

    let token = CancelToken::new();
    token.cancel();
    let mut enc = CountingEncoder::default();
    let err = encode_wav(&wav, &mut enc, &token).unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(enc.flushes, 0);
}

#[test]
fn non_wav_input_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let bogus = dir.path().join("x.wav");
    std::fs::write(&bogus, b"definitely not riff").unwrap();
    let mut enc = CountingEncoder::default();
    assert!(matches!(
        encode_wav(&bogus, &mut enc, &CancelToken::new()),
        Err(ConvertError::Input(_))
    ));
}

#[test]
fn wav_info_reads_header() {
    let dir = tempfile::tempdir().unwrap();
    let wav = dir.path().join("in.wav");
    write_wav(&wav, stereo_16(), 441);
    let info = read_wav_info(&wav).unwrap();
    assert_eq!(info.sample_rate, 44_100);
    assert_eq!(info.channels, 2);
    assert_eq!(info.frames, 441);
}

#[test]
fn bit_depth_conversion() {
    assert_eq!(int_to_i16(1 << 22, 24), 16384);
    assert_eq!(int_to_i16(127, 8), 127 << 8);
    assert_eq!(f32_to_i16(2.0), i16::MAX);
    assert_eq!(f32_to_i16(-1.0), -i16::MAX);
}
