use std::path::{Path, PathBuf};

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{
    CodecType, DecoderOptions, CODEC_TYPE_NULL, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S32LE,
    CODEC_TYPE_PCM_U8,
};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

/// Integer PCM encodings the analyzer accepts: 8-bit unsigned, 16/32-bit signed.
const SUPPORTED_CODECS: [CodecType; 3] =
    [CODEC_TYPE_PCM_U8, CODEC_TYPE_PCM_S16LE, CODEC_TYPE_PCM_S32LE];

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open audio file {path}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to probe audio format")]
    Probe(#[source] SymphoniaError),
    #[error("no audio tracks found")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownSampleRate,
    #[error("unsupported sample encoding: {codec} ({bits} bits per sample)")]
    UnsupportedEncoding { codec: String, bits: String },
    #[error("audio stream contains no samples")]
    Empty,
    #[error("failed to decode audio")]
    Decode(#[source] SymphoniaError),
}

/// Decoded mono waveform. Immutable once constructed.
#[derive(Clone, Debug)]
pub struct WaveformBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl WaveformBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, DecodeError> {
        if samples.is_empty() {
            return Err(DecodeError::Empty);
        }
        if sample_rate == 0 {
            return Err(DecodeError::UnknownSampleRate);
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode an integer-PCM WAV file to mono samples in [-1, 1].
pub fn decode_wav(path: &Path) -> Result<WaveformBuffer, DecodeError> {
    let file = std::fs::File::open(path).map_err(|source| DecodeError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(DecodeError::Probe)?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let params = &track.codec_params;
    if !SUPPORTED_CODECS.contains(&params.codec) {
        return Err(DecodeError::UnsupportedEncoding {
            codec: codec_name(params.codec),
            bits: params
                .bits_per_sample
                .map_or_else(|| "unknown".to_string(), |b| b.to_string()),
        });
    }

    let track_id = track.id;
    let channels = params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = params.sample_rate.ok_or(DecodeError::UnknownSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(DecodeError::Decode)?;

    let mut mono: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping undecodable packet: {}", msg);
                continue;
            }
            Err(e) => return Err(DecodeError::Decode(e)),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        downmix_into(sample_buf.samples(), channels, &mut mono);
    }

    let buffer = WaveformBuffer::new(mono, sample_rate)?;

    log::info!(
        "Decoded audio: {} samples, {}Hz, {} channel(s), {:.1}s",
        buffer.len(),
        sample_rate,
        channels,
        buffer.duration()
    );

    Ok(buffer)
}

/// Average interleaved frames to mono, appending to `out`.
fn downmix_into(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels == 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32),
    );
}

fn codec_name(codec: CodecType) -> String {
    symphonia::default::get_codecs()
        .get_codec(codec)
        .map_or_else(|| format!("{:?}", codec), |d| d.short_name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn write_wav(dir: &Path, name: &str, spec: hound::WavSpec, frames: &[Vec<i32>]) -> PathBuf {
        let path = dir.join(name);
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                match spec.bits_per_sample {
                    8 => writer.write_sample(s as i8).unwrap(),
                    16 => writer.write_sample(s as i16).unwrap(),
                    _ => writer.write_sample(s).unwrap(),
                }
            }
        }
        writer.finalize().unwrap();
        path
    }

    fn spec(channels: u16, bits: u16) -> hound::WavSpec {
        hound::WavSpec {
            channels,
            sample_rate: 44100,
            bits_per_sample: bits,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn decodes_16bit_mono() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<Vec<i32>> = vec![vec![0], vec![16384], vec![-16384], vec![0]];
        let path = write_wav(dir.path(), "mono16.wav", spec(1, 16), &frames);

        let buffer = decode_wav(&path).unwrap();
        assert_eq!(buffer.sample_rate(), 44100);
        assert_eq!(buffer.len(), 4);
        assert_abs_diff_eq!(buffer.samples()[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(buffer.samples()[2], -0.5, epsilon = 1e-4);
    }

    #[test]
    fn averages_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let frames: Vec<Vec<i32>> = vec![vec![16384, 0], vec![16384, 16384], vec![-16384, 16384]];
        let path = write_wav(dir.path(), "stereo16.wav", spec(2, 16), &frames);

        let buffer = decode_wav(&path).unwrap();
        assert_eq!(buffer.len(), 3);
        assert_abs_diff_eq!(buffer.samples()[0], 0.25, epsilon = 1e-4);
        assert_abs_diff_eq!(buffer.samples()[1], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(buffer.samples()[2], 0.0, epsilon = 1e-4);
    }

    #[test]
    fn decodes_8bit_and_32bit() {
        let dir = tempfile::tempdir().unwrap();

        let path8 = write_wav(dir.path(), "mono8.wav", spec(1, 8), &[vec![64], vec![-64]]);
        let buffer8 = decode_wav(&path8).unwrap();
        assert_abs_diff_eq!(buffer8.samples()[0], 0.5, epsilon = 1e-2);
        assert_abs_diff_eq!(buffer8.samples()[1], -0.5, epsilon = 1e-2);

        let half = 1 << 30;
        let path32 = write_wav(dir.path(), "mono32.wav", spec(1, 32), &[vec![half], vec![-half]]);
        let buffer32 = decode_wav(&path32).unwrap();
        assert_abs_diff_eq!(buffer32.samples()[0], 0.5, epsilon = 1e-4);
        assert_abs_diff_eq!(buffer32.samples()[1], -0.5, epsilon = 1e-4);
    }

    #[test]
    fn rejects_24bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_wav(dir.path(), "mono24.wav", spec(1, 24), &[vec![1000], vec![-1000]]);

        let err = decode_wav(&path).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedEncoding { .. }), "{err}");
    }

    #[test]
    fn rejects_float_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("float.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        writer.write_sample(0.25f32).unwrap();
        writer.finalize().unwrap();

        let err = decode_wav(&path).unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedEncoding { .. }), "{err}");
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = decode_wav(Path::new("/nonexistent/input.wav")).unwrap_err();
        assert!(matches!(err, DecodeError::Open { .. }));
    }

    #[test]
    fn empty_buffer_rejected() {
        assert!(matches!(WaveformBuffer::new(Vec::new(), 44100), Err(DecodeError::Empty)));
        assert!(matches!(
            WaveformBuffer::new(vec![0.0], 0),
            Err(DecodeError::UnknownSampleRate)
        ));
    }
}
