use anyhow::{Context, Result};

use super::bands::{BandLayout, BandMapper};
use super::bass::{brightness, BassEstimator};
use super::decode::WaveformBuffer;
use super::features::FrameFeatures;
use super::oscilloscope::OscilloscopeSampler;
use super::spectrum::SpectralAnalyzer;
use super::window::read_window_into;
use crate::config::AnalysisConfig;
use crate::config::OscilloscopeConfig;

/// Spectral windows shorter than this are raised to it.
pub const MIN_FFT_SIZE: usize = 1024;

/// All state carried across frames: band values, oscilloscope points and the reusable
/// analysis buffers. One instance per waveform; updated in place once per frame.
pub struct Analyzer {
    spectral: SpectralAnalyzer,
    window: Vec<f32>,
    bands: BandMapper,
    bass: BassEstimator,
    oscilloscope: OscilloscopeSampler,
}

impl Analyzer {
    pub fn new(
        analysis: &AnalysisConfig,
        oscilloscope: &OscilloscopeConfig,
        sample_rate: u32,
    ) -> Result<Self> {
        let fft_size = analysis.fft_size.max(MIN_FFT_SIZE);
        let spectral = SpectralAnalyzer::new(fft_size, sample_rate);

        let layout = BandLayout::new(analysis.bands, analysis.min_frequency, sample_rate)
            .context("Failed to lay out frequency bands")?;
        let bands = BandMapper::new(layout, analysis.smoothing_low, analysis.smoothing_high);
        let bass = BassEstimator::new(spectral.frequencies(), analysis.bass_cutoff);

        let edges = bands.layout().boundaries();
        log::info!(
            "Analysis: fft={} ({:.2} Hz/bin), {} bands {:.0}-{:.0} Hz, {} bass bins <= {:.0} Hz",
            spectral.size(),
            sample_rate as f32 / spectral.size() as f32,
            bands.layout().len(),
            edges[0],
            edges[edges.len() - 1],
            bass.bins(),
            analysis.bass_cutoff
        );

        Ok(Self {
            window: vec![0.0; fft_size],
            spectral,
            bands,
            bass,
            oscilloscope: OscilloscopeSampler::new(
                oscilloscope.window,
                oscilloscope.points,
                oscilloscope.smoothing,
            ),
        })
    }

    /// Centre frequency of each band, lowest first.
    pub fn band_centers(&self) -> Vec<f32> {
        self.bands.bands().iter().map(|b| b.center).collect()
    }

    /// Run one full analysis pass centred on sample `center`.
    ///
    /// The spectral branch and the oscilloscope branch share no mutable state and run in
    /// parallel.
    pub fn process(&mut self, buffer: &WaveformBuffer, center: usize) -> FrameFeatures {
        let samples = buffer.samples();
        let Self {
            spectral,
            window,
            bands,
            bass,
            oscilloscope,
        } = self;

        let (bass_norm, ()) = rayon::join(
            || {
                read_window_into(samples, center, window);
                let spectrum = spectral.analyze(window);
                bands.update(&spectrum);
                bass.estimate(&spectrum)
            },
            || oscilloscope.update(samples, center),
        );

        let overall_energy = bands.overall_energy();

        FrameFeatures {
            bands: bands.values().collect(),
            oscilloscope: oscilloscope.points().iter().map(|p| p.value).collect(),
            oscilloscope_x: oscilloscope.points().iter().map(|p| p.x).collect(),
            bass: bass_norm,
            overall_energy,
            brightness: brightness(overall_energy, bass_norm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer(sample_rate: u32) -> Analyzer {
        Analyzer::new(
            &AnalysisConfig::default(),
            &OscilloscopeConfig::default(),
            sample_rate,
        )
        .unwrap()
    }

    #[test]
    fn silent_waveform_stays_finite() {
        let buffer = WaveformBuffer::new(vec![0.0; 44100], 44100).unwrap();
        let mut analyzer = analyzer(44100);

        for frame in 0..120 {
            let features = analyzer.process(&buffer, frame * 367);
            assert_eq!(features.bands.len(), 128);
            assert_eq!(features.oscilloscope.len(), 128);
            assert!(features.bands.iter().all(|v| v.is_finite() && (0.0..=1.0).contains(v)));
            assert!(features.oscilloscope.iter().all(|v| *v == 0.0));
            assert_eq!(features.bass, 0.0);
            assert!(features.brightness.is_finite());
        }

        let features = analyzer.process(&buffer, 0);
        assert!(features.bands.iter().all(|&v| v > 0.99));
        assert!((features.brightness - (0.3 + 0.9 * features.overall_energy)).abs() < 1e-5);
    }

    #[test]
    fn clipped_input_stays_bounded() {
        let samples: Vec<f32> = (0..30_000).map(|n| if (n / 50) % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let buffer = WaveformBuffer::new(samples, 22050).unwrap();
        let mut analyzer = analyzer(22050);

        for center in (0..40_000).step_by(1234) {
            let features = analyzer.process(&buffer, center);
            assert!(features.bands.iter().all(|v| (0.0..=1.0).contains(v)));
            assert!(features.oscilloscope.iter().all(|v| v.abs() <= 1.0 + 1e-6));
            assert!((0.0..=1.0).contains(&features.bass));
            assert!((0.05..=1.5).contains(&features.brightness));
        }
    }

    #[test]
    fn low_tone_raises_bass() {
        let sr = 44100;
        let samples: Vec<f32> = (0..sr as usize)
            .map(|n| 0.9 * (2.0 * std::f32::consts::PI * 80.0 * n as f32 / sr as f32).sin())
            .collect();
        let buffer = WaveformBuffer::new(samples, sr).unwrap();
        let mut analyzer = analyzer(sr);

        let features = analyzer.process(&buffer, 20_000);
        assert!(features.bass > 0.5, "bass = {}", features.bass);
    }

    #[test]
    fn small_fft_size_is_raised() {
        let config = AnalysisConfig {
            fft_size: 256,
            ..AnalysisConfig::default()
        };
        let analyzer = Analyzer::new(&config, &OscilloscopeConfig::default(), 44100).unwrap();
        assert_eq!(analyzer.spectral.size(), MIN_FFT_SIZE);
    }
}
