use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

/// Magnitude spectrum of one analysis window. `magnitudes[k]` belongs to `frequencies[k]` Hz.
#[derive(Debug)]
pub struct Spectrum<'a> {
    pub magnitudes: Vec<f32>,
    pub frequencies: &'a [f32],
}

impl Spectrum<'_> {
    pub fn len(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitudes.is_empty()
    }

    /// Spacing between adjacent bins in Hz.
    pub fn bin_width(&self) -> f32 {
        if self.frequencies.len() > 1 {
            self.frequencies[1] - self.frequencies[0]
        } else {
            0.0
        }
    }
}

/// Hann-windowed real FFT of a fixed size, planned once.
pub struct SpectralAnalyzer {
    size: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    frequencies: Vec<f32>,
    scratch: Vec<Complex<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(size: usize, sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(size);
        let bin_hz = sample_rate as f32 / size as f32;
        let frequencies = (0..=size / 2).map(|k| k as f32 * bin_hz).collect();

        Self {
            size,
            fft,
            window: hann_window(size),
            frequencies,
            scratch: vec![Complex::new(0.0, 0.0); size],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Bin centre frequencies, `size / 2 + 1` entries from 0 Hz to Nyquist.
    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Window `samples` (must be `size` long) and return `size / 2 + 1` magnitudes.
    pub fn analyze(&mut self, samples: &[f32]) -> Spectrum<'_> {
        debug_assert_eq!(samples.len(), self.size);

        for ((slot, &s), &w) in self.scratch.iter_mut().zip(samples).zip(&self.window) {
            *slot = Complex::new(s * w, 0.0);
        }
        self.fft.process(&mut self.scratch);

        let magnitudes = self.scratch[..self.frequencies.len()]
            .iter()
            .map(|c| {
                let m = c.norm();
                if m.is_finite() {
                    m
                } else {
                    0.0
                }
            })
            .collect();

        Spectrum {
            magnitudes,
            frequencies: &self.frequencies,
        }
    }
}

/// Symmetric Hann window, matching the usual `hanning(size)` definition.
pub fn hann_window(size: usize) -> Vec<f32> {
    if size == 1 {
        return vec![1.0];
    }
    (0..size)
        .map(|i| {
            0.5 * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos())
        })
        .collect()
}
