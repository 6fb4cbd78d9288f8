use super::finite_or;
use super::spectrum::Spectrum;

const BASS_DB_EPSILON: f32 = 1e-9;
/// Mean bass level (absolute dB) that maps to 0; 0 dB maps to 1.
const BASS_DB_FLOOR: f32 = -60.0;

/// Normalized low-frequency energy from the bins at or below a cutoff.
pub struct BassEstimator {
    bins: usize,
}

impl BassEstimator {
    /// `frequencies` must be ascending, as produced by the spectral analyzer.
    pub fn new(frequencies: &[f32], cutoff: f32) -> Self {
        let bins = frequencies.iter().take_while(|&&f| f <= cutoff).count().max(1);
        Self { bins }
    }

    /// Number of spectrum bins included in the estimate.
    pub fn bins(&self) -> usize {
        self.bins
    }

    /// Bass level in [0, 1]; 0 for an empty spectrum.
    pub fn estimate(&self, spectrum: &Spectrum<'_>) -> f32 {
        if spectrum.is_empty() {
            return 0.0;
        }
        let count = self.bins.min(spectrum.len());
        if count == 0 {
            return 0.0;
        }
        let mean_db = spectrum.magnitudes[..count]
            .iter()
            .map(|&m| 20.0 * (m.max(0.0) + BASS_DB_EPSILON).log10())
            .sum::<f32>()
            / count as f32;

        finite_or((mean_db - BASS_DB_FLOOR) / -BASS_DB_FLOOR, 0.0).clamp(0.0, 1.0)
    }
}

/// Scene brightness from the mean band level and the bass estimate.
pub fn brightness(overall_energy: f32, bass: f32) -> f32 {
    finite_or(0.3 + overall_energy * 0.9 + bass * 0.4, 0.3).clamp(0.05, 1.5)
}
