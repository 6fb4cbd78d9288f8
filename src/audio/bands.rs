use thiserror::Error;

use super::spectrum::Spectrum;
use super::{finite_or, smooth};

/// Added to band magnitudes before taking the log.
const BAND_DB_EPSILON: f32 = 1e-8;
/// Relative dB span mapped onto [0, 1]; anything quieter than this below the frame peak is 0.
const BAND_DB_RANGE: f32 = 40.0;

#[derive(Debug, Error, PartialEq)]
pub enum LayoutError {
    #[error("band count must be at least 1")]
    NoBands,
    #[error("nyquist frequency {nyquist} Hz must exceed minimum frequency {min} Hz")]
    NyquistBelowMinimum { min: f32, nyquist: f32 },
}

/// Log-spaced band edges between `min_freq` and Nyquist, with geometric-mean centres.
#[derive(Clone, Debug)]
pub struct BandLayout {
    boundaries: Vec<f32>,
    centers: Vec<f32>,
}

impl BandLayout {
    pub fn new(count: usize, min_freq: f32, sample_rate: u32) -> Result<Self, LayoutError> {
        if count == 0 {
            return Err(LayoutError::NoBands);
        }
        let nyquist = sample_rate as f32 / 2.0;
        if !(min_freq > 0.0 && nyquist > min_freq) {
            return Err(LayoutError::NyquistBelowMinimum {
                min: min_freq,
                nyquist,
            });
        }

        let log_min = (min_freq as f64).log10();
        let log_max = (nyquist as f64).log10();
        let mut boundaries: Vec<f32> = (0..=count)
            .map(|i| {
                let t = i as f64 / count as f64;
                10f64.powf(log_min + (log_max - log_min) * t) as f32
            })
            .collect();
        // Pin the ends so rounding in powf never leaks past the requested span.
        boundaries[0] = min_freq;
        boundaries[count] = nyquist;

        let centers = boundaries
            .windows(2)
            .map(|pair| ((pair[0] as f64) * (pair[1] as f64)).sqrt() as f32)
            .collect();

        Ok(Self {
            boundaries,
            centers,
        })
    }

    pub fn boundaries(&self) -> &[f32] {
        &self.boundaries
    }

    pub fn centers(&self) -> &[f32] {
        &self.centers
    }

    pub fn len(&self) -> usize {
        self.centers.len()
    }
}

/// Per-band smoothing coefficients, linearly spaced from `low` (first band) to `high` (last).
pub fn smoothing_ramp(count: usize, low: f32, high: f32) -> Vec<f32> {
    match count {
        0 => Vec::new(),
        1 => vec![low],
        _ => (0..count)
            .map(|i| low + (high - low) * i as f32 / (count - 1) as f32)
            .collect(),
    }
}

/// One visual band: fixed centre and smoothing coefficient, mutable smoothed value in [0, 1].
#[derive(Clone, Debug)]
pub struct FrequencyBand {
    pub center: f32,
    pub smoothing: f32,
    pub value: f32,
}

/// Maps a magnitude spectrum onto log-spaced bands with relative-dB normalization.
pub struct BandMapper {
    layout: BandLayout,
    bands: Vec<FrequencyBand>,
}

impl BandMapper {
    pub fn new(layout: BandLayout, smoothing_low: f32, smoothing_high: f32) -> Self {
        let coefficients = smoothing_ramp(layout.len(), smoothing_low, smoothing_high);
        let bands = layout
            .centers()
            .iter()
            .zip(coefficients)
            .map(|(&center, smoothing)| FrequencyBand {
                center,
                smoothing,
                value: 0.0,
            })
            .collect();
        Self { layout, bands }
    }

    pub fn layout(&self) -> &BandLayout {
        &self.layout
    }

    pub fn bands(&self) -> &[FrequencyBand] {
        &self.bands
    }

    pub fn values(&self) -> impl Iterator<Item = f32> + '_ {
        self.bands.iter().map(|b| b.value)
    }

    /// Mean of the current smoothed band values.
    pub fn overall_energy(&self) -> f32 {
        if self.bands.is_empty() {
            return 0.0;
        }
        self.values().sum::<f32>() / self.bands.len() as f32
    }

    /// Unsmoothed per-band values for this spectrum, each in [0, 1].
    pub fn normalize(&self, spectrum: &Spectrum<'_>) -> Vec<f32> {
        let spline = CubicSpline::uniform(spectrum.bin_width(), &spectrum.magnitudes);

        let db: Vec<f32> = self
            .layout
            .centers()
            .iter()
            .map(|&f| {
                let mag = finite_or(spline.eval(f), 0.0).max(0.0);
                20.0 * (mag + BAND_DB_EPSILON).log10()
            })
            .collect();

        let max_db = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let max_db = if max_db.is_finite() { max_db } else { 0.0 };

        db.into_iter()
            .map(|d| {
                let rel = d - max_db;
                finite_or((rel + BAND_DB_RANGE) / BAND_DB_RANGE, 0.0).clamp(0.0, 1.0)
            })
            .collect()
    }

    /// Fold this frame's spectrum into the smoothed band values.
    pub fn update(&mut self, spectrum: &Spectrum<'_>) {
        let fresh = self.normalize(spectrum);
        for (band, new) in self.bands.iter_mut().zip(fresh) {
            band.value = finite_or(smooth(band.value, new, band.smoothing), 0.0).clamp(0.0, 1.0);
        }
    }
}

/// Not-a-knot cubic spline through uniformly spaced knots at `x = k * step`.
///
/// Evaluating outside `[0, (n - 1) * step]` yields 0. Fewer than three knots interpolate
/// linearly; exactly three give the parabola through them.
struct CubicSpline<'a> {
    step: f32,
    values: &'a [f32],
    second: Vec<f32>,
}

impl<'a> CubicSpline<'a> {
    fn uniform(step: f32, values: &'a [f32]) -> Self {
        let n = values.len();
        let mut second = vec![0.0f32; n];
        if n >= 3 && step > 0.0 {
            solve_not_a_knot(step, values, &mut second);
        }
        Self {
            step,
            values,
            second,
        }
    }

    fn eval(&self, x: f32) -> f32 {
        let n = self.values.len();
        if n == 0 || x < 0.0 {
            return 0.0;
        }
        if n == 1 || self.step <= 0.0 {
            return if x == 0.0 { self.values[0] } else { 0.0 };
        }
        let last = (n - 1) as f32 * self.step;
        if x > last {
            return 0.0;
        }

        let h = self.step;
        let k = ((x / h) as usize).min(n - 2);
        let x0 = k as f32 * h;
        let a = (x0 + h - x) / h;
        let b = (x - x0) / h;
        let (y0, y1) = (self.values[k], self.values[k + 1]);
        let (m0, m1) = (self.second[k], self.second[k + 1]);

        a * y0 + b * y1 + ((a * a * a - a) * m0 + (b * b * b - b) * m1) * h * h / 6.0
    }
}

/// Second derivatives `M` for uniform knots, `n >= 3`.
///
/// Interior rows are `M[i-1] + 4 M[i] + M[i+1] = r[i]` with `r[i] = 6/h^2 (y[i+1] - 2y[i] + y[i-1])`.
/// Not-a-knot ends (`M[0] = 2 M[1] - M[2]` and its mirror) collapse the first and last rows to
/// `6 M[1] = r[1]` and `6 M[n-2] = r[n-2]`; the knots between are solved with the Thomas
/// algorithm.
fn solve_not_a_knot(step: f32, values: &[f32], second: &mut [f32]) {
    let n = values.len();
    let scale = 6.0 / (step * step);
    let r = |i: usize| scale * (values[i + 1] - 2.0 * values[i] + values[i - 1]);

    if n == 3 {
        second.fill(r(1) / 6.0);
        return;
    }

    second[1] = r(1) / 6.0;
    second[n - 2] = r(n - 2) / 6.0;

    // Unknowns M[2..=n-3]
    let m = n - 4;
    let mut c_prime = vec![0.0f32; m];
    let mut d_prime = vec![0.0f32; m];
    for j in 0..m {
        let i = j + 2;
        let mut rhs = r(i);
        if j == 0 {
            rhs -= second[1];
        }
        if j + 1 == m {
            rhs -= second[n - 2];
        }
        if j == 0 {
            c_prime[0] = 1.0 / 4.0;
            d_prime[0] = rhs / 4.0;
        } else {
            let denom = 4.0 - c_prime[j - 1];
            c_prime[j] = 1.0 / denom;
            d_prime[j] = (rhs - d_prime[j - 1]) / denom;
        }
    }
    for j in (0..m).rev() {
        let next = if j + 1 < m { second[j + 3] } else { 0.0 };
        second[j + 2] = d_prime[j] - c_prime[j] * next;
    }

    second[0] = 2.0 * second[1] - second[2];
    second[n - 1] = 2.0 * second[n - 2] - second[n - 3];
}
