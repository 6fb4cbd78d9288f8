use super::window::read_window_into;
use super::{finite_or, smooth};

/// Added to the per-frame peak so silent windows never divide by zero.
const PEAK_EPSILON: f32 = 1e-9;

/// One oscilloscope point: fixed horizontal slot in [0, 1], smoothed peak-normalized amplitude.
#[derive(Clone, Debug)]
pub struct OscillatorPoint {
    pub x: f32,
    pub value: f32,
}

/// Short waveform snippet around the cursor, resampled to a fixed point count.
pub struct OscilloscopeSampler {
    window: Vec<f32>,
    smoothing: f32,
    points: Vec<OscillatorPoint>,
}

impl OscilloscopeSampler {
    pub fn new(window_len: usize, count: usize, smoothing: f32) -> Self {
        let points = (0..count)
            .map(|i| OscillatorPoint {
                x: if count > 1 {
                    i as f32 / (count - 1) as f32
                } else {
                    0.0
                },
                value: 0.0,
            })
            .collect();
        Self {
            window: vec![0.0; window_len],
            smoothing,
            points,
        }
    }

    pub fn points(&self) -> &[OscillatorPoint] {
        &self.points
    }

    pub fn update(&mut self, samples: &[f32], center: usize) {
        read_window_into(samples, center, &mut self.window);
        let resampled = resample_linear(&self.window, self.points.len());
        let normalized = peak_normalize(&resampled);

        for (point, new) in self.points.iter_mut().zip(normalized) {
            point.value = finite_or(smooth(point.value, new, self.smoothing), 0.0);
        }
    }
}

/// Linear interpolation at `count` uniformly spaced positions spanning `input`.
pub fn resample_linear(input: &[f32], count: usize) -> Vec<f32> {
    if input.is_empty() {
        return vec![0.0; count];
    }
    if count == 1 {
        return vec![input[0]];
    }

    let last = (input.len() - 1) as f32;
    (0..count)
        .map(|i| {
            let pos = last * i as f32 / (count - 1) as f32;
            let k = (pos as usize).min(input.len() - 1);
            if k + 1 >= input.len() {
                return input[k];
            }
            let frac = pos - k as f32;
            input[k] + (input[k + 1] - input[k]) * frac
        })
        .collect()
}

/// Divide by the peak absolute value (plus epsilon); output magnitudes stay within 1.
pub fn peak_normalize(values: &[f32]) -> Vec<f32> {
    let peak = values.iter().fold(0.0f32, |acc, v| acc.max(v.abs())) + PEAK_EPSILON;
    values.iter().map(|v| finite_or(v / peak, 0.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn resample_always_yields_requested_count() {
        for &count in &[1usize, 2, 3, 128, 4096] {
            assert_eq!(resample_linear(&vec![0.0; 2048], count).len(), count);
            assert_eq!(resample_linear(&[0.5], count).len(), count);
            assert_eq!(resample_linear(&[], count).len(), count);
        }
    }

    #[test]
    fn resample_endpoints_and_midpoints() {
        let input = [0.0f32, 1.0, 2.0, 3.0, 4.0];
        let out = resample_linear(&input, 9);
        for (i, &v) in out.iter().enumerate() {
            assert_abs_diff_eq!(v, i as f32 * 0.5, epsilon = 1e-6);
        }
    }

    #[test]
    fn peak_normalization() {
        let out = peak_normalize(&[0.25, -0.5, 0.1]);
        assert_abs_diff_eq!(out[0], 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(out[1], -1.0, epsilon = 1e-6);
        assert!(peak_normalize(&[0.0; 8]).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn points_span_unit_interval() {
        let sampler = OscilloscopeSampler::new(64, 5, 0.5);
        let xs: Vec<f32> = sampler.points().iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(OscilloscopeSampler::new(64, 1, 0.5).points()[0].x, 0.0);
    }

    #[test]
    fn silent_window_produces_zeros() {
        let mut sampler = OscilloscopeSampler::new(2048, 128, 0.5);
        sampler.update(&vec![0.0; 10_000], 5_000);
        assert_eq!(sampler.points().len(), 128);
        assert!(sampler.points().iter().all(|p| p.value == 0.0));
    }

    #[test]
    fn values_bounded_by_peak_normalization() {
        let samples: Vec<f32> = (0..20_000).map(|n| (n as f32 * 0.05).sin() * 0.3).collect();
        let mut sampler = OscilloscopeSampler::new(2048, 128, 0.5);
        for center in (0..25_000).step_by(997) {
            sampler.update(&samples, center);
            for p in sampler.points() {
                assert!(p.value.is_finite());
                assert!(p.value.abs() <= 1.0 + 1e-6);
            }
        }
    }

    #[test]
    fn smoothing_halves_toward_target() {
        let samples = vec![0.5f32; 4096];
        let mut sampler = OscilloscopeSampler::new(256, 4, 0.5);
        sampler.update(&samples, 2048);
        for p in sampler.points() {
            assert_abs_diff_eq!(p.value, 0.5, epsilon = 1e-6);
        }
        sampler.update(&samples, 2048);
        for p in sampler.points() {
            assert_abs_diff_eq!(p.value, 0.75, epsilon = 1e-6);
        }
    }
}
