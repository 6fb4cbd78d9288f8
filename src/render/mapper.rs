use serde::Serialize;

use crate::audio::features::FrameFeatures;
use crate::config::VisualConfig;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BarRecord {
    pub x: f32,
    /// Band centre frequency in Hz
    pub frequency: f32,
    pub height: f32,
    /// Vertical centre of the bar
    pub y: f32,
    pub color: [u8; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PointRecord {
    pub x: f32,
    pub y: f32,
}

/// Everything the visual sink needs for one frame.
#[derive(Clone, Debug, Serialize)]
pub struct VisualFrame {
    pub frame: u64,
    /// Playback position in seconds
    pub time: f32,
    pub bars: Vec<BarRecord>,
    pub points: Vec<PointRecord>,
    /// Ambient light colour; all three channels carry the brightness
    pub light: [f32; 3],
    /// Low-frequency energy behind the brightness (0.0-1.0)
    pub bass: f32,
    /// Mean band level behind the brightness (0.0-1.0)
    pub energy: f32,
}

/// Stateless mapping from normalized features to scene attributes.
pub struct ParameterMapper {
    visual: VisualConfig,
    frequencies: Vec<f32>,
    start_x: f32,
    width: f32,
}

impl ParameterMapper {
    /// Bars are laid out `bar_spacing` apart and centred on x = 0; oscilloscope points span the
    /// same width.
    pub fn new(visual: VisualConfig, band_centers: Vec<f32>) -> Self {
        let width = band_centers.len().saturating_sub(1) as f32 * visual.bar_spacing;
        Self {
            start_x: -width / 2.0,
            width,
            visual,
            frequencies: band_centers,
        }
    }

    pub fn bar_x(&self, index: usize) -> f32 {
        self.start_x + index as f32 * self.visual.bar_spacing
    }

    pub fn bar_height(&self, value: f32) -> f32 {
        self.visual.min_bar_height + value * self.visual.scale_factor
    }

    pub fn bar_center_y(&self, height: f32) -> f32 {
        height / 2.0 + self.visual.bar_y_offset
    }

    /// Green (0) to red (1) gradient blended with the pastel tint, quantized to 8 bits.
    pub fn bar_color(&self, value: f32) -> [u8; 3] {
        let v = value.clamp(0.0, 1.0);
        let base = [v, 1.0 - v, 0.0];
        let strength = self.visual.pastel_strength;
        let tint = self.visual.pastel_tint;
        let mut rgb = [0u8; 3];
        for (out, (b, t)) in rgb.iter_mut().zip(base.iter().zip(tint.iter())) {
            let c = b * (1.0 - strength) + t * strength;
            *out = (c.clamp(0.0, 1.0) * 255.0) as u8;
        }
        rgb
    }

    pub fn point_x(&self, slot: f32) -> f32 {
        self.start_x + slot * self.width
    }

    pub fn point_y(&self, value: f32) -> f32 {
        self.visual.osc_base_y + value * self.visual.osc_amplitude
    }

    pub fn map(&self, features: &FrameFeatures, frame: u64, time: f32) -> VisualFrame {
        let bars = features
            .bands
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let height = self.bar_height(v);
                BarRecord {
                    x: self.bar_x(i),
                    frequency: self.frequencies.get(i).copied().unwrap_or(0.0),
                    height,
                    y: self.bar_center_y(height),
                    color: self.bar_color(v),
                }
            })
            .collect();

        let points = features
            .oscilloscope
            .iter()
            .zip(&features.oscilloscope_x)
            .map(|(&v, &slot)| PointRecord {
                x: self.point_x(slot),
                y: self.point_y(v),
            })
            .collect();

        let b = features.brightness;
        VisualFrame {
            frame,
            time,
            bars,
            points,
            light: [b, b, b],
            bass: features.bass,
            energy: features.overall_energy,
        }
    }
}
