/// Normalized per-frame analysis output, before any visual mapping.
#[derive(Clone, Debug, Default)]
pub struct FrameFeatures {
    /// Smoothed band values (0.0-1.0), lowest frequency first
    pub bands: Vec<f32>,
    /// Smoothed oscilloscope amplitudes, peak-normalized per frame
    pub oscilloscope: Vec<f32>,
    /// Horizontal slot of each oscilloscope point (0.0-1.0)
    pub oscilloscope_x: Vec<f32>,
    /// Low-frequency energy (0.0-1.0)
    pub bass: f32,
    /// Mean of the smoothed band values
    pub overall_energy: f32,
    /// Scene brightness (0.05-1.5)
    pub brightness: f32,
}
