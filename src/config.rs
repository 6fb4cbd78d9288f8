use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub oscilloscope: OscilloscopeConfig,
    #[serde(default)]
    pub visual: VisualConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_bands")]
    pub bands: usize,
    #[serde(default = "default_min_frequency")]
    pub min_frequency: f32,
    #[serde(default = "default_bass_cutoff")]
    pub bass_cutoff: f32,
    /// Smoothing coefficient of the lowest band (slowest response)
    #[serde(default = "default_smoothing_low")]
    pub smoothing_low: f32,
    /// Smoothing coefficient of the highest band (fastest response)
    #[serde(default = "default_smoothing_high")]
    pub smoothing_high: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OscilloscopeConfig {
    #[serde(default = "default_osc_window")]
    pub window: usize,
    #[serde(default = "default_osc_points")]
    pub points: usize,
    #[serde(default = "default_osc_smoothing")]
    pub smoothing: f32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct VisualConfig {
    #[serde(default = "default_min_bar_height")]
    pub min_bar_height: f32,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
    #[serde(default = "default_bar_y_offset")]
    pub bar_y_offset: f32,
    #[serde(default = "default_bar_spacing")]
    pub bar_spacing: f32,
    #[serde(default = "default_osc_base_y")]
    pub osc_base_y: f32,
    #[serde(default = "default_osc_amplitude")]
    pub osc_amplitude: f32,
    #[serde(default = "default_pastel_strength")]
    pub pastel_strength: f32,
    #[serde(default = "default_pastel_tint")]
    pub pastel_tint: [f32; 3],
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: f32,
    #[serde(default)]
    pub looping: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            bands: default_bands(),
            min_frequency: default_min_frequency(),
            bass_cutoff: default_bass_cutoff(),
            smoothing_low: default_smoothing_low(),
            smoothing_high: default_smoothing_high(),
        }
    }
}

impl Default for OscilloscopeConfig {
    fn default() -> Self {
        Self {
            window: default_osc_window(),
            points: default_osc_points(),
            smoothing: default_osc_smoothing(),
        }
    }
}

impl Default for VisualConfig {
    fn default() -> Self {
        Self {
            min_bar_height: default_min_bar_height(),
            scale_factor: default_scale_factor(),
            bar_y_offset: default_bar_y_offset(),
            bar_spacing: default_bar_spacing(),
            osc_base_y: default_osc_base_y(),
            osc_amplitude: default_osc_amplitude(),
            pastel_strength: default_pastel_strength(),
            pastel_tint: default_pastel_tint(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            looping: false,
        }
    }
}

fn default_fft_size() -> usize { 4096 }
fn default_bands() -> usize { 128 }
fn default_min_frequency() -> f32 { 20.0 }
fn default_bass_cutoff() -> f32 { 320.0 }
fn default_smoothing_low() -> f32 { 0.75 }
fn default_smoothing_high() -> f32 { 0.35 }
fn default_osc_window() -> usize { 2048 }
fn default_osc_points() -> usize { 128 }
fn default_osc_smoothing() -> f32 { 0.5 }
fn default_min_bar_height() -> f32 { 0.05 }
fn default_scale_factor() -> f32 { 7.0 }
fn default_bar_y_offset() -> f32 { -13.0 }
fn default_bar_spacing() -> f32 { 0.35 }
fn default_osc_base_y() -> f32 { 10.0 }
fn default_osc_amplitude() -> f32 { 3.0 }
fn default_pastel_strength() -> f32 { 0.1 }
fn default_pastel_tint() -> [f32; 3] { [0.96, 0.96, 0.94] }
fn default_fps() -> f32 { 120.0 }

impl Config {
    pub fn validate(&self) -> Result<()> {
        let a = &self.analysis;
        if a.bands == 0 {
            bail!("analysis.bands must be at least 1");
        }
        if a.fft_size == 0 {
            bail!("analysis.fft_size must be at least 1");
        }
        if !(a.min_frequency > 0.0) {
            bail!("analysis.min_frequency must be positive, got {}", a.min_frequency);
        }
        check_smoothing("analysis.smoothing_low", a.smoothing_low)?;
        check_smoothing("analysis.smoothing_high", a.smoothing_high)?;
        if a.smoothing_low < a.smoothing_high {
            bail!(
                "analysis.smoothing_low ({}) must not be below smoothing_high ({}): low bands respond slowest",
                a.smoothing_low,
                a.smoothing_high
            );
        }

        let o = &self.oscilloscope;
        if o.window == 0 || o.points == 0 {
            bail!("oscilloscope.window and oscilloscope.points must be at least 1");
        }
        check_smoothing("oscilloscope.smoothing", o.smoothing)?;

        if !(self.playback.fps > 0.0 && self.playback.fps.is_finite()) {
            bail!("playback.fps must be positive, got {}", self.playback.fps);
        }
        Ok(())
    }
}

fn check_smoothing(name: &str, value: f32) -> Result<()> {
    if !(0.0..1.0).contains(&value) {
        bail!("{} must be in [0, 1), got {}", name, value);
    }
    Ok(())
}

/// Explicit path if given, else `./auralis.toml`, `~/.config/auralis/config.toml`, or the
/// platform config directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("auralis.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("auralis").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("auralis").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

/// Load the explicit or discovered config. An explicit file that fails to load is an error; a
/// discovered one falls back to defaults.
pub fn resolve_config(explicit: Option<&Path>) -> Result<Config> {
    let Some(path) = find_config(explicit) else {
        return Ok(Config::default());
    };
    match load_config(&path) {
        Some(config) => {
            log::info!("Loaded config from {}", path.display());
            Ok(config)
        }
        None if explicit.is_some() => bail!("Failed to load config from {}", path.display()),
        None => {
            log::warn!("Failed to load config from {}, using defaults", path.display());
            Ok(Config::default())
        }
    }
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}
