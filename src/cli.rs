use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "auralis",
    about = "Turn a WAV file into a per-frame stream of spectrum bar, oscilloscope and lighting parameters"
)]
pub struct Cli {
    /// Input WAV file (8/16/32-bit integer PCM)
    pub input: PathBuf,

    /// Output for JSON Lines frame records ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Config file (defaults to auralis.toml or ~/.config/auralis/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Frames per second [config: playback.fps, default 120]
    #[arg(long)]
    pub fps: Option<f32>,

    /// Wrap playback at the end of the waveform instead of stopping
    #[arg(long = "loop")]
    pub looping: bool,

    /// Render as fast as possible, stepping the cursor by sample_rate / fps per frame
    #[arg(long)]
    pub offline: bool,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Number of spectrum bars [config: analysis.bands, default 128]
    #[arg(long)]
    pub bands: Option<usize>,

    /// Number of oscilloscope points [config: oscilloscope.points, default 128]
    #[arg(long)]
    pub points: Option<usize>,
}
