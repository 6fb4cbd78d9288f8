mod audio;
mod cli;
mod config;
mod playback;
mod render;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use audio::analysis::Analyzer;
use cli::Cli;
use playback::{ClockCursor, SteppedCursor};
use render::mapper::ParameterMapper;
use render::sink::JsonLinesSink;
use scheduler::{FramePacer, FrameScheduler};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let mut config = config::resolve_config(cli.config.as_deref())?;

    // CLI flags win over the config file
    if let Some(fps) = cli.fps {
        config.playback.fps = fps;
    }
    if cli.looping {
        config.playback.looping = true;
    }
    if let Some(bands) = cli.bands {
        config.analysis.bands = bands;
    }
    if let Some(points) = cli.points {
        config.oscilloscope.points = points;
    }
    config.validate().context("Invalid configuration")?;

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }
    if cli.offline && config.playback.looping && cli.max_frames.is_none() {
        anyhow::bail!("Offline rendering of a looping waveform needs --max-frames");
    }

    log::info!("auralis - audio-driven visual parameter stream");
    log::info!("Input: {}", cli.input.display());
    log::info!("Output: {}", cli.output.display());

    // 1. Decode audio
    let buffer = audio::decode::decode_wav(&cli.input)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;
    let sample_rate = buffer.sample_rate();
    let duration = buffer.duration();

    // 2. Analysis state and visual mapping
    let analyzer = Analyzer::new(&config.analysis, &config.oscilloscope, sample_rate)?;
    let mapper = ParameterMapper::new(config.visual.clone(), analyzer.band_centers());
    let mut scheduler = FrameScheduler::new(buffer, analyzer, mapper);

    let mut sink = JsonLinesSink::create(&cli.output)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::Relaxed))
            .context("Failed to install Ctrl-C handler")?;
    }

    let fps = config.playback.fps;
    let looping = config.playback.looping;
    log::info!(
        "Scheduler: {:.1} fps, looping={}, mode={}",
        fps,
        looping,
        if cli.offline { "offline" } else { "realtime" }
    );

    // 3. Frame loop
    let summary = if cli.offline {
        let total_frames = cli
            .max_frames
            .unwrap_or_else(|| (duration * fps).ceil() as u64);
        let pb = ProgressBar::new(total_frames);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
                .expect("progress template is valid")
                .progress_chars("=>-"),
        );

        let mut cursor = SteppedCursor::new(sample_rate, fps, looping);
        let summary = scheduler.run_offline(&mut cursor, &mut sink, &stop, cli.max_frames, |n| {
            pb.set_position(n)
        })?;
        pb.finish_with_message("Rendering complete");
        summary
    } else {
        let cursor = ClockCursor::start(sample_rate, looping);
        let mut pacer = FramePacer::new(fps);
        log::info!("Frame budget: {:.2}ms", pacer.period().as_secs_f64() * 1000.0);
        scheduler.run_realtime(&cursor, &mut sink, &mut pacer, &stop, cli.max_frames)?
    };

    if stop.load(Ordering::Relaxed) {
        log::info!("Interrupted");
    }
    log::info!(
        "Done: {} frames, {} overruns, end of stream {}",
        summary.frames,
        summary.overruns,
        if summary.reached_end { "reached" } else { "not reached" }
    );
    Ok(())
}
