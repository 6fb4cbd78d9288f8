use anyhow::Result;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::audio::analysis::Analyzer;
use crate::audio::decode::WaveformBuffer;
use crate::playback::{CursorSnapshot, PlaybackCursor, SteppedCursor};
use crate::render::mapper::{ParameterMapper, VisualFrame};
use crate::render::sink::{SinkEvent, VisualSink};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorPosition {
    At(usize),
    EndOfStream,
}

/// Apply the wrap / end-of-stream policy to a raw cursor index.
pub fn resolve_cursor(snapshot: CursorSnapshot, len: usize) -> CursorPosition {
    if len == 0 {
        return CursorPosition::EndOfStream;
    }
    if snapshot.index < len {
        CursorPosition::At(snapshot.index)
    } else if snapshot.looping {
        CursorPosition::At(snapshot.index % len)
    } else {
        CursorPosition::EndOfStream
    }
}

#[derive(Debug)]
pub enum TickOutcome {
    Frame(VisualFrame),
    /// First tick past the end of a non-looping waveform.
    EndOfStream { frame: u64, time: f32 },
    /// Still past the end; already signalled.
    Finished,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub overruns: u64,
    pub reached_end: bool,
}

/// Holds a target frame period. Overruns are counted, never caught up.
pub struct FramePacer {
    period: Duration,
    overruns: u64,
}

impl FramePacer {
    pub fn new(fps: f32) -> Self {
        Self {
            period: Duration::from_secs_f64(1.0 / fps as f64),
            overruns: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    /// Time left in the frame budget, if any.
    pub fn remaining(&self, elapsed: Duration) -> Option<Duration> {
        self.period.checked_sub(elapsed).filter(|d| !d.is_zero())
    }

    pub fn wait(&mut self, frame_start: Instant) {
        let elapsed = frame_start.elapsed();
        match self.remaining(elapsed) {
            Some(sleep) => std::thread::sleep(sleep),
            None => {
                self.overruns += 1;
                log::debug!(
                    "Frame overran budget: {:.2}ms > {:.2}ms",
                    elapsed.as_secs_f64() * 1000.0,
                    self.period.as_secs_f64() * 1000.0
                );
            }
        }
    }
}

/// Drives one analysis + mapping pass per tick and feeds the visual sink.
pub struct FrameScheduler {
    buffer: WaveformBuffer,
    analyzer: Analyzer,
    mapper: ParameterMapper,
    frame: u64,
    end_signalled: bool,
}

impl FrameScheduler {
    pub fn new(buffer: WaveformBuffer, analyzer: Analyzer, mapper: ParameterMapper) -> Self {
        Self {
            buffer,
            analyzer,
            mapper,
            frame: 0,
            end_signalled: false,
        }
    }

    pub fn tick(&mut self, snapshot: CursorSnapshot) -> TickOutcome {
        let sample_rate = self.buffer.sample_rate() as f32;
        match resolve_cursor(snapshot, self.buffer.len()) {
            CursorPosition::At(index) => {
                self.end_signalled = false;
                let features = self.analyzer.process(&self.buffer, index);
                let frame = self
                    .mapper
                    .map(&features, self.frame, index as f32 / sample_rate);
                self.frame += 1;
                TickOutcome::Frame(frame)
            }
            CursorPosition::EndOfStream if self.end_signalled => TickOutcome::Finished,
            CursorPosition::EndOfStream => {
                self.end_signalled = true;
                log::info!("End of stream after {} frames", self.frame);
                TickOutcome::EndOfStream {
                    frame: self.frame,
                    time: self.buffer.duration(),
                }
            }
        }
    }

    /// One tick plus delivery to the sink. Breaks once playback has ended.
    pub fn step<S: VisualSink>(
        &mut self,
        snapshot: CursorSnapshot,
        sink: &mut S,
    ) -> Result<ControlFlow<()>> {
        match self.tick(snapshot) {
            TickOutcome::Frame(frame) => {
                sink.handle(SinkEvent::Frame(&frame))?;
                Ok(ControlFlow::Continue(()))
            }
            TickOutcome::EndOfStream { frame, time } => {
                sink.handle(SinkEvent::EndOfStream { frame, time })?;
                Ok(ControlFlow::Break(()))
            }
            TickOutcome::Finished => Ok(ControlFlow::Break(())),
        }
    }

    /// Paced loop against a live cursor until end-of-stream, `stop`, or `max_frames`.
    pub fn run_realtime<C: PlaybackCursor, S: VisualSink>(
        &mut self,
        cursor: &C,
        sink: &mut S,
        pacer: &mut FramePacer,
        stop: &AtomicBool,
        max_frames: Option<u64>,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while !stop.load(Ordering::Relaxed) && max_frames.map_or(true, |max| summary.frames < max)
        {
            let frame_start = Instant::now();
            if self.step(cursor.snapshot(), sink)?.is_break() {
                summary.reached_end = true;
                break;
            }
            summary.frames += 1;
            pacer.wait(frame_start);
        }

        summary.overruns = pacer.overruns();
        Ok(summary)
    }

    /// Unpaced loop advancing `cursor` one frame per tick. `on_frame` receives the frame count.
    pub fn run_offline<S: VisualSink>(
        &mut self,
        cursor: &mut SteppedCursor,
        sink: &mut S,
        stop: &AtomicBool,
        max_frames: Option<u64>,
        mut on_frame: impl FnMut(u64),
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        while !stop.load(Ordering::Relaxed) && max_frames.map_or(true, |max| summary.frames < max)
        {
            if self.step(cursor.snapshot(), sink)?.is_break() {
                summary.reached_end = true;
                break;
            }
            summary.frames += 1;
            on_frame(summary.frames);
            cursor.advance();
        }

        Ok(summary)
    }
}
