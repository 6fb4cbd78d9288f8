use std::time::Instant;

/// Read-only snapshot of the external playback cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorSnapshot {
    pub index: usize,
    pub looping: bool,
}

/// Source of the playback position. The analyzer only ever reads it.
pub trait PlaybackCursor {
    fn snapshot(&self) -> CursorSnapshot;
}

/// Wall-clock cursor: assumes playback started at construction and runs at `sample_rate`.
pub struct ClockCursor {
    started: Instant,
    sample_rate: u32,
    looping: bool,
}

impl ClockCursor {
    pub fn start(sample_rate: u32, looping: bool) -> Self {
        Self {
            started: Instant::now(),
            sample_rate,
            looping,
        }
    }
}

impl PlaybackCursor for ClockCursor {
    fn snapshot(&self) -> CursorSnapshot {
        let elapsed = self.started.elapsed().as_secs_f64();
        CursorSnapshot {
            index: (elapsed * self.sample_rate as f64) as usize,
            looping: self.looping,
        }
    }
}

/// Cursor that moves a fixed number of samples per frame, for rendering faster than real time.
pub struct SteppedCursor {
    frame: u64,
    samples_per_frame: f64,
    looping: bool,
}

impl SteppedCursor {
    pub fn new(sample_rate: u32, fps: f32, looping: bool) -> Self {
        Self {
            frame: 0,
            samples_per_frame: sample_rate as f64 / fps as f64,
            looping,
        }
    }

    pub fn advance(&mut self) {
        self.frame += 1;
    }
}

impl PlaybackCursor for SteppedCursor {
    fn snapshot(&self) -> CursorSnapshot {
        CursorSnapshot {
            index: (self.frame as f64 * self.samples_per_frame) as usize,
            looping: self.looping,
        }
    }
}
