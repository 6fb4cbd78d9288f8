use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::mapper::VisualFrame;

/// What the scheduler hands to the visual side each tick.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SinkEvent<'a> {
    Frame(&'a VisualFrame),
    /// Playback passed the last sample of a non-looping waveform.
    EndOfStream { frame: u64, time: f32 },
}

pub trait VisualSink {
    fn handle(&mut self, event: SinkEvent<'_>) -> Result<()>;
}

/// Writes one JSON object per event, newline separated.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl JsonLinesSink<Box<dyn Write>> {
    /// `-` means stdout.
    pub fn create(path: &Path) -> Result<Self> {
        let writer: Box<dyn Write> = if path.as_os_str() == "-" {
            Box::new(BufWriter::new(std::io::stdout()))
        } else {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            Box::new(BufWriter::new(file))
        };
        Ok(Self::new(writer))
    }
}

impl<W: Write> VisualSink for JsonLinesSink<W> {
    fn handle(&mut self, event: SinkEvent<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &event).context("Failed to serialize frame")?;
        self.writer.write_all(b"\n").context("Failed to write frame")?;
        // A live consumer must see each record whole within its tick.
        self.writer.flush().context("Failed to flush output")?;
        Ok(())
    }
}

impl<W: Write> Drop for JsonLinesSink<W> {
    fn drop(&mut self) {
        if let Err(err) = self.writer.flush() {
            log::warn!("Failed to flush output: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::mapper::{BarRecord, PointRecord};

    fn frame() -> VisualFrame {
        VisualFrame {
            frame: 3,
            time: 0.5,
            bars: vec![BarRecord {
                x: -1.0,
                frequency: 440.0,
                height: 2.0,
                y: -12.0,
                color: [24, 253, 23],
            }],
            points: vec![PointRecord { x: 0.0, y: 10.0 }],
            light: [1.0, 1.0, 1.0],
            bass: 0.0,
            energy: 0.0,
        }
    }

    #[test]
    fn writes_tagged_json_lines() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let f = frame();
        sink.handle(SinkEvent::Frame(&f)).unwrap();
        sink.handle(SinkEvent::EndOfStream { frame: 4, time: 0.6 }).unwrap();

        let out = String::from_utf8(std::mem::take(&mut sink.writer)).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "frame");
        assert_eq!(first["frame"], 3);
        assert_eq!(first["bars"][0]["color"], serde_json::json!([24, 253, 23]));
        assert_eq!(first["points"][0]["y"], 10.0);

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "end_of_stream");
        assert_eq!(second["frame"], 4);
    }

    #[test]
    fn full_size_frame_reaches_writer_within_tick() {
        let mut f = frame();
        f.bars = (0..128)
            .map(|i| BarRecord {
                x: i as f32 * 0.35 - 22.225,
                frequency: 20.0 * 1.056f32.powi(i),
                height: 3.123_456,
                y: -11.438_272,
                color: [140, 137, 23],
            })
            .collect();
        f.points = (0..128)
            .map(|i| PointRecord {
                x: i as f32 * 0.35 - 22.225,
                y: 10.0 + (i as f32 * 0.1).sin() * 3.0,
            })
            .collect();

        let mut sink = JsonLinesSink::new(BufWriter::new(Vec::new()));
        sink.handle(SinkEvent::Frame(&f)).unwrap();

        let written = sink.writer.get_ref();
        assert!(written.len() > 8192, "record should exceed the default buffer");
        assert_eq!(written.last(), Some(&b'\n'));
        let line = std::str::from_utf8(written).unwrap().trim_end();
        let parsed: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(parsed["bars"].as_array().unwrap().len(), 128);
        assert_eq!(parsed["points"].as_array().unwrap().len(), 128);
    }

    #[test]
    fn creates_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frames.jsonl");
        {
            let mut sink = JsonLinesSink::create(&path).unwrap();
            sink.handle(SinkEvent::EndOfStream { frame: 0, time: 0.0 }).unwrap();
        }
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("end_of_stream"));
    }
}
