//! Event log produced by running a detector over a recorded sequence.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::gesture::{Gesture, GestureDetector, GestureEvents};
use crate::pose::Pose;

/// One fired event. `timestamp` is `frame_index / frame_rate`, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub timestamp: f32,
    pub event: &'static str,
}

/// Ordered list of fired events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append every gesture that fired on `frame_index`.
    pub fn record(&mut self, frame_index: usize, frame_rate: f32, events: &GestureEvents) {
        let timestamp = frame_index as f32 / frame_rate;
        self.records
            .extend(events.iter_fired().map(|g| EventRecord { timestamp, event: g.as_str() }));
    }

    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn count(&self, gesture: Gesture) -> usize {
        self.records.iter().filter(|r| r.event == gesture.as_str()).count()
    }

    /// CSV with a `t_sec,event` header.
    pub fn write_csv<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "t_sec,event")?;
        for r in &self.records {
            writeln!(out, "{},{}", r.timestamp, r.event)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_json<W: Write>(&self, mut out: W) -> Result<()> {
        serde_json::to_writer_pretty(&mut out, self)?;
        out.flush()?;
        Ok(())
    }
}

/// Feed `frames` through `detector` in order and collect the events.
pub fn detect_events(detector: &mut GestureDetector, frames: &[Pose], frame_rate: f32) -> EventLog {
    let mut log = EventLog::new();
    for (i, pose) in frames.iter().enumerate() {
        let events = detector.update(*pose);
        log.record(i, frame_rate, &events);
    }
    log
}
