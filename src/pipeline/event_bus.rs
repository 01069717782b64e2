// src/pipeline/event_bus.rs
//
// Ordered delivery of presentation events. The gate decides, the sink
// renders; everything in between is a single bounded channel so events
// are applied exactly in the order they were decided. A full channel
// makes the sender wait instead of dropping anything.

use crate::types::Detection;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "detections", rename_all = "snake_case")]
pub enum PresentationEvent {
    ShowSearching,
    HideSearching,
    ShowResults(Vec<Detection>),
    ClearResults,
}

/// Renders presentation events. Called from the presentation task only.
pub trait PresentationSink: Send + 'static {
    fn apply(&mut self, event: PresentationEvent) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// The single delivery channel from the gate to the presentation task.
pub fn presentation_channel(
    capacity: usize,
) -> (
    mpsc::Sender<PresentationEvent>,
    mpsc::Receiver<PresentationEvent>,
) {
    mpsc::channel(capacity.max(1))
}

/// Apply events in receipt order until every sender is gone.
/// Returns the number of events applied.
pub async fn run_presentation<S: PresentationSink>(
    mut events: mpsc::Receiver<PresentationEvent>,
    mut sink: S,
) -> Result<u64> {
    let mut applied = 0u64;
    while let Some(event) = events.recv().await {
        sink.apply(event)?;
        applied += 1;
    }
    sink.flush()?;
    debug!("Presentation channel closed after {} events", applied);
    Ok(applied)
}

// ============================================================================
// SINKS
// ============================================================================

/// Logs every event.
#[derive(Debug, Default)]
pub struct LogSink;

impl PresentationSink for LogSink {
    fn apply(&mut self, event: PresentationEvent) -> Result<()> {
        match event {
            PresentationEvent::ShowSearching => info!("🔴 Searching..."),
            PresentationEvent::HideSearching => info!("⚪ Scene moving, search stopped"),
            PresentationEvent::ShowResults(detections) => {
                info!("🟢 Detected {} object(s)", detections.len());
                for d in &detections {
                    info!(
                        "   {} ({:.2}) at [{:.3}, {:.3}, {:.3}, {:.3}]",
                        d.label,
                        d.confidence,
                        d.bounding_box.x,
                        d.bounding_box.y,
                        d.bounding_box.width,
                        d.bounding_box.height
                    );
                }
            }
            PresentationEvent::ClearResults => info!("Results cleared"),
        }
        Ok(())
    }
}

/// Writes one JSON object per event.
pub struct JsonlSink {
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create event log {}", path.display()))?;
        info!("💾 Events will be written to: {}", path.display());
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl PresentationSink for JsonlSink {
    fn apply(&mut self, event: PresentationEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Fans each event out to two sinks, first then second.
pub struct TeeSink<A, B> {
    first: A,
    second: B,
}

impl<A: PresentationSink, B: PresentationSink> TeeSink<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A: PresentationSink, B: PresentationSink> PresentationSink for TeeSink<A, B> {
    fn apply(&mut self, event: PresentationEvent) -> Result<()> {
        self.first.apply(event.clone())?;
        self.second.apply(event)
    }

    fn flush(&mut self) -> Result<()> {
        self.first.flush()?;
        self.second.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NormalizedRect;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<PresentationEvent>>>);

    impl PresentationSink for Recorder {
        fn apply(&mut self, event: PresentationEvent) -> Result<()> {
            self.0.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn results() -> PresentationEvent {
        PresentationEvent::ShowResults(vec![Detection {
            label: "euro".to_string(),
            confidence: 0.8,
            bounding_box: NormalizedRect::new(0.0, 0.0, 0.5, 0.5),
        }])
    }

    #[tokio::test]
    async fn test_events_applied_in_order_without_drops() {
        let (tx, rx) = presentation_channel(2);
        let recorder = Recorder::default();
        let task = tokio::spawn(run_presentation(rx, recorder.clone()));

        let sent = vec![
            PresentationEvent::ShowSearching,
            results(),
            PresentationEvent::ClearResults,
            PresentationEvent::HideSearching,
            PresentationEvent::ShowSearching,
        ];
        for event in sent.clone() {
            tx.send(event).await.unwrap();
        }
        drop(tx);

        assert_eq!(task.await.unwrap().unwrap(), 5);
        assert_eq!(*recorder.0.lock().unwrap(), sent);
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(results()).unwrap();
        assert_eq!(json["event"], "show_results");
        assert_eq!(json["detections"][0]["label"], "euro");

        let json = serde_json::to_value(PresentationEvent::ClearResults).unwrap();
        assert_eq!(json, serde_json::json!({"event": "clear_results"}));
    }

    #[test]
    fn test_jsonl_sink_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut sink = JsonlSink::create(&path).unwrap();
        sink.apply(PresentationEvent::ShowSearching).unwrap();
        sink.apply(results()).unwrap();
        sink.flush().unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("show_searching"));
        assert!(lines[1].contains("euro"));
    }
}
