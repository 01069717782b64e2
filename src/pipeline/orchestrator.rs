// src/pipeline/orchestrator.rs
//
// Owns the stability gate. Frames, dispatch completions, and user
// commands all arrive as messages and are applied one at a time from
// this task, so the gate never needs a lock.

use super::dispatcher::DetectionDispatcher;
use super::event_bus::PresentationEvent;
use super::metrics::{MetricsSummary, PipelineMetrics};
use crate::detection::{DetectionFilter, ObjectDetector};
use crate::gate::{DispatchCompletion, GateDecision, StabilityGate};
use crate::registration::MotionSampleSource;
use crate::types::{Config, FrameHandle};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Actions a user can take while the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineCommand {
    /// Forget the shown results so the next stable scene triggers again
    Restart,
    /// Pause capture: clear the display and ignore frames until Start
    Stop,
    Start,
}

pub struct PipelineOrchestrator<S, D>
where
    S: MotionSampleSource<Frame = FrameHandle>,
    D: ObjectDetector,
{
    gate: StabilityGate<S>,
    dispatcher: DetectionDispatcher<D>,
    completions: mpsc::Receiver<DispatchCompletion>,
    presentation: mpsc::Sender<PresentationEvent>,
    metrics: PipelineMetrics,
    capturing: bool,
}

impl<S, D> PipelineOrchestrator<S, D>
where
    S: MotionSampleSource<Frame = FrameHandle>,
    D: ObjectDetector,
{
    pub fn new(
        config: &Config,
        source: S,
        detector: Arc<D>,
        presentation: mpsc::Sender<PresentationEvent>,
        metrics: PipelineMetrics,
    ) -> Self {
        // At most one dispatch is in flight, so one slot is enough
        let (completion_tx, completions) = mpsc::channel(1);
        let dispatcher = DetectionDispatcher::new(
            detector,
            DetectionFilter::from_config(&config.detection),
            config.detection.timeout_ms.map(Duration::from_millis),
            completion_tx,
            metrics.clone(),
        );

        info!(
            "Stability gate: history={}, threshold={:.1}, detection timeout={:?}",
            config.gate.history_length,
            config.gate.stability_threshold,
            config.detection.timeout_ms
        );

        Self {
            gate: StabilityGate::new(&config.gate, source),
            dispatcher,
            completions,
            presentation,
            metrics,
            capturing: true,
        }
    }

    pub fn gate(&self) -> &StabilityGate<S> {
        &self.gate
    }

    /// Process messages until the frame stream ends, then wait for the
    /// in-flight dispatch (if any) and return the final metrics.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<FrameHandle>,
        mut commands: mpsc::Receiver<PipelineCommand>,
    ) -> Result<MetricsSummary> {
        let mut commands_open = true;

        loop {
            tokio::select! {
                biased;

                Some(completion) = self.completions.recv() => {
                    let decision = self.gate.on_dispatch_complete(completion);
                    self.apply(decision).await?;
                }

                command = commands.recv(), if commands_open => match command {
                    Some(command) => self.handle_command(command).await?,
                    None => commands_open = false,
                },

                frame = frames.recv() => match frame {
                    Some(frame) => self.handle_frame(frame).await?,
                    None => break,
                },
            }
        }

        while self.gate.pending_detection() {
            info!("Frame stream ended, waiting for in-flight detection");
            match self.completions.recv().await {
                Some(completion) => {
                    let decision = self.gate.on_dispatch_complete(completion);
                    self.apply(decision).await?;
                }
                None => break,
            }
        }

        let summary = self.metrics.summary();
        info!("✓ Pipeline finished after {} frames", summary.total_frames);
        Ok(summary)
    }

    async fn handle_frame(&mut self, frame: FrameHandle) -> Result<()> {
        if !self.capturing {
            self.metrics.inc(&self.metrics.dropped_frames);
            return Ok(());
        }

        self.metrics.inc(&self.metrics.total_frames);
        let frame_id = frame.frame_id;
        let decision = self.gate.on_frame(frame);

        let stats = self.gate.stats();
        self.metrics.set(&self.metrics.registration_failures, stats.registration_failures);
        self.metrics.set(&self.metrics.stable_frames, stats.stable_frames);

        if frame_id % 90 == 0 {
            debug!(
                "Frame {}: state={:?}, history={}/{}",
                frame_id,
                self.gate.state(),
                self.gate.history().len(),
                self.gate.history().capacity()
            );
        }

        self.apply(decision).await
    }

    async fn handle_command(&mut self, command: PipelineCommand) -> Result<()> {
        info!("Command: {:?}", command);
        let decision = match command {
            PipelineCommand::Restart => self.gate.reset_results(),
            PipelineCommand::Stop => {
                // A dispatch already in flight still completes and its
                // results are shown while capture is paused
                self.capturing = false;
                self.gate.stop_capture()
            }
            PipelineCommand::Start => {
                self.capturing = true;
                GateDecision::none()
            }
        };
        self.apply(decision).await
    }

    async fn apply(&mut self, decision: GateDecision<FrameHandle>) -> Result<()> {
        if let Some(request) = decision.dispatch {
            self.dispatcher.dispatch(request);
        }

        for event in decision.events {
            match &event {
                PresentationEvent::ShowResults(_) => self.metrics.inc(&self.metrics.results_shown),
                PresentationEvent::ClearResults => self.metrics.inc(&self.metrics.results_cleared),
                _ => {}
            }
            self.presentation
                .send(event)
                .await
                .context("Presentation channel closed")?;
        }
        Ok(())
    }
}
