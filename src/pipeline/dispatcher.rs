// src/pipeline/dispatcher.rs
//
// Runs detection passes off the frame path. Each request becomes one
// tokio task that reports exactly one DispatchCompletion, whatever
// happens to the detector (error, panic, timeout).

use super::metrics::PipelineMetrics;
use crate::detection::{DetectionError, DetectionFilter, ObjectDetector};
use crate::gate::{DispatchCompletion, DispatchRequest};
use crate::types::{Detection, FrameHandle};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub struct DetectionDispatcher<D: ObjectDetector> {
    detector: Arc<D>,
    filter: DetectionFilter,
    timeout: Option<Duration>,
    completions: mpsc::Sender<DispatchCompletion>,
    metrics: PipelineMetrics,
}

impl<D: ObjectDetector> DetectionDispatcher<D> {
    pub fn new(
        detector: Arc<D>,
        filter: DetectionFilter,
        timeout: Option<Duration>,
        completions: mpsc::Sender<DispatchCompletion>,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            detector,
            filter,
            timeout,
            completions,
            metrics,
        }
    }

    /// Start a detection pass. The frame handle stays with the task until
    /// its completion has been sent.
    pub fn dispatch(&self, request: DispatchRequest<FrameHandle>) -> JoinHandle<()> {
        let detector = Arc::clone(&self.detector);
        let filter = self.filter;
        let timeout = self.timeout;
        let completions = self.completions.clone();
        let metrics = self.metrics.clone();

        metrics.inc(&metrics.dispatches);
        debug!(
            "Dispatching {:?} on frame {}",
            request.ticket, request.frame.frame_id
        );

        tokio::spawn(async move {
            let started = Instant::now();
            let outcome = run_detection(detector, Arc::clone(&request.frame), filter, timeout).await;
            metrics.set(
                &metrics.detection_time_us,
                started.elapsed().as_micros() as u64,
            );

            match &outcome {
                Err(DetectionError::Timeout { .. }) => {
                    metrics.inc(&metrics.detection_timeouts);
                    metrics.inc(&metrics.detection_failures);
                }
                Err(_) => metrics.inc(&metrics.detection_failures),
                Ok(_) => {}
            }

            let completion = DispatchCompletion {
                ticket: request.ticket,
                outcome,
            };
            if completions.send(completion).await.is_err() {
                warn!(
                    "Completion for {:?} dropped, orchestrator is gone",
                    request.ticket
                );
            }
        })
    }
}

async fn run_detection<D: ObjectDetector>(
    detector: Arc<D>,
    frame: FrameHandle,
    filter: DetectionFilter,
    timeout: Option<Duration>,
) -> Result<Vec<Detection>, DetectionError> {
    // Inner task so a panicking detector still yields a completion
    let mut worker = tokio::spawn(async move { detector.detect(&frame).await });

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut worker).await {
            Ok(joined) => joined,
            Err(_) => {
                worker.abort();
                return Err(DetectionError::Timeout {
                    after_ms: limit.as_millis() as u64,
                });
            }
        },
        None => worker.await,
    };

    let observations = joined.map_err(|e| DetectionError::Worker(e.to_string()))??;
    Ok(filter.apply(observations))
}
