// src/pipeline/metrics.rs
//
// Counters shared between the orchestrator and the dispatcher tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct PipelineMetrics {
    pub total_frames: Arc<AtomicU64>,
    pub dropped_frames: Arc<AtomicU64>,
    pub registration_failures: Arc<AtomicU64>,
    pub stable_frames: Arc<AtomicU64>,
    pub dispatches: Arc<AtomicU64>,
    pub detection_failures: Arc<AtomicU64>,
    pub detection_timeouts: Arc<AtomicU64>,
    pub results_shown: Arc<AtomicU64>,
    pub results_cleared: Arc<AtomicU64>,
    pub detection_time_us: Arc<AtomicU64>,
    pub started_at: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            total_frames: Arc::new(AtomicU64::new(0)),
            dropped_frames: Arc::new(AtomicU64::new(0)),
            registration_failures: Arc::new(AtomicU64::new(0)),
            stable_frames: Arc::new(AtomicU64::new(0)),
            dispatches: Arc::new(AtomicU64::new(0)),
            detection_failures: Arc::new(AtomicU64::new(0)),
            detection_timeouts: Arc::new(AtomicU64::new(0)),
            results_shown: Arc::new(AtomicU64::new(0)),
            results_cleared: Arc::new(AtomicU64::new(0)),
            detection_time_us: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }

    pub fn inc(&self, counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set(&self, counter: &AtomicU64, value: u64) {
        counter.store(value, Ordering::Relaxed);
    }

    pub fn fps(&self) -> f64 {
        let frames = self.total_frames.load(Ordering::Relaxed);
        let elapsed = self.started_at.elapsed().as_secs_f64();
        if elapsed > 0.01 {
            frames as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_frames: self.total_frames.load(Ordering::Relaxed),
            dropped_frames: self.dropped_frames.load(Ordering::Relaxed),
            fps: self.fps(),
            registration_failures: self.registration_failures.load(Ordering::Relaxed),
            stable_frames: self.stable_frames.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            detection_failures: self.detection_failures.load(Ordering::Relaxed),
            detection_timeouts: self.detection_timeouts.load(Ordering::Relaxed),
            results_shown: self.results_shown.load(Ordering::Relaxed),
            results_cleared: self.results_cleared.load(Ordering::Relaxed),
            last_detection_us: self.detection_time_us.load(Ordering::Relaxed),
            elapsed_secs: self.started_at.elapsed().as_secs_f64(),
        }
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub dropped_frames: u64,
    pub fps: f64,
    pub registration_failures: u64,
    pub stable_frames: u64,
    pub dispatches: u64,
    pub detection_failures: u64,
    pub detection_timeouts: u64,
    pub results_shown: u64,
    pub results_cleared: u64,
    pub last_detection_us: u64,
    pub elapsed_secs: f64,
}
