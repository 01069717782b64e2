// src/gate/state_machine.rs
//
// Per-frame decision policy: register the frame against the previous
// baseline, record the translation, and decide whether to trigger a
// detection pass, clear the shown results, or toggle the searching cue.
//
// Two flags are orthogonal to the history state:
//   * in_flight      — at most one detection dispatch at a time
//   * results_visible — a shown result set suppresses new triggers until
//                       the scene moves again or the consumer restarts

use super::history::TranspositionHistory;
use super::stability::StabilityMetric;
use crate::detection::DetectionError;
use crate::pipeline::PresentationEvent;
use crate::registration::MotionSampleSource;
use crate::types::{Detection, GateConfig};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No baseline frame yet
    Baselining,
    /// History still filling
    Accumulating,
    /// History full and summed motion below threshold
    Stable,
    /// History full and summed motion at or above threshold
    Unstable,
}

/// Identifies one detection dispatch so late completions can be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchTicket(pub u64);

#[derive(Debug, Clone)]
pub struct DispatchRequest<F> {
    pub ticket: DispatchTicket,
    pub frame: F,
}

#[derive(Debug)]
pub struct DispatchCompletion {
    pub ticket: DispatchTicket,
    pub outcome: Result<Vec<Detection>, DetectionError>,
}

/// What the gate wants done after an input. Empty means "do nothing".
#[derive(Debug)]
pub struct GateDecision<F> {
    pub dispatch: Option<DispatchRequest<F>>,
    pub events: Vec<PresentationEvent>,
}

impl<F> GateDecision<F> {
    pub fn none() -> Self {
        Self {
            dispatch: None,
            events: Vec::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.dispatch.is_none() && self.events.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateStats {
    pub frames: u64,
    pub registration_failures: u64,
    pub stable_frames: u64,
    pub dispatches: u64,
    pub completions: u64,
    pub stale_completions: u64,
}

pub struct StabilityGate<S: MotionSampleSource> {
    source: S,
    metric: StabilityMetric,
    history: TranspositionHistory,
    previous_frame: Option<S::Frame>,
    in_flight: Option<DispatchTicket>,
    next_ticket: u64,
    results_visible: bool,
    searching_cue: bool,
    stats: GateStats,
}

impl<S: MotionSampleSource> StabilityGate<S> {
    pub fn new(config: &GateConfig, source: S) -> Self {
        Self {
            source,
            metric: StabilityMetric::new(config.stability_threshold),
            history: TranspositionHistory::new(config.history_length.max(1)),
            previous_frame: None,
            in_flight: None,
            next_ticket: 0,
            results_visible: false,
            searching_cue: false,
            stats: GateStats::default(),
        }
    }

    /// Process one captured frame.
    pub fn on_frame(&mut self, frame: S::Frame) -> GateDecision<S::Frame> {
        self.stats.frames += 1;

        let Some(previous) = self.previous_frame.as_ref() else {
            self.previous_frame = Some(frame);
            self.history.reset();
            debug!("Baseline frame captured, history reset");
            return GateDecision::none();
        };

        let sample = match self.source.register(previous, &frame) {
            Ok(sample) => sample,
            Err(e) => {
                // Keep the old baseline; the next frame registers against it
                self.stats.registration_failures += 1;
                warn!("Registration failed, frame skipped: {}", e);
                return GateDecision::none();
            }
        };

        self.history.record(sample);

        if self.metric.is_stable(&self.history) {
            self.stats.stable_frames += 1;
            self.on_stable(frame)
        } else {
            self.previous_frame = Some(frame);
            self.on_unstable()
        }
    }

    fn on_stable(&mut self, frame: S::Frame) -> GateDecision<S::Frame> {
        let mut decision = GateDecision::none();

        if self.results_visible {
            self.previous_frame = Some(frame);
            return decision;
        }

        if self.in_flight.is_none() {
            decision.dispatch = self.begin_dispatch(frame.clone());
        }
        self.previous_frame = Some(frame);

        if !self.searching_cue {
            self.searching_cue = true;
            decision.events.push(PresentationEvent::ShowSearching);
        }
        decision
    }

    fn on_unstable(&mut self) -> GateDecision<S::Frame> {
        let mut decision = GateDecision::none();

        if self.results_visible {
            self.results_visible = false;
            decision.events.push(PresentationEvent::ClearResults);
            debug!("Scene moved, clearing shown results");
        }
        if self.searching_cue {
            self.searching_cue = false;
            decision.events.push(PresentationEvent::HideSearching);
        }
        decision
    }

    fn begin_dispatch(&mut self, frame: S::Frame) -> Option<DispatchRequest<S::Frame>> {
        if let Some(ticket) = self.in_flight {
            debug_assert!(false, "dispatch {:?} already in flight", ticket);
            error!("Refusing second dispatch while {:?} is in flight", ticket);
            return None;
        }

        let ticket = DispatchTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight = Some(ticket);
        self.stats.dispatches += 1;
        info!("🔍 Scene stable, dispatching detection {:?}", ticket);

        Some(DispatchRequest { ticket, frame })
    }

    /// Apply the outcome of a detection dispatch.
    pub fn on_dispatch_complete(
        &mut self,
        completion: DispatchCompletion,
    ) -> GateDecision<S::Frame> {
        let mut decision = GateDecision::none();

        if self.in_flight != Some(completion.ticket) {
            self.stats.stale_completions += 1;
            debug!(
                "Ignoring stale completion {:?} (in flight: {:?})",
                completion.ticket, self.in_flight
            );
            return decision;
        }

        self.in_flight = None;
        self.stats.completions += 1;

        match completion.outcome {
            Ok(detections) if !detections.is_empty() => {
                info!(
                    "✓ Detection {:?} found {} object(s)",
                    completion.ticket,
                    detections.len()
                );
                self.results_visible = true;
                decision
                    .events
                    .push(PresentationEvent::ShowResults(detections));
            }
            Ok(_) => {
                debug!("Detection {:?} found nothing", completion.ticket);
            }
            Err(e) => {
                warn!("Detection {:?} failed: {}", completion.ticket, e);
            }
        }
        decision
    }

    /// External restart: forget the shown results so the next stable
    /// period can trigger again.
    pub fn reset_results(&mut self) -> GateDecision<S::Frame> {
        let mut decision = GateDecision::none();
        if self.results_visible {
            self.results_visible = false;
            decision.events.push(PresentationEvent::ClearResults);
        }
        decision
    }

    /// Capture stopped: clear everything shown and re-baseline on the next
    /// frame. An in-flight dispatch still completes normally.
    pub fn stop_capture(&mut self) -> GateDecision<S::Frame> {
        let mut decision = self.reset_results();
        if self.searching_cue {
            self.searching_cue = false;
            decision.events.push(PresentationEvent::HideSearching);
        }
        self.previous_frame = None;
        self.history.reset();
        decision
    }

    pub fn state(&self) -> GateState {
        if self.previous_frame.is_none() {
            GateState::Baselining
        } else if !self.history.is_full() {
            GateState::Accumulating
        } else if self.metric.is_stable(&self.history) {
            GateState::Stable
        } else {
            GateState::Unstable
        }
    }

    pub fn pending_detection(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<DispatchTicket> {
        self.in_flight
    }

    pub fn results_visible(&self) -> bool {
        self.results_visible
    }

    pub fn searching_cue_shown(&self) -> bool {
        self.searching_cue
    }

    pub fn history(&self) -> &TranspositionHistory {
        &self.history
    }

    pub fn previous_frame(&self) -> Option<&S::Frame> {
        self.previous_frame.as_ref()
    }

    pub fn stats(&self) -> GateStats {
        self.stats
    }
}
