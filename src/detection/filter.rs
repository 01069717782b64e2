// src/detection/filter.rs

use crate::types::{Detection, DetectionConfig, Observation};
use tracing::debug;

/// Keeps observations that are confident overall and whose best label is
/// confident too. Each kept observation becomes one Detection named after
/// its best label.
#[derive(Debug, Clone, Copy)]
pub struct DetectionFilter {
    /// Inclusive
    pub min_observation_confidence: f64,
    /// Exclusive
    pub min_label_confidence: f64,
}

impl Default for DetectionFilter {
    fn default() -> Self {
        Self {
            min_observation_confidence: 0.1,
            min_label_confidence: 0.3,
        }
    }
}

impl DetectionFilter {
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            min_observation_confidence: config.min_observation_confidence,
            min_label_confidence: config.min_label_confidence,
        }
    }

    pub fn apply(&self, observations: Vec<Observation>) -> Vec<Detection> {
        observations
            .into_iter()
            .filter(|obs| obs.confidence >= self.min_observation_confidence)
            .filter_map(|obs| {
                let top = obs.labels.into_iter().next()?;
                if top.confidence <= self.min_label_confidence {
                    return None;
                }
                debug!(
                    "{}({:.2}): {:?}",
                    top.identifier, top.confidence, obs.bounding_box
                );
                Some(Detection {
                    label: top.identifier,
                    confidence: top.confidence,
                    bounding_box: obs.bounding_box,
                })
            })
            .collect()
    }
}
