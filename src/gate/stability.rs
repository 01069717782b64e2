// src/gate/stability.rs
//
// The stability check compares the L1 norm of the *summed* displacement
// over a full history against the threshold. The sum is not divided by
// the history length, so a longer history makes the check stricter.

use super::history::TranspositionHistory;

#[derive(Debug, Clone, Copy)]
pub struct StabilityMetric {
    threshold: f64,
}

impl StabilityMetric {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// |Σdx| + |Σdy| over the history, or None while it is still filling.
    pub fn displacement(&self, history: &TranspositionHistory) -> Option<f64> {
        if !history.is_full() {
            return None;
        }
        Some(history.sum().l1_norm())
    }

    pub fn is_stable(&self, history: &TranspositionHistory) -> bool {
        self.displacement(history)
            .is_some_and(|distance| distance < self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TranslationSample;

    fn filled(len: usize, dx: f64, dy: f64) -> TranspositionHistory {
        let mut history = TranspositionHistory::new(len);
        for _ in 0..len {
            history.record(TranslationSample::new(dx, dy));
        }
        history
    }

    #[test]
    fn test_small_motion_is_stable() {
        let metric = StabilityMetric::new(30.0);
        let history = filled(50, 0.1, 0.1);
        let distance = metric.displacement(&history).unwrap();
        assert!((distance - 10.0).abs() < 1e-9);
        assert!(metric.is_stable(&history));
    }

    #[test]
    fn test_large_motion_is_unstable() {
        let metric = StabilityMetric::new(30.0);
        let history = filled(50, 1.0, 1.0);
        assert_eq!(metric.displacement(&history), Some(100.0));
        assert!(!metric.is_stable(&history));
    }

    #[test]
    fn test_partial_history_is_never_stable() {
        let metric = StabilityMetric::new(30.0);
        let mut history = TranspositionHistory::new(50);
        for _ in 0..49 {
            history.record(TranslationSample::ZERO);
        }
        assert_eq!(metric.displacement(&history), None);
        assert!(!metric.is_stable(&history));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let metric = StabilityMetric::new(30.0);
        // Σ = (15, -15) → L1 = 30, not below the threshold
        let history = filled(10, 1.5, -1.5);
        assert!(!metric.is_stable(&history));
    }

    #[test]
    fn test_opposite_motion_cancels_out() {
        let metric = StabilityMetric::new(30.0);
        let mut history = TranspositionHistory::new(4);
        for dx in [20.0, -20.0, 20.0, -20.0] {
            history.record(TranslationSample::new(dx, 0.0));
        }
        assert!(metric.is_stable(&history));
    }

    #[test]
    fn test_longer_history_is_stricter() {
        let metric = StabilityMetric::new(30.0);
        assert!(metric.is_stable(&filled(20, 0.5, 0.5)));
        assert!(!metric.is_stable(&filled(40, 0.5, 0.5)));
    }
}
