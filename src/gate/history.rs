// src/gate/history.rs

use crate::types::TranslationSample;
use std::collections::VecDeque;

/// Bounded FIFO of the most recent translation samples, oldest first.
#[derive(Debug, Clone)]
pub struct TranspositionHistory {
    points: VecDeque<TranslationSample>,
    capacity: usize,
}

impl TranspositionHistory {
    pub fn new(capacity: usize) -> Self {
        debug_assert!(capacity > 0, "history capacity must be non-zero");
        Self {
            points: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest one when at capacity.
    pub fn record(&mut self, sample: TranslationSample) {
        if self.points.len() == self.capacity {
            self.points.pop_front();
        }
        self.points.push_back(sample);
    }

    pub fn reset(&mut self) {
        self.points.clear();
    }

    pub fn is_full(&self) -> bool {
        self.points.len() == self.capacity
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslationSample> {
        self.points.iter()
    }

    /// Component-wise sum of every sample currently held.
    pub fn sum(&self) -> TranslationSample {
        self.points.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(i: usize) -> TranslationSample {
        TranslationSample::new(i as f64, -(i as f64))
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut history = TranspositionHistory::new(5);
        for i in 0..23 {
            history.record(sample(i));
            assert!(history.len() <= 5);
        }
        assert!(history.is_full());
    }

    #[test]
    fn test_keeps_last_samples_in_arrival_order() {
        let mut history = TranspositionHistory::new(4);
        for i in 0..10 {
            history.record(sample(i));
        }
        let kept: Vec<TranslationSample> = history.iter().copied().collect();
        assert_eq!(kept, vec![sample(6), sample(7), sample(8), sample(9)]);
    }

    #[test]
    fn test_not_full_until_capacity_reached() {
        let mut history = TranspositionHistory::new(3);
        history.record(sample(1));
        history.record(sample(2));
        assert!(!history.is_full());
        history.record(sample(3));
        assert!(history.is_full());
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut history = TranspositionHistory::new(3);
        for i in 0..3 {
            history.record(sample(i));
        }
        history.reset();
        assert!(history.is_empty());
        assert!(!history.is_full());
        assert_eq!(history.sum(), TranslationSample::ZERO);
    }
}
