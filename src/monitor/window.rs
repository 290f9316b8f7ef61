//! Fixed-capacity FIFO window of rate samples.

use std::collections::VecDeque;

/// Upper bound on the up-front allocation; larger windows grow on demand.
const MAX_PREALLOC: usize = 1024;

/// Keeps the most recent `capacity` samples; pushing into a full window
/// evicts the oldest one.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SlidingWindow {
    /// Creates an empty window. A capacity of 0 is raised to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity.min(MAX_PREALLOC)),
            capacity,
        }
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Arithmetic mean of the held samples, 0 when empty.
    pub fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window_average_is_zero() {
        let window = SlidingWindow::new(3);
        assert!(window.is_empty());
        assert_eq!(window.average(), 0.0);
    }

    #[test]
    fn test_zero_capacity_raised_to_one() {
        let mut window = SlidingWindow::new(0);
        assert_eq!(window.capacity(), 1);
        window.push(5.0);
        window.push(7.0);
        assert_eq!(window.len(), 1);
        assert_eq!(window.average(), 7.0);
    }

    #[test]
    fn test_len_never_exceeds_capacity() {
        let mut window = SlidingWindow::new(4);
        for i in 0..10 {
            window.push(i as f64);
            assert!(window.len() <= 4);
            assert_eq!(window.len(), (i + 1).min(4));
        }
        assert!(window.is_full());
    }

    #[test]
    fn test_average_of_partial_window() {
        let mut window = SlidingWindow::new(5);
        window.push(10.0);
        window.push(20.0);
        assert_eq!(window.average(), 15.0);
        assert!(!window.is_full());
    }

    #[test]
    fn test_eviction_drops_oldest() {
        let mut window = SlidingWindow::new(3);
        for sample in [100.0, 1.0, 2.0, 3.0] {
            window.push(sample);
        }
        // 100 was evicted
        assert_eq!(window.len(), 3);
        assert_eq!(window.average(), 2.0);
    }

    #[test]
    fn test_huge_capacity_allocates_lazily() {
        let mut window = SlidingWindow::new(usize::MAX);
        assert_eq!(window.capacity(), usize::MAX);
        for sample in [1.0, 2.0, 3.0] {
            window.push(sample);
        }
        assert_eq!(window.len(), 3);
        assert!(!window.is_full());
        assert_eq!(window.average(), 2.0);
    }

    #[test]
    fn test_clear() {
        let mut window = SlidingWindow::new(2);
        window.push(1.0);
        window.push(2.0);
        window.clear();
        assert!(window.is_empty());
        assert_eq!(window.capacity(), 2);
        assert_eq!(window.average(), 0.0);
    }
}
