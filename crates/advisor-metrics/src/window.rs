//! Bounded sample window for percentile approximation

use std::collections::VecDeque;

/// Keeps the most recent `capacity` samples
#[derive(Debug, Clone)]
pub(crate) struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl SampleWindow {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub(crate) fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Nearest-rank percentile, `p` in `[0, 1]`; 0.0 when empty
    pub(crate) fn percentile(&self, p: f64) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let mut sorted: Vec<f64> = self.samples.iter().copied().collect();
        sorted.sort_by(f64::total_cmp);
        let rank = (p.clamp(0.0, 1.0) * sorted.len() as f64).ceil() as usize;
        sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_window_is_zero() {
        assert_eq!(SampleWindow::new(4).percentile(0.95), 0.0);
    }

    #[test]
    fn nearest_rank() {
        let mut window = SampleWindow::new(100);
        for v in 1..=100 {
            window.push(f64::from(v));
        }
        assert_eq!(window.percentile(0.95), 95.0);
        assert_eq!(window.percentile(0.5), 50.0);
        assert_eq!(window.percentile(1.0), 100.0);
    }

    #[test]
    fn oldest_samples_drop_out() {
        let mut window = SampleWindow::new(2);
        window.push(1000.0);
        window.push(1.0);
        window.push(2.0);
        assert_eq!(window.percentile(1.0), 2.0);
    }
}
