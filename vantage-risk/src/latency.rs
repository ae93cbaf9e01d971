use std::collections::VecDeque;

/// Sliding window of exchange round-trip times, used to feed the latency
/// circuit breaker trigger (spec: "p99 of recent exchange RTTs over a sliding
/// window").
#[derive(Debug, Clone)]
pub struct LatencyTracker {
    window: usize,
    samples: VecDeque<u64>,
}

impl LatencyTracker {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn record(&mut self, rtt_ms: u64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(rtt_ms);
    }

    /// p99 latency of the current window, or `None` until at least one
    /// sample has been recorded.
    pub fn p99_ms(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();
        let idx = ((sorted.len() as f64) * 0.99).ceil() as usize;
        let idx = idx.saturating_sub(1).min(sorted.len() - 1);
        Some(sorted[idx])
    }

    pub fn is_full(&self) -> bool {
        self.samples.len() == self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p99_of_uniform_samples_is_the_sample() {
        let mut tracker = LatencyTracker::new(10);
        for _ in 0..10 {
            tracker.record(50);
        }
        assert_eq!(tracker.p99_ms(), Some(50));
    }

    #[test]
    fn spike_is_reflected_once_window_is_full() {
        let mut tracker = LatencyTracker::new(4);
        tracker.record(10);
        tracker.record(10);
        tracker.record(10);
        tracker.record(5_000);
        assert_eq!(tracker.p99_ms(), Some(5_000));
    }

    #[test]
    fn window_evicts_oldest_sample() {
        let mut tracker = LatencyTracker::new(2);
        tracker.record(10);
        tracker.record(20);
        tracker.record(30);
        assert!(tracker.is_full());
        // 10 has been evicted; only 20, 30 remain.
        assert_eq!(tracker.p99_ms(), Some(30));
    }
}
