//! Pointer velocity estimation
//!
//! Least-squares slope over a short horizon of recent samples, per axis.

use std::collections::VecDeque;

/// Only samples this recent contribute to the estimate
const HORIZON_MS: i64 = 100;

/// A gap this long since the previous sample means the pointer stopped
const ASSUME_STOPPED_MS: i64 = 40;

#[derive(Debug, Clone, Copy)]
struct Sample {
    time_ms: i64,
    x: f64,
    y: f64,
}

#[derive(Debug, Clone, Default)]
pub struct VelocityTracker {
    history: VecDeque<Sample>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    pub fn add_movement(&mut self, time_ms: i64, x: f64, y: f64) {
        if let Some(last) = self.history.back() {
            // Samples must not go back in time
            if time_ms < last.time_ms {
                tracing::trace!(time_ms, last = last.time_ms, "ignoring out of order sample");
                return;
            }
        }
        self.history.push_back(Sample { time_ms, x, y });

        while let Some(first) = self.history.front() {
            if time_ms.saturating_sub(first.time_ms) <= HORIZON_MS {
                break;
            }
            self.history.pop_front();
        }
    }

    /// Current velocity in px/s as `(x, y)`
    pub fn velocity(&self) -> (f64, f64) {
        let n = self.history.len();
        if n < 2 {
            return (0.0, 0.0);
        }
        let newest = self.history[n - 1];
        let previous = self.history[n - 2];
        if newest.time_ms.saturating_sub(previous.time_ms) > ASSUME_STOPPED_MS {
            return (0.0, 0.0);
        }

        let count = n as f64;
        let mean_t = self.history.iter().map(|s| s.time_ms as f64).sum::<f64>() / count;
        let mean_x = self.history.iter().map(|s| s.x).sum::<f64>() / count;
        let mean_y = self.history.iter().map(|s| s.y).sum::<f64>() / count;

        let mut var_t = 0.0;
        let mut cov_x = 0.0;
        let mut cov_y = 0.0;
        for sample in &self.history {
            let dt = sample.time_ms as f64 - mean_t;
            var_t += dt * dt;
            cov_x += dt * (sample.x - mean_x);
            cov_y += dt * (sample.y - mean_y);
        }
        if var_t == 0.0 {
            return (0.0, 0.0);
        }

        // Slope is px/ms
        (cov_x / var_t * 1000.0, cov_y / var_t * 1000.0)
    }
}
