use std::collections::VecDeque;

/// Trailing window over the last `size` pushed values.
///
/// The spread is tracked with Welford's add/remove update, so the variance is
/// accumulated as deviations from the current window mean rather than as raw
/// sums of squares. An eviction that wipes out most of the spread (a level
/// shift leaving the window) triggers a rebuild from the buffer, as does every
/// full rotation.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    size: usize,
    values: VecDeque<f64>,
    sum: f64,
    count: usize,
    mean: f64,
    m2: f64,
    missing: usize,
    evictions: usize,
}

// Rebuild when an eviction leaves less than this share of the previous m2.
const REBUILD_RATIO: f64 = 1e-3;

impl RollingWindow {
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "window size must be positive");
        RollingWindow {
            size,
            values: VecDeque::with_capacity(size),
            sum: 0.0,
            count: 0,
            mean: 0.0,
            m2: 0.0,
            missing: 0,
            evictions: 0,
        }
    }

    pub fn push(&mut self, value: f64) {
        let mut rebuild = false;

        if self.values.len() == self.size {
            if let Some(old) = self.values.pop_front() {
                let before = self.m2;
                self.remove(old);
                rebuild = self.m2 < before * REBUILD_RATIO;
            }
            self.evictions += 1;
        }

        self.values.push_back(value);
        self.add(value);

        if rebuild || self.evictions >= self.size {
            self.evictions = 0;
            self.rebuild();
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Full and free of missing values.
    pub fn is_ready(&self) -> bool {
        self.values.len() == self.size && self.missing == 0
    }

    pub fn sum(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        Some(self.sum)
    }

    pub fn mean(&self) -> Option<f64> {
        self.sum().map(|s| s / self.size as f64)
    }

    /// Sample standard deviation (n - 1 divisor).
    pub fn std_dev(&self) -> Option<f64> {
        if !self.is_ready() || self.size < 2 {
            return None;
        }
        let var = self.m2 / (self.size - 1) as f64;
        Some(var.max(0.0).sqrt())
    }

    fn add(&mut self, value: f64) {
        if !value.is_finite() {
            self.missing += 1;
            return;
        }
        self.sum += value;
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    fn remove(&mut self, value: f64) {
        if !value.is_finite() {
            self.missing -= 1;
            return;
        }
        self.sum -= value;
        self.count -= 1;
        if self.count == 0 {
            self.sum = 0.0;
            self.mean = 0.0;
            self.m2 = 0.0;
            return;
        }
        let delta = value - self.mean;
        self.mean -= delta / self.count as f64;
        self.m2 -= delta * (value - self.mean);
    }

    fn rebuild(&mut self) {
        self.sum = 0.0;
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
        self.missing = 0;

        let values = std::mem::take(&mut self.values);
        for &v in &values {
            self.add(v);
        }
        self.values = values;
    }
}
