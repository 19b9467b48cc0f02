#[allow(unused_imports)]
use micromath::F32Ext;
use heapless::Deque;

/// Mean magnitudes below this are treated as zero and checked against the
/// absolute stddev instead of the relative one.
const MEAN_EPSILON: f32 = 1e-6;

/// Sliding window over a scalar signal with a stability verdict.
///
/// "Stable" means the window's relative standard deviation sits below a
/// threshold. Landing detection, ground-plane acquisition and rep debounce
/// all hang off this one check.
#[derive(Debug, Clone)]
pub struct StabilityWindow<const N: usize> {
    window: Deque<f32, N>,
    min_samples: usize,
}

impl<const N: usize> StabilityWindow<N> {
    /// Window that reports stability once half full.
    pub fn new() -> Self {
        Self {
            window: Deque::new(),
            min_samples: N / 2,
        }
    }

    /// Window that withholds a verdict until `min_samples` are present.
    pub fn with_min_samples(min_samples: usize) -> Self {
        Self {
            window: Deque::new(),
            min_samples,
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.window.is_full() {
            self.window.pop_front();
        }
        // cannot fail, a slot was just freed
        let _ = self.window.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn clear(&mut self) {
        self.window.clear();
    }

    /// Window contents, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &f32> {
        self.window.iter()
    }

    pub fn mean(&self) -> Option<f32> {
        if self.window.is_empty() {
            return None;
        }
        let sum: f32 = self.window.iter().sum();
        Some(sum / self.window.len() as f32)
    }

    /// Population variance of the window.
    pub fn variance(&self) -> Option<f32> {
        let mean = self.mean()?;
        let sum_sq: f32 = self.window.iter().map(|v| (v - mean) * (v - mean)).sum();
        Some(sum_sq / self.window.len() as f32)
    }

    pub fn stddev(&self) -> Option<f32> {
        self.variance().map(|v| v.sqrt())
    }

    /// Max - min over the window, `None` until `min_samples` are present.
    /// Absolute-pixel flavor of the stability check.
    pub fn spread(&self) -> Option<f32> {
        if self.window.len() < self.min_samples {
            return None;
        }
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for &v in self.window.iter() {
            min = min.min(v);
            max = max.max(v);
        }
        Some(max - min)
    }

    /// True iff the window holds at least `min_samples` values whose
    /// relative stddev is below `relative_threshold`. A window that is
    /// still filling is not-yet-stable, never an error.
    pub fn is_stable(&self, relative_threshold: f32) -> bool {
        if self.window.len() < self.min_samples {
            return false;
        }
        let mean = match self.mean() {
            Some(m) => m,
            None => return false,
        };
        let stddev = match self.stddev() {
            Some(s) => s,
            None => return false,
        };
        if mean.abs() < MEAN_EPSILON {
            stddev < relative_threshold
        } else {
            stddev / mean.abs() < relative_threshold
        }
    }
}

impl<const N: usize> Default for StabilityWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}
