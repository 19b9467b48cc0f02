use crate::welford::Welford;

/// Reference constants frozen at the end of a calibration run. Immutable
/// once frozen; owned by exactly one tracker.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationReference<const K: usize> {
    means: [f32; K],
}

impl<const K: usize> CalibrationReference<K> {
    pub fn channel(&self, i: usize) -> f32 {
        self.means[i]
    }

    pub fn means(&self) -> &[f32; K] {
        &self.means
    }
}

/// Accumulates `K`-channel baseline samples until `target` of them have
/// been seen, then freezes the per-channel means as the session's
/// calibration reference.
///
/// Frames that fail the caller's landmark-likelihood filter are simply not
/// added, so they never count toward the target. After the freeze,
/// `add_sample` is a no-op: a tracker that keeps feeding a frozen
/// calibration cannot drift its reference.
pub struct CalibrationTracker<const K: usize> {
    target: usize,
    stats: Welford<K>,
    reference: Option<CalibrationReference<K>>,
}

impl<const K: usize> CalibrationTracker<K> {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            stats: Welford::new(),
            reference: None,
        }
    }

    /// Add one valid baseline sample. No-op once frozen.
    pub fn add_sample(&mut self, sample: [f32; K]) {
        if self.reference.is_some() {
            return;
        }
        self.stats.update(sample);
    }

    pub fn samples_collected(&self) -> usize {
        self.stats.count() as usize
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn is_frozen(&self) -> bool {
        self.reference.is_some()
    }

    /// Freeze and return the reference once enough samples accumulated.
    /// One-shot: every later call returns the same frozen values.
    pub fn try_freeze(&mut self) -> Option<&CalibrationReference<K>> {
        if self.reference.is_none() && self.samples_collected() >= self.target {
            let means = self.stats.mean();
            self.reference = Some(CalibrationReference { means });
            log_debug!("calibration frozen after {} samples", self.samples_collected());
        }
        self.reference.as_ref()
    }

    /// The frozen reference, if any, without attempting a freeze.
    pub fn reference(&self) -> Option<&CalibrationReference<K>> {
        self.reference.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn does_not_freeze_early() {
        let mut tracker = CalibrationTracker::<2>::new(5);
        for _ in 0..4 {
            tracker.add_sample([200.0, 800.0]);
        }
        assert!(tracker.try_freeze().is_none());
        assert!(!tracker.is_frozen());
    }

    #[test]
    fn freezes_channel_means() {
        let mut tracker = CalibrationTracker::<2>::new(4);
        tracker.add_sample([198.0, 798.0]);
        tracker.add_sample([202.0, 802.0]);
        tracker.add_sample([199.0, 799.0]);
        tracker.add_sample([201.0, 801.0]);

        let reference = tracker.try_freeze().unwrap();
        assert_relative_eq!(reference.channel(0), 200.0, epsilon = 1e-4);
        assert_relative_eq!(reference.channel(1), 800.0, epsilon = 1e-4);
    }

    #[test]
    fn freeze_is_one_shot_and_drift_free() {
        let mut tracker = CalibrationTracker::<1>::new(3);
        for _ in 0..3 {
            tracker.add_sample([100.0]);
        }
        let first = *tracker.try_freeze().unwrap();

        // samples after the freeze must not move the reference
        for _ in 0..50 {
            tracker.add_sample([9999.0]);
        }
        let second = *tracker.try_freeze().unwrap();
        assert_eq!(first, second);
        assert_relative_eq!(second.channel(0), 100.0, epsilon = 1e-6);
    }

    #[test]
    fn skipped_frames_do_not_count() {
        // the caller filters low-likelihood frames by not calling add_sample;
        // the tracker must only count what it was given
        let mut tracker = CalibrationTracker::<1>::new(10);
        for _ in 0..7 {
            tracker.add_sample([1.0]);
        }
        assert_eq!(tracker.samples_collected(), 7);
        assert!(tracker.try_freeze().is_none());
    }
}
