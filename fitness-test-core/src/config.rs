//! Per-test threshold and budget data. One tracker implementation per
//! family, parameterized by these profiles instead of per-test subtypes.

use serde::{Deserialize, Serialize};

/// Which measurement a session produces.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TestKind {
    VerticalJump,
    BroadJump,
    Height,
    SitAndReach,
    SitUps,
    ShuttleRun,
}

/// Thresholds for the takeoff/landing state machine shared by both jump
/// tests.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JumpProfile {
    /// standing frames needed before the baseline freezes
    pub calibration_frames: usize,
    pub landmark_likelihood_threshold: f32,
    /// heel rise that counts as takeoff, as a fraction of the calibrated
    /// body pixel-height
    pub lift_threshold_ratio: f32,
    /// frames that must elapse in the air before a landing can confirm
    pub min_airtime_frames: usize,
    /// max-min toe X over the trailing window that still reads as "planted"
    pub toe_spread_max_px: f32,
    /// whole-session frame budget before the session reports an error
    pub frame_budget: usize,
    /// cm, scales pixel displacements to real-world units
    pub user_height_cm: f32,
}

impl Default for JumpProfile {
    fn default() -> Self {
        Self {
            calibration_frames: 25,
            landmark_likelihood_threshold: 0.5,
            lift_threshold_ratio: 0.03,
            min_airtime_frames: 8,
            toe_spread_max_px: 20.0,
            frame_budget: 1800,
            user_height_cm: 170.0,
        }
    }
}

/// Thresholds for the per-frame geometric tests (height, sit-and-reach).
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FrameMetricProfile {
    pub calibration_frames: usize,
    pub landmark_likelihood_threshold: f32,
    /// frames spent accumulating candidates once calibrated
    pub measure_frames: usize,
    pub frame_budget: usize,
    /// px, single focal-length estimate for the height test
    pub focal_length_px: f32,
    /// m, camera-to-subject distance for the height test
    pub subject_distance_m: f32,
}

impl Default for FrameMetricProfile {
    fn default() -> Self {
        Self {
            calibration_frames: 15,
            landmark_likelihood_threshold: 0.5,
            measure_frames: 90,
            frame_budget: 900,
            focal_length_px: 900.0,
            subject_distance_m: 2.5,
        }
    }
}

/// Thresholds for the sit-ups repetition counter.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RepProfile {
    pub calibration_frames: usize,
    pub landmark_likelihood_threshold: f32,
    /// deg, trunk angle below this reads as the "up" posture
    pub up_angle_deg: f32,
    /// deg, trunk angle above this reads as the "down" posture
    pub down_angle_deg: f32,
    /// consecutive frames a posture must hold before it latches
    pub min_phase_frames: usize,
    pub frame_budget: usize,
}

impl Default for RepProfile {
    fn default() -> Self {
        Self {
            calibration_frames: 15,
            landmark_likelihood_threshold: 0.5,
            up_angle_deg: 55.0,
            down_angle_deg: 105.0,
            min_phase_frames: 4,
            frame_budget: 5400,
        }
    }
}

/// Thresholds for the 4x10 m shuttle-run tracker.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ShuttleProfile {
    /// m, fixes worse than this feed turn detection but not distance
    pub accuracy_ceiling_m: f32,
    /// m, single increments below this do not accumulate
    pub noise_floor_m: f64,
    /// cumulative distances where the run pauses for a confirmed turn
    pub milestones_m: [f64; 3],
    /// m, terminal cumulative distance
    pub total_distance_m: f64,
    /// deg, device-compass delta confirming a turn
    pub heading_delta_deg: f32,
    pub strict_heading_delta_deg: f32,
    /// deg, GPS-bearing turn angle confirming a turn
    pub bearing_delta_deg: f32,
    pub strict_bearing_delta_deg: f32,
    /// displacement-cosine ceilings for the velocity-reversal signal
    pub velocity_cosine_max: f64,
    pub strict_velocity_cosine_max: f64,
    /// m, minimum per-fix approach toward the last turn point
    pub approach_delta_m: f64,
    /// whole-session fix budget
    pub fix_budget: usize,
}

impl Default for ShuttleProfile {
    fn default() -> Self {
        Self {
            accuracy_ceiling_m: 15.0,
            noise_floor_m: 0.5,
            milestones_m: [10.0, 20.0, 30.0],
            total_distance_m: 40.0,
            heading_delta_deg: 90.0,
            strict_heading_delta_deg: 100.0,
            bearing_delta_deg: 90.0,
            strict_bearing_delta_deg: 100.0,
            velocity_cosine_max: 0.1,
            strict_velocity_cosine_max: -0.2,
            approach_delta_m: 1.5,
            fix_budget: 1200,
        }
    }
}

/// A session's full configuration: the test to run plus its thresholds.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum TestConfig {
    VerticalJump(JumpProfile),
    BroadJump(JumpProfile),
    Height(FrameMetricProfile),
    SitAndReach(FrameMetricProfile),
    SitUps(RepProfile),
    ShuttleRun(ShuttleProfile),
}

impl TestConfig {
    pub fn kind(&self) -> TestKind {
        match self {
            TestConfig::VerticalJump(_) => TestKind::VerticalJump,
            TestConfig::BroadJump(_) => TestKind::BroadJump,
            TestConfig::Height(_) => TestKind::Height,
            TestConfig::SitAndReach(_) => TestKind::SitAndReach,
            TestConfig::SitUps(_) => TestKind::SitUps,
            TestConfig::ShuttleRun(_) => TestKind::ShuttleRun,
        }
    }

    /// Samples the session will process before finalize reports the
    /// phase it got stuck in.
    pub fn sample_budget(&self) -> usize {
        match self {
            TestConfig::VerticalJump(p) | TestConfig::BroadJump(p) => p.frame_budget,
            TestConfig::Height(p) | TestConfig::SitAndReach(p) => p.frame_budget,
            TestConfig::SitUps(p) => p.frame_budget,
            TestConfig::ShuttleRun(p) => p.fix_budget,
        }
    }

    /// Likelihood floor used for frame admission; `None` for the GPS test.
    pub fn landmark_likelihood_threshold(&self) -> Option<f32> {
        match self {
            TestConfig::VerticalJump(p) | TestConfig::BroadJump(p) => {
                Some(p.landmark_likelihood_threshold)
            }
            TestConfig::Height(p) | TestConfig::SitAndReach(p) => {
                Some(p.landmark_likelihood_threshold)
            }
            TestConfig::SitUps(p) => Some(p.landmark_likelihood_threshold),
            TestConfig::ShuttleRun(_) => None,
        }
    }

    /// Sanity bounds on the final value, in the unit of the test
    /// (cm for the camera tests). `None` means every value is accepted.
    pub fn plausible_range(&self) -> Option<(f32, f32)> {
        match self.kind() {
            TestKind::Height => Some((50.0, 250.0)),
            TestKind::BroadJump => Some((10.0, 400.0)),
            TestKind::VerticalJump => Some((2.0, 150.0)),
            TestKind::SitAndReach | TestKind::SitUps | TestKind::ShuttleRun => None,
        }
    }
}
