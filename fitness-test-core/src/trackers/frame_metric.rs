use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;
use nalgebra::Vector2;

use crate::{
    aggregate::MAX_CANDIDATES,
    calibration::CalibrationTracker,
    config::FrameMetricProfile,
    geometry::angle_at_vertex_deg,
    result::{ErrorKind, FrameStatus, Phase, Progress},
    sample::{Landmark, PoseDetection},
};

/// Per-frame height estimates outside this band are dropped as pose
/// glitches before they ever reach the aggregator.
const PLAUSIBLE_HEIGHT_CM: (f32, f32) = (50.0, 250.0);

/// The torso spans roughly this fraction of standing height; used when the
/// ankles are cut off at the bottom of the frame.
const TORSO_HEIGHT_RATIO: f32 = 0.35;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// value: standing height, cm
    Height,
    /// value: trunk flexion angle at the hip, deg
    SitAndReach,
}

/// Machine for the tests where every calibrated frame yields one
/// independent geometric candidate. No takeoff/landing pair, just
/// `Calibrating -> Measuring -> Done` with a frame budget.
pub enum FrameMetricTracker {
    Calibrating {
        profile: FrameMetricProfile,
        kind: MetricKind,
        baseline: CalibrationTracker<1>,
    },
    Measuring {
        profile: FrameMetricProfile,
        kind: MetricKind,
        candidates: Vec<f32, MAX_CANDIDATES>,
        frames_in_phase: usize,
    },
    Done {
        candidates: Vec<f32, MAX_CANDIDATES>,
    },
}

impl FrameMetricTracker {
    pub fn new(profile: FrameMetricProfile, kind: MetricKind) -> Self {
        let target = profile.calibration_frames;
        Self::Calibrating {
            profile,
            kind,
            baseline: CalibrationTracker::new(target),
        }
    }

    pub fn update(&mut self, detection: &PoseDetection) -> FrameStatus {
        match self {
            Self::Calibrating {
                profile,
                kind,
                baseline,
            } => {
                let Some(metric) = frame_metric(detection, *kind, profile) else {
                    return FrameStatus::IncompletePose;
                };
                baseline.add_sample([metric]);

                if let Some(frozen) = baseline.try_freeze() {
                    log_info!(
                        "subject acquired, baseline metric {} over {} frames",
                        frozen.channel(0),
                        profile.calibration_frames
                    );
                    *self = Self::Measuring {
                        profile: profile.clone(),
                        kind: *kind,
                        candidates: Vec::new(),
                        frames_in_phase: 0,
                    };
                }
                FrameStatus::Used
            }
            Self::Measuring {
                profile,
                kind,
                candidates,
                frames_in_phase,
            } => {
                *frames_in_phase += 1;
                let status = match frame_metric(detection, *kind, profile) {
                    Some(metric) => {
                        if candidates.push(metric).is_err() {
                            log_warn!("candidate buffer full, dropping frame metric");
                        }
                        FrameStatus::Used
                    }
                    None => FrameStatus::IncompletePose,
                };

                if *frames_in_phase >= profile.measure_frames {
                    log_info!(
                        "measuring window closed with {} candidates",
                        candidates.len()
                    );
                    *self = Self::Done {
                        candidates: candidates.clone(),
                    };
                }
                status
            }
            Self::Done { .. } => FrameStatus::AfterCompletion,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Calibrating { .. } => Phase::Calibrating,
            Self::Measuring { .. } => Phase::Active,
            Self::Done { .. } => Phase::Done,
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            Self::Calibrating { baseline, .. } => Progress::Calibration {
                valid_frames: baseline.samples_collected(),
                target: baseline.target(),
            },
            Self::Measuring {
                profile,
                candidates,
                ..
            } => Progress::Frames {
                candidates: candidates.len(),
                budget: profile.measure_frames,
            },
            Self::Done { candidates } => Progress::Frames {
                candidates: candidates.len(),
                budget: 0,
            },
        }
    }

    pub fn candidates(&self) -> &[f32] {
        match self {
            Self::Measuring { candidates, .. } | Self::Done { candidates } => candidates,
            _ => &[],
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    pub fn incomplete_error(&self) -> Option<ErrorKind> {
        match self {
            Self::Calibrating { .. } => Some(ErrorKind::CalibrationIncomplete),
            // a cut-short measuring phase still aggregates whatever it has
            Self::Measuring { .. } | Self::Done { .. } => None,
        }
    }
}

fn frame_metric(
    detection: &PoseDetection,
    kind: MetricKind,
    profile: &FrameMetricProfile,
) -> Option<f32> {
    match kind {
        MetricKind::Height => height_cm(detection, profile),
        MetricKind::SitAndReach => trunk_angle_deg(detection, profile),
    }
}

/// Pinhole scaling of the nose-to-ankle pixel extent. When the ankles are
/// not confidently visible, scale the nose-to-hip extent up by the torso
/// ratio instead.
fn height_cm(detection: &PoseDetection, profile: &FrameMetricProfile) -> Option<f32> {
    let min_likelihood = profile.landmark_likelihood_threshold;
    let nose = detection.point_above(Landmark::Nose, min_likelihood)?;

    let pixel_extent = match detection.midpoint_above(
        Landmark::LeftAnkle,
        Landmark::RightAnkle,
        min_likelihood,
    ) {
        Some(ankle) => (ankle.y - nose.y).abs(),
        None => {
            let hip =
                detection.midpoint_above(Landmark::LeftHip, Landmark::RightHip, min_likelihood)?;
            (hip.y - nose.y).abs() / TORSO_HEIGHT_RATIO
        }
    };

    let height = pixel_extent * profile.subject_distance_m / profile.focal_length_px * 100.0;
    if height < PLAUSIBLE_HEIGHT_CM.0 || height > PLAUSIBLE_HEIGHT_CM.1 {
        log_debug!("discarding implausible per-frame height {} cm", height);
        return None;
    }
    Some(height)
}

/// Flexion angle at the hip vertex between the shoulder and the knee.
fn trunk_angle_deg(detection: &PoseDetection, profile: &FrameMetricProfile) -> Option<f32> {
    let min_likelihood = profile.landmark_likelihood_threshold;
    let shoulder: Vector2<f32> =
        detection.midpoint_above(Landmark::LeftShoulder, Landmark::RightShoulder, min_likelihood)?;
    let hip = detection.midpoint_above(Landmark::LeftHip, Landmark::RightHip, min_likelihood)?;
    let knee = detection.midpoint_above(Landmark::LeftKnee, Landmark::RightKnee, min_likelihood)?;
    Some(angle_at_vertex_deg(shoulder, hip, knee))
}
