use heapless::Vec;
#[allow(unused_imports)]
use micromath::F32Ext;

use crate::{
    calibration::CalibrationTracker,
    config::JumpProfile,
    result::{ErrorKind, FrameStatus, Phase, Progress},
    sample::{Landmark, PoseDetection},
    stability::StabilityWindow,
};

/// Trailing frames of toe X the landing check looks at.
const TOE_WINDOW: usize = 12;

/// Candidate buffer: one per toe-window frame for the broad jump, one for
/// the vertical jump.
const JUMP_CANDIDATES: usize = 16;

// calibration channels
const CH_HEAD_Y: usize = 0;
const CH_HEEL_Y: usize = 1;
const CH_TOE_Y: usize = 2;
const CH_ANKLE_Y: usize = 3;
const JUMP_CHANNELS: usize = 4;

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    /// value: peak heel rise, cm
    Vertical,
    /// value: horizontal toe displacement, cm
    Broad,
}

/// Constants frozen at the end of the standing phase. Pixel height anchors
/// every later threshold, so jump thresholds scale with how large the
/// athlete appears in frame.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy)]
pub struct JumpReference {
    pub pixel_height: f32,
    pub baseline_heel_y: f32,
    pub baseline_ankle_y: f32,
    pub ground_toe_y: f32,
}

/// Everything the jump machine needs out of one frame.
struct JumpObservation {
    head_y: f32,
    heel_y: f32,
    ankle_y: f32,
    toe_y: f32,
    toe_x: f32,
}

fn observe(detection: &PoseDetection, min_likelihood: f32) -> Option<JumpObservation> {
    let head = detection.point_above(Landmark::Nose, min_likelihood)?;
    let heel = detection.midpoint_above(Landmark::LeftHeel, Landmark::RightHeel, min_likelihood)?;
    let ankle =
        detection.midpoint_above(Landmark::LeftAnkle, Landmark::RightAnkle, min_likelihood)?;
    let toe = detection.midpoint_above(
        Landmark::LeftFootIndex,
        Landmark::RightFootIndex,
        min_likelihood,
    )?;
    Some(JumpObservation {
        head_y: head.y,
        heel_y: heel.y,
        ankle_y: ankle.y,
        toe_y: toe.y,
        toe_x: toe.x,
    })
}

/// Landing tolerance widens with elapsed airtime: a long flight means more
/// pose drift, so the heel does not have to come back as precisely.
fn landing_margin_ratio(airtime_frames: usize) -> f32 {
    match airtime_frames {
        0..=19 => 0.03,
        20..=34 => 0.05,
        35..=49 => 0.08,
        _ => 0.12,
    }
}

/// State machine for both jump tests: stand still, take off, fly, land.
pub enum JumpTracker {
    /// accumulate a standing baseline, then freeze the pixel-height scale
    Calibrating {
        profile: JumpProfile,
        kind: JumpKind,
        baseline: CalibrationTracker<JUMP_CHANNELS>,
    },
    /// calibrated, watching for the heel or ankle to leave the ground
    Ready {
        profile: JumpProfile,
        kind: JumpKind,
        reference: JumpReference,
    },
    /// takeoff seen, waiting for a landing that holds still
    InAir {
        profile: JumpProfile,
        kind: JumpKind,
        reference: JumpReference,
        takeoff_toe_x: f32,
        airtime_frames: usize,
        peak_heel_rise_px: f32,
        toe_x_window: StabilityWindow<TOE_WINDOW>,
    },
    Done {
        candidates: Vec<f32, JUMP_CANDIDATES>,
        airtime_frames: usize,
    },
}

impl JumpTracker {
    pub fn new(profile: JumpProfile, kind: JumpKind) -> Self {
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
                let Some(obs) = observe(detection, profile.landmark_likelihood_threshold) else {
                    // skipped frames never count toward the calibration target
                    return FrameStatus::IncompletePose;
                };
                baseline.add_sample([obs.head_y, obs.heel_y, obs.toe_y, obs.ankle_y]);

                if let Some(frozen) = baseline.try_freeze() {
                    let reference = JumpReference {
                        pixel_height: (frozen.channel(CH_HEAD_Y) - frozen.channel(CH_HEEL_Y))
                            .abs(),
                        baseline_heel_y: frozen.channel(CH_HEEL_Y),
                        baseline_ankle_y: frozen.channel(CH_ANKLE_Y),
                        ground_toe_y: frozen.channel(CH_TOE_Y),
                    };
                    if reference.pixel_height < 10.0 {
                        log_warn!(
                            "calibrated pixel height {} px is implausibly small",
                            reference.pixel_height
                        );
                    }
                    log_info!(
                        "jump baseline frozen: pixel_height={} heel_y={}",
                        reference.pixel_height,
                        reference.baseline_heel_y
                    );
                    *self = Self::Ready {
                        profile: profile.clone(),
                        kind: *kind,
                        reference,
                    };
                }
                FrameStatus::Used
            }
            Self::Ready {
                profile,
                kind,
                reference,
            } => {
                let Some(obs) = observe(detection, profile.landmark_likelihood_threshold) else {
                    return FrameStatus::IncompletePose;
                };
                let lift_threshold = profile.lift_threshold_ratio * reference.pixel_height;
                let heel_rise = reference.baseline_heel_y - obs.heel_y;
                let ankle_rise = reference.baseline_ankle_y - obs.ankle_y;

                if heel_rise > lift_threshold || ankle_rise > lift_threshold {
                    log_info!(
                        "takeoff detected, heel rise {} px (threshold {} px)",
                        heel_rise,
                        lift_threshold
                    );
                    let mut toe_x_window = StabilityWindow::with_min_samples(TOE_WINDOW);
                    toe_x_window.push(obs.toe_x);
                    *self = Self::InAir {
                        profile: profile.clone(),
                        kind: *kind,
                        reference: *reference,
                        takeoff_toe_x: obs.toe_x,
                        airtime_frames: 0,
                        peak_heel_rise_px: heel_rise.max(0.0),
                        toe_x_window,
                    };
                }
                FrameStatus::Used
            }
            Self::InAir {
                profile,
                kind,
                reference,
                takeoff_toe_x,
                airtime_frames,
                peak_heel_rise_px,
                toe_x_window,
            } => {
                *airtime_frames += 1;
                let Some(obs) = observe(detection, profile.landmark_likelihood_threshold) else {
                    return FrameStatus::IncompletePose;
                };

                let heel_rise = reference.baseline_heel_y - obs.heel_y;
                *peak_heel_rise_px = peak_heel_rise_px.max(heel_rise);
                toe_x_window.push(obs.toe_x);

                // landing needs the heel back near baseline AND a planted
                // toe at the same time, otherwise a mid-bounce frame would
                // read as a landing
                let margin = landing_margin_ratio(*airtime_frames) * reference.pixel_height;
                let heel_settled = (obs.heel_y - reference.baseline_heel_y).abs() < margin;
                let toe_planted = toe_x_window
                    .spread()
                    .is_some_and(|spread| spread < profile.toe_spread_max_px);

                if *airtime_frames >= profile.min_airtime_frames && heel_settled && toe_planted {
                    let scale = profile.user_height_cm / reference.pixel_height;
                    let mut candidates: Vec<f32, JUMP_CANDIDATES> = Vec::new();
                    match kind {
                        JumpKind::Broad => {
                            // one candidate per planted-toe frame, the
                            // aggregator sorts out the stragglers
                            for &toe_x in toe_x_window.iter() {
                                let _ = candidates.push((toe_x - *takeoff_toe_x).abs() * scale);
                            }
                        }
                        JumpKind::Vertical => {
                            let _ = candidates.push(peak_heel_rise_px.max(0.0) * scale);
                        }
                    }
                    log_info!(
                        "landing confirmed after {} airtime frames, {} candidates",
                        *airtime_frames,
                        candidates.len()
                    );
                    *self = Self::Done {
                        candidates,
                        airtime_frames: *airtime_frames,
                    };
                }
                FrameStatus::Used
            }
            Self::Done { .. } => FrameStatus::AfterCompletion,
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Calibrating { .. } => Phase::Calibrating,
            Self::Ready { .. } => Phase::Ready,
            Self::InAir { .. } => Phase::Active,
            Self::Done { .. } => Phase::Done,
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            Self::Calibrating { baseline, .. } => Progress::Calibration {
                valid_frames: baseline.samples_collected(),
                target: baseline.target(),
            },
            Self::Ready { .. } => Progress::Jump { airtime_frames: 0 },
            Self::InAir { airtime_frames, .. } => Progress::Jump {
                airtime_frames: *airtime_frames,
            },
            Self::Done { airtime_frames, .. } => Progress::Jump {
                airtime_frames: *airtime_frames,
            },
        }
    }

    /// Raw candidates, non-empty only once landed.
    pub fn candidates(&self) -> &[f32] {
        match self {
            Self::Done { candidates, .. } => candidates,
            _ => &[],
        }
    }

    /// The error a session in this phase reports if it ends now.
    pub fn incomplete_error(&self) -> Option<ErrorKind> {
        match self {
            Self::Calibrating { .. } => Some(ErrorKind::CalibrationIncomplete),
            Self::Ready { .. } => Some(ErrorKind::NoEventDetected),
            Self::InAir { .. } => Some(ErrorKind::EventAmbiguous),
            Self::Done { .. } => None,
        }
    }
}
