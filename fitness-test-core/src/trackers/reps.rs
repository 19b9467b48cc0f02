use crate::{
    calibration::CalibrationTracker,
    config::RepProfile,
    geometry::angle_at_vertex_deg,
    result::{ErrorKind, FrameStatus, Phase, Progress},
    sample::{Landmark, PoseDetection},
};

/// Which half of the sit-up the athlete is currently in, judged by the
/// shoulder-hip-knee angle.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Posture {
    /// trunk curled toward the knees
    Up,
    /// lying back on the ground
    Down,
}

/// Repetition counter for sit-ups.
///
/// The up and down thresholds are separated by a dead band, and a posture
/// only latches after holding for `min_phase_frames` consecutive frames, so
/// a single noisy angle estimate cannot mint a rep.
pub enum RepCounter {
    /// find the athlete's resting trunk angle
    Calibrating {
        profile: RepProfile,
        baseline: CalibrationTracker<1>,
    },
    Counting {
        profile: RepProfile,
        posture: Posture,
        /// consecutive frames the opposite posture has been seen
        pending_frames: usize,
        reps: u32,
        frames_in_phase: usize,
    },
}

impl RepCounter {
    pub fn new(profile: RepProfile) -> Self {
        let target = profile.calibration_frames;
        Self::Calibrating {
            profile,
            baseline: CalibrationTracker::new(target),
        }
    }

    pub fn update(&mut self, detection: &PoseDetection) -> FrameStatus {
        match self {
            Self::Calibrating { profile, baseline } => {
                let Some(angle) = trunk_angle(detection, profile) else {
                    return FrameStatus::IncompletePose;
                };
                baseline.add_sample([angle]);

                if let Some(frozen) = baseline.try_freeze() {
                    let resting_angle = frozen.channel(0);
                    let posture = if resting_angle > profile.down_angle_deg {
                        Posture::Down
                    } else {
                        log_warn!(
                            "resting trunk angle {} deg is not a lying posture",
                            resting_angle
                        );
                        Posture::Up
                    };
                    log_info!("rep counting starts from {} deg", resting_angle);
                    *self = Self::Counting {
                        profile: profile.clone(),
                        posture,
                        pending_frames: 0,
                        reps: 0,
                        frames_in_phase: 0,
                    };
                }
                FrameStatus::Used
            }
            Self::Counting {
                profile,
                posture,
                pending_frames,
                reps,
                frames_in_phase,
            } => {
                *frames_in_phase += 1;
                let Some(angle) = trunk_angle(detection, profile) else {
                    return FrameStatus::IncompletePose;
                };

                // hysteresis: the angle has to cross the far threshold, not
                // just leave the current posture's band
                let observed = if angle < profile.up_angle_deg {
                    Some(Posture::Up)
                } else if angle > profile.down_angle_deg {
                    Some(Posture::Down)
                } else {
                    None
                };

                match observed {
                    Some(next) if next != *posture => {
                        *pending_frames += 1;
                        if *pending_frames >= profile.min_phase_frames {
                            if next == Posture::Down {
                                // up-and-back-down completes the rep
                                *reps += 1;
                                log_info!("rep {} completed", *reps);
                            } else {
                                log_debug!("trunk up at {} deg", angle);
                            }
                            *posture = next;
                            *pending_frames = 0;
                        }
                    }
                    _ => {
                        *pending_frames = 0;
                    }
                }
                FrameStatus::Used
            }
        }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Calibrating { .. } => Phase::Calibrating,
            Self::Counting { .. } => Phase::Active,
        }
    }

    pub fn progress(&self) -> Progress {
        match self {
            Self::Calibrating { baseline, .. } => Progress::Calibration {
                valid_frames: baseline.samples_collected(),
                target: baseline.target(),
            },
            Self::Counting { reps, .. } => Progress::Reps { count: *reps },
        }
    }

    /// Completed repetitions; `None` while still calibrating.
    pub fn completed_reps(&self) -> Option<u32> {
        match self {
            Self::Calibrating { .. } => None,
            Self::Counting { reps, .. } => Some(*reps),
        }
    }

    pub fn frames_counted(&self) -> u32 {
        match self {
            Self::Calibrating { .. } => 0,
            Self::Counting {
                frames_in_phase, ..
            } => *frames_in_phase as u32,
        }
    }

    pub fn incomplete_error(&self) -> Option<ErrorKind> {
        match self {
            Self::Calibrating { .. } => Some(ErrorKind::CalibrationIncomplete),
            Self::Counting { reps: 0, .. } => Some(ErrorKind::NoEventDetected),
            Self::Counting { .. } => None,
        }
    }
}

fn trunk_angle(detection: &PoseDetection, profile: &RepProfile) -> Option<f32> {
    let min_likelihood = profile.landmark_likelihood_threshold;
    let shoulder =
        detection.midpoint_above(Landmark::LeftShoulder, Landmark::RightShoulder, min_likelihood)?;
    let hip = detection.midpoint_above(Landmark::LeftHip, Landmark::RightHip, min_likelihood)?;
    let knee = detection.midpoint_above(Landmark::LeftKnee, Landmark::RightKnee, min_likelihood)?;
    Some(angle_at_vertex_deg(shoulder, hip, knee))
}
