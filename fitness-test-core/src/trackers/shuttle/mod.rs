//! 4x10 m shuttle-run tracking: distance accumulation with exact milestone
//! boundaries, strict-mode turn confirmation while paused, and completion
//! at the configured total distance.
//!
//! All per-fix work happens in [`transition`], a pure function from
//! `(state, fix)` to `(new state, emitted event)`; the [`ShuttleTracker`]
//! wrapper only owns the current state and the profile. That keeps every
//! transition independently testable.

use heapless::Deque;

use crate::{
    config::ShuttleProfile,
    geometry::haversine_m,
    result::{ErrorKind, FrameStatus, Phase, Progress},
    sample::PositionFix,
};

mod turn;

pub use turn::{TurnInputs, TurnSignal, confirm_turn};

/// Fixes of look-back the turn detector can use.
pub const POSITION_HISTORY: usize = 16;

pub type PositionHistory = Deque<PositionFix, POSITION_HISTORY>;

/// A fixed distance checkpoint. Once passed it is never revisited.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy)]
pub struct Milestone {
    pub threshold_m: f64,
    pub passed: bool,
    /// where the athlete was when the boundary was crossed
    pub turn_position: Option<(f64, f64)>,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuttlePhase {
    /// waiting for the first fix accurate enough to anchor the run
    AcquiringFix,
    Running,
    /// paused exactly on a milestone boundary until a strict-mode turn
    AwaitingTurn {
        milestone: usize,
    },
    Completed,
}

#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShuttleEvent {
    StartAcquired,
    MilestoneReached(usize),
    TurnConfirmed(usize, TurnSignal),
    Completed,
}

/// The complete mutable state of a shuttle run, every field explicit.
/// The previous device heading is ordinary tracked state here, not
/// ambient context.
#[derive(Debug, Clone)]
pub struct ShuttleState {
    pub phase: ShuttlePhase,
    /// admitted fixes, oldest first, poor-accuracy ones included
    pub history: PositionHistory,
    pub total_distance_m: f64,
    pub lap_distance_m: f64,
    pub milestones: [Milestone; 3],
    pub direction_changes: u32,
    /// compass heading of the most recent fix that reported one
    pub prev_device_heading: Option<f32>,
    /// the turn point the athlete last left (run start before the first
    /// turn); the approach signal measures closing distance toward it
    pub last_turn_position: Option<(f64, f64)>,
    /// position distance increments are measured from
    pub anchor_position: Option<(f64, f64)>,
    pub prev_distance_to_reference_m: Option<f64>,
    /// accurate fixes that fed distance accumulation
    pub fixes_admitted: u32,
}

impl ShuttleState {
    pub fn new(profile: &ShuttleProfile) -> Self {
        Self {
            phase: ShuttlePhase::AcquiringFix,
            history: Deque::new(),
            total_distance_m: 0.0,
            lap_distance_m: 0.0,
            milestones: profile.milestones_m.map(|threshold_m| Milestone {
                threshold_m,
                passed: false,
                turn_position: None,
            }),
            direction_changes: 0,
            prev_device_heading: None,
            last_turn_position: None,
            anchor_position: None,
            prev_distance_to_reference_m: None,
            fixes_admitted: 0,
        }
    }

    pub fn milestones_passed(&self) -> u8 {
        self.milestones.iter().filter(|m| m.passed).count() as u8
    }
}

/// Advance the run by one fix.
///
/// The turn detector only ever sees the state as it stood *before* this
/// fix: history, previous heading and previous reference distance all
/// predate `fix`, which is what "previous sample" means in the signal
/// definitions.
pub fn transition(
    state: &ShuttleState,
    profile: &ShuttleProfile,
    fix: &PositionFix,
) -> (ShuttleState, Option<ShuttleEvent>) {
    let mut next = state.clone();
    let mut event = None;
    let accurate = fix.horizontal_accuracy_m <= profile.accuracy_ceiling_m;

    match state.phase {
        ShuttlePhase::AcquiringFix => {
            if accurate {
                let start = fix.lat_lon();
                next.anchor_position = Some(start);
                next.last_turn_position = Some(start);
                next.phase = ShuttlePhase::Running;
                event = Some(ShuttleEvent::StartAcquired);
            }
        }
        ShuttlePhase::Running => {
            if accurate && let Some(anchor) = state.anchor_position {
                let increment = haversine_m(anchor, fix.lat_lon());
                // sub-noise-floor increments don't accumulate and don't
                // advance the anchor, so slow movement still adds up
                if increment >= profile.noise_floor_m {
                    event = accumulate(&mut next, profile, fix, increment);
                }
            }
        }
        ShuttlePhase::AwaitingTurn { milestone } => {
            let inputs = TurnInputs {
                history: &state.history,
                current: fix,
                prev_device_heading: state.prev_device_heading,
                reference_position: state.last_turn_position,
                prev_distance_to_reference_m: state.prev_distance_to_reference_m,
            };
            if let Some(signal) = confirm_turn(profile, &inputs, true) {
                let turn_position = state.milestones[milestone].turn_position;
                next.direction_changes += 1;
                // resume from the recorded turn position, not the current
                // fix: pre-turn GPS drift must not inflate the next lap
                next.anchor_position = turn_position;
                next.last_turn_position = turn_position;
                next.lap_distance_m = 0.0;
                next.phase = ShuttlePhase::Running;
                event = Some(ShuttleEvent::TurnConfirmed(milestone, signal));
            }
        }
        ShuttlePhase::Completed => {}
    }

    // bookkeeping every phase shares, always on the post-transition state
    if next.history.is_full() {
        next.history.pop_front();
    }
    let _ = next.history.push_back(*fix);
    if fix.heading_deg.is_some() {
        next.prev_device_heading = fix.heading_deg;
    }
    next.prev_distance_to_reference_m = next
        .last_turn_position
        .map(|reference| haversine_m(fix.lat_lon(), reference));
    if accurate {
        next.fixes_admitted = next.fixes_admitted.saturating_add(1);
    }

    (next, event)
}

/// Add `increment` meters, clamping exactly onto the next milestone (or the
/// terminal distance) instead of overshooting it.
fn accumulate(
    next: &mut ShuttleState,
    profile: &ShuttleProfile,
    fix: &PositionFix,
    increment: f64,
) -> Option<ShuttleEvent> {
    let pending = next.milestones.iter().position(|m| !m.passed);
    let boundary = match pending {
        Some(i) => next.milestones[i].threshold_m,
        None => profile.total_distance_m,
    };
    let allowed = boundary - next.total_distance_m;

    if increment < allowed {
        next.total_distance_m += increment;
        next.lap_distance_m += increment;
        next.anchor_position = Some(fix.lat_lon());
        return None;
    }

    // partial increment lands precisely on the boundary; the lap is set to
    // the exact boundary-to-boundary span so no float drift survives
    let previous_boundary = match pending {
        Some(0) => 0.0,
        Some(i) => next.milestones[i - 1].threshold_m,
        None => next.milestones[2].threshold_m,
    };
    next.total_distance_m = boundary;
    next.lap_distance_m = boundary - previous_boundary;
    next.anchor_position = Some(fix.lat_lon());

    match pending {
        Some(i) => {
            next.milestones[i].passed = true;
            next.milestones[i].turn_position = Some(fix.lat_lon());
            next.phase = ShuttlePhase::AwaitingTurn { milestone: i };
            Some(ShuttleEvent::MilestoneReached(i))
        }
        None => {
            next.phase = ShuttlePhase::Completed;
            Some(ShuttleEvent::Completed)
        }
    }
}

/// Thin stateful shell over [`transition`].
pub struct ShuttleTracker {
    profile: ShuttleProfile,
    state: ShuttleState,
}

impl ShuttleTracker {
    pub fn new(profile: ShuttleProfile) -> Self {
        let state = ShuttleState::new(&profile);
        Self { profile, state }
    }

    pub fn update(&mut self, fix: &PositionFix) -> FrameStatus {
        if self.state.phase == ShuttlePhase::Completed {
            return FrameStatus::AfterCompletion;
        }

        let (next, event) = transition(&self.state, &self.profile, fix);
        match event {
            Some(ShuttleEvent::StartAcquired) => {
                log_info!("run anchored at first accurate fix");
            }
            Some(ShuttleEvent::MilestoneReached(i)) => {
                log_info!(
                    "milestone {} m reached, waiting for turn",
                    next.milestones[i].threshold_m
                );
            }
            Some(ShuttleEvent::TurnConfirmed(i, _)) => {
                log_info!(
                    "turn {} confirmed at milestone {} m",
                    next.direction_changes,
                    next.milestones[i].threshold_m
                );
            }
            Some(ShuttleEvent::Completed) => {
                log_info!("run complete at {} m", next.total_distance_m);
            }
            None => {}
        }
        self.state = next;

        if fix.horizontal_accuracy_m <= self.profile.accuracy_ceiling_m {
            FrameStatus::Used
        } else {
            FrameStatus::LowAccuracyFix
        }
    }

    pub fn state(&self) -> &ShuttleState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        match self.state.phase {
            ShuttlePhase::AcquiringFix => Phase::Calibrating,
            ShuttlePhase::Running => Phase::Active,
            ShuttlePhase::AwaitingTurn { .. } => Phase::AwaitingTurn,
            ShuttlePhase::Completed => Phase::Done,
        }
    }

    pub fn progress(&self) -> Progress {
        Progress::Shuttle {
            total_distance_m: self.state.total_distance_m,
            lap_distance_m: self.state.lap_distance_m,
            milestones_passed: self.state.milestones_passed(),
            direction_changes: self.state.direction_changes,
        }
    }

    pub fn incomplete_error(&self) -> Option<ErrorKind> {
        match self.state.phase {
            ShuttlePhase::AcquiringFix => Some(ErrorKind::CalibrationIncomplete),
            ShuttlePhase::Running if self.state.milestones_passed() == 0 => {
                Some(ErrorKind::NoEventDetected)
            }
            ShuttlePhase::Running | ShuttlePhase::AwaitingTurn { .. } => {
                Some(ErrorKind::EventAmbiguous)
            }
            ShuttlePhase::Completed => None,
        }
    }
}
