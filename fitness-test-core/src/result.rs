use serde::{Deserialize, Serialize};

/// Why a session failed to produce a measurement. All of these are
/// recoverable: the caller may `reset()` and run again.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// required landmarks missing or below the likelihood threshold
    IncompletePose,
    MultiplePeopleDetected,
    OutOfFrame,
    /// session ended before the baseline froze
    CalibrationIncomplete,
    /// calibrated, but the expected event (takeoff, first rep, first
    /// milestone) never happened
    NoEventDetected,
    /// the event started but its end could not be confirmed (landing,
    /// turn, remaining milestones)
    EventAmbiguous,
    /// the aggregator received zero candidates
    NoValidCandidates,
    ValueOutOfPlausibleRange,
}

/// Per-sample disposition reported back to the caller. A rejected sample
/// never fails the session, the engine just moves on to the next one.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    Used,
    NoPersonDetected,
    MultiplePeopleDetected,
    IncompletePose,
    OutOfFrame,
    /// low-accuracy fix: admitted for turn detection, excluded from
    /// distance accumulation
    LowAccuracyFix,
    /// a pose sample fed to a GPS test or vice versa
    WrongKind,
    /// sample arrived after the tracker reached its terminal state
    AfterCompletion,
    /// the session's sample budget is spent
    BudgetExhausted,
}

/// Coarse phase of the session, common across all test kinds.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Calibrating,
    Ready,
    Active,
    AwaitingTurn,
    Done,
}

/// Live per-test detail carried by each `StateUpdate`.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Calibration {
        valid_frames: usize,
        target: usize,
    },
    Jump {
        airtime_frames: usize,
    },
    Frames {
        candidates: usize,
        budget: usize,
    },
    Reps {
        count: u32,
    },
    Shuttle {
        total_distance_m: f64,
        lap_distance_m: f64,
        milestones_passed: u8,
        direction_changes: u32,
    },
    None,
}

/// What `ingest` hands back after every sample.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct StateUpdate {
    pub phase: Phase,
    pub frame_status: FrameStatus,
    pub progress: Progress,
}

/// The one validated measurement a session produces.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct TestResult {
    pub success: bool,
    /// cm for the camera tests, m for the shuttle run, reps for sit-ups
    pub value: Option<f32>,
    /// 0.5 - 1.0
    pub confidence: Option<f32>,
    /// samples that contributed to the value
    pub sample_count: u32,
    pub error: Option<ErrorKind>,
}

impl TestResult {
    pub fn failure(error: ErrorKind, sample_count: u32) -> Self {
        Self {
            success: false,
            value: None,
            confidence: None,
            sample_count,
            error: Some(error),
        }
    }
}
