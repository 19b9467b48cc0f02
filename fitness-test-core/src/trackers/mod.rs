//! One state machine per measurement family, all following the same
//! calibrate / detect / accumulate skeleton.

pub mod frame_metric;
pub mod jump;
pub mod reps;
pub mod shuttle;

pub use frame_metric::{FrameMetricTracker, MetricKind};
pub use jump::{JumpKind, JumpReference, JumpTracker};
pub use reps::RepCounter;
pub use shuttle::{
    Milestone, PositionHistory, ShuttleEvent, ShuttlePhase, ShuttleState, ShuttleTracker,
    TurnInputs, TurnSignal, confirm_turn, transition,
};
