//! Measurement engine for camera- and GPS-based fitness tests.
//!
//! Noisy per-frame samples (pose landmarks or GPS fixes) go in, one
//! validated measurement with a confidence estimate comes out. Sensor
//! acquisition, ML inference, upload and persistence all live outside this
//! crate; the engine only ever sees [`Sample`] values.

// only use std when feature = "std" is enabled or during testing
#![cfg_attr(not(any(test, feature = "std")), no_std)]

mod fmt;

pub mod aggregate;
pub mod calibration;
pub mod config;
pub mod geometry;
pub mod result;
pub mod sample;
pub mod session;
pub mod stability;
pub mod trackers;
mod welford;

pub use config::{
    FrameMetricProfile, JumpProfile, RepProfile, ShuttleProfile, TestConfig, TestKind,
};
pub use result::{ErrorKind, FrameStatus, Phase, Progress, StateUpdate, TestResult};
pub use sample::{Landmark, LandmarkPoint, PoseDetection, PoseFrame, PositionFix, Sample};
pub use session::{IngestGate, MeasurementSession};
pub use welford::Welford;

#[cfg(test)]
mod tests;
