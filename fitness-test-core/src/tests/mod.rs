#[cfg(feature = "log")]
use log::LevelFilter;

use crate::sample::{Landmark, LandmarkPoint, PoseDetection, PoseFrame, Sample};

mod jump;
mod reps;
mod shuttle;

pub fn init_logger() {
    #[cfg(feature = "log")]
    let _ = env_logger::builder()
        .filter_level(LevelFilter::Warn)
        .filter(Some("fitness_test_core"), LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// A synthetic athlete standing in a 720x1280 frame, about 600 px tall.
/// Tests shift individual fields to simulate movement.
#[derive(Clone, Copy)]
pub struct TestBody {
    pub x: f32,
    pub nose_y: f32,
    pub shoulder_y: f32,
    pub hip_y: f32,
    pub knee_y: f32,
    pub ankle_y: f32,
    pub heel_y: f32,
    pub toe_y: f32,
    pub toe_x: f32,
    pub likelihood: f32,
}

impl Default for TestBody {
    fn default() -> Self {
        Self {
            x: 360.0,
            nose_y: 200.0,
            shoulder_y: 300.0,
            hip_y: 500.0,
            knee_y: 650.0,
            ankle_y: 780.0,
            heel_y: 800.0,
            toe_y: 810.0,
            toe_x: 360.0,
            likelihood: 0.9,
        }
    }
}

impl TestBody {
    pub fn detection(&self) -> PoseDetection {
        let mut d = PoseDetection::new();
        let p = |x: f32, y: f32| LandmarkPoint {
            x,
            y,
            likelihood: self.likelihood,
        };
        d.set(Landmark::Nose, p(self.x, self.nose_y));
        d.set(Landmark::LeftShoulder, p(self.x - 10.0, self.shoulder_y));
        d.set(Landmark::RightShoulder, p(self.x + 10.0, self.shoulder_y));
        d.set(Landmark::LeftHip, p(self.x - 10.0, self.hip_y));
        d.set(Landmark::RightHip, p(self.x + 10.0, self.hip_y));
        d.set(Landmark::LeftKnee, p(self.x - 10.0, self.knee_y));
        d.set(Landmark::RightKnee, p(self.x + 10.0, self.knee_y));
        d.set(Landmark::LeftAnkle, p(self.x - 10.0, self.ankle_y));
        d.set(Landmark::RightAnkle, p(self.x + 10.0, self.ankle_y));
        d.set(Landmark::LeftHeel, p(self.x - 10.0, self.heel_y));
        d.set(Landmark::RightHeel, p(self.x + 10.0, self.heel_y));
        d.set(Landmark::LeftFootIndex, p(self.toe_x - 10.0, self.toe_y));
        d.set(Landmark::RightFootIndex, p(self.toe_x + 10.0, self.toe_y));
        d
    }

    pub fn frame(&self, timestamp_ms: f64) -> Sample {
        let mut frame = PoseFrame::new(720.0, 1280.0, timestamp_ms);
        frame.push_detection(self.detection());
        Sample::Pose(frame)
    }
}
