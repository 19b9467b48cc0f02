use heapless::Vec;
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

/// Upper bound on pose detections carried per frame. Anything past the
/// second detection is already an error condition, the extra slots just
/// let the caller hand over what the detector produced.
pub const MAX_DETECTIONS: usize = 4;

/// Named anatomical points, in the order the landmark provider reports them.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Landmark {
    Nose,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl Landmark {
    pub const COUNT: usize = 17;

    pub const fn index(self) -> usize {
        self as usize
    }
}

/// One detected landmark in image-pixel space, with the detector's
/// per-point confidence.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct LandmarkPoint {
    /// px
    pub x: f32,
    /// px, y grows downward
    pub y: f32,
    /// 0-1
    pub likelihood: f32,
}

impl LandmarkPoint {
    pub fn position(&self) -> Vector2<f32> {
        Vector2::new(self.x, self.y)
    }
}

/// All landmarks of a single detected person.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PoseDetection {
    points: [Option<LandmarkPoint>; Landmark::COUNT],
}

impl Default for PoseDetection {
    fn default() -> Self {
        Self::new()
    }
}

impl PoseDetection {
    pub const fn new() -> Self {
        Self {
            points: [None; Landmark::COUNT],
        }
    }

    pub fn set(&mut self, landmark: Landmark, point: LandmarkPoint) {
        self.points[landmark.index()] = Some(point);
    }

    pub fn point(&self, landmark: Landmark) -> Option<&LandmarkPoint> {
        self.points[landmark.index()].as_ref()
    }

    /// The landmark only if the detector is at least `min_likelihood` sure
    /// about it.
    pub fn point_above(&self, landmark: Landmark, min_likelihood: f32) -> Option<&LandmarkPoint> {
        self.point(landmark)
            .filter(|p| p.likelihood >= min_likelihood)
    }

    /// Midpoint of a left/right landmark pair, when both sides pass the
    /// likelihood filter.
    pub fn midpoint_above(
        &self,
        left: Landmark,
        right: Landmark,
        min_likelihood: f32,
    ) -> Option<Vector2<f32>> {
        let l = self.point_above(left, min_likelihood)?;
        let r = self.point_above(right, min_likelihood)?;
        Some((l.position() + r.position()) / 2.0)
    }

    /// True when every confidently-detected point lies inside the frame.
    pub fn within_frame(&self, width: f32, height: f32, min_likelihood: f32) -> bool {
        self.points.iter().flatten().all(|p| {
            p.likelihood < min_likelihood
                || (p.x >= 0.0 && p.x <= width && p.y >= 0.0 && p.y <= height)
        })
    }
}

/// One camera frame worth of landmark results.
///
/// Zero detections and more than one detection are both meaningful to the
/// session layer, so the frame carries whatever the provider returned
/// instead of pre-filtering.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PoseFrame {
    /// px
    pub width: f32,
    /// px
    pub height: f32,
    pub timestamp_ms: f64,
    pub detections: Vec<PoseDetection, MAX_DETECTIONS>,
}

impl PoseFrame {
    pub fn new(width: f32, height: f32, timestamp_ms: f64) -> Self {
        Self {
            width,
            height,
            timestamp_ms,
            detections: Vec::new(),
        }
    }

    pub fn push_detection(&mut self, detection: PoseDetection) {
        if self.detections.push(detection).is_err() {
            log_warn!("pose frame already holds {} detections, dropping one", MAX_DETECTIONS);
        }
    }
}

/// One GPS fix as delivered by the position provider. No polling-rate
/// contract, fixes may arrive arbitrarily sparse.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone, Copy)]
pub struct PositionFix {
    pub latitude: f64,
    pub longitude: f64,
    /// m
    pub horizontal_accuracy_m: f32,
    /// deg clockwise from true north, when the device compass had one
    pub heading_deg: Option<f32>,
    pub timestamp_ms: f64,
}

impl PositionFix {
    pub fn lat_lon(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// One observation handed to the engine.
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum Sample {
    Pose(PoseFrame),
    Position(PositionFix),
}

impl Sample {
    pub fn timestamp_ms(&self) -> f64 {
        match self {
            Sample::Pose(frame) => frame.timestamp_ms,
            Sample::Position(fix) => fix.timestamp_ms,
        }
    }
}
