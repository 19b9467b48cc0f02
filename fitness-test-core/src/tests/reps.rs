use super::init_logger;
use crate::{
    config::{RepProfile, TestConfig},
    result::{ErrorKind, Phase, Progress},
    sample::{Landmark, LandmarkPoint, PoseDetection, PoseFrame, Sample},
    session::MeasurementSession,
};

/// Athlete lying on their back: hip at the origin of the pose, knee out
/// along +x, shoulder placed so the shoulder-hip-knee angle is exactly
/// `trunk_angle_deg`.
fn situp_frame(trunk_angle_deg: f32, timestamp_ms: f64) -> Sample {
    let hip = (360.0, 500.0);
    let knee = (560.0, 500.0);
    let angle = trunk_angle_deg.to_radians();
    let shoulder = (
        hip.0 + 200.0 * angle.cos(),
        hip.1 - 200.0 * angle.sin(),
    );

    let mut d = PoseDetection::new();
    let p = |x: f32, y: f32| LandmarkPoint {
        x,
        y,
        likelihood: 0.9,
    };
    d.set(Landmark::LeftShoulder, p(shoulder.0 - 5.0, shoulder.1));
    d.set(Landmark::RightShoulder, p(shoulder.0 + 5.0, shoulder.1));
    d.set(Landmark::LeftHip, p(hip.0 - 5.0, hip.1));
    d.set(Landmark::RightHip, p(hip.0 + 5.0, hip.1));
    d.set(Landmark::LeftKnee, p(knee.0 - 5.0, knee.1));
    d.set(Landmark::RightKnee, p(knee.0 + 5.0, knee.1));

    let mut frame = PoseFrame::new(720.0, 1280.0, timestamp_ms);
    frame.push_detection(d);
    Sample::Pose(frame)
}

fn feed(session: &mut MeasurementSession, angle: f32, frames: usize, t0: f64) -> f64 {
    let mut t = t0;
    for _ in 0..frames {
        session.ingest(&situp_frame(angle, t));
        t += 33.0;
    }
    t
}

#[test]
fn counts_full_repetitions() {
    init_logger();

    let profile = RepProfile::default();
    let mut session = MeasurementSession::new(TestConfig::SitUps(profile.clone()));

    // resting flat: 120 deg trunk angle
    let mut t = feed(&mut session, 120.0, profile.calibration_frames, 0.0);
    assert_eq!(session.phase(), Phase::Active);

    for _ in 0..3 {
        t = feed(&mut session, 40.0, 6, t);
        t = feed(&mut session, 120.0, 6, t);
    }

    assert_eq!(session.progress(), Progress::Reps { count: 3 });
    let result = session.finalize();
    assert!(result.success);
    assert_eq!(result.value, Some(3.0));
    assert_eq!(result.confidence, Some(1.0));
}

#[test]
fn single_frame_flicker_does_not_count() {
    init_logger();

    let profile = RepProfile::default();
    let mut session = MeasurementSession::new(TestConfig::SitUps(profile.clone()));

    let mut t = feed(&mut session, 120.0, profile.calibration_frames, 0.0);

    // two frames of "up" is below the 4-frame debounce
    t = feed(&mut session, 40.0, 2, t);
    feed(&mut session, 120.0, 10, t);

    assert_eq!(session.progress(), Progress::Reps { count: 0 });
    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::NoEventDetected));
}

#[test]
fn dead_band_angles_reset_the_debounce() {
    let profile = RepProfile::default();
    let mut session = MeasurementSession::new(TestConfig::SitUps(profile.clone()));

    let mut t = feed(&mut session, 120.0, profile.calibration_frames, 0.0);

    // alternating up-candidate and dead-band frames: the up posture can
    // never hold long enough to latch
    for _ in 0..10 {
        t = feed(&mut session, 40.0, 3, t);
        t = feed(&mut session, 80.0, 1, t);
    }
    assert_eq!(session.progress(), Progress::Reps { count: 0 });
}

#[test]
fn zero_reps_is_no_event_not_a_crash() {
    let profile = RepProfile::default();
    let mut session = MeasurementSession::new(TestConfig::SitUps(profile.clone()));

    feed(&mut session, 120.0, profile.calibration_frames + 30, 0.0);

    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::NoEventDetected));
}
