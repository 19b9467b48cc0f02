use approx::assert_relative_eq;

use super::{TestBody, init_logger};
use crate::{
    config::{JumpProfile, TestConfig},
    result::{ErrorKind, Phase},
    session::MeasurementSession,
};

fn jump_profile() -> JumpProfile {
    JumpProfile {
        user_height_cm: 180.0,
        ..Default::default()
    }
}

/// calibrated pixel height: |200 - 800| = 600 px, so the 3% lift
/// threshold is 18 px and 1 px maps to 0.3 cm for a 180 cm athlete
fn feed_calibration(session: &mut MeasurementSession, frames: usize) {
    let body = TestBody::default();
    for i in 0..frames {
        session.ingest(&body.frame(i as f64 * 33.0));
    }
}

#[test]
fn broad_jump_end_to_end() {
    init_logger();

    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));

    feed_calibration(&mut session, 25);
    assert_eq!(session.phase(), Phase::Ready);

    // takeoff: heel rises 40 px, well past the 18 px threshold
    let mut body = TestBody::default();
    body.heel_y = 760.0;
    body.ankle_y = 740.0;
    session.ingest(&body.frame(1000.0));
    assert_eq!(session.phase(), Phase::Active);

    // flight: heel high, toe sweeping forward
    for i in 0..10 {
        body.heel_y = 700.0;
        body.ankle_y = 680.0;
        body.toe_x = 380.0 + i as f32 * 16.0;
        session.ingest(&body.frame(1100.0 + i as f64 * 33.0));
    }
    assert_eq!(session.phase(), Phase::Active);

    // landing: heel back on baseline, toe planted at 560 px for 12 frames
    for i in 0..12 {
        body.heel_y = 800.0;
        body.ankle_y = 780.0;
        body.toe_x = if i % 2 == 0 { 560.0 } else { 561.0 };
        session.ingest(&body.frame(1500.0 + i as f64 * 33.0));
    }
    assert_eq!(session.phase(), Phase::Done);

    // |560 - 360| px * 180 cm / 600 px = 60 cm
    let result = session.finalize();
    assert!(result.success);
    assert_relative_eq!(result.value.unwrap(), 60.0, epsilon = 1.0);
    assert!(result.confidence.unwrap() > 0.9);
    assert!(result.sample_count > 0);
    assert_eq!(result.error, None);
}

#[test]
fn vertical_jump_measures_peak_rise() {
    init_logger();

    let mut session = MeasurementSession::new(TestConfig::VerticalJump(jump_profile()));
    feed_calibration(&mut session, 25);

    let mut body = TestBody::default();
    body.heel_y = 760.0;
    session.ingest(&body.frame(1000.0));

    // peak of the flight: heel 100 px above baseline
    for i in 0..10 {
        body.heel_y = 700.0;
        session.ingest(&body.frame(1100.0 + i as f64 * 33.0));
    }
    for i in 0..12 {
        body.heel_y = 800.0;
        session.ingest(&body.frame(1500.0 + i as f64 * 33.0));
    }

    // 100 px * 180 cm / 600 px = 30 cm
    let result = session.finalize();
    assert!(result.success);
    assert_relative_eq!(result.value.unwrap(), 30.0, epsilon = 0.5);
}

#[test]
fn session_ending_while_calibrating_reports_calibration_incomplete() {
    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));
    feed_calibration(&mut session, 10);

    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::CalibrationIncomplete));
}

#[test]
fn never_jumping_reports_no_event() {
    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));
    feed_calibration(&mut session, 60);
    assert_eq!(session.phase(), Phase::Ready);

    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::NoEventDetected));
}

#[test]
fn unconfirmed_landing_reports_event_ambiguous() {
    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));
    feed_calibration(&mut session, 25);

    let mut body = TestBody::default();
    body.heel_y = 700.0;
    for i in 0..20 {
        // airborne the whole time, never settles
        body.toe_x = 380.0 + i as f32 * 10.0;
        session.ingest(&body.frame(1000.0 + i as f64 * 33.0));
    }

    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::EventAmbiguous));
}

#[test]
fn low_likelihood_frames_do_not_count_toward_calibration() {
    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));

    let mut faint = TestBody::default();
    faint.likelihood = 0.2;
    for i in 0..25 {
        session.ingest(&faint.frame(i as f64 * 33.0));
    }
    // 25 skipped frames later the session is still calibrating
    assert_eq!(session.phase(), Phase::Calibrating);

    feed_calibration(&mut session, 25);
    assert_eq!(session.phase(), Phase::Ready);
}

#[test]
fn bounce_does_not_confirm_landing() {
    init_logger();

    let mut session = MeasurementSession::new(TestConfig::BroadJump(jump_profile()));
    feed_calibration(&mut session, 25);

    let mut body = TestBody::default();
    body.heel_y = 760.0;
    session.ingest(&body.frame(1000.0));

    // heel touches baseline mid-bounce but the toe is still travelling,
    // so the stability window must hold the landing back
    for i in 0..10 {
        body.heel_y = 800.0;
        body.toe_x = 380.0 + i as f32 * 25.0;
        session.ingest(&body.frame(1100.0 + i as f64 * 33.0));
    }
    assert_eq!(session.phase(), Phase::Active);
}
