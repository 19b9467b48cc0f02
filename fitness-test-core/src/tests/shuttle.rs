use approx::assert_relative_eq;

use super::init_logger;
use crate::{
    config::{ShuttleProfile, TestConfig},
    result::{ErrorKind, FrameStatus, Phase},
    sample::{PositionFix, Sample},
    session::MeasurementSession,
    trackers::{ShuttlePhase, ShuttleTracker},
};

/// ~2.0015 m of latitude
const STEP: f64 = 0.000018;
const START: (f64, f64) = (13.0, 77.0);

fn fix(lat: f64, lon: f64, heading: Option<f32>, t: f64) -> PositionFix {
    PositionFix {
        latitude: lat,
        longitude: lon,
        horizontal_accuracy_m: 5.0,
        heading_deg: heading,
        timestamp_ms: t,
    }
}

/// Drive the tracker up its first lap: start anchor plus five 2 m steps
/// north, which crosses the 10 m milestone on the last one.
fn run_first_lap(tracker: &mut ShuttleTracker) -> f64 {
    let mut t = 0.0;
    for i in 0..=5 {
        tracker.update(&fix(START.0 + i as f64 * STEP, START.1, Some(0.0), t));
        t += 1000.0;
    }
    t
}

#[test]
fn milestone_distance_is_exact() {
    init_logger();

    let mut tracker = ShuttleTracker::new(ShuttleProfile::default());
    run_first_lap(&mut tracker);

    // five 2.0015 m increments overshoot 10 m; the partial increment must
    // land the lap exactly on the boundary
    let state = tracker.state();
    assert_eq!(state.total_distance_m, 10.0);
    assert_eq!(state.lap_distance_m, 10.0);
    assert!(state.milestones[0].passed);
    assert!(!state.milestones[1].passed);
    assert_eq!(state.phase, ShuttlePhase::AwaitingTurn { milestone: 0 });
    assert_eq!(state.direction_changes, 0);
}

#[test]
fn heading_flip_confirms_turn_and_rebases_distance() {
    init_logger();

    let mut tracker = ShuttleTracker::new(ShuttleProfile::default());
    let mut t = run_first_lap(&mut tracker);
    let turn_point = tracker.state().milestones[0].turn_position.unwrap();

    // compass flips by 110 degrees while paused at the milestone
    tracker.update(&fix(turn_point.0, turn_point.1, Some(110.0), t));
    t += 1000.0;

    let state = tracker.state();
    assert_eq!(state.direction_changes, 1);
    assert_eq!(state.phase, ShuttlePhase::Running);

    // next fix is 2 m south of the turn point; distance must grow from
    // the turn position, not from the run start
    tracker.update(&fix(turn_point.0 - STEP, turn_point.1, Some(180.0), t));
    let state = tracker.state();
    assert_relative_eq!(state.total_distance_m - 10.0, 2.0015, epsilon = 0.05);
    assert_relative_eq!(state.lap_distance_m, 2.0015, epsilon = 0.05);
}

#[test]
fn full_run_completes_at_forty_meters() {
    init_logger();

    let mut session = MeasurementSession::new(TestConfig::ShuttleRun(ShuttleProfile::default()));
    let mut t = 0.0;
    let mut lat = START.0;
    let mut heading = 0.0f32;

    // anchor
    session.ingest(&Sample::Position(fix(lat, START.1, Some(heading), t)));
    t += 1000.0;

    for _lap in 0..4 {
        let direction = if heading == 0.0 { 1.0 } else { -1.0 };
        // six steps cross the 10 m boundary
        for _ in 0..6 {
            lat += direction * STEP;
            session.ingest(&Sample::Position(fix(lat, START.1, Some(heading), t)));
            t += 1000.0;
            if session.phase() != Phase::Active {
                break;
            }
        }
        if session.phase() == Phase::Done {
            break;
        }
        // turn around
        heading = if heading == 0.0 { 180.0 } else { 0.0 };
        session.ingest(&Sample::Position(fix(lat, START.1, Some(heading), t)));
        t += 1000.0;
    }

    assert_eq!(session.phase(), Phase::Done);
    let result = session.finalize();
    assert!(result.success);
    assert_relative_eq!(result.value.unwrap(), 40.0, epsilon = 1e-4);
    assert_eq!(result.error, None);

    let update = session.ingest(&Sample::Position(fix(lat, START.1, None, t)));
    assert_eq!(update.frame_status, FrameStatus::AfterCompletion);
}

#[test]
fn low_accuracy_fixes_do_not_accumulate_distance() {
    init_logger();

    let mut tracker = ShuttleTracker::new(ShuttleProfile::default());
    tracker.update(&fix(START.0, START.1, Some(0.0), 0.0));

    // a wild 30 m-accuracy fix two steps north
    let status = tracker.update(&fix(
        START.0 + 2.0 * STEP,
        START.1,
        Some(0.0),
        1000.0,
    ));
    assert_eq!(status, FrameStatus::Used);
    let status = tracker.update(&PositionFix {
        horizontal_accuracy_m: 30.0,
        ..fix(START.0 + 4.0 * STEP, START.1, Some(0.0), 2000.0)
    });
    assert_eq!(status, FrameStatus::LowAccuracyFix);

    // distance only reflects the two accurate fixes
    let state = tracker.state();
    assert_relative_eq!(state.total_distance_m, 4.003, epsilon = 0.05);
    // but the poor fix still entered the position history
    assert_eq!(state.history.len(), 3);
}

#[test]
fn sub_noise_floor_increments_still_add_up() {
    let mut tracker = ShuttleTracker::new(ShuttleProfile::default());
    tracker.update(&fix(START.0, START.1, None, 0.0));

    // 0.22 m per fix is below the 0.5 m floor; the anchor must not chase
    // the fixes, so slow forward motion still accumulates eventually
    let tiny = STEP / 9.0;
    for i in 1..=20 {
        tracker.update(&fix(START.0 + i as f64 * tiny, START.1, None, i as f64 * 1000.0));
    }
    let state = tracker.state();
    assert!(state.total_distance_m > 3.0);
}

#[test]
fn milestones_are_validated_at_most_once() {
    let mut tracker = ShuttleTracker::new(ShuttleProfile::default());
    let mut t = run_first_lap(&mut tracker);
    let turn_point = tracker.state().milestones[0].turn_position.unwrap();

    tracker.update(&fix(turn_point.0, turn_point.1, Some(110.0), t));
    t += 1000.0;

    // run the second lap south, back past the first milestone's ground
    for i in 1..=6 {
        tracker.update(&fix(turn_point.0 - i as f64 * STEP, turn_point.1, Some(180.0), t));
        t += 1000.0;
    }

    let state = tracker.state();
    // the 10 m milestone is not re-triggered, the 20 m one is
    assert!(state.milestones[1].passed);
    assert_eq!(state.phase, ShuttlePhase::AwaitingTurn { milestone: 1 });
    assert_eq!(state.milestones_passed(), 2);
}

#[test]
fn never_acquiring_a_fix_reports_calibration_incomplete() {
    let mut session = MeasurementSession::new(TestConfig::ShuttleRun(ShuttleProfile::default()));
    for i in 0..10 {
        session.ingest(&Sample::Position(PositionFix {
            horizontal_accuracy_m: 50.0,
            ..fix(START.0, START.1, None, i as f64 * 1000.0)
        }));
    }
    let result = session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::CalibrationIncomplete));
}

#[test]
fn stalling_mid_run_reports_event_ambiguous() {
    let mut tracker_session =
        MeasurementSession::new(TestConfig::ShuttleRun(ShuttleProfile::default()));
    let mut t = 0.0;
    for i in 0..=5 {
        tracker_session.ingest(&Sample::Position(fix(
            START.0 + i as f64 * STEP,
            START.1,
            Some(0.0),
            t,
        )));
        t += 1000.0;
    }
    assert_eq!(tracker_session.phase(), Phase::AwaitingTurn);

    // athlete never turns; there is deliberately no timeout, the caller
    // decides when to give up
    let result = tracker_session.finalize();
    assert!(!result.success);
    assert_eq!(result.error, Some(ErrorKind::EventAmbiguous));
}
