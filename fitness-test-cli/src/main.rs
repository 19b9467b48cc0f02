//! Replay recorded sample streams through the measurement engine.
//!
//! Pose streams are CSV in long format, one landmark per row, rows of one
//! frame sharing a timestamp:
//!
//! ```csv
//! timestamp_ms,frame_width,frame_height,person,landmark,x,y,likelihood
//! 0.0,720,1280,0,nose,360.0,200.0,0.97
//! 0.0,720,1280,0,left_heel,350.0,800.0,0.92
//! ```
//!
//! GPS streams are one fix per row:
//!
//! ```csv
//! timestamp_ms,latitude,longitude,horizontal_accuracy_m,heading_deg
//! 0.0,13.0,77.0,5.0,0.0
//! 1000.0,13.000018,77.0,5.0,
//! ```

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use fitness_test_core::{
    FrameMetricProfile, JumpProfile, Landmark, LandmarkPoint, MeasurementSession, Phase,
    PoseDetection, PoseFrame, PositionFix, RepProfile, Sample, ShuttleProfile, TestConfig,
};
use log::info;
use serde::Deserialize;

#[derive(Parser)]
#[command(about = "Replay recorded sample streams through the measurement engine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Replay a pose-landmark CSV through a camera test
    Pose {
        csv: PathBuf,
        #[arg(long)]
        test: PoseTest,
        /// athlete height, used to scale the jump tests
        #[arg(long, default_value_t = 170.0)]
        user_height_cm: f32,
    },
    /// Replay a GPS fix CSV through the shuttle-run test
    Gps { csv: PathBuf },
}

#[derive(ValueEnum, Clone, Copy)]
enum PoseTest {
    VerticalJump,
    BroadJump,
    Height,
    SitAndReach,
    SitUps,
}

#[derive(Deserialize)]
struct PoseRow {
    timestamp_ms: f64,
    frame_width: f32,
    frame_height: f32,
    person: usize,
    landmark: Landmark,
    x: f32,
    y: f32,
    likelihood: f32,
}

#[derive(Deserialize)]
struct GpsRow {
    timestamp_ms: f64,
    latitude: f64,
    longitude: f64,
    horizontal_accuracy_m: f32,
    heading_deg: Option<f32>,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();
    let cli = Cli::parse();

    let (config, samples) = match cli.command {
        Command::Pose {
            csv,
            test,
            user_height_cm,
        } => {
            let rows = read_rows::<PoseRow>(&csv)?;
            (pose_config(test, user_height_cm), frames_from_rows(rows))
        }
        Command::Gps { csv } => {
            let rows = read_rows::<GpsRow>(&csv)?;
            let samples = rows
                .into_iter()
                .map(|row| {
                    Sample::Position(PositionFix {
                        latitude: row.latitude,
                        longitude: row.longitude,
                        horizontal_accuracy_m: row.horizontal_accuracy_m,
                        heading_deg: row.heading_deg,
                        timestamp_ms: row.timestamp_ms,
                    })
                })
                .collect();
            (TestConfig::ShuttleRun(ShuttleProfile::default()), samples)
        }
    };

    let mut session = MeasurementSession::new(config);
    let mut phase = session.phase();
    for sample in &samples {
        let update = session.ingest(sample);
        if update.phase != phase {
            info!("{:?} -> {:?} ({:?})", phase, update.phase, update.progress);
            phase = update.phase;
        }
        if update.phase == Phase::Done {
            break;
        }
    }

    let result = session.finalize();
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}

fn pose_config(test: PoseTest, user_height_cm: f32) -> TestConfig {
    match test {
        PoseTest::VerticalJump => TestConfig::VerticalJump(JumpProfile {
            user_height_cm,
            ..Default::default()
        }),
        PoseTest::BroadJump => TestConfig::BroadJump(JumpProfile {
            user_height_cm,
            ..Default::default()
        }),
        PoseTest::Height => TestConfig::Height(FrameMetricProfile::default()),
        PoseTest::SitAndReach => TestConfig::SitAndReach(FrameMetricProfile::default()),
        PoseTest::SitUps => TestConfig::SitUps(RepProfile::default()),
    }
}

fn read_rows<T: for<'de> Deserialize<'de>>(path: &PathBuf) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row.with_context(|| format!("malformed row in {}", path.display()))?);
    }
    Ok(rows)
}

/// Fold landmark rows into frames. Rows belong to the same frame while
/// their timestamp matches; each distinct `person` index within a frame
/// becomes its own detection, so multi-person recordings replay as the
/// error condition they are.
fn frames_from_rows(rows: Vec<PoseRow>) -> Vec<Sample> {
    let mut samples: Vec<Sample> = Vec::new();
    let mut current: Option<PoseFrame> = None;
    let mut current_people: Vec<usize> = Vec::new();

    for row in rows {
        let start_new = current
            .as_ref()
            .is_none_or(|frame| frame.timestamp_ms != row.timestamp_ms);
        if start_new {
            if let Some(frame) = current.take() {
                samples.push(Sample::Pose(frame));
            }
            current = Some(PoseFrame::new(
                row.frame_width,
                row.frame_height,
                row.timestamp_ms,
            ));
            current_people.clear();
        }

        let frame = current.as_mut().expect("frame was just created");
        if !current_people.contains(&row.person) {
            current_people.push(row.person);
            frame.push_detection(PoseDetection::new());
        }
        let slot = current_people
            .iter()
            .position(|p| *p == row.person)
            .expect("person was just recorded");
        if let Some(detection) = frame.detections.get_mut(slot) {
            detection.set(
                row.landmark,
                LandmarkPoint {
                    x: row.x,
                    y: row.y,
                    likelihood: row.likelihood,
                },
            );
        }
    }
    if let Some(frame) = current.take() {
        samples.push(Sample::Pose(frame));
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(timestamp_ms: f64, person: usize, landmark: Landmark) -> PoseRow {
        PoseRow {
            timestamp_ms,
            frame_width: 720.0,
            frame_height: 1280.0,
            person,
            landmark,
            x: 100.0,
            y: 200.0,
            likelihood: 0.9,
        }
    }

    #[test]
    fn rows_group_into_frames_by_timestamp() {
        let rows = vec![
            row(0.0, 0, Landmark::Nose),
            row(0.0, 0, Landmark::LeftHeel),
            row(33.0, 0, Landmark::Nose),
        ];
        let samples = frames_from_rows(rows);
        assert_eq!(samples.len(), 2);
        let Sample::Pose(first) = &samples[0] else {
            panic!("expected a pose frame");
        };
        assert_eq!(first.detections.len(), 1);
        assert!(first.detections[0].point(Landmark::LeftHeel).is_some());
    }

    #[test]
    fn distinct_person_indices_become_detections() {
        let rows = vec![row(0.0, 0, Landmark::Nose), row(0.0, 1, Landmark::Nose)];
        let samples = frames_from_rows(rows);
        assert_eq!(samples.len(), 1);
        let Sample::Pose(frame) = &samples[0] else {
            panic!("expected a pose frame");
        };
        assert_eq!(frame.detections.len(), 2);
    }
}
