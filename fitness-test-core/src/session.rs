//! The orchestrator: one session owns one tracker, feeds it samples one at
//! a time, and produces exactly one validated result.

use core::sync::atomic::{AtomicBool, Ordering};

use heapless::Vec;

use crate::{
    aggregate::{MAX_CANDIDATES, robust_aggregate},
    config::{TestConfig, TestKind},
    result::{ErrorKind, FrameStatus, Phase, Progress, StateUpdate, TestResult},
    sample::{PoseDetection, PoseFrame, Sample},
    trackers::{
        FrameMetricTracker, JumpKind, JumpTracker, MetricKind, RepCounter, ShuttleTracker,
    },
};

enum TestTracker {
    Jump(JumpTracker),
    FrameMetric(FrameMetricTracker),
    Reps(RepCounter),
    Shuttle(ShuttleTracker),
}

fn build_tracker(config: &TestConfig) -> TestTracker {
    match config {
        TestConfig::VerticalJump(profile) => {
            TestTracker::Jump(JumpTracker::new(profile.clone(), JumpKind::Vertical))
        }
        TestConfig::BroadJump(profile) => {
            TestTracker::Jump(JumpTracker::new(profile.clone(), JumpKind::Broad))
        }
        TestConfig::Height(profile) => {
            TestTracker::FrameMetric(FrameMetricTracker::new(profile.clone(), MetricKind::Height))
        }
        TestConfig::SitAndReach(profile) => TestTracker::FrameMetric(FrameMetricTracker::new(
            profile.clone(),
            MetricKind::SitAndReach,
        )),
        TestConfig::SitUps(profile) => TestTracker::Reps(RepCounter::new(profile.clone())),
        TestConfig::ShuttleRun(profile) => {
            TestTracker::Shuttle(ShuttleTracker::new(profile.clone()))
        }
    }
}

/// Why rejected frames were rejected, tallied so a session that starves
/// can name the dominant cause instead of a bare "calibration incomplete".
#[derive(Default, Clone, Copy)]
struct RejectionCounters {
    no_person: u32,
    multiple_people: u32,
    incomplete_pose: u32,
    out_of_frame: u32,
}

impl RejectionCounters {
    fn record(&mut self, status: FrameStatus) {
        match status {
            FrameStatus::NoPersonDetected => self.no_person += 1,
            FrameStatus::MultiplePeopleDetected => self.multiple_people += 1,
            FrameStatus::IncompletePose => self.incomplete_pose += 1,
            FrameStatus::OutOfFrame => self.out_of_frame += 1,
            _ => {}
        }
    }

    /// The rejection reason behind more than half of all ingested samples,
    /// if there is one.
    fn dominant(&self, samples_ingested: u32) -> Option<ErrorKind> {
        let majority = samples_ingested / 2;
        if self.multiple_people > majority {
            Some(ErrorKind::MultiplePeopleDetected)
        } else if self.out_of_frame > majority {
            Some(ErrorKind::OutOfFrame)
        } else if self.no_person + self.incomplete_pose > majority {
            Some(ErrorKind::IncompletePose)
        } else {
            None
        }
    }
}

/// One measurement attempt, sample in / result out.
///
/// Strictly single-threaded and synchronous: each `ingest` runs to
/// completion before the next sample is considered, and nothing is shared
/// across sessions. Sparse sample arrival is fine, no fixed frame interval
/// is assumed anywhere.
pub struct MeasurementSession {
    config: TestConfig,
    tracker: TestTracker,
    samples_ingested: u32,
    rejections: RejectionCounters,
    result: Option<TestResult>,
}

impl MeasurementSession {
    pub fn new(config: TestConfig) -> Self {
        let tracker = build_tracker(&config);
        Self {
            config,
            tracker,
            samples_ingested: 0,
            rejections: RejectionCounters::default(),
            result: None,
        }
    }

    pub fn kind(&self) -> TestKind {
        self.config.kind()
    }

    pub fn phase(&self) -> Phase {
        if self.result.is_some() {
            return Phase::Done;
        }
        match &self.tracker {
            TestTracker::Jump(t) => t.phase(),
            TestTracker::FrameMetric(t) => t.phase(),
            TestTracker::Reps(t) => t.phase(),
            TestTracker::Shuttle(t) => t.phase(),
        }
    }

    pub fn progress(&self) -> Progress {
        match &self.tracker {
            TestTracker::Jump(t) => t.progress(),
            TestTracker::FrameMetric(t) => t.progress(),
            TestTracker::Reps(t) => t.progress(),
            TestTracker::Shuttle(t) => t.progress(),
        }
    }

    pub fn samples_ingested(&self) -> u32 {
        self.samples_ingested
    }

    /// Feed one sample. A bad sample only ever skips itself; the session
    /// keeps running.
    pub fn ingest(&mut self, sample: &Sample) -> StateUpdate {
        if self.result.is_some() {
            return self.state_update(FrameStatus::AfterCompletion);
        }
        if self.samples_ingested as usize >= self.config.sample_budget() {
            log_warn!("sample budget {} spent, ignoring sample", self.config.sample_budget());
            return self.state_update(FrameStatus::BudgetExhausted);
        }
        self.samples_ingested += 1;

        let frame_status = match (&mut self.tracker, sample) {
            (TestTracker::Shuttle(tracker), Sample::Position(fix)) => tracker.update(fix),
            (TestTracker::Shuttle(_), Sample::Pose(_)) => {
                log_warn!("pose frame fed to the shuttle-run session");
                FrameStatus::WrongKind
            }
            (_, Sample::Position(_)) => {
                log_warn!("position fix fed to a camera-test session");
                FrameStatus::WrongKind
            }
            (tracker, Sample::Pose(frame)) => {
                let min_likelihood = self
                    .config
                    .landmark_likelihood_threshold()
                    .unwrap_or(0.5);
                match admit_pose(frame, min_likelihood) {
                    Ok(detection) => match tracker {
                        TestTracker::Jump(t) => t.update(detection),
                        TestTracker::FrameMetric(t) => t.update(detection),
                        TestTracker::Reps(t) => t.update(detection),
                        TestTracker::Shuttle(_) => unreachable!(),
                    },
                    Err(status) => status,
                }
            }
        };

        self.rejections.record(frame_status);
        self.state_update(frame_status)
    }

    /// The session's one result. Computed on the first call, every later
    /// call re-reads the same value.
    pub fn finalize(&mut self) -> TestResult {
        if let Some(result) = self.result {
            return result;
        }
        let result = self.compute_result();
        log_info!(
            "session finalized: success={} value={:?} after {} samples",
            result.success,
            result.value,
            self.samples_ingested
        );
        self.result = Some(result);
        result
    }

    /// Discard everything and make the session reusable immediately.
    pub fn reset(&mut self) {
        self.tracker = build_tracker(&self.config);
        self.samples_ingested = 0;
        self.rejections = RejectionCounters::default();
        self.result = None;
    }

    fn state_update(&self, frame_status: FrameStatus) -> StateUpdate {
        StateUpdate {
            phase: self.phase(),
            frame_status,
            progress: self.progress(),
        }
    }

    /// A starving calibration is usually a symptom: name the dominant
    /// frame-rejection cause when there is one.
    fn refine(&self, error: ErrorKind) -> ErrorKind {
        if error == ErrorKind::CalibrationIncomplete {
            self.rejections
                .dominant(self.samples_ingested)
                .unwrap_or(error)
        } else {
            error
        }
    }

    fn compute_result(&self) -> TestResult {
        match &self.tracker {
            TestTracker::Jump(t) => match t.incomplete_error() {
                Some(error) => TestResult::failure(self.refine(error), 0),
                None => aggregate_result(&self.config, t.candidates()),
            },
            TestTracker::FrameMetric(t) => match t.incomplete_error() {
                Some(error) => TestResult::failure(self.refine(error), 0),
                // an exhausted stream mid-measuring still aggregates what
                // it collected
                None => aggregate_result(&self.config, t.candidates()),
            },
            TestTracker::Reps(t) => match (t.incomplete_error(), t.completed_reps()) {
                (Some(error), _) => TestResult::failure(self.refine(error), t.frames_counted()),
                (None, Some(reps)) => TestResult {
                    success: true,
                    value: Some(reps as f32),
                    confidence: Some(1.0),
                    sample_count: t.frames_counted(),
                    error: None,
                },
                (None, None) => TestResult::failure(ErrorKind::CalibrationIncomplete, 0),
            },
            TestTracker::Shuttle(t) => match t.incomplete_error() {
                Some(error) => TestResult::failure(error, t.state().fixes_admitted),
                None => TestResult {
                    success: true,
                    value: Some(t.state().total_distance_m as f32),
                    confidence: Some(1.0),
                    sample_count: t.state().fixes_admitted,
                    error: None,
                },
            },
        }
    }
}

/// Frame-level admission shared by every camera test. Zero people and more
/// than one person are deliberately distinct outcomes.
fn admit_pose(frame: &PoseFrame, min_likelihood: f32) -> Result<&PoseDetection, FrameStatus> {
    match frame.detections.len() {
        0 => Err(FrameStatus::NoPersonDetected),
        1 => {
            let detection = &frame.detections[0];
            if !detection.within_frame(frame.width, frame.height, min_likelihood) {
                Err(FrameStatus::OutOfFrame)
            } else {
                Ok(detection)
            }
        }
        _ => Err(FrameStatus::MultiplePeopleDetected),
    }
}

fn aggregate_result(config: &TestConfig, candidates: &[f32]) -> TestResult {
    let mut buffer: Vec<f32, MAX_CANDIDATES> = Vec::new();
    for &candidate in candidates {
        let _ = buffer.push(candidate);
    }

    match robust_aggregate(&mut buffer) {
        None => TestResult::failure(ErrorKind::NoValidCandidates, 0),
        Some(aggregate) => {
            let out_of_range = config
                .plausible_range()
                .is_some_and(|(lo, hi)| aggregate.value < lo || aggregate.value > hi);
            if out_of_range {
                log_warn!(
                    "aggregated value {} is outside the plausible range",
                    aggregate.value
                );
            }
            TestResult {
                success: !out_of_range,
                value: Some(aggregate.value),
                confidence: Some(aggregate.confidence),
                sample_count: aggregate.retained as u32,
                error: out_of_range.then_some(ErrorKind::ValueOutOfPlausibleRange),
            }
        }
    }
}

/// Non-blocking backpressure for hosts that deliver samples from an async
/// callback: at most one ingest may be in flight, and a sample arriving
/// while the permit is held must be dropped, never queued and never
/// blocked on.
///
/// ```ignore
/// let gate = IngestGate::new();
/// // camera callback:
/// if let Some(_permit) = gate.try_acquire() {
///     session.ingest(&sample);
/// } // anything else this frame is dropped
/// ```
pub struct IngestGate {
    busy: AtomicBool,
}

impl IngestGate {
    pub const fn new() -> Self {
        Self {
            busy: AtomicBool::new(false),
        }
    }

    pub fn try_acquire(&self) -> Option<IngestPermit<'_>> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            Some(IngestPermit { gate: self })
        } else {
            None
        }
    }
}

impl Default for IngestGate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct IngestPermit<'a> {
    gate: &'a IngestGate,
}

impl Drop for IngestPermit<'_> {
    fn drop(&mut self) {
        self.gate.busy.store(false, Ordering::Release);
    }
}
