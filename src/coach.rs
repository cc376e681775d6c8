//! Coaching loop.
//!
//! Each round polls the target position, captures a frame, estimates the
//! user's keypoints and speaks feedback. Rounds are separated by a fixed
//! sleep; a failed round is logged and retried after the same sleep.

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::ingest::FrameSource;
use crate::pose::{KeypointSet, PoseEstimator};
use crate::speech::Speaker;

pub const NOT_THERE_YET: &str = "Not quite there yet";

/// Where target positions and hold instructions come from.
pub trait TargetSource {
    fn target_position(&mut self) -> Result<String>;
    fn instructions(&mut self, position: &str) -> Result<String>;
}

/// Recognizes which position a keypoint set shows.
///
/// Channel `i` of the keypoint set is model channel `i`; implementations must
/// know the model's joint layout.
pub trait PoseClassifier {
    /// The recognized position name, or `None` when nothing is recognized.
    fn classify(&self, keypoints: &KeypointSet) -> Option<String>;
}

/// Classifier for deployments without a pose-comparison model.
///
/// Never recognizes a position, so every round ends with corrective feedback.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnlabeledClassifier;

impl PoseClassifier for UnlabeledClassifier {
    fn classify(&self, _keypoints: &KeypointSet) -> Option<String> {
        None
    }
}

/// Result of one coaching round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundOutcome {
    pub target: String,
    pub recognized: Option<String>,
    pub matched: bool,
    pub keypoints: usize,
}

/// Counters over a coaching session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoachStats {
    pub rounds: u64,
    pub matches: u64,
    pub failures: u64,
}

pub struct Coach {
    targets: Box<dyn TargetSource>,
    frames: Box<dyn FrameSource>,
    estimator: PoseEstimator,
    classifier: Box<dyn PoseClassifier>,
    speaker: Box<dyn Speaker>,
    poll_interval: Duration,
    announced: Option<String>,
}

impl Coach {
    pub fn new(
        targets: Box<dyn TargetSource>,
        frames: Box<dyn FrameSource>,
        estimator: PoseEstimator,
        speaker: Box<dyn Speaker>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            targets,
            frames,
            estimator,
            classifier: Box::new(UnlabeledClassifier),
            speaker,
            poll_interval,
            announced: None,
        }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn PoseClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Run a single round.
    pub fn run_round(&mut self) -> Result<RoundOutcome> {
        let target = self
            .targets
            .target_position()
            .context("fetch target position")?;
        if self.announced.as_deref() != Some(target.as_str()) {
            log::info!("waiting for user to assume {}", target);
            self.speaker.say(&format!("Please assume {}", target))?;
            self.announced = Some(target.clone());
        }

        let frame = self.frames.next_frame().context("capture frame")?;
        let keypoints = self.estimator.estimate(&frame)?;
        let recognized = self.classifier.classify(&keypoints);
        let matched = recognized.as_deref() == Some(target.as_str());

        if matched {
            let instructions = self
                .targets
                .instructions(&target)
                .context("fetch hold instructions")?;
            self.speaker.say(&instructions)?;
        } else {
            self.speaker.say(NOT_THERE_YET)?;
        }

        Ok(RoundOutcome {
            target,
            recognized,
            matched,
            keypoints: keypoints.len(),
        })
    }

    /// Run rounds until `max_rounds` is reached (`None` = forever) or `shutdown` is set.
    pub fn run(&mut self, max_rounds: Option<u64>, shutdown: &AtomicBool) -> Result<CoachStats> {
        let mut stats = CoachStats::default();
        log::info!(
            "coach running: frames from {}, poll interval {:?}",
            self.frames.describe(),
            self.poll_interval
        );
        loop {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            if max_rounds.is_some_and(|max| stats.rounds >= max) {
                break;
            }

            let started = Instant::now();
            match self.run_round() {
                Ok(outcome) => {
                    if outcome.matched {
                        stats.matches += 1;
                    }
                    log::info!(
                        "round {}: target={}, matched={}, keypoints={}",
                        stats.rounds + 1,
                        outcome.target,
                        outcome.matched,
                        outcome.keypoints
                    );
                }
                Err(err) => {
                    stats.failures += 1;
                    log::warn!("round {} failed: {:#}", stats.rounds + 1, err);
                }
            }
            stats.rounds += 1;

            if max_rounds.is_some_and(|max| stats.rounds >= max) {
                break;
            }
            self.sleep_until_next_round(started, shutdown);
        }
        Ok(stats)
    }

    fn sleep_until_next_round(&self, started: Instant, shutdown: &AtomicBool) {
        let step = Duration::from_millis(50);
        while started.elapsed() < self.poll_interval {
            if shutdown.load(Ordering::SeqCst) {
                return;
            }
            std::thread::sleep(step.min(self.poll_interval.saturating_sub(started.elapsed())));
        }
    }

    /// Close the estimator.
    pub fn finish(self) -> Result<()> {
        self.estimator.close()
    }
}
