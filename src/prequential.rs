//! Test-then-train outer loop with delayed labels.
//!
//! Each example is handed to the [`EvaluationDriver`] first, so the final prediction for a
//! labelled example is made before the learner sees its label; only then is the learner
//! trained. Snapshots of every bin's measurements are collected into a [`LearningCurve`].

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{
    Error, EvaluationDriver, Evaluator, ExampleStream, Learner, LearningCurve, Measurement,
    Result,
};

/// Name of the processed-examples column.
pub const INSTANCES_COLUMN: &str = "learning evaluation instances";
/// Name of the elapsed-time column.
pub const TIME_COLUMN: &str = "evaluation time (seconds)";

/// Limits and sampling for [`run_prequential`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrequentialConfig {
    /// Stop after this many examples (labelled and unlabelled both count).
    pub instance_limit: Option<u64>,
    /// Stop once this much wall time has passed.
    pub time_limit: Option<Duration>,
    /// Take a snapshot every this many examples (`>= 1`).
    pub sample_frequency: u64,
}

impl Default for PrequentialConfig {
    fn default() -> Self {
        Self {
            instance_limit: None,
            time_limit: None,
            sample_frequency: 100_000,
        }
    }
}

impl PrequentialConfig {
    pub fn with_instance_limit(mut self, n: u64) -> Self {
        self.instance_limit = Some(n);
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_sample_frequency(mut self, n: u64) -> Self {
        self.sample_frequency = n;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_frequency == 0 {
            return Err(Error::InvalidConfig("sample_frequency must be at least 1"));
        }
        Ok(())
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StopReason {
    StreamExhausted,
    InstanceLimit,
    TimeLimit,
}

/// Outcome of [`run_prequential`].
#[derive(Debug, Clone)]
pub struct PrequentialSummary {
    /// Examples taken from the stream.
    pub instances: u64,
    /// Of those, examples that carried a label.
    pub labelled: u64,
    pub finalized: u64,
    pub unmatched: u64,
    /// Unlabelled arrivals dropped because their identity was already pending.
    pub duplicates: u64,
    /// Instances still waiting for a label when the run ended.
    pub pending: usize,
    pub elapsed: Duration,
    pub stop: StopReason,
    pub curve: LearningCurve,
}

/// Drive `stream` through `driver`, training `learner` on every labelled example.
pub fn run_prequential<E, L, S>(
    cfg: &PrequentialConfig,
    driver: &mut EvaluationDriver<E>,
    learner: &mut L,
    stream: &mut S,
) -> Result<PrequentialSummary>
where
    E: Evaluator,
    L: Learner + ?Sized,
    S: ExampleStream + ?Sized,
{
    cfg.validate()?;
    info!(
        bin_count = driver.config().bin_count,
        prediction_frequency = driver.config().prediction_frequency,
        sample_frequency = cfg.sample_frequency,
        "prequential run started"
    );

    let started = Instant::now();
    let mut curve = LearningCurve::new();
    let mut instances = 0u64;
    let mut labelled = 0u64;
    let mut duplicates = 0u64;
    let mut sampled_at = None;

    let stop = loop {
        if cfg.instance_limit.is_some_and(|n| instances >= n) {
            break StopReason::InstanceLimit;
        }
        if cfg.time_limit.is_some_and(|t| started.elapsed() >= t) {
            break StopReason::TimeLimit;
        }
        if !stream.has_more() {
            break StopReason::StreamExhausted;
        }
        let Some(example) = stream.next_example() else {
            break StopReason::StreamExhausted;
        };
        instances += 1;

        let is_labelled = example.is_labelled();
        let train_on = is_labelled.then(|| example.clone());
        match driver.process(&*learner, example) {
            Ok(_) => {}
            Err(Error::DuplicateInstance(id)) => {
                warn!(instance_id = id.0, "duplicate unlabelled arrival dropped");
                duplicates += 1;
            }
            Err(e) => return Err(e),
        }
        if let Some(example) = train_on {
            labelled += 1;
            learner.train(&example);
        }

        if instances % cfg.sample_frequency == 0 {
            snapshot(&mut curve, driver, instances, started.elapsed())?;
            sampled_at = Some(instances);
        }
    };

    if sampled_at != Some(instances) {
        snapshot(&mut curve, driver, instances, started.elapsed())?;
    }

    let elapsed = started.elapsed();
    info!(
        instances,
        labelled,
        finalized = driver.finalized_count(),
        unmatched = driver.unmatched_count(),
        pending = driver.buffer().len(),
        elapsed_s = elapsed.as_secs_f64(),
        ?stop,
        "prequential run finished"
    );

    Ok(PrequentialSummary {
        instances,
        labelled,
        finalized: driver.finalized_count(),
        unmatched: driver.unmatched_count(),
        duplicates,
        pending: driver.buffer().len(),
        elapsed,
        stop,
        curve,
    })
}

fn snapshot<E: Evaluator>(
    curve: &mut LearningCurve,
    driver: &EvaluationDriver<E>,
    instances: u64,
    elapsed: Duration,
) -> Result<()> {
    let mut row = vec![
        Measurement::new(INSTANCES_COLUMN, instances as f64),
        Measurement::new(TIME_COLUMN, elapsed.as_secs_f64()),
    ];
    row.extend(driver.evaluators().measurements());
    curve.insert(&row)
}
