//! The statistic sink each bin feeds.
//!
//! Accuracy, kappa, error metrics and the like live behind [`Evaluator`] and are supplied by
//! the caller. This module provides the trait, the overhead bookkeeping every binned
//! evaluator shares ([`OverheadCounters`]), and [`TallyEvaluator`], a statistics-free sink
//! that only counts what it receives.

use crate::{merge_run, Example, TaskKind, TimedVotes, Votes};

/// A named value reported by an evaluator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Measurement {
    pub name: String,
    pub value: f64,
}

impl Measurement {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Incremental evaluator fed with one bin's results.
///
/// `add_result` receives every prediction the model actually computed for this bin, including
/// unlabelled ones (the immediate bin-0 prediction), which count towards the calculated
/// prediction total but carry no label to score against. `add_cloned_result` receives results
/// that reuse an earlier prediction and must not be counted as calculated.
pub trait Evaluator {
    /// Task the votes belong to; decides how merge runs are combined.
    fn task(&self) -> TaskKind;

    /// Clear all accumulated state.
    fn reset(&mut self);

    /// Score a prediction computed for this bin.
    fn add_result(&mut self, example: &Example, votes: &[f64]);

    /// Score a prediction reused from an earlier bin (not a new model call).
    fn add_cloned_result(&mut self, example: &Example, votes: &[f64]);

    /// Merge a run of timestamped votes into one vote, then score it as computed.
    fn add_merged_result(&mut self, example: &Example, run: &[TimedVotes]) {
        let merged = merge_run(self.task(), run);
        self.add_result(example, &merged);
    }

    /// Current number of instances waiting for their label.
    fn set_backlog_size(&mut self, n: usize);

    /// Current number of reprediction records across waiting instances.
    fn set_reprediction_backlog(&mut self, n: usize);

    /// Add the reprediction count of an instance that just received its label.
    fn increment_total_repredictions_for_finished_instance(&mut self, count: usize);

    /// Snapshot of everything this evaluator reports, in a stable order.
    fn measurements(&self) -> Vec<Measurement>;
}

impl<E: Evaluator + ?Sized> Evaluator for Box<E> {
    fn task(&self) -> TaskKind {
        (**self).task()
    }
    fn reset(&mut self) {
        (**self).reset()
    }
    fn add_result(&mut self, example: &Example, votes: &[f64]) {
        (**self).add_result(example, votes)
    }
    fn add_cloned_result(&mut self, example: &Example, votes: &[f64]) {
        (**self).add_cloned_result(example, votes)
    }
    fn add_merged_result(&mut self, example: &Example, run: &[TimedVotes]) {
        (**self).add_merged_result(example, run)
    }
    fn set_backlog_size(&mut self, n: usize) {
        (**self).set_backlog_size(n)
    }
    fn set_reprediction_backlog(&mut self, n: usize) {
        (**self).set_reprediction_backlog(n)
    }
    fn increment_total_repredictions_for_finished_instance(&mut self, count: usize) {
        (**self).increment_total_repredictions_for_finished_instance(count)
    }
    fn measurements(&self) -> Vec<Measurement> {
        (**self).measurements()
    }
}

/// Evaluation-overhead bookkeeping shared by binned evaluators.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverheadCounters {
    /// Predictions that required a model call (cloned results excluded).
    pub calculated_predictions: u64,
    pub instances_in_buffer: usize,
    pub predictions_in_buffer: usize,
    /// Repredictions made for instances that have since received their label.
    pub finished_repredictions: u64,
    /// Weight of labelled results observed.
    pub labelled_weight: f64,
}

impl OverheadCounters {
    /// Account for one result. Only positive-weight results count.
    pub fn observe(&mut self, example: &Example, calculated: bool) {
        if example.weight <= 0.0 {
            return;
        }
        if calculated {
            self.calculated_predictions += 1;
        }
        if example.is_labelled() {
            self.labelled_weight += example.weight;
        }
    }

    /// Mean repredictions per labelled unit of weight; `0` before any labelled result.
    pub fn average_repredictions(&self) -> f64 {
        if self.labelled_weight > 0.0 {
            self.finished_repredictions as f64 / self.labelled_weight
        } else {
            0.0
        }
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        vec![
            Measurement::new("Calculated prediction count", self.calculated_predictions as f64),
            Measurement::new("Instances in buffer count", self.instances_in_buffer as f64),
            Measurement::new("Predictions in buffer count", self.predictions_in_buffer as f64),
            Measurement::new("Average reprediction count", self.average_repredictions()),
        ]
    }
}

/// Statistics-free evaluator: counts the results a bin receives.
///
/// Useful on its own for checking evaluation overhead and bin coverage, and as the reference
/// for how a statistics-bearing evaluator should treat cloned and merged results.
#[derive(Debug, Clone, Default)]
pub struct TallyEvaluator {
    task: TaskKind,
    scored: u64,
    cloned: u64,
    merged: u64,
    last_merged: Votes,
    overhead: OverheadCounters,
}

impl TallyEvaluator {
    pub fn new(task: TaskKind) -> Self {
        Self {
            task,
            ..Self::default()
        }
    }

    /// Labelled results received (computed, cloned or merged).
    pub fn scored(&self) -> u64 {
        self.scored
    }

    pub fn cloned(&self) -> u64 {
        self.cloned
    }

    pub fn merged(&self) -> u64 {
        self.merged
    }

    /// The most recent merged vote, empty before any merge.
    pub fn last_merged(&self) -> &[f64] {
        &self.last_merged
    }

    pub fn overhead(&self) -> &OverheadCounters {
        &self.overhead
    }

    fn record(&mut self, example: &Example, calculated: bool) {
        if example.is_labelled() {
            self.scored += 1;
        }
        self.overhead.observe(example, calculated);
    }
}

impl Evaluator for TallyEvaluator {
    fn task(&self) -> TaskKind {
        self.task
    }

    fn reset(&mut self) {
        *self = Self::new(self.task);
    }

    fn add_result(&mut self, example: &Example, _votes: &[f64]) {
        self.record(example, true);
    }

    fn add_cloned_result(&mut self, example: &Example, _votes: &[f64]) {
        self.cloned += 1;
        self.record(example, false);
    }

    fn add_merged_result(&mut self, example: &Example, run: &[TimedVotes]) {
        let merged = merge_run(self.task, run);
        self.merged += 1;
        self.add_result(example, &merged);
        self.last_merged = merged;
    }

    fn set_backlog_size(&mut self, n: usize) {
        self.overhead.instances_in_buffer = n;
    }

    fn set_reprediction_backlog(&mut self, n: usize) {
        self.overhead.predictions_in_buffer = n;
    }

    fn increment_total_repredictions_for_finished_instance(&mut self, count: usize) {
        self.overhead.finished_repredictions += count as u64;
    }

    fn measurements(&self) -> Vec<Measurement> {
        let mut out = vec![
            Measurement::new("classified instances", self.overhead.labelled_weight),
            Measurement::new("scored results", self.scored as f64),
            Measurement::new("cloned results", self.cloned as f64),
            Measurement::new("merged results", self.merged as f64),
        ];
        out.extend(self.overhead.measurements());
        out
    }
}
