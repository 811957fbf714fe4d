//! The evaluation control loop.
//!
//! [`EvaluationDriver`] owns the pending-instance buffer and the per-bin evaluators, and
//! consumes the stream one example at a time:
//!
//! ```text
//! unlabelled x  ->  predict, buffer, score immediately in bin 0 (no label yet)
//! labelled   x  ->  final prediction, label, map every prediction to bins, drop from buffer;
//!                   every other pending instance counts one more label passing it and is
//!                   repredicted each time that count reaches a multiple of K
//! ```
//!
//! Reprediction is driven only by the number of labelled examples observed, never by wall
//! time. The learner is borrowed per call: the caller trains it (after `process`) so the
//! final prediction is made before the label is learned from.

use tracing::{debug, trace, warn};

use crate::{
    plan_bins, BinEvaluators, BinLayout, Error, Evaluator, Example, InstanceId, Learner,
    PendingInstance, PendingInstanceBuffer, Result, TaskKind,
};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for an [`EvaluationDriver`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DriverConfig {
    /// Number of relative-time bins between the first and the final prediction (`1..=1000`).
    pub bin_count: usize,
    /// Reprediction cadence `K`: a pending instance is repredicted every `K` labelled
    /// examples observed while it waits (`>= 1`).
    pub prediction_frequency: u64,
    /// Task the learner solves. Every bin evaluator must report the same task, since the
    /// evaluators merge same-bin predictions according to it.
    pub task: TaskKind,
    /// Log a warning when the backlog reaches this size, and again at every doubling.
    ///
    /// The buffer itself is never capped.
    pub backlog_warn_threshold: Option<usize>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            bin_count: 50,
            prediction_frequency: 10,
            task: TaskKind::Classification,
            backlog_warn_threshold: None,
        }
    }
}

impl DriverConfig {
    pub fn with_bin_count(mut self, bin_count: usize) -> Self {
        self.bin_count = bin_count;
        self
    }

    pub fn with_prediction_frequency(mut self, k: u64) -> Self {
        self.prediction_frequency = k;
        self
    }

    pub fn with_task(mut self, task: TaskKind) -> Self {
        self.task = task;
        self
    }

    pub fn with_backlog_warning(mut self, threshold: usize) -> Self {
        self.backlog_warn_threshold = Some(threshold);
        self
    }

    /// Check ranges; returns the bin layout this configuration describes.
    pub fn validate(&self) -> Result<BinLayout> {
        if self.prediction_frequency == 0 {
            return Err(Error::InvalidConfig("prediction_frequency must be at least 1"));
        }
        if self.backlog_warn_threshold == Some(0) {
            return Err(Error::InvalidConfig("backlog_warn_threshold must be at least 1"));
        }
        BinLayout::new(self.bin_count)
    }
}

// ============================================================================
// Arrival
// ============================================================================

/// What [`EvaluationDriver::process`] did with one example.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arrival {
    /// Unlabelled example buffered; its first prediction went to bin 0.
    Buffered(InstanceId),
    /// Label arrived for a pending instance; its predictions were dispatched to all bins.
    Finalized {
        id: InstanceId,
        /// Repredictions made while the instance waited.
        repredictions: usize,
    },
    /// Label arrived for an instance that is not pending. Logged; the sweep still ran.
    Unmatched(InstanceId),
}

// ============================================================================
// EvaluationDriver
// ============================================================================

/// Delayed-label evaluation session.
///
/// ```rust
/// use latbin::{
///     Arrival, DriverConfig, EvaluationDriver, Example, InstanceId, Label, Learner,
///     MajorityClassLearner, TallyEvaluator, TaskKind,
/// };
///
/// let cfg = DriverConfig::default().with_bin_count(4).with_prediction_frequency(1);
/// let mut driver =
///     EvaluationDriver::new(cfg, |_| TallyEvaluator::new(TaskKind::Classification)).unwrap();
/// let mut model = MajorityClassLearner::default();
///
/// driver.process(&model, Example::unlabelled(1, 0, vec![0.3])).unwrap();
/// driver.process(&model, Example::unlabelled(2, 1, vec![0.8])).unwrap();
///
/// let label = Example::labelled(2, 5, vec![0.8], Label::Class(1));
/// driver.process(&model, label.clone()).unwrap();
/// model.train(&label);
///
/// let done = driver.process(&model, Example::labelled(1, 10, vec![0.3], Label::Class(0))).unwrap();
/// assert_eq!(done, Arrival::Finalized { id: InstanceId(1), repredictions: 1 });
/// assert!(driver.buffer().is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct EvaluationDriver<E> {
    cfg: DriverConfig,
    layout: BinLayout,
    buffer: PendingInstanceBuffer,
    bins: BinEvaluators<E>,
    next_backlog_warning: Option<usize>,
    finalized: u64,
    unmatched: u64,
}

impl<E: Evaluator> EvaluationDriver<E> {
    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    /// Create a driver, building one evaluator per bin with `factory(bin_index)`.
    pub fn new<F>(cfg: DriverConfig, factory: F) -> Result<Self>
    where
        F: FnMut(usize) -> E,
    {
        let layout = cfg.validate()?;
        Self::assemble(cfg, layout, BinEvaluators::new(layout, factory))
    }

    /// Create a driver around an existing evaluator array.
    pub fn with_evaluators(cfg: DriverConfig, bins: BinEvaluators<E>) -> Result<Self> {
        let layout = cfg.validate()?;
        if bins.layout() != layout {
            return Err(Error::EvaluatorCount {
                expected: layout.total_bins(),
                actual: bins.len(),
            });
        }
        Self::assemble(cfg, layout, bins)
    }

    fn assemble(cfg: DriverConfig, layout: BinLayout, bins: BinEvaluators<E>) -> Result<Self> {
        if bins.iter().any(|e| e.task() != cfg.task) {
            return Err(Error::InvalidConfig(
                "bin evaluators must report the task the driver is configured for",
            ));
        }
        Ok(Self {
            cfg,
            layout,
            buffer: PendingInstanceBuffer::new(),
            bins,
            next_backlog_warning: cfg.backlog_warn_threshold,
            finalized: 0,
            unmatched: 0,
        })
    }

    // -----------------------------------------------------------------------
    // Core interface
    // -----------------------------------------------------------------------

    /// Consume one example from the stream.
    ///
    /// Errors only on a duplicate unlabelled arrival (an identity that is already pending);
    /// the buffer is left unchanged in that case.
    pub fn process<L>(&mut self, learner: &L, example: Example) -> Result<Arrival>
    where
        L: Learner + ?Sized,
    {
        if example.is_labelled() {
            self.on_labelled(learner, example)
        } else {
            self.on_unlabelled(learner, example)
        }
    }

    fn on_unlabelled<L>(&mut self, learner: &L, example: Example) -> Result<Arrival>
    where
        L: Learner + ?Sized,
    {
        let id = example.id;
        if self.buffer.contains(id) {
            return Err(Error::DuplicateInstance(id));
        }
        let votes = learner.predict(&example);
        self.bins.immediate_mut().add_result(&example, &votes);
        self.buffer.insert(PendingInstance::new(example, votes))?;
        self.check_backlog();
        Ok(Arrival::Buffered(id))
    }

    fn on_labelled<L>(&mut self, learner: &L, example: Example) -> Result<Arrival>
    where
        L: Learner + ?Sized,
    {
        let id = example.id;
        let arrival = match self.buffer.remove(id) {
            Some(pending) => {
                let repredictions = self.finalize(learner, pending, &example)?;
                Arrival::Finalized { id, repredictions }
            }
            None => {
                warn!(
                    instance_id = id.0,
                    timestamp = example.timestamp,
                    "label for an instance that is not pending"
                );
                self.unmatched += 1;
                Arrival::Unmatched(id)
            }
        };

        let k = self.cfg.prediction_frequency;
        for pending in self.buffer.iter_mut() {
            if pending.record_pass() % k == 0 {
                let votes = learner.predict(pending.example());
                pending.push_reprediction(votes, example.timestamp);
                trace!(
                    instance_id = pending.id().0,
                    passed = pending.instances_passed(),
                    "reprediction"
                );
            }
        }

        let backlog = self.buffer.len();
        let repredictions = self.buffer.total_reprediction_count();
        let bin0 = self.bins.immediate_mut();
        bin0.set_backlog_size(backlog);
        bin0.set_reprediction_backlog(repredictions);
        Ok(arrival)
    }

    fn finalize<L>(
        &mut self,
        learner: &L,
        mut pending: PendingInstance,
        labelled: &Example,
    ) -> Result<usize>
    where
        L: Learner + ?Sized,
    {
        let repredictions = pending.reprediction_count();
        self.bins
            .immediate_mut()
            .increment_total_repredictions_for_finished_instance(repredictions);

        let votes = learner.predict(labelled);
        pending.finalize(votes, labelled.timestamp, labelled.label)?;
        let plan = plan_bins(self.layout, pending.records_mut())?;
        self.bins.apply(pending.example(), &plan);
        self.finalized += 1;

        debug!(
            instance_id = pending.id().0,
            repredictions,
            span = labelled.timestamp.saturating_sub(pending.first_timestamp()),
            "instance finalized"
        );
        Ok(repredictions)
    }

    fn check_backlog(&mut self) {
        let Some(at) = self.next_backlog_warning else {
            return;
        };
        let backlog = self.buffer.len();
        if backlog >= at {
            warn!(
                backlog,
                repredictions = self.buffer.total_reprediction_count(),
                "pending-instance backlog keeps growing; labels may be missing or very late"
            );
            self.next_backlog_warning = Some(at.saturating_mul(2));
        }
    }

    // -----------------------------------------------------------------------
    // Introspection
    // -----------------------------------------------------------------------

    pub fn config(&self) -> &DriverConfig {
        &self.cfg
    }

    pub fn layout(&self) -> BinLayout {
        self.layout
    }

    /// Instances still waiting for their label.
    pub fn buffer(&self) -> &PendingInstanceBuffer {
        &self.buffer
    }

    pub fn evaluators(&self) -> &BinEvaluators<E> {
        &self.bins
    }

    pub fn evaluators_mut(&mut self) -> &mut BinEvaluators<E> {
        &mut self.bins
    }

    /// Instances whose label arrived and whose predictions were dispatched.
    pub fn finalized_count(&self) -> u64 {
        self.finalized
    }

    /// Labels that matched no pending instance.
    pub fn unmatched_count(&self) -> u64 {
        self.unmatched
    }

    /// Backlog size at which the next warning is logged.
    pub(crate) fn next_backlog_warning(&self) -> Option<usize> {
        self.next_backlog_warning
    }

    pub fn into_evaluators(self) -> BinEvaluators<E> {
        self.bins
    }
}
