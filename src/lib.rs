//! `latbin`: binned evaluation of online learners under delayed labels.
//!
//! In a verification-latency stream an unlabelled example arrives, the model predicts at
//! once, and the true label shows up later, sometimes much later. Meanwhile the model keeps
//! learning from other labels and may be asked again. The question `latbin` answers is how
//! good the model's answer was *at each point* of that wait: right away, just before the
//! label arrived, and everywhere in between.
//!
//! Every instance's wait `[t0, t1]` is normalized and cut into `B` equal bins. Each
//! prediction made for the instance is attributed to one bin, and each bin feeds its own
//! caller-supplied [`Evaluator`]:
//!
//! ```text
//!   bin 0        bins 1..=B (relative time in [t0, t1])        bin B+1
//!   first    |--------|--------|--------|--------|          final (test-then-train)
//!   pred.       repredictions, forward-filled, merged
//! ```
//!
//! - a bin with no prediction of its own repeats the preceding one (a *cloned* result, not
//!   counted as a model call);
//! - several repredictions in one bin are merged by duration: each prediction owns the time
//!   until it is superseded ([`merge_run`]);
//! - every bin gets exactly one result per finished instance.
//!
//! **Main types:**
//! - [`EvaluationDriver`]: consumes the stream, buffers pending instances, and schedules
//!   repredictions every `K` labelled examples ([`DriverConfig::prediction_frequency`]).
//! - [`plan_bins`] / [`BinLayout`]: the pure bin-mapping step.
//! - [`BinEvaluators`]: the `B + 2` evaluators, with [`TallyEvaluator`] and
//!   [`OverheadCounters`] as building blocks for evaluation-overhead figures.
//! - [`run_prequential`]: the outer test-then-train loop, producing a [`LearningCurve`].
//! - [`Learner`] / [`ExampleStream`]: the seams to the model and the data source.
//!   (feature `stochastic`) [`DelayedLabelStream`] is a seedable synthetic source.
//!
//! **Non-goals:**
//! - No statistics of its own (accuracy, kappa, error metrics): bring an [`Evaluator`].
//! - No eviction of instances whose label never arrives. The buffer grows; use
//!   [`DriverConfig::backlog_warn_threshold`] to see it in the logs.
//! - Single-threaded: one driver per stream.
//!
//! Logging goes through `tracing`; the crate never installs a subscriber.

#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod example;
pub use example::*;

mod record;
pub use record::*;

mod pending;
pub use pending::*;

mod merge;
pub use merge::*;

mod binning;
pub use binning::*;

mod evaluator;
pub use evaluator::*;

mod bins;
pub use bins::*;

mod learner;
pub use learner::*;

mod stream;
pub use stream::*;

mod driver;
pub use driver::*;

mod report;
pub use report::*;

mod prequential;
pub use prequential::*;
