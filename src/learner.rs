//! The model under evaluation.
//!
//! The driver only ever *queries* the learner; training is the outer loop's job
//! (see [`crate::run_prequential`]). Two baselines are included so the evaluation pipeline
//! can be exercised without a real model.

use crate::{Example, Label, Votes};

/// Common interface for online learners.
///
/// # Example
///
/// ```rust
/// use latbin::{Example, Label, Learner, MajorityClassLearner};
///
/// let mut m = MajorityClassLearner::default();
/// m.train(&Example::labelled(1, 0, vec![], Label::Class(2)));
/// let votes = m.predict(&Example::unlabelled(2, 1, vec![]));
/// assert_eq!(votes, vec![0.0, 0.0, 1.0]);
/// ```
pub trait Learner {
    /// Prediction for `example`. Must not change the learner.
    ///
    /// An empty vector means "no prediction yet" (e.g. an untrained model).
    fn predict(&self, example: &Example) -> Votes;

    /// Update the model with a labelled example. Unlabelled examples are ignored.
    fn train(&mut self, example: &Example);
}

/// Predicts the weighted class frequencies seen so far.
#[derive(Debug, Clone, Default)]
pub struct MajorityClassLearner {
    counts: Vec<f64>,
}

impl MajorityClassLearner {
    pub fn counts(&self) -> &[f64] {
        &self.counts
    }
}

impl Learner for MajorityClassLearner {
    fn predict(&self, _example: &Example) -> Votes {
        self.counts.clone()
    }

    fn train(&mut self, example: &Example) {
        let Some(Label::Class(c)) = example.label else {
            return;
        };
        if self.counts.len() <= c {
            self.counts.resize(c + 1, 0.0);
        }
        self.counts[c] += example.weight;
    }
}

/// Predicts the weighted mean of the targets seen so far (0 before any training).
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetMeanLearner {
    weight: f64,
    sum: f64,
}

impl Learner for TargetMeanLearner {
    fn predict(&self, _example: &Example) -> Votes {
        if self.weight > 0.0 {
            vec![self.sum / self.weight]
        } else {
            vec![0.0]
        }
    }

    fn train(&mut self, example: &Example) {
        let Some(label) = example.label else {
            return;
        };
        self.sum += label.value() * example.weight;
        self.weight += example.weight;
    }
}
