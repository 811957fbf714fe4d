//! Duration-weighted merge of several predictions that fall into the same bin.
//!
//! A run is an ordered list of [`TimedVotes`]: a synthetic predecessor stamped at the bin's
//! start (carrying the prediction in force when the bin opened), the real predictions inside
//! the bin, and a synthetic successor stamped at the bin's end. For every consecutive pair
//! `(p_j, p_{j+1})` the *earlier* prediction owns the interval `t_{j+1} - t_j`: a prediction
//! stays the model's answer until it is superseded.

use crate::{TimedVotes, Votes};

/// Kind of learning task, which decides how votes are read and merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TaskKind {
    /// Votes are per-class scores; the prediction is their argmax.
    #[default]
    Classification,
    /// Votes hold a single predicted value in `votes[0]`.
    Regression,
}

/// Index of the largest score; ties go to the lowest index. `None` for empty input.
pub fn max_index(votes: &[f64]) -> Option<usize> {
    if votes.is_empty() {
        return None;
    }
    let mut best = 0usize;
    for (i, &v) in votes.iter().enumerate() {
        if votes[best] < v {
            best = i;
        }
    }
    Some(best)
}

/// One-hot vote for the argmax class (ties go to the lowest index).
pub fn binary_votes(votes: &[f64]) -> Votes {
    let mut out = vec![0.0; votes.len()];
    if let Some(i) = max_index(votes) {
        out[i] = 1.0;
    }
    out
}

/// Merge a run into one representative vote.
///
/// A run with fewer than two entries, or whose total span is zero, has nothing to weight:
/// the latest vote passes through unchanged.
pub fn merge_run(task: TaskKind, run: &[TimedVotes]) -> Votes {
    let Some(last) = run.last() else {
        return Vec::new();
    };
    let span = elapsed(run[0].timestamp, last.timestamp);
    if run.len() < 2 || span <= 0.0 {
        return last.votes.clone();
    }
    match task {
        TaskKind::Classification => merge_classification(run),
        TaskKind::Regression => vec![merge_regression(run, span)],
    }
}

fn merge_classification(run: &[TimedVotes]) -> Votes {
    let classes = run.iter().map(|p| p.votes.len()).max().unwrap_or(0);
    let mut weight = vec![0.0_f64; classes];
    for pair in run.windows(2) {
        let held = elapsed(pair[0].timestamp, pair[1].timestamp).max(0.0);
        if let Some(c) = max_index(&pair[0].votes) {
            weight[c] += held;
        }
    }
    binary_votes(&weight)
}

fn merge_regression(run: &[TimedVotes], span: f64) -> f64 {
    let mut weighted = 0.0_f64;
    for pair in run.windows(2) {
        let held = elapsed(pair[0].timestamp, pair[1].timestamp).max(0.0);
        let v = pair[0].votes.first().copied().unwrap_or(0.0);
        weighted += v * held;
    }
    weighted / span
}

/// `to - from` without overflow, for any pair of `i64` timestamps.
pub(crate) fn elapsed(from: i64, to: i64) -> f64 {
    (i128::from(to) - i128::from(from)) as f64
}
