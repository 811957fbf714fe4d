//! Timestamped predictions made for one buffered instance.

/// Prediction vector: class scores for classification, a single value for regression.
pub type Votes = Vec<f64>;

/// When, relative to the instance's life in the buffer, a prediction was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PredictionRole {
    /// Made when the unlabelled instance arrived.
    First,
    /// Made while waiting for the label, as the model kept learning.
    Reprediction,
    /// Made right before the label is used (test-then-train).
    Final,
}

/// One prediction for a buffered instance.
///
/// Immutable except for the bin index, which the planner writes once.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PredictionRecord {
    votes: Votes,
    timestamp: i64,
    role: PredictionRole,
    bin_index: Option<usize>,
}

impl PredictionRecord {
    pub fn new(votes: Votes, timestamp: i64, role: PredictionRole) -> Self {
        Self {
            votes,
            timestamp,
            role,
            bin_index: None,
        }
    }

    pub fn votes(&self) -> &[f64] {
        &self.votes
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn role(&self) -> PredictionRole {
        self.role
    }

    /// Bin this record was mapped to, once planning has run.
    pub fn bin_index(&self) -> Option<usize> {
        self.bin_index
    }

    /// Set the bin index. Returns `false` (and changes nothing) if it was already set.
    pub fn assign_bin(&mut self, bin: usize) -> bool {
        if self.bin_index.is_some() {
            return false;
        }
        self.bin_index = Some(bin);
        true
    }

    /// Copy of the votes paired with a timestamp, for merge runs.
    pub fn timed(&self) -> TimedVotes {
        TimedVotes {
            votes: self.votes.clone(),
            timestamp: self.timestamp,
        }
    }
}

/// Votes that were in force from `timestamp` on; the element type of a merge run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimedVotes {
    pub votes: Votes,
    pub timestamp: i64,
}

impl TimedVotes {
    pub fn new(votes: Votes, timestamp: i64) -> Self {
        Self { votes, timestamp }
    }
}
