//! Stream examples: the instances the driver buffers and scores.

use std::fmt;

/// Stable identity of an instance while it waits for its label.
///
/// The unlabelled arrival and the later labelled arrival of the same instance carry the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for InstanceId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// True label of an instance.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Label {
    /// Class index (classification).
    Class(usize),
    /// Numeric target (regression).
    Value(f64),
}

impl Label {
    /// Class index, if this is a classification label.
    pub fn class(&self) -> Option<usize> {
        match self {
            Label::Class(c) => Some(*c),
            Label::Value(_) => None,
        }
    }

    /// Label as a number: the class index for classification, the target for regression.
    pub fn value(&self) -> f64 {
        match self {
            Label::Class(c) => *c as f64,
            Label::Value(v) => *v,
        }
    }
}

/// One example read from the stream.
///
/// Whether an example is labelled is decided by whoever produces the stream; the driver only
/// looks at [`Example::label`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Example {
    pub id: InstanceId,
    /// Stream timestamp; non-decreasing along the stream.
    pub timestamp: i64,
    /// Non-negative weight. Zero-weight examples are buffered but never counted.
    pub weight: f64,
    pub label: Option<Label>,
    pub features: Vec<f64>,
}

impl Example {
    /// An unlabelled example with weight 1.
    pub fn unlabelled(id: impl Into<InstanceId>, timestamp: i64, features: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            weight: 1.0,
            label: None,
            features,
        }
    }

    /// A labelled example with weight 1.
    pub fn labelled(
        id: impl Into<InstanceId>,
        timestamp: i64,
        features: Vec<f64>,
        label: Label,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            weight: 1.0,
            label: Some(label),
            features,
        }
    }

    /// Replace the weight.
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Replace the label.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn is_labelled(&self) -> bool {
        self.label.is_some()
    }
}
