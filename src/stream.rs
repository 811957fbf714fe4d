//! Example sources.

use std::iter::Peekable;

use crate::Example;

/// A source of examples in non-decreasing timestamp order.
pub trait ExampleStream {
    /// Whether another example is available.
    fn has_more(&mut self) -> bool;

    /// The next example, or `None` when the stream is exhausted.
    fn next_example(&mut self) -> Option<Example>;
}

/// Adapts any iterator of examples into an [`ExampleStream`].
#[derive(Debug, Clone)]
pub struct IterStream<I: Iterator<Item = Example>> {
    inner: Peekable<I>,
}

impl<I: Iterator<Item = Example>> IterStream<I> {
    pub fn new(iter: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            inner: iter.into_iter().peekable(),
        }
    }
}

impl<I: Iterator<Item = Example>> ExampleStream for IterStream<I> {
    fn has_more(&mut self) -> bool {
        self.inner.peek().is_some()
    }

    fn next_example(&mut self) -> Option<Example> {
        self.inner.next()
    }
}

#[cfg(feature = "stochastic")]
pub use synthetic::*;

#[cfg(feature = "stochastic")]
mod synthetic {
    use std::cmp::Reverse;
    use std::collections::{BinaryHeap, HashMap};

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rand_distr::{Distribution, Exp};

    use super::ExampleStream;
    use crate::{Error, Example, InstanceId, Label, Result};

    /// Configuration for [`DelayedLabelStream`].
    #[derive(Debug, Clone, Copy)]
    #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
    pub struct DelayedLabelConfig {
        /// Number of instances to generate.
        pub instances: u64,
        /// Number of classes; the label is a noisy threshold on the first feature.
        pub classes: usize,
        /// Number of features per instance (at least 1).
        pub features: usize,
        /// Mean label delay, in timestamp units (exponentially distributed).
        pub mean_delay: f64,
        /// Probability that a label is drawn uniformly instead of from the concept.
        pub label_noise: f64,
    }

    impl Default for DelayedLabelConfig {
        fn default() -> Self {
            Self {
                instances: 1_000,
                classes: 2,
                features: 3,
                mean_delay: 50.0,
                label_noise: 0.1,
            }
        }
    }

    /// Seedable synthetic stream with verification latency.
    ///
    /// One unlabelled instance arrives per timestamp tick. Its labelled copy is released at
    /// `arrival + delay`, `delay ~ Exp(1 / mean_delay)` rounded up, so labels interleave with
    /// later arrivals. Each instance is emitted exactly twice: unlabelled, then labelled.
    #[derive(Debug, Clone)]
    pub struct DelayedLabelStream {
        cfg: DelayedLabelConfig,
        rng: StdRng,
        delay: Exp<f64>,
        next_id: u64,
        clock: i64,
        // Earliest release pops first.
        due: BinaryHeap<Reverse<(i64, u64)>>,
        held: HashMap<u64, (Vec<f64>, usize)>,
    }

    impl DelayedLabelStream {
        pub fn new(cfg: DelayedLabelConfig, seed: u64) -> Result<Self> {
            if cfg.classes == 0 {
                return Err(Error::InvalidConfig("classes must be at least 1"));
            }
            if cfg.features == 0 {
                return Err(Error::InvalidConfig("features must be at least 1"));
            }
            if !(cfg.mean_delay.is_finite() && cfg.mean_delay > 0.0) {
                return Err(Error::InvalidConfig("mean_delay must be finite and > 0"));
            }
            let delay = Exp::new(1.0 / cfg.mean_delay)
                .map_err(|_| Error::InvalidConfig("mean_delay must be finite and > 0"))?;
            Ok(Self {
                cfg,
                rng: StdRng::seed_from_u64(seed),
                delay,
                next_id: 0,
                clock: 0,
                due: BinaryHeap::new(),
                held: HashMap::new(),
            })
        }

        /// Instances emitted unlabelled whose label has not been released yet.
        pub fn in_flight(&self) -> usize {
            self.held.len()
        }

        fn arrivals_left(&self) -> bool {
            self.next_id < self.cfg.instances
        }

        fn arrive(&mut self) -> Example {
            let id = self.next_id;
            self.next_id += 1;
            self.clock += 1;

            let features: Vec<f64> = (0..self.cfg.features)
                .map(|_| self.rng.random::<f64>())
                .collect();
            let classes = self.cfg.classes;
            let concept = ((features[0] * classes as f64) as usize).min(classes - 1);
            let class = if self.rng.random::<f64>() < self.cfg.label_noise {
                self.rng.random_range(0..classes)
            } else {
                concept
            };
            let wait = self.delay.sample(&mut self.rng).ceil().max(1.0) as i64;
            self.due.push(Reverse((self.clock + wait, id)));
            self.held.insert(id, (features.clone(), class));
            Example::unlabelled(InstanceId(id), self.clock, features)
        }
    }

    impl ExampleStream for DelayedLabelStream {
        fn has_more(&mut self) -> bool {
            self.arrivals_left() || !self.due.is_empty()
        }

        fn next_example(&mut self) -> Option<Example> {
            let release_now = match self.due.peek() {
                Some(Reverse((at, _))) => !self.arrivals_left() || *at <= self.clock,
                None => false,
            };
            if release_now {
                let Reverse((at, id)) = self.due.pop()?;
                let (features, class) = self.held.remove(&id)?;
                self.clock = self.clock.max(at);
                return Some(Example::labelled(
                    InstanceId(id),
                    self.clock,
                    features,
                    Label::Class(class),
                ));
            }
            if self.arrivals_left() {
                return Some(self.arrive());
            }
            None
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn every_instance_arrives_unlabelled_then_labelled() {
            let cfg = DelayedLabelConfig {
                instances: 300,
                ..DelayedLabelConfig::default()
            };
            let mut s = DelayedLabelStream::new(cfg, 7).unwrap();
            let mut seen: HashMap<InstanceId, (i64, Option<i64>)> = HashMap::new();
            let mut last_ts = i64::MIN;
            while s.has_more() {
                let e = s.next_example().unwrap();
                assert!(e.timestamp >= last_ts, "timestamps must not decrease");
                last_ts = e.timestamp;
                if e.is_labelled() {
                    let entry = seen.get_mut(&e.id).expect("label after arrival");
                    assert!(entry.1.is_none(), "label emitted twice");
                    entry.1 = Some(e.timestamp);
                } else {
                    assert!(seen.insert(e.id, (e.timestamp, None)).is_none());
                }
            }
            assert_eq!(seen.len(), 300);
            for (arrived, labelled) in seen.values() {
                assert!(labelled.unwrap() > *arrived);
            }
        }

        #[test]
        fn rejects_invalid_config() {
            let bad = DelayedLabelConfig {
                mean_delay: 0.0,
                ..DelayedLabelConfig::default()
            };
            assert!(DelayedLabelStream::new(bad, 0).is_err());
        }
    }
}
