//! Fixed-length array of per-bin evaluators.

use crate::{BinDispatch, BinLayout, DispatchKind, Error, Evaluator, Example, Measurement, Result};

/// `bin_count + 2` independent evaluators.
///
/// Index `0` receives immediate (first) predictions, `1..=bin_count` the relative-time bins,
/// and `bin_count + 1` the final, test-then-train predictions.
#[derive(Debug, Clone)]
pub struct BinEvaluators<E> {
    layout: BinLayout,
    bins: Vec<E>,
}

impl<E: Evaluator> BinEvaluators<E> {
    /// Build one evaluator per bin with `factory(bin_index)`.
    pub fn new<F>(layout: BinLayout, factory: F) -> Self
    where
        F: FnMut(usize) -> E,
    {
        let bins = (0..layout.total_bins()).map(factory).collect();
        Self { layout, bins }
    }

    /// Wrap evaluators built elsewhere; there must be exactly `bin_count + 2` of them.
    pub fn from_vec(layout: BinLayout, bins: Vec<E>) -> Result<Self> {
        if bins.len() != layout.total_bins() {
            return Err(Error::EvaluatorCount {
                expected: layout.total_bins(),
                actual: bins.len(),
            });
        }
        Ok(Self { layout, bins })
    }

    pub fn layout(&self) -> BinLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    pub fn get(&self, bin: usize) -> Option<&E> {
        self.bins.get(bin)
    }

    pub fn get_mut(&mut self, bin: usize) -> Option<&mut E> {
        self.bins.get_mut(bin)
    }

    /// The immediate-prediction evaluator (bin 0), which also carries backlog gauges.
    pub fn immediate(&self) -> &E {
        &self.bins[0]
    }

    pub fn immediate_mut(&mut self) -> &mut E {
        &mut self.bins[0]
    }

    /// The final-prediction evaluator (bin `bin_count + 1`).
    pub fn final_bin(&self) -> &E {
        &self.bins[self.layout.final_bin()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        self.bins.iter()
    }

    /// Feed a planned set of dispatches for `example` to their evaluators.
    pub fn apply(&mut self, example: &Example, plan: &[BinDispatch]) {
        for d in plan {
            let Some(e) = self.bins.get_mut(d.bin) else {
                continue;
            };
            match &d.kind {
                DispatchKind::Direct => e.add_result(example, &d.votes),
                DispatchKind::Deferred | DispatchKind::Cloned => {
                    e.add_cloned_result(example, &d.votes)
                }
                DispatchKind::Merged(run) => e.add_merged_result(example, run),
            }
        }
    }

    pub fn reset(&mut self) {
        for e in &mut self.bins {
            e.reset();
        }
    }

    /// Measurements of every bin, each name prefixed with `"bin {i}:"`.
    pub fn measurements(&self) -> Vec<Measurement> {
        self.bins
            .iter()
            .enumerate()
            .flat_map(|(i, e)| {
                e.measurements()
                    .into_iter()
                    .map(move |m| Measurement::new(format!("bin {i}:{}", m.name), m.value))
            })
            .collect()
    }
}
