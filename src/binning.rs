//! Mapping an instance's predictions onto relative-time bins.
//!
//! Bin `0` holds the first prediction, bin `bin_count + 1` the final (test-then-train)
//! prediction, and bins `1..=bin_count` split the instance's own `[t0, t1]` interval into
//! equal-width slices. [`plan_bins`] turns a finished instance's record list into exactly one
//! [`BinDispatch`] per bin:
//!
//! ```text
//! records:  F(t0)   R(t=10)   R(t=60) R(t=70)   X(t1=100)        bin_count = 4
//! bins:     0       1         3       3         5
//! plan:     0:Deferred  1:Direct  2:Cloned(R@10)  3:Merged  4:Cloned(R@70)  5:Direct
//! ```

use crate::merge::elapsed;
use crate::{Error, PredictionRecord, PredictionRole, Result, TimedVotes, Votes};

/// Upper bound on the number of relative bins.
pub const MAX_BIN_COUNT: usize = 1000;

/// Relative-time bin geometry for a fixed bin count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinLayout {
    bin_count: usize,
}

impl BinLayout {
    /// Layout with `bin_count` relative bins (`1..=MAX_BIN_COUNT`).
    pub fn new(bin_count: usize) -> Result<Self> {
        if bin_count == 0 {
            return Err(Error::InvalidConfig("bin_count must be at least 1"));
        }
        if bin_count > MAX_BIN_COUNT {
            return Err(Error::InvalidConfig("bin_count must be at most 1000"));
        }
        Ok(Self { bin_count })
    }

    /// Number of relative bins.
    pub fn bin_count(&self) -> usize {
        self.bin_count
    }

    /// Total number of bins including the reserved first and final bins.
    pub fn total_bins(&self) -> usize {
        self.bin_count + 2
    }

    /// Index of the reserved final-prediction bin.
    pub fn final_bin(&self) -> usize {
        self.bin_count + 1
    }

    /// Relative bin of a reprediction made at `t` for an instance spanning `[t0, t1]`.
    ///
    /// A reprediction made exactly at `t1` belongs to the last relative bin, never to the
    /// reserved final bin. Returns `None` when `t1 <= t0` (no relative bins exist).
    pub fn bin_for(&self, t0: i64, t1: i64, t: i64) -> Option<usize> {
        if t1 <= t0 {
            return None;
        }
        let frac = elapsed(t0, t) / elapsed(t0, t1);
        let offset = (frac * self.bin_count as f64)
            .floor()
            .clamp(0.0, (self.bin_count - 1) as f64);
        Some(1 + offset as usize)
    }

    /// Timestamp at which relative bin `bin` opens.
    pub fn bin_start(&self, t0: i64, t1: i64, bin: usize) -> i64 {
        self.boundary(t0, t1, bin.saturating_sub(1))
    }

    /// Timestamp at which relative bin `bin` closes.
    pub fn bin_end(&self, t0: i64, t1: i64, bin: usize) -> i64 {
        self.boundary(t0, t1, bin)
    }

    fn boundary(&self, t0: i64, t1: i64, k: usize) -> i64 {
        let frac = k as f64 / self.bin_count as f64;
        (frac * elapsed(t0, t1) + t0 as f64).floor() as i64
    }
}

/// How a bin's representative result reaches its evaluator.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DispatchKind {
    /// A prediction computed for this bin.
    Direct,
    /// The first prediction, already reported and counted when the instance arrived; scored
    /// now that the label is known, without counting it again.
    Deferred,
    /// Forward-filled copy of the preceding prediction; no model call was made for this bin.
    Cloned,
    /// Several predictions landed in this bin; the evaluator merges the run.
    Merged(Vec<TimedVotes>),
}

/// One bin's representative result.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinDispatch {
    pub bin: usize,
    /// Votes to score. For [`DispatchKind::Merged`], the latest vote in the run.
    pub votes: Votes,
    pub kind: DispatchKind,
}

impl BinDispatch {
    fn new(bin: usize, votes: &[f64], kind: DispatchKind) -> Self {
        Self {
            bin,
            votes: votes.to_vec(),
            kind,
        }
    }
}

/// Plan the bin dispatches for one finished instance and write each record's bin index.
///
/// `records` must start with the first prediction and end with the final prediction. Every
/// bin in `0..=bin_count + 1` receives exactly one dispatch:
/// - gaps between serviced bins are forward-filled with the preceding prediction;
/// - consecutive repredictions in the same bin are merged into one dispatch;
/// - when `t1 == t0` there is no relative interval, so bins `1..=bin_count` are all filled
///   from the first prediction.
pub fn plan_bins(layout: BinLayout, records: &mut [PredictionRecord]) -> Result<Vec<BinDispatch>> {
    let n = records.len();
    if n == 0 || records[0].role() != PredictionRole::First {
        return Err(Error::MissingFirstPrediction);
    }
    if n < 2 || records[n - 1].role() != PredictionRole::Final {
        return Err(Error::MissingFinalPrediction);
    }

    let bin_count = layout.bin_count();
    let final_bin = layout.final_bin();
    let t0 = records[0].timestamp();
    let t1 = records[n - 1].timestamp();
    let mut plan: Vec<BinDispatch> = Vec::with_capacity(layout.total_bins());

    records[0].assign_bin(0);
    plan.push(BinDispatch::new(0, records[0].votes(), DispatchKind::Deferred));

    if t1 <= t0 {
        for bin in 1..=bin_count {
            plan.push(BinDispatch::new(bin, records[0].votes(), DispatchKind::Cloned));
        }
        records[n - 1].assign_bin(final_bin);
        plan.push(BinDispatch::new(final_bin, records[n - 1].votes(), DispatchKind::Direct));
        return Ok(plan);
    }

    let bin_of = |r: &PredictionRecord| layout.bin_for(t0, t1, r.timestamp()).unwrap_or(1);

    let mut last_serviced = 0usize;
    let mut i = 1usize;
    while i < n - 1 {
        let bin = bin_of(&records[i]);
        for fill in (last_serviced + 1)..bin {
            plan.push(BinDispatch::new(fill, records[i - 1].votes(), DispatchKind::Cloned));
        }
        last_serviced = bin;

        let mut j = i;
        while j + 1 < n - 1 && bin_of(&records[j + 1]) == bin {
            j += 1;
        }
        for r in &mut records[i..=j] {
            r.assign_bin(bin);
        }

        if j > i {
            let mut run = Vec::with_capacity(j - i + 3);
            run.push(TimedVotes::new(
                records[i - 1].votes().to_vec(),
                layout.bin_start(t0, t1, bin),
            ));
            run.extend(records[i..=j].iter().map(PredictionRecord::timed));
            run.push(TimedVotes::new(
                records[j].votes().to_vec(),
                layout.bin_end(t0, t1, bin),
            ));
            plan.push(BinDispatch::new(bin, records[j].votes(), DispatchKind::Merged(run)));
        } else {
            plan.push(BinDispatch::new(bin, records[i].votes(), DispatchKind::Direct));
        }
        i = j + 1;
    }

    records[n - 1].assign_bin(final_bin);
    plan.push(BinDispatch::new(final_bin, records[n - 1].votes(), DispatchKind::Direct));

    for fill in (last_serviced + 1)..=bin_count {
        plan.push(BinDispatch::new(fill, records[n - 2].votes(), DispatchKind::Cloned));
    }
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(v: f64, t: i64, role: PredictionRole) -> PredictionRecord {
        PredictionRecord::new(vec![v], t, role)
    }

    fn records(first: i64, repredictions: &[(f64, i64)], last: i64) -> Vec<PredictionRecord> {
        let mut out = vec![rec(0.0, first, PredictionRole::First)];
        for &(v, t) in repredictions {
            out.push(rec(v, t, PredictionRole::Reprediction));
        }
        out.push(rec(99.0, last, PredictionRole::Final));
        out
    }

    fn by_bin(plan: &[BinDispatch], bin: usize) -> &BinDispatch {
        plan.iter().find(|d| d.bin == bin).expect("bin dispatched")
    }

    #[test]
    fn layout_rejects_out_of_range_bin_counts() {
        assert!(BinLayout::new(0).is_err());
        assert!(BinLayout::new(MAX_BIN_COUNT + 1).is_err());
        assert_eq!(BinLayout::new(50).unwrap().total_bins(), 52);
    }

    #[test]
    fn bin_for_is_monotonic_over_the_span() {
        let l = BinLayout::new(4).unwrap();
        assert_eq!(l.bin_for(0, 100, 0), Some(1));
        assert_eq!(l.bin_for(0, 100, 10), Some(1));
        assert_eq!(l.bin_for(0, 100, 25), Some(2));
        assert_eq!(l.bin_for(0, 100, 50), Some(3));
        assert_eq!(l.bin_for(0, 100, 75), Some(4));
    }

    #[test]
    fn bin_for_clamps_label_arrival_to_last_relative_bin() {
        let l = BinLayout::new(4).unwrap();
        assert_eq!(l.bin_for(0, 100, 100), Some(4));
        assert_eq!(l.bin_for(5, 5, 5), None);
    }

    #[test]
    fn spans_wider_than_i64_do_not_overflow() {
        let l = BinLayout::new(4).unwrap();
        let (t0, t1) = (-5_000_000_000_000_000_000, 5_000_000_000_000_000_000);
        assert_eq!(l.bin_for(t0, t1, 0), Some(3));
        assert_eq!(l.bin_for(i64::MIN, i64::MAX, i64::MAX), Some(4));
        assert_eq!(l.bin_for(i64::MIN, i64::MAX, i64::MIN), Some(1));
        assert_eq!(l.bin_start(t0, t1, 3), 0);

        let mut records = vec![
            PredictionRecord::new(vec![1.0], i64::MIN, PredictionRole::First),
            PredictionRecord::new(vec![2.0], 0, PredictionRole::Reprediction),
            PredictionRecord::new(vec![3.0], i64::MAX, PredictionRole::Final),
        ];
        let plan = plan_bins(l, &mut records).unwrap();
        assert_eq!(plan.len(), l.total_bins());
    }

    #[test]
    fn bin_boundaries_floor_to_integer_timestamps() {
        let l = BinLayout::new(3).unwrap();
        assert_eq!(l.bin_start(0, 100, 1), 0);
        assert_eq!(l.bin_end(0, 100, 1), 33);
        assert_eq!(l.bin_start(0, 100, 2), 33);
        assert_eq!(l.bin_end(0, 100, 3), 100);
    }

    #[test]
    fn plan_without_repredictions_fills_from_first() {
        let l = BinLayout::new(3).unwrap();
        let mut rs = records(0, &[], 90);
        let plan = plan_bins(l, &mut rs).unwrap();
        assert_eq!(plan.len(), 5);
        assert_eq!(by_bin(&plan, 0).kind, DispatchKind::Deferred);
        for bin in 1..=3 {
            let d = by_bin(&plan, bin);
            assert_eq!(d.kind, DispatchKind::Cloned);
            assert_eq!(d.votes, vec![0.0]);
        }
        assert_eq!(by_bin(&plan, 4).kind, DispatchKind::Direct);
        assert_eq!(by_bin(&plan, 4).votes, vec![99.0]);
        assert_eq!(rs[0].bin_index(), Some(0));
        assert_eq!(rs[1].bin_index(), Some(4));
    }

    #[test]
    fn plan_forward_fills_gap_between_repredictions() {
        let l = BinLayout::new(4).unwrap();
        let mut rs = records(0, &[(1.0, 10), (3.0, 60)], 100);
        let plan = plan_bins(l, &mut rs).unwrap();
        assert_eq!(by_bin(&plan, 1).kind, DispatchKind::Direct);
        assert_eq!(by_bin(&plan, 2).kind, DispatchKind::Cloned);
        assert_eq!(by_bin(&plan, 2).votes, vec![1.0]);
        assert_eq!(by_bin(&plan, 3).kind, DispatchKind::Direct);
        assert_eq!(by_bin(&plan, 4).kind, DispatchKind::Cloned);
        assert_eq!(by_bin(&plan, 4).votes, vec![3.0]);
        assert_eq!(rs[1].bin_index(), Some(1));
        assert_eq!(rs[2].bin_index(), Some(3));
    }

    #[test]
    fn plan_merges_same_bin_run_with_synthetic_boundaries() {
        let l = BinLayout::new(4).unwrap();
        let mut rs = records(0, &[(1.0, 10), (2.0, 55), (4.0, 70)], 100);
        let plan = plan_bins(l, &mut rs).unwrap();
        let d = by_bin(&plan, 3);
        let DispatchKind::Merged(run) = &d.kind else {
            panic!("expected a merged dispatch, got {:?}", d.kind);
        };
        assert_eq!(
            run,
            &vec![
                TimedVotes::new(vec![1.0], 50),
                TimedVotes::new(vec![2.0], 55),
                TimedVotes::new(vec![4.0], 70),
                TimedVotes::new(vec![4.0], 75),
            ]
        );
        assert_eq!(d.votes, vec![4.0]);
        // The bin after the run is filled from the run's last prediction.
        assert_eq!(by_bin(&plan, 4).votes, vec![4.0]);
        assert_eq!(rs[2].bin_index(), Some(3));
        assert_eq!(rs[3].bin_index(), Some(3));
    }

    #[test]
    fn plan_reprediction_at_label_time_lands_in_last_relative_bin() {
        let l = BinLayout::new(4).unwrap();
        let mut rs = records(0, &[(7.0, 100)], 100);
        let plan = plan_bins(l, &mut rs).unwrap();
        assert_eq!(by_bin(&plan, 4).kind, DispatchKind::Direct);
        assert_eq!(by_bin(&plan, 4).votes, vec![7.0]);
        assert_eq!(by_bin(&plan, 5).votes, vec![99.0]);
        assert_eq!(plan.len(), 6);
    }

    #[test]
    fn plan_with_zero_span_skips_relative_mapping() {
        let l = BinLayout::new(3).unwrap();
        let mut rs = records(20, &[(5.0, 20)], 20);
        let plan = plan_bins(l, &mut rs).unwrap();
        assert_eq!(plan.len(), 5);
        for bin in 1..=3 {
            assert_eq!(by_bin(&plan, bin).votes, vec![0.0]);
            assert_eq!(by_bin(&plan, bin).kind, DispatchKind::Cloned);
        }
        assert_eq!(rs[1].bin_index(), None);
    }

    #[test]
    fn plan_rejects_malformed_record_lists() {
        let l = BinLayout::new(2).unwrap();
        let mut empty: Vec<PredictionRecord> = Vec::new();
        assert!(matches!(plan_bins(l, &mut empty), Err(Error::MissingFirstPrediction)));
        let mut open = vec![rec(0.0, 0, PredictionRole::First)];
        assert!(matches!(plan_bins(l, &mut open), Err(Error::MissingFinalPrediction)));
    }

    proptest! {
        #[test]
        fn every_bin_receives_exactly_one_dispatch(
            bin_count in 1usize..20,
            t0 in 0i64..1_000,
            gaps in proptest::collection::vec(0i64..40, 0..30),
            tail in 0i64..40,
        ) {
            let layout = BinLayout::new(bin_count).unwrap();
            let mut t = t0;
            let mut reps = Vec::new();
            for (k, g) in gaps.iter().enumerate() {
                t += g;
                reps.push((k as f64, t));
            }
            let mut rs = records(t0, &reps, t + tail);
            let plan = plan_bins(layout, &mut rs).unwrap();

            let mut seen = vec![0usize; layout.total_bins()];
            for d in &plan {
                seen[d.bin] += 1;
            }
            prop_assert!(seen.iter().all(|&c| c == 1), "seen={:?}", seen);
            prop_assert_eq!(rs.first().unwrap().bin_index(), Some(0));
            prop_assert_eq!(rs.last().unwrap().bin_index(), Some(bin_count + 1));
        }

        #[test]
        fn bin_for_stays_in_relative_range(
            bin_count in 1usize..200,
            t0 in -1_000i64..1_000,
            span in 1i64..10_000,
            offset_frac in 0.0f64..=1.0,
        ) {
            let layout = BinLayout::new(bin_count).unwrap();
            let t1 = t0 + span;
            let t = t0 + (offset_frac * span as f64) as i64;
            let bin = layout.bin_for(t0, t1, t).unwrap();
            prop_assert!((1..=bin_count).contains(&bin));
        }
    }
}
