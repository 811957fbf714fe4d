//! Instances waiting for their true label, and the buffer that holds them.
//!
//! The buffer is unbounded: an instance whose label never arrives stays here for the rest of
//! the run. [`crate::DriverConfig::backlog_warn_threshold`] makes that visible in the logs.

use std::collections::{BTreeMap, HashMap};

use crate::{
    Error, Example, InstanceId, Label, PredictionRecord, PredictionRole, Result, Votes,
};

/// One buffered instance and every prediction made for it so far.
#[derive(Debug, Clone)]
pub struct PendingInstance {
    example: Example,
    records: Vec<PredictionRecord>,
    /// Labelled examples observed elsewhere in the stream since this instance was buffered.
    instances_passed: u64,
    repredictions: usize,
}

impl PendingInstance {
    /// Buffer `example` with its first prediction, timestamped at the example's arrival.
    pub fn new(example: Example, first_votes: Votes) -> Self {
        let first = PredictionRecord::new(first_votes, example.timestamp, PredictionRole::First);
        Self {
            example,
            records: vec![first],
            instances_passed: 0,
            repredictions: 0,
        }
    }

    pub fn id(&self) -> InstanceId {
        self.example.id
    }

    pub fn example(&self) -> &Example {
        &self.example
    }

    /// Records in arrival order; the first is always the first prediction.
    pub fn records(&self) -> &[PredictionRecord] {
        &self.records
    }

    pub(crate) fn records_mut(&mut self) -> &mut [PredictionRecord] {
        &mut self.records
    }

    pub fn instances_passed(&self) -> u64 {
        self.instances_passed
    }

    /// Count one more labelled example passing this instance; returns the new count.
    pub fn record_pass(&mut self) -> u64 {
        self.instances_passed += 1;
        self.instances_passed
    }

    /// Number of reprediction records.
    pub fn reprediction_count(&self) -> usize {
        self.repredictions
    }

    /// Timestamp of the first prediction.
    pub fn first_timestamp(&self) -> i64 {
        self.records[0].timestamp()
    }

    pub fn is_finalized(&self) -> bool {
        self.records
            .last()
            .is_some_and(|r| r.role() == PredictionRole::Final)
    }

    /// Append a reprediction made at `timestamp`.
    pub fn push_reprediction(&mut self, votes: Votes, timestamp: i64) {
        self.records.push(PredictionRecord::new(
            votes,
            timestamp,
            PredictionRole::Reprediction,
        ));
        self.repredictions += 1;
    }

    /// Append the final prediction and write the true label onto the buffered example.
    pub fn finalize(&mut self, votes: Votes, timestamp: i64, label: Option<Label>) -> Result<()> {
        if self.is_finalized() {
            return Err(Error::AlreadyFinalized(self.id()));
        }
        self.records
            .push(PredictionRecord::new(votes, timestamp, PredictionRole::Final));
        if label.is_some() {
            self.example.label = label;
        }
        Ok(())
    }
}

/// Arrival-ordered set of pending instances with an identity index.
#[derive(Debug, Clone, Default)]
pub struct PendingInstanceBuffer {
    by_arrival: BTreeMap<u64, PendingInstance>,
    index: HashMap<InstanceId, u64>,
    next_seq: u64,
}

impl PendingInstanceBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance. Fails if its identity is already pending.
    pub fn insert(&mut self, pending: PendingInstance) -> Result<()> {
        let id = pending.id();
        if self.index.contains_key(&id) {
            return Err(Error::DuplicateInstance(id));
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.index.insert(id, seq);
        self.by_arrival.insert(seq, pending);
        Ok(())
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn find(&self, id: InstanceId) -> Option<&PendingInstance> {
        let seq = self.index.get(&id)?;
        self.by_arrival.get(seq)
    }

    pub fn find_mut(&mut self, id: InstanceId) -> Option<&mut PendingInstance> {
        let seq = self.index.get(&id)?;
        self.by_arrival.get_mut(seq)
    }

    /// Remove and return the instance with identity `id`.
    ///
    /// Once removed, the identity is free to be reused by an unrelated instance.
    pub fn remove(&mut self, id: InstanceId) -> Option<PendingInstance> {
        let seq = self.index.remove(&id)?;
        self.by_arrival.remove(&seq)
    }

    /// Pending instances, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingInstance> + '_ {
        self.by_arrival.values()
    }

    /// Pending instances, oldest first, for the per-label sweep.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut PendingInstance> + '_ {
        self.by_arrival.values_mut()
    }

    pub fn len(&self) -> usize {
        self.by_arrival.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_arrival.is_empty()
    }

    /// Reprediction records across all pending instances.
    pub fn total_reprediction_count(&self) -> usize {
        self.by_arrival.values().map(|p| p.reprediction_count()).sum()
    }
}
