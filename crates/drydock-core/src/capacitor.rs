//! Correlation of bulk capacitor results back to contexts.
//!
//! The engine's capacitor query returns one anonymous record per context in
//! the caller's capacitor network. Records carry no context identifier —
//! only an opaque engine identity token. This module rebuilds the
//! context-to-record mapping by comparing that token against the engine
//! handles of the locally computed relevant set, by identity and never by
//! payload.
//!
//! The correlation doubles as a consistency check between the local graph
//! and the engine's: a count mismatch, an unmatched record, or a duplicated
//! token all mean the two sides have desynchronized, which is fatal
//! ([`EngineFault`](crate::error::EngineFault)) rather than recoverable.

use std::collections::{BTreeMap, BTreeSet};

use tracing::error;

use tenet::{CapacitorRecord, EngineHandle};

use crate::context::ContextId;
use crate::error::{EngineFault, Result};

/// One entry of a context's relevant set: itself, everyone it targets,
/// everyone targeting it.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) struct RelevantContext {
    pub id: ContextId,
    pub handle: EngineHandle,
}

/// Capacitor snapshots keyed by context identity.
///
/// Produced by
/// [`SimContext::get_capacitor_all`](crate::context::SimContext::get_capacitor_all).
/// Iteration is in context-id order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CapacitorReport {
    entries: BTreeMap<ContextId, CapacitorRecord>,
}

impl CapacitorReport {
    /// The snapshot for one context, if it was part of the network.
    #[must_use]
    pub fn get(&self, id: ContextId) -> Option<&CapacitorRecord> {
        self.entries.get(&id)
    }

    /// Whether the report covers the given context.
    #[must_use]
    pub fn contains(&self, id: ContextId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Number of contexts covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the report is empty. A well-formed report never is — the
    /// queried context is always part of its own network.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates snapshots in context-id order.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, &CapacitorRecord)> + '_ {
        self.entries.iter().map(|(id, record)| (*id, record))
    }
}

/// Matches engine records onto the relevant set by identity token.
///
/// Every record must claim exactly one relevant context and every relevant
/// context must be claimed exactly once; anything else aborts with a fault.
pub(crate) fn correlate(
    relevant: &[RelevantContext],
    records: &[CapacitorRecord],
) -> Result<CapacitorReport> {
    if relevant.len() != records.len() {
        let fault = EngineFault::CapacitorCount { expected: relevant.len(), actual: records.len() };
        error!(%fault, "capacitor correlation failed");
        return Err(fault.into());
    }

    let mut unclaimed: BTreeMap<EngineHandle, ContextId> =
        relevant.iter().map(|entry| (entry.handle, entry.id)).collect();
    let mut claimed = BTreeSet::new();
    let mut entries = BTreeMap::new();

    for record in records {
        match unclaimed.remove(&record.origin) {
            Some(id) => {
                claimed.insert(record.origin);
                entries.insert(id, *record);
            }
            None => {
                let fault = if claimed.contains(&record.origin) {
                    EngineFault::DuplicateCapacitorOrigin(record.origin)
                } else {
                    EngineFault::UnmatchedCapacitorOrigin(record.origin)
                };
                error!(%fault, "capacitor correlation failed");
                return Err(fault.into());
            }
        }
    }

    Ok(CapacitorReport { entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tenet::Stability;

    fn record(origin: u64, capacity: f64) -> CapacitorRecord {
        CapacitorRecord {
            origin: EngineHandle::new(origin),
            capacity,
            delta: -1.0,
            stability: Stability::Stable { fraction: 0.5 },
        }
    }

    fn relevant(id: u64, handle: u64) -> RelevantContext {
        RelevantContext { id: ContextId::from_raw(id), handle: EngineHandle::new(handle) }
    }

    #[test]
    fn records_map_onto_contexts_by_identity() {
        let set = [relevant(10, 1), relevant(11, 2)];
        // Engine order differs from set order; identity decides.
        let records = [record(2, 800.0), record(1, 400.0)];

        let report = correlate(&set, &records).unwrap();
        assert_eq!(report.len(), 2);
        assert_eq!(report.get(ContextId::from_raw(10)).unwrap().capacity, 400.0);
        assert_eq!(report.get(ContextId::from_raw(11)).unwrap().capacity, 800.0);
    }

    #[test]
    fn count_mismatch_is_a_fault() {
        let set = [relevant(10, 1), relevant(11, 2)];
        let records = [record(1, 400.0)];

        let err = correlate(&set, &records).unwrap_err();
        assert_eq!(
            err,
            Error::EngineFault(EngineFault::CapacitorCount { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn unmatched_origin_is_a_fault() {
        let set = [relevant(10, 1)];
        let records = [record(9, 400.0)];

        let err = correlate(&set, &records).unwrap_err();
        assert_eq!(
            err,
            Error::EngineFault(EngineFault::UnmatchedCapacitorOrigin(EngineHandle::new(9)))
        );
    }

    #[test]
    fn duplicated_origin_is_a_fault() {
        let set = [relevant(10, 1), relevant(11, 2)];
        let records = [record(1, 400.0), record(1, 400.0)];

        let err = correlate(&set, &records).unwrap_err();
        assert_eq!(
            err,
            Error::EngineFault(EngineFault::DuplicateCapacitorOrigin(EngineHandle::new(1)))
        );
    }
}
