//! Consensus ordering.
//!
//! An event is received in the first decided round whose famous witnesses
//! all see it. Its consensus timestamp is the lower median, over those
//! famous witnesses, of the timestamp of the earliest event on each
//! witness's own chain that sees it. Newly received events are appended in
//! `(round_received, consensus_timestamp, id)` order.

use hashgraph_core::EventId;
use hashgraph_store::{EventHandle, Store, StoreExt};

use crate::error::Result;
use crate::hashgraph::Hashgraph;

/// Lower median of a set of timestamps.
///
/// Returns None for an empty set.
pub fn lower_median(mut stamps: Vec<i64>) -> Option<i64> {
    if stamps.is_empty() {
        return None;
    }
    stamps.sort_unstable();
    Some(stamps[(stamps.len() - 1) / 2])
}

impl<S: Store> Hashgraph<S> {
    /// Receive pending events against the decided rounds.
    ///
    /// Returns the ids appended to the order, in order.
    pub(crate) fn find_order(&mut self) -> Result<Vec<EventId>> {
        let Some(last_decided) = self.last_decided_round() else {
            return Ok(Vec::new());
        };

        let famous_by_round: Vec<Vec<EventHandle>> =
            (0..=last_decided).map(|r| self.famous_handles(r)).collect();

        let pending: Vec<EventHandle> = self.pending.iter().copied().collect();
        let mut received = Vec::new();

        for handle in pending {
            let first_round = self.store.event(handle).round;
            for round in first_round..=last_decided {
                let famous = &famous_by_round[round as usize];
                if famous.is_empty() {
                    continue;
                }
                let all_see = famous
                    .iter()
                    .all(|w| self.relations.see(&self.store, *w, handle));
                if !all_see {
                    continue;
                }

                let stamps = famous
                    .iter()
                    .map(|w| self.first_sighting(*w, handle))
                    .collect();
                if let Some(ts) = lower_median(stamps) {
                    received.push((round, ts, self.store.event(handle).id, handle));
                }
                break;
            }
        }

        received.sort_unstable();

        let mut ids = Vec::with_capacity(received.len());
        for (round, ts, id, handle) in received {
            self.store.set_consensus(handle, round, ts)?;
            self.pending.remove(&handle);
            self.ordered.push(handle);
            ids.push(id);
        }
        Ok(ids)
    }

    /// Timestamp of the earliest event on `witness`'s chain that sees `target`.
    fn first_sighting(&mut self, witness: EventHandle, target: EventHandle) -> i64 {
        let entry = self.store.entry(witness);
        let last = entry.chain_index as usize;
        let chain = &self.store.chain(&entry.event.owner)[..=last];

        // Seeing is monotone along a chain.
        let first = chain.partition_point(|h| !self.relations.see(&self.store, *h, target));
        self.store.event(chain[first.min(last)]).timestamp
    }
}
