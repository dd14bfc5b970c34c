//! Gossip sync protocol.
//!
//! A pull exchange initiated by peer A with peer B:
//!
//! ```text
//! Peer A                                    Peer B
//!   |-------- GetMissingEventCounts ---------->|
//!   |<------- MissingEventCounts --------------|
//!   |-------- GetMissingEvents --------------->|   (only if anything is missing)
//!   |<------- SyncEvents ----------------------|
//!   |-------- GetEvents ---------------------->|   (parents the batch names
//!   |<------- SyncEvents ----------------------|    but we do not hold)
//!   merge, create one event, run consensus
//! ```
//!
//! The `GetEvents` round trip only happens around forks: the callee may hold
//! a fork branch that we stored off its owner's chain or never saw, and the
//! counts digest cannot tell the two apart.
//!
//! Everything here is a plain function over a [`Hashgraph`]. The caller owns
//! the lock and the transport.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use hashgraph_consensus::{Hashgraph, InsertResult};
use hashgraph_core::{Event, EventId, PeerId};
use hashgraph_store::{Store, StoreExt};

use crate::error::{Result, SyncError};
use crate::messages::{limits, PeerCounts, SyncErrorCode, SyncMessage};

/// Configuration for sync behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// How long to wait for a peer's reply.
    #[serde(with = "crate::serde_millis")]
    pub rpc_timeout: Duration,
    /// Maximum events packed into one SyncEvents reply.
    pub max_events_per_message: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            rpc_timeout: Duration::from_secs(5),
            max_events_per_message: 1000,
        }
    }
}

impl SyncConfig {
    /// Check the configuration for values the protocol cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.rpc_timeout.is_zero() {
            return Err(SyncError::InvalidConfig("rpc_timeout must be non-zero".into()));
        }
        if self.max_events_per_message == 0
            || self.max_events_per_message > limits::MAX_EVENTS_PER_MESSAGE
        {
            return Err(SyncError::InvalidConfig(format!(
                "max_events_per_message must be in 1..={}",
                limits::MAX_EVENTS_PER_MESSAGE
            )));
        }
        Ok(())
    }
}

/// Outcome of merging a batch of remote events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Events that were new.
    pub accepted: Vec<EventId>,
    /// Events that were already known.
    pub duplicates: usize,
    /// Events stored off their owner's chain: forks and what the forker
    /// built on them.
    pub excluded: Vec<EventId>,
    /// Events rejected (bad structure or parents never delivered).
    pub rejected: usize,
    /// Owners caught forking during this merge.
    pub forks: Vec<PeerId>,
}

/// Result of one sync with a peer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// The peer synced from.
    pub peer: Option<PeerId>,
    /// Events received from the peer.
    pub received: usize,
    /// Merge outcome.
    pub merge: MergeReport,
    /// The event created at the end of the sync.
    pub created: Option<EventId>,
    /// Ids appended to the consensus order.
    pub newly_ordered: Vec<EventId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Callee side
// ─────────────────────────────────────────────────────────────────────────────

/// How many more events of each peer we know than the caller.
///
/// Covers every peer we know, clamped at zero.
pub fn missing_event_counts<S: Store>(graph: &Hashgraph<S>, known: &PeerCounts) -> PeerCounts {
    graph
        .peer_counts()
        .into_iter()
        .map(|(peer, ours)| {
            let theirs = known.get(&peer).copied().unwrap_or(0);
            (peer, ours.saturating_sub(theirs))
        })
        .collect()
}

/// Package each peer's last `counts[peer]` events, oldest first.
///
/// At most `max_events` events are packed. When the budget runs out, each
/// peer keeps the oldest part of its run so that parents travel before
/// children; the rest follows on a later sync. `first` is packed before the
/// others.
pub fn collect_missing_events<S: Store>(
    graph: &Hashgraph<S>,
    counts: &PeerCounts,
    first: Option<&PeerId>,
    max_events: usize,
) -> BTreeMap<PeerId, Vec<Event>> {
    let store = graph.store();
    let mut budget = max_events;
    let mut out = BTreeMap::new();

    let order = first
        .into_iter()
        .filter(|p| counts.contains_key(*p))
        .chain(counts.keys().filter(|p| Some(*p) != first));

    for peer in order {
        let wanted = counts.get(peer).copied().unwrap_or(0) as usize;
        if wanted == 0 || budget == 0 {
            continue;
        }
        let run = store.last_events(peer, wanted);
        let take = run.len().min(budget);
        if take == 0 {
            continue;
        }
        budget -= take;
        out.insert(
            *peer,
            run[..take].iter().map(|h| store.event(*h).clone()).collect(),
        );
    }
    out
}

/// The events among `ids` that we hold, grouped by owner.
///
/// Unknown ids are skipped. At most `max_events` events are returned.
pub fn collect_events_by_id<S: Store>(
    graph: &Hashgraph<S>,
    ids: &[EventId],
    max_events: usize,
) -> BTreeMap<PeerId, Vec<Event>> {
    let mut out: BTreeMap<PeerId, Vec<Event>> = BTreeMap::new();
    for event in ids.iter().filter_map(|id| graph.get(id).ok()).take(max_events) {
        out.entry(event.owner).or_default().push(event.clone());
    }
    out
}

/// Parents named in `batch` that neither the graph nor the batch holds.
pub fn unresolved_parents<S: Store>(
    graph: &Hashgraph<S>,
    batch: &BTreeMap<PeerId, Vec<Event>>,
) -> Vec<EventId> {
    let carried: HashSet<EventId> = batch.values().flatten().map(|e| e.id).collect();
    let missing: BTreeSet<EventId> = batch
        .values()
        .flatten()
        .flat_map(|e| e.self_parent.into_iter().chain(e.other_parent))
        .filter(|p| !carried.contains(p) && !graph.contains(p))
        .collect();
    missing.into_iter().collect()
}

/// Add `found` to `batch`, skipping events it already carries.
///
/// Returns how many were added.
pub fn extend_batch(
    batch: &mut BTreeMap<PeerId, Vec<Event>>,
    found: BTreeMap<PeerId, Vec<Event>>,
) -> usize {
    let mut carried: HashSet<EventId> = batch.values().flatten().map(|e| e.id).collect();
    let mut added = 0;
    for (owner, events) in found {
        for event in events {
            if carried.insert(event.id) {
                batch.entry(owner).or_default().push(event);
                added += 1;
            }
        }
    }
    added
}

/// Answer a read-only request.
///
/// Returns an `Error` message for anything that is not a query.
pub fn answer_query<S: Store>(
    graph: &Hashgraph<S>,
    config: &SyncConfig,
    local: &PeerId,
    message: &SyncMessage,
) -> SyncMessage {
    match message {
        SyncMessage::GetMissingEventCounts { known } => SyncMessage::MissingEventCounts {
            counts: missing_event_counts(graph, known),
        },
        SyncMessage::GetMissingEvents { counts } => SyncMessage::SyncEvents {
            sender: *local,
            missing_events: collect_missing_events(
                graph,
                counts,
                Some(local),
                config.max_events_per_message,
            ),
        },
        SyncMessage::GetEvents { ids } => SyncMessage::SyncEvents {
            sender: *local,
            missing_events: collect_events_by_id(graph, ids, config.max_events_per_message),
        },
        other => SyncMessage::error(
            SyncErrorCode::UnexpectedMessage,
            format!("{} is not a query", other.kind()),
        ),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Caller side
// ─────────────────────────────────────────────────────────────────────────────

/// Merge remote events parents-first.
///
/// Events are tried oldest first per owner. Anything whose parents are not
/// yet known is retried after the rest of the batch; once a pass makes no
/// progress the leftovers are rejected and a later sync re-delivers them.
pub fn merge_events<S: Store>(
    graph: &mut Hashgraph<S>,
    missing_events: BTreeMap<PeerId, Vec<Event>>,
) -> MergeReport {
    let mut report = MergeReport::default();
    let mut remaining: Vec<Event> = missing_events.into_values().flatten().collect();

    loop {
        let before = remaining.len();
        let mut retry = Vec::new();

        for event in remaining {
            let id = event.id;
            match graph.insert(event.clone()) {
                Ok(InsertResult::Inserted(_)) => report.accepted.push(id),
                Ok(InsertResult::AlreadyExists) => report.duplicates += 1,
                Ok(InsertResult::Excluded(_)) => {
                    report.excluded.push(id);
                    if !report.forks.contains(&event.owner) {
                        report.forks.push(event.owner);
                    }
                }
                Err(e) if e.is_retryable() => retry.push(event),
                Err(e) => {
                    tracing::warn!(event = %id, error = %e, "rejected remote event");
                    report.rejected += 1;
                }
            }
        }

        remaining = retry;
        if remaining.is_empty() || remaining.len() == before {
            break;
        }
    }

    if !remaining.is_empty() {
        tracing::debug!(count = remaining.len(), "events still missing parents");
        report.rejected += remaining.len();
    }
    report
}

/// Merge a batch from `sender`, create our one event on top, and run
/// consensus.
///
/// This is the whole critical section of a sync; the caller holds the
/// graph's lock around it.
pub fn apply_sync<S: Store>(
    graph: &mut Hashgraph<S>,
    local: PeerId,
    sender: PeerId,
    missing_events: BTreeMap<PeerId, Vec<Event>>,
    timestamp: i64,
    transactions: Vec<Bytes>,
) -> Result<SyncReport> {
    let received = missing_events.values().map(Vec::len).sum();
    let merge = merge_events(graph, missing_events);

    let created = graph.create_event(local, sender, timestamp, transactions)?;
    let delta = graph.run_consensus()?;

    tracing::debug!(
        peer = %sender,
        received,
        accepted = merge.accepted.len(),
        duplicates = merge.duplicates,
        excluded = merge.excluded.len(),
        rejected = merge.rejected,
        created = %created,
        ordered = delta.ordered.len(),
        "sync applied"
    );

    Ok(SyncReport {
        peer: Some(sender),
        received,
        merge,
        created: Some(created),
        newly_ordered: delta.ordered,
    })
}

/// Unwrap a `MissingEventCounts` reply.
pub fn expect_counts(reply: SyncMessage) -> Result<PeerCounts> {
    match reply {
        SyncMessage::MissingEventCounts { counts } => Ok(counts),
        other => Err(unexpected("MissingEventCounts", other)),
    }
}

/// Unwrap a `SyncEvents` reply.
pub fn expect_events(reply: SyncMessage) -> Result<(PeerId, BTreeMap<PeerId, Vec<Event>>)> {
    match reply {
        SyncMessage::SyncEvents {
            sender,
            missing_events,
        } => Ok((sender, missing_events)),
        other => Err(unexpected("SyncEvents", other)),
    }
}

fn unexpected(expected: &'static str, got: SyncMessage) -> SyncError {
    match got {
        SyncMessage::Error { code, message } => SyncError::PeerError { code, message },
        other => SyncError::UnexpectedMessage {
            expected,
            got: other.kind(),
        },
    }
}
