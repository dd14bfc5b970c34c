//! The Node: one peer taking part in gossip and consensus.
//!
//! A node owns its hashgraph behind a single async mutex. The lock is taken
//! for reading counts, for packaging replies, and for the merge/create/order
//! critical section of a sync; it is never held while waiting on a peer.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;

use hashgraph_consensus::Hashgraph;
use hashgraph_core::{Event, EventId, PeerId, MAX_TRANSACTIONS_PER_EVENT};
use hashgraph_sync::{
    answer_query, apply_sync, collect_missing_events, expect_counts, expect_events, extend_batch,
    limits, missing_event_counts, order_hash, unresolved_parents, PeerCounts, SyncError,
    SyncErrorCode, SyncHandler, SyncMessage, SyncReport, Transport,
};

/// Rounds of fetching parents by id within one sync.
const MAX_PARENT_FETCHES: usize = 16;

use crate::clock::Clock;
use crate::config::NodeConfig;
use crate::error::{NodeError, Result};

/// Outcome of one gossip pass.
#[derive(Debug, Default)]
pub struct GossipReport {
    /// Syncs that completed.
    pub synced: Vec<SyncReport>,
    /// Peers skipped this pass, with the reason.
    pub failed: Vec<(PeerId, String)>,
}

/// Outcome of pushing events to a peer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushReport {
    /// Events sent.
    pub sent: usize,
    /// Events the peer did not have.
    pub accepted: u64,
    /// Events the peer already had.
    pub duplicates: u64,
    /// Events the peer refused.
    pub rejected: u64,
}

/// Diagnostic view of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSnapshot {
    /// This node's identity.
    pub peer_id: PeerId,
    /// Events known.
    pub events: usize,
    /// Events known per owner.
    pub peer_counts: PeerCounts,
    /// Highest round assigned.
    pub max_round: u64,
    /// Highest round with every witness decided.
    pub last_decided_round: Option<u64>,
    /// Events in the consensus order.
    pub ordered: usize,
    /// Events not yet ordered.
    pub unordered: usize,
    /// Transactions waiting for the next local event.
    pub buffered_transactions: usize,
    /// Peers caught forking.
    pub faulty: Vec<PeerId>,
    /// Rolling hash of the consensus order.
    pub order_hash: [u8; 32],
}

/// A hashgraph peer.
pub struct Node {
    /// This node's identity.
    id: PeerId,
    /// Configuration.
    config: NodeConfig,
    /// The local view; single writer.
    graph: Mutex<Hashgraph>,
    /// Transactions for the next event this node creates.
    transactions: Mutex<Vec<Bytes>>,
    /// Timestamp source.
    clock: Arc<dyn Clock>,
    /// Outbound RPC.
    transport: Arc<dyn Transport>,
}

impl Node {
    /// Create a node and its first event.
    pub fn new(
        config: NodeConfig,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        if transport.local_peer_id() != config.peer_id {
            return Err(NodeError::InvalidConfig(format!(
                "transport speaks for {}, config for {}",
                transport.local_peer_id(),
                config.peer_id
            )));
        }

        let id = config.peer_id;
        let mut graph: Hashgraph = Hashgraph::new(config.peer_set()?, config.consensus.clone())?;
        let genesis = graph.create_genesis(id, clock.now_millis(), Vec::new())?;
        tracing::info!(peer = %id, %genesis, peers = config.peers.len(), "node started");

        Ok(Self {
            id,
            config,
            graph: Mutex::new(graph),
            transactions: Mutex::new(Vec::new()),
            clock,
            transport,
        })
    }

    /// This node's identity.
    pub fn id(&self) -> PeerId {
        self.id
    }

    /// The node's configuration.
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Transactions
    // ─────────────────────────────────────────────────────────────────────────

    /// Buffer a transaction for the next event this node creates.
    pub async fn submit_transaction(&self, tx: impl Into<Bytes>) -> Result<()> {
        let mut buffer = self.transactions.lock().await;
        if buffer.len() >= self.config.max_pending_transactions {
            return Err(NodeError::TransactionBufferFull {
                capacity: self.config.max_pending_transactions,
            });
        }
        buffer.push(tx.into());
        Ok(())
    }

    /// The oldest buffered transactions that fit in one event.
    async fn take_transactions(&self) -> Vec<Bytes> {
        let mut buffer = self.transactions.lock().await;
        let take = buffer.len().min(MAX_TRANSACTIONS_PER_EVENT);
        buffer.drain(..take).collect()
    }

    /// Put transactions back at the front of the buffer after a failed sync.
    async fn restore_transactions(&self, mut txs: Vec<Bytes>) {
        let mut buffer = self.transactions.lock().await;
        txs.append(&mut buffer);
        *buffer = txs;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Gossip
    // ─────────────────────────────────────────────────────────────────────────

    /// Pull what `peer` has that we lack, then record the sync with a new
    /// event.
    pub async fn sync_from(&self, peer: &PeerId) -> Result<SyncReport> {
        self.check_remote(peer)?;

        let known = self.graph.lock().await.peer_counts();
        let reply = self
            .transport
            .call(peer, SyncMessage::GetMissingEventCounts { known })
            .await?;
        let counts: PeerCounts = expect_counts(reply)?
            .into_iter()
            .filter(|(_, n)| *n > 0)
            .collect();

        let missing = if counts.is_empty() {
            BTreeMap::new()
        } else {
            let reply = self
                .transport
                .call(peer, SyncMessage::GetMissingEvents { counts })
                .await?;
            let (sender, mut missing) = expect_events(reply)?;
            check_sender(peer, &sender)?;
            self.fetch_unresolved(peer, &mut missing).await?;
            missing
        };

        let txs = self.take_transactions().await;
        let result = {
            let mut graph = self.graph.lock().await;
            apply_sync(
                &mut *graph,
                self.id,
                *peer,
                missing,
                self.clock.now_millis(),
                txs.clone(),
            )
        };

        match result {
            Ok(report) => Ok(report),
            Err(e) => {
                self.restore_transactions(txs).await;
                Err(e.into())
            }
        }
    }

    /// Hand `peer` the events it lacks; it records the sync with an event
    /// of its own.
    pub async fn push_to(&self, peer: &PeerId) -> Result<PushReport> {
        self.check_remote(peer)?;

        // Asking with an empty digest returns the peer's full counts.
        let reply = self
            .transport
            .call(
                peer,
                SyncMessage::GetMissingEventCounts {
                    known: PeerCounts::new(),
                },
            )
            .await?;
        let theirs = expect_counts(reply)?;

        let missing_events = {
            let graph = self.graph.lock().await;
            let counts = missing_event_counts(&*graph, &theirs);
            collect_missing_events(
                &*graph,
                &counts,
                Some(&self.id),
                self.config.sync.max_events_per_message,
            )
        };
        let sent = missing_events.values().map(Vec::len).sum();

        let reply = self
            .transport
            .call(
                peer,
                SyncMessage::SyncEvents {
                    sender: self.id,
                    missing_events,
                },
            )
            .await?;

        match reply {
            SyncMessage::Ack {
                accepted,
                duplicates,
                rejected,
            } => Ok(PushReport {
                sent,
                accepted,
                duplicates,
                rejected,
            }),
            SyncMessage::Error { code, message } => {
                Err(SyncError::PeerError { code, message }.into())
            }
            other => Err(SyncError::UnexpectedMessage {
                expected: "Ack",
                got: other.kind(),
            }
            .into()),
        }
    }

    /// Sync from every other peer once.
    ///
    /// Peers that cannot be reached or answer badly are logged and skipped.
    pub async fn gossip_pass(&self) -> Result<GossipReport> {
        let mut report = GossipReport::default();
        for peer in self.config.remote_peers() {
            match self.sync_from(peer).await {
                Ok(sync) => report.synced.push(sync),
                Err(e) if e.is_peer_failure() => {
                    tracing::warn!(from = %self.id, %peer, error = %e, "sync failed, skipping peer");
                    report.failed.push((*peer, e.to_string()));
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Run gossip passes every `gossip_interval` until `shutdown` turns true
    /// or its sender is dropped.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut ticker = tokio::time::interval(self.config.gossip_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = ticker.tick() => {
                    let pass = self.gossip_pass().await?;
                    tracing::debug!(
                        peer = %self.id,
                        synced = pass.synced.len(),
                        failed = pass.failed.len(),
                        "gossip pass"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!(peer = %self.id, "node stopped");
        Ok(())
    }

    /// Fetch by id the parents `missing` names that neither it nor our graph
    /// holds. A fork branch we never kept on its owner's chain only arrives
    /// this way, since the counts digest cannot describe it.
    async fn fetch_unresolved(
        &self,
        peer: &PeerId,
        missing: &mut BTreeMap<PeerId, Vec<Event>>,
    ) -> Result<()> {
        for _ in 0..MAX_PARENT_FETCHES {
            let mut ids = {
                let graph = self.graph.lock().await;
                unresolved_parents(&*graph, missing)
            };
            if ids.is_empty() {
                return Ok(());
            }
            ids.truncate(limits::MAX_IDS_PER_REQUEST);

            let reply = self.transport.call(peer, SyncMessage::GetEvents { ids }).await?;
            let (sender, found) = expect_events(reply)?;
            check_sender(peer, &sender)?;
            if extend_batch(missing, found) == 0 {
                break;
            }
        }
        tracing::debug!(from = %self.id, %peer, "parents still unresolved after fetching");
        Ok(())
    }

    fn check_remote(&self, peer: &PeerId) -> Result<()> {
        if *peer == self.id {
            return Err(NodeError::SelfSync);
        }
        if !self.config.peers.contains(peer) {
            return Err(NodeError::UnknownPeer(*peer));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Ids in consensus order.
    pub async fn ordered_event_ids(&self) -> Vec<EventId> {
        self.graph.lock().await.ordered_ids()
    }

    /// Transactions in consensus order.
    pub async fn ordered_transactions(&self) -> Vec<Bytes> {
        self.graph.lock().await.ordered_transactions()
    }

    /// Counters for diagnostics.
    pub async fn snapshot(&self) -> NodeSnapshot {
        let buffered_transactions = self.transactions.lock().await.len();
        let graph = self.graph.lock().await;
        let ordered = graph.ordered_ids();
        NodeSnapshot {
            peer_id: self.id,
            events: graph.len(),
            peer_counts: graph.peer_counts(),
            max_round: graph.max_round(),
            last_decided_round: graph.last_decided_round(),
            ordered: ordered.len(),
            unordered: graph.pending_len(),
            buffered_transactions,
            faulty: graph.faulty_peers(),
            order_hash: order_hash(&ordered),
        }
    }

    /// Run `f` against the hashgraph under the lock.
    pub async fn with_hashgraph<R>(&self, f: impl FnOnce(&Hashgraph) -> R) -> R {
        let graph = self.graph.lock().await;
        f(&*graph)
    }
}

fn check_sender(peer: &PeerId, sender: &PeerId) -> Result<()> {
    if sender != peer {
        return Err(SyncError::InvalidMessage(format!(
            "events from {peer} claim sender {sender}"
        ))
        .into());
    }
    Ok(())
}

#[async_trait]
impl SyncHandler for Node {
    async fn handle(
        &self,
        from: PeerId,
        message: SyncMessage,
    ) -> hashgraph_sync::Result<SyncMessage> {
        if !self.config.peers.contains(&from) {
            return Ok(SyncMessage::error(
                SyncErrorCode::InvalidMessage,
                format!("{from} is not a member"),
            ));
        }

        match message {
            SyncMessage::SyncEvents {
                sender,
                missing_events,
            } => {
                if sender != from || sender == self.id {
                    return Ok(SyncMessage::error(
                        SyncErrorCode::InvalidMessage,
                        format!("pushed events claim sender {sender}"),
                    ));
                }
                let txs = self.take_transactions().await;
                let result = {
                    let mut graph = self.graph.lock().await;
                    apply_sync(
                        &mut *graph,
                        self.id,
                        sender,
                        missing_events,
                        self.clock.now_millis(),
                        txs.clone(),
                    )
                };
                match result {
                    Ok(report) => Ok(SyncMessage::Ack {
                        accepted: report.merge.accepted.len() as u64,
                        duplicates: report.merge.duplicates as u64,
                        rejected: report.merge.rejected as u64,
                    }),
                    Err(e) => {
                        self.restore_transactions(txs).await;
                        tracing::warn!(peer = %self.id, %from, error = %e, "push failed");
                        Ok(SyncMessage::error(SyncErrorCode::InternalError, e.to_string()))
                    }
                }
            }
            query => {
                let graph = self.graph.lock().await;
                Ok(answer_query(&*graph, &self.config.sync, &self.id, &query))
            }
        }
    }
}
