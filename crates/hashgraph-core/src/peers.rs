//! Fixed peer membership and supermajority arithmetic.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::PeerId;

/// The known set of peers taking part in consensus.
///
/// Sorted and de-duplicated so that iteration order is identical on every
/// peer. Membership is fixed for the lifetime of a hashgraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSet {
    peers: Vec<PeerId>,
}

impl PeerSet {
    /// Build a peer set. Duplicates are dropped.
    pub fn new(peers: impl IntoIterator<Item = PeerId>) -> Result<Self, CoreError> {
        let mut peers: Vec<PeerId> = peers.into_iter().collect();
        peers.sort();
        peers.dedup();
        if peers.is_empty() {
            return Err(CoreError::EmptyPeerSet);
        }
        Ok(Self { peers })
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Always false for a constructed set; present for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Whether the peer is a member.
    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.binary_search(peer).is_ok()
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    /// `⌈2n/3⌉`.
    pub fn supermajority_threshold(&self) -> usize {
        supermajority_threshold(self.len())
    }

    /// Whether `count` is strictly greater than `⌈2n/3⌉`.
    pub fn is_supermajority(&self, count: usize) -> bool {
        count > self.supermajority_threshold()
    }
}

/// `⌈2n/3⌉` for a peer count `n`.
pub fn supermajority_threshold(num_peers: usize) -> usize {
    (2 * num_peers).div_ceil(3)
}

impl<'a> IntoIterator for &'a PeerSet {
    type Item = &'a PeerId;
    type IntoIter = std::slice::Iter<'a, PeerId>;

    fn into_iter(self) -> Self::IntoIter {
        self.peers.iter()
    }
}
