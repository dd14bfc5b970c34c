//! Convergence checks between peers.
//!
//! Two honest peers must emit orders where one is a prefix of the other.
//! Comparing a rolling hash of the order is enough to tell; the ids are
//! only walked to locate a divergence.

use hashgraph_core::EventId;

/// Domain separator for the order hash.
const ORDER_DOMAIN: &[u8] = b"hashgraph-order-v0:";

/// Rolling Blake3 over an ordered list of event ids.
///
/// H = Blake3(domain || id_1 || ... || id_n)
pub fn order_hash(ids: &[EventId]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(ORDER_DOMAIN);
    for id in ids {
        hasher.update(id.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Result of comparing two consensus orders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvergenceResult {
    /// Identical orders.
    Converged,

    /// One order is a strict prefix of the other.
    Behind {
        /// Length of the local order.
        local_len: usize,
        /// Length of the remote order.
        remote_len: usize,
    },

    /// The orders disagree at some position.
    Diverged {
        /// First position where they differ.
        at: usize,
        /// Local id at that position.
        local: EventId,
        /// Remote id at that position.
        remote: EventId,
    },
}

impl ConvergenceResult {
    /// Check if converged.
    pub fn is_converged(&self) -> bool {
        matches!(self, ConvergenceResult::Converged)
    }

    /// Whether the orders are consistent (equal or prefix-related).
    pub fn is_consistent(&self) -> bool {
        !self.is_diverged()
    }

    /// Whether the orders contradict each other.
    pub fn is_diverged(&self) -> bool {
        matches!(self, ConvergenceResult::Diverged { .. })
    }
}

/// Compare a local order against a remote one.
pub fn verify_convergence(local: &[EventId], remote: &[EventId]) -> ConvergenceResult {
    if local.len() == remote.len() && order_hash(local) == order_hash(remote) {
        return ConvergenceResult::Converged;
    }

    if let Some((at, (l, r))) = local
        .iter()
        .zip(remote)
        .enumerate()
        .find(|(_, (l, r))| l != r)
    {
        tracing::warn!(at, local = %l, remote = %r, "consensus orders diverged");
        return ConvergenceResult::Diverged {
            at,
            local: *l,
            remote: *r,
        };
    }

    ConvergenceResult::Behind {
        local_len: local.len(),
        remote_len: remote.len(),
    }
}

/// Compare many orders pairwise against the longest one.
///
/// Returns one result per input, in input order.
pub fn verify_all(orders: &[Vec<EventId>]) -> Vec<ConvergenceResult> {
    let Some(longest) = orders.iter().max_by_key(|o| o.len()) else {
        return Vec::new();
    };
    orders
        .iter()
        .map(|order| verify_convergence(order, longest))
        .collect()
}
