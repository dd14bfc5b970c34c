//! Structural validation of events received from peers.
//!
//! These checks protect the integrity of the content address and the
//! parent structure. They do not authenticate the creator; signing and
//! signature verification belong to an external collaborator.

use crate::error::ValidationError;
use crate::event::{Event, MAX_TRANSACTIONS_PER_EVENT};
use crate::peers::PeerSet;

/// Validate an event's structure against the peer set.
///
/// Checks, in order:
/// 1. the claimed id equals the recomputed content address
/// 2. parents are both present or both absent
/// 3. the two parents are distinct
/// 4. the owner is a member of the peer set
/// 5. the transaction count is within bounds
pub fn validate_event(event: &Event, peers: &PeerSet) -> Result<(), ValidationError> {
    let computed = event.compute_id();
    if computed != event.id {
        return Err(ValidationError::IdMismatch {
            claimed: event.id,
            computed,
        });
    }

    match (&event.self_parent, &event.other_parent) {
        (Some(_), None) | (None, Some(_)) => {
            return Err(ValidationError::PartialParents(event.id));
        }
        (Some(sp), Some(op)) if sp == op => {
            return Err(ValidationError::SameParents(event.id));
        }
        _ => {}
    }

    if !peers.contains(&event.owner) {
        return Err(ValidationError::UnknownOwner {
            event: event.id,
            owner: event.owner,
        });
    }

    if event.transactions.len() > MAX_TRANSACTIONS_PER_EVENT {
        return Err(ValidationError::TooManyTransactions {
            event: event.id,
            count: event.transactions.len(),
            max: MAX_TRANSACTIONS_PER_EVENT,
        });
    }

    Ok(())
}
