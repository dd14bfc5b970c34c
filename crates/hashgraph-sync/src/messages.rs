//! Sync protocol message types.
//!
//! These messages are exchanged between peers to spread missing events.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use hashgraph_core::{Event, EventId, PeerId};

/// Current protocol version.
pub const PROTOCOL_VERSION: u8 = 0;

/// Message size limits.
pub mod limits {
    /// Max entries in a per-peer count map.
    pub const MAX_PEERS_PER_DIGEST: usize = 1024;
    /// Max events in one SyncEvents message, across all peers.
    pub const MAX_EVENTS_PER_MESSAGE: usize = 10_000;
    /// Max ids in one GetEvents request.
    pub const MAX_IDS_PER_REQUEST: usize = 1024;
    /// Max length of an error description.
    pub const MAX_ERROR_MESSAGE_LEN: usize = 1024;
}

/// Per-peer event counts.
pub type PeerCounts = BTreeMap<PeerId, u64>;

/// Sync protocol messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessage {
    /// Digest: how many events of each peer the caller knows.
    GetMissingEventCounts {
        /// Caller's known count per peer.
        known: PeerCounts,
    },

    /// Reply to `GetMissingEventCounts`.
    MissingEventCounts {
        /// For every peer the callee knows, how many more events it has
        /// than the caller (never negative).
        counts: PeerCounts,
    },

    /// Transfer request: send me the last `counts[peer]` events of each peer.
    GetMissingEvents {
        /// Number of trailing events wanted per peer.
        counts: PeerCounts,
    },

    /// Request specific events by id.
    ///
    /// Used for parents that a `SyncEvents` batch names but does not carry:
    /// events off their owner's chain, which counts cannot describe.
    GetEvents {
        /// Ids wanted.
        ids: Vec<EventId>,
    },

    /// Missing events, oldest first per peer.
    ///
    /// Sent as the reply to `GetMissingEvents` or `GetEvents`, or pushed
    /// unsolicited.
    SyncEvents {
        /// The peer that packaged the events.
        sender: PeerId,
        /// Events per owner, oldest first.
        missing_events: BTreeMap<PeerId, Vec<Event>>,
    },

    /// Acknowledge a pushed `SyncEvents`.
    Ack {
        /// Events that were new.
        accepted: u64,
        /// Events that were already known.
        duplicates: u64,
        /// Events that were rejected.
        rejected: u64,
    },

    /// Error condition.
    Error {
        /// Error code for programmatic handling.
        code: SyncErrorCode,
        /// Human-readable description.
        message: String,
    },
}

impl SyncMessage {
    /// Short name of the variant, for logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::GetMissingEventCounts { .. } => "GetMissingEventCounts",
            SyncMessage::MissingEventCounts { .. } => "MissingEventCounts",
            SyncMessage::GetMissingEvents { .. } => "GetMissingEvents",
            SyncMessage::GetEvents { .. } => "GetEvents",
            SyncMessage::SyncEvents { .. } => "SyncEvents",
            SyncMessage::Ack { .. } => "Ack",
            SyncMessage::Error { .. } => "Error",
        }
    }

    /// Build an error reply, truncating the description to the limit.
    pub fn error(code: SyncErrorCode, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.len() > limits::MAX_ERROR_MESSAGE_LEN {
            let mut end = limits::MAX_ERROR_MESSAGE_LEN;
            while !message.is_char_boundary(end) {
                end -= 1;
            }
            message.truncate(end);
        }
        SyncMessage::Error { code, message }
    }

    /// Check if this message respects size limits.
    pub fn validate_limits(&self) -> Result<(), &'static str> {
        match self {
            SyncMessage::GetMissingEventCounts { known: counts }
            | SyncMessage::MissingEventCounts { counts }
            | SyncMessage::GetMissingEvents { counts } => {
                if counts.len() > limits::MAX_PEERS_PER_DIGEST {
                    return Err("too many peers in digest");
                }
            }
            SyncMessage::GetEvents { ids } => {
                if ids.len() > limits::MAX_IDS_PER_REQUEST {
                    return Err("too many ids requested");
                }
            }
            SyncMessage::SyncEvents { missing_events, .. } => {
                if missing_events.len() > limits::MAX_PEERS_PER_DIGEST {
                    return Err("too many peers in event batch");
                }
                let total: usize = missing_events.values().map(Vec::len).sum();
                if total > limits::MAX_EVENTS_PER_MESSAGE {
                    return Err("too many events");
                }
            }
            SyncMessage::Error { message, .. } => {
                if message.len() > limits::MAX_ERROR_MESSAGE_LEN {
                    return Err("error message too long");
                }
            }
            SyncMessage::Ack { .. } => {}
        }
        Ok(())
    }
}

/// Error codes for sync protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum SyncErrorCode {
    /// Unknown/unspecified error.
    Unknown = 0,
    /// Message too large.
    MessageTooLarge = 2,
    /// Invalid message format.
    InvalidMessage = 3,
    /// Message is valid but not expected here.
    UnexpectedMessage = 4,
    /// Internal error on peer.
    InternalError = 6,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashgraph_core::EventBuilder;

    fn peer(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    #[test]
    fn test_message_limits_valid() {
        let msg = SyncMessage::GetMissingEventCounts {
            known: [(peer(1), 3), (peer(2), 0)].into_iter().collect(),
        };
        assert!(msg.validate_limits().is_ok());
    }

    #[test]
    fn test_digest_limit_exceeded() {
        let known: PeerCounts = (0..=limits::MAX_PEERS_PER_DIGEST as u32)
            .map(|i| {
                let mut bytes = [0u8; 32];
                bytes[..4].copy_from_slice(&i.to_be_bytes());
                (PeerId::from_bytes(bytes), 1)
            })
            .collect();
        let msg = SyncMessage::MissingEventCounts { counts: known };
        assert_eq!(msg.validate_limits(), Err("too many peers in digest"));
    }

    #[test]
    fn test_event_limit_exceeded() {
        let event = EventBuilder::new(peer(1)).build();
        let msg = SyncMessage::SyncEvents {
            sender: peer(1),
            missing_events: [(peer(1), vec![event; limits::MAX_EVENTS_PER_MESSAGE + 1])]
                .into_iter()
                .collect(),
        };
        assert_eq!(msg.validate_limits(), Err("too many events"));
    }

    #[test]
    fn test_id_request_limit() {
        let ids = vec![EventId::from_bytes([3; 32]); limits::MAX_IDS_PER_REQUEST];
        let msg = SyncMessage::GetEvents { ids: ids.clone() };
        assert!(msg.validate_limits().is_ok());
        assert_eq!(msg.kind(), "GetEvents");

        let mut ids = ids;
        ids.push(EventId::from_bytes([4; 32]));
        let msg = SyncMessage::GetEvents { ids };
        assert_eq!(msg.validate_limits(), Err("too many ids requested"));
    }

    #[test]
    fn test_error_message_truncated() {
        let msg = SyncMessage::error(SyncErrorCode::InternalError, "é".repeat(2000));
        assert!(msg.validate_limits().is_ok());
        assert_eq!(msg.kind(), "Error");
    }
}
