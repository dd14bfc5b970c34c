//! Transport abstraction for the sync protocol.
//!
//! Sync is request/response: the caller sends one message and waits for
//! one reply. Implementations may use TCP, HTTP, QUIC, or anything else
//! that can carry the CBOR encoding below.

use async_trait::async_trait;

use hashgraph_core::PeerId;

use crate::error::{Result, SyncError};
use crate::messages::SyncMessage;

/// Caller side: deliver a request to a peer and return its reply.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `message` to `peer` and wait for the reply.
    async fn call(&self, peer: &PeerId, message: SyncMessage) -> Result<SyncMessage>;

    /// Get the local peer's identity.
    fn local_peer_id(&self) -> PeerId;
}

/// Callee side: answer a request from `from`.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Handle one incoming request.
    async fn handle(&self, from: PeerId, message: SyncMessage) -> Result<SyncMessage>;
}

/// Encode a message to CBOR.
pub fn encode_message(message: &SyncMessage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(message, &mut buf).map_err(|e| SyncError::Codec(e.to_string()))?;
    Ok(buf)
}

/// Decode a message from CBOR and check its size limits.
pub fn decode_message(bytes: &[u8]) -> Result<SyncMessage> {
    let message: SyncMessage =
        ciborium::from_reader(bytes).map_err(|e| SyncError::Codec(e.to_string()))?;
    message
        .validate_limits()
        .map_err(|e| SyncError::InvalidMessage(e.into()))?;
    Ok(message)
}

/// An in-process network for tests and simulations.
///
/// Every request and reply is round-tripped through the CBOR codec, so the
/// wire format is exercised exactly as a real transport would.
pub mod memory {
    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Weak};
    use std::time::Duration;
    use tokio::sync::RwLock;

    /// Shared routing table.
    #[derive(Default)]
    pub struct MemoryNetwork {
        /// Registered handlers. Weak so the network never keeps a node alive.
        handlers: RwLock<HashMap<PeerId, Weak<dyn SyncHandler>>>,

        /// Peers currently cut off from the network.
        unreachable: RwLock<HashSet<PeerId>>,
    }

    impl MemoryNetwork {
        /// Create a new memory network.
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Route requests for `peer` to `handler`.
        pub async fn register(&self, peer: PeerId, handler: Arc<dyn SyncHandler>) {
            self.handlers
                .write()
                .await
                .insert(peer, Arc::downgrade(&handler));
        }

        /// Cut `peer` off: calls to and from it fail.
        pub async fn disconnect(&self, peer: PeerId) {
            self.unreachable.write().await.insert(peer);
        }

        /// Undo [`disconnect`](Self::disconnect).
        pub async fn reconnect(&self, peer: PeerId) {
            self.unreachable.write().await.remove(&peer);
        }

        /// Create a transport for `local` on this network.
        pub fn transport(self: &Arc<Self>, local: PeerId, timeout: Duration) -> MemoryTransport {
            MemoryTransport {
                local,
                network: Arc::clone(self),
                timeout,
            }
        }

        async fn route(&self, from: &PeerId, to: &PeerId) -> Result<Arc<dyn SyncHandler>> {
            {
                let unreachable = self.unreachable.read().await;
                if unreachable.contains(from) {
                    return Err(SyncError::TransportError("local peer disconnected".into()));
                }
                if unreachable.contains(to) {
                    return Err(SyncError::PeerNotConnected(*to));
                }
            }
            let handlers = self.handlers.read().await;
            handlers
                .get(to)
                .and_then(Weak::upgrade)
                .ok_or(SyncError::PeerNotConnected(*to))
        }
    }

    /// In-memory transport implementation.
    pub struct MemoryTransport {
        local: PeerId,
        network: Arc<MemoryNetwork>,
        timeout: Duration,
    }

    #[async_trait]
    impl Transport for MemoryTransport {
        async fn call(&self, peer: &PeerId, message: SyncMessage) -> Result<SyncMessage> {
            let handler = self.network.route(&self.local, peer).await?;

            let request = decode_message(&encode_message(&message)?)?;
            let reply = tokio::time::timeout(self.timeout, handler.handle(self.local, request))
                .await
                .map_err(|_| SyncError::Timeout(self.timeout))??;

            decode_message(&encode_message(&reply)?)
        }

        fn local_peer_id(&self) -> PeerId {
            self.local
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryNetwork;
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use hashgraph_core::EventBuilder;

    /// Replies with its own counts, whatever it is asked.
    struct Echo {
        counts: BTreeMap<PeerId, u64>,
    }

    #[async_trait]
    impl SyncHandler for Echo {
        async fn handle(&self, _from: PeerId, message: SyncMessage) -> Result<SyncMessage> {
            match message {
                SyncMessage::GetMissingEventCounts { .. } => Ok(SyncMessage::MissingEventCounts {
                    counts: self.counts.clone(),
                }),
                other => Ok(SyncMessage::error(
                    crate::messages::SyncErrorCode::UnexpectedMessage,
                    other.kind(),
                )),
            }
        }
    }

    /// Never answers in time.
    struct Stall;

    #[async_trait]
    impl SyncHandler for Stall {
        async fn handle(&self, _from: PeerId, _message: SyncMessage) -> Result<SyncMessage> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(SyncMessage::Ack {
                accepted: 0,
                duplicates: 0,
                rejected: 0,
            })
        }
    }

    fn peer(b: u8) -> PeerId {
        PeerId::from_bytes([b; 32])
    }

    #[test]
    fn test_codec_preserves_events() {
        let event = EventBuilder::new(peer(1))
            .timestamp(-5)
            .transaction(b"payload".to_vec())
            .build();
        let msg = SyncMessage::SyncEvents {
            sender: peer(1),
            missing_events: [(peer(1), vec![event.clone()])].into_iter().collect(),
        };
        let decoded = decode_message(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_message(&[0xff, 0x00, 0x13]),
            Err(SyncError::Codec(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_call_roundtrip() {
        let network = MemoryNetwork::new();
        let counts: BTreeMap<PeerId, u64> = [(peer(2), 7)].into_iter().collect();
        let echo: Arc<dyn SyncHandler> = Arc::new(Echo {
            counts: counts.clone(),
        });
        network.register(peer(2), echo.clone()).await;

        let transport = network.transport(peer(1), Duration::from_secs(1));
        assert_eq!(transport.local_peer_id(), peer(1));
        let reply = transport
            .call(
                &peer(2),
                SyncMessage::GetMissingEventCounts {
                    known: BTreeMap::new(),
                },
            )
            .await
            .unwrap();
        assert_eq!(reply, SyncMessage::MissingEventCounts { counts });
    }

    #[tokio::test]
    async fn test_memory_disconnect_and_reconnect() {
        let network = MemoryNetwork::new();
        let echo: Arc<dyn SyncHandler> = Arc::new(Echo {
            counts: BTreeMap::new(),
        });
        network.register(peer(2), echo.clone()).await;
        let transport = network.transport(peer(1), Duration::from_secs(1));
        let request = SyncMessage::GetMissingEventCounts {
            known: BTreeMap::new(),
        };

        network.disconnect(peer(2)).await;
        let err = transport.call(&peer(2), request.clone()).await.unwrap_err();
        assert!(matches!(err, SyncError::PeerNotConnected(p) if p == peer(2)));
        assert!(err.is_transport());

        network.reconnect(peer(2)).await;
        assert!(transport.call(&peer(2), request).await.is_ok());
    }

    #[tokio::test]
    async fn test_memory_unknown_peer() {
        let network = MemoryNetwork::new();
        let transport = network.transport(peer(1), Duration::from_secs(1));
        let err = transport
            .call(
                &peer(9),
                SyncMessage::GetMissingEventCounts {
                    known: BTreeMap::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_dropped_handler_is_unreachable() {
        let network = MemoryNetwork::new();
        {
            let echo: Arc<dyn SyncHandler> = Arc::new(Echo {
                counts: BTreeMap::new(),
            });
            network.register(peer(2), echo).await;
        }
        let transport = network.transport(peer(1), Duration::from_secs(1));
        let err = transport
            .call(
                &peer(2),
                SyncMessage::GetMissingEventCounts {
                    known: BTreeMap::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::PeerNotConnected(_)));
    }

    #[tokio::test]
    async fn test_memory_timeout() {
        let network = MemoryNetwork::new();
        let stall: Arc<dyn SyncHandler> = Arc::new(Stall);
        network.register(peer(2), stall.clone()).await;
        let transport = network.transport(peer(1), Duration::from_millis(50));

        let err = transport
            .call(
                &peer(2),
                SyncMessage::GetMissingEventCounts {
                    known: BTreeMap::new(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Timeout(_)));
    }
}
