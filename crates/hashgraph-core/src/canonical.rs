//! Canonical CBOR encoding of event creation fields.
//!
//! Follows RFC 8949 Core Deterministic Encoding:
//! - Map keys are small integers written in ascending order
//! - Integers use the smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! Every peer must derive the same [`EventId`] for the same event, so this
//! encoding is the one thing that may never change without a version bump.

use bytes::Bytes;

use crate::types::{EventId, PeerId};

/// Domain separator mixed into every event id.
pub const EVENT_ID_DOMAIN: &[u8] = b"hashgraph-event-v0:";

/// Field keys (integer keys for compact encoding).
mod keys {
    pub const OWNER: u64 = 0;
    pub const SELF_PARENT: u64 = 1;
    pub const OTHER_PARENT: u64 = 2;
    pub const TIMESTAMP: u64 = 3;
    pub const TRANSACTIONS: u64 = 4;
    pub const COUNT: u64 = 5;
}

const MAJOR_UINT: u8 = 0;
const MAJOR_NINT: u8 = 1;
const MAJOR_BYTES: u8 = 2;
const MAJOR_ARRAY: u8 = 4;
const MAJOR_MAP: u8 = 5;
const CBOR_NULL: u8 = 0xf6;

/// Encode the creation fields of an event to canonical bytes.
pub fn canonical_event_bytes(
    owner: &PeerId,
    self_parent: Option<&EventId>,
    other_parent: Option<&EventId>,
    timestamp: i64,
    transactions: &[Bytes],
) -> Vec<u8> {
    let payload_len: usize = transactions.iter().map(|tx| tx.len() + 9).sum();
    let mut buf = Vec::with_capacity(128 + payload_len);

    encode_uint(&mut buf, MAJOR_MAP, keys::COUNT);

    encode_uint(&mut buf, MAJOR_UINT, keys::OWNER);
    encode_bytes(&mut buf, owner.as_bytes());

    encode_uint(&mut buf, MAJOR_UINT, keys::SELF_PARENT);
    encode_optional_id(&mut buf, self_parent);

    encode_uint(&mut buf, MAJOR_UINT, keys::OTHER_PARENT);
    encode_optional_id(&mut buf, other_parent);

    encode_uint(&mut buf, MAJOR_UINT, keys::TIMESTAMP);
    encode_int(&mut buf, timestamp);

    encode_uint(&mut buf, MAJOR_UINT, keys::TRANSACTIONS);
    encode_uint(&mut buf, MAJOR_ARRAY, transactions.len() as u64);
    for tx in transactions {
        encode_bytes(&mut buf, tx);
    }

    buf
}

/// Compute the id of an event from its creation fields.
pub fn event_id_for(
    owner: &PeerId,
    self_parent: Option<&EventId>,
    other_parent: Option<&EventId>,
    timestamp: i64,
    transactions: &[Bytes],
) -> EventId {
    let bytes = canonical_event_bytes(owner, self_parent, other_parent, timestamp, transactions);
    let mut hasher = blake3::Hasher::new();
    hasher.update(EVENT_ID_DOMAIN);
    hasher.update(&bytes);
    EventId(*hasher.finalize().as_bytes())
}

fn encode_optional_id(buf: &mut Vec<u8>, id: Option<&EventId>) {
    match id {
        Some(id) => encode_bytes(buf, id.as_bytes()),
        None => buf.push(CBOR_NULL),
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, MAJOR_UINT, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, MAJOR_NINT, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

/// Encode a byte string (major type 2).
fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, MAJOR_BYTES, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}
