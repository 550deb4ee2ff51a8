//! Hash-chain primitives for the trust event log.
//!
//! Every field that contributes to an entry's hash is fed to SHA-256
//! explicitly, in a fixed order, so nothing is accidentally omitted.
//!
//! Hash input layout (bytes, in order):
//!   1. sequence as 8-byte little-endian
//!   2. prev_hash as UTF-8 bytes (64 ASCII hex chars)
//!   3. agent_id, event_type, outcome, each UTF-8 followed by a 0 byte
//!   4. magnitude, original_score, adjustment, new_score as f64 bits, LE
//!   5. reason as UTF-8 followed by a 0 byte
//!   6. success as one byte
//!   7. timestamp as RFC 3339 with nanoseconds

use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use atrian_contracts::trust::TrustEvent;

/// The `prev_hash` of the first entry in every chain.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One `TrustEvent` with its position and hashes in the chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainedEvent {
    pub sequence: u64,
    pub event: TrustEvent,
    pub prev_hash: String,
    pub this_hash: String,
}

/// Compute the SHA-256 hash for one trust event. Returns lowercase hex.
pub fn hash_event(sequence: u64, event: &TrustEvent, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sequence.to_le_bytes());
    hasher.update(prev_hash.as_bytes());

    for text in [
        event.agent_id.as_str(),
        event.event_type.as_str(),
        event.outcome.as_str(),
    ] {
        hasher.update(text.as_bytes());
        hasher.update([0u8]);
    }

    for number in [
        event.magnitude,
        event.original_score,
        event.adjustment,
        event.new_score,
    ] {
        hasher.update(number.to_bits().to_le_bytes());
    }

    hasher.update(event.reason.as_bytes());
    hasher.update([0u8]);
    hasher.update([u8::from(event.success)]);
    hasher.update(
        event
            .timestamp
            .to_rfc3339_opts(SecondsFormat::Nanos, true)
            .as_bytes(),
    );

    hex::encode(hasher.finalize())
}

/// Verify prev-hash linkage and hash correctness of every entry.
///
/// An empty chain is valid.
pub fn verify_chain(entries: &[ChainedEvent]) -> bool {
    let mut expected_prev = GENESIS_HASH.to_string();

    for (position, entry) in entries.iter().enumerate() {
        if entry.sequence != position as u64 || entry.prev_hash != expected_prev {
            return false;
        }
        if entry.this_hash != hash_event(entry.sequence, &entry.event, &entry.prev_hash) {
            return false;
        }
        expected_prev = entry.this_hash.clone();
    }

    true
}
