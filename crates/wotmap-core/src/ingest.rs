//! Two-pass loader for preprocessed keyring record streams.
//!
//! # Record format
//!
//! Fixed-width 18-byte records, newline-terminated:
//!
//! ```text
//! byte 0      record type: 'p' (key) or 's' (signature)
//! bytes 1-16  16 hex digits: the key identifier
//! byte 17     '\n' — records without the terminator are discarded
//! ```
//!
//! A `'p'` record introduces a key. An `'s'` record introduces a
//! signature **on the most recently seen key**; its payload identifies
//! the signer.
//!
//! # Passes
//!
//! Pass one collects every `'p'` key into the table. Pass two re-walks
//! the stream from the start, resolving each `'p'` record to the
//! current-key context and adding one `signer → current` edge per `'s'`
//! record.
//!
//! Failure policy: an unresolvable current-key context aborts the whole
//! load; an unresolvable *signer* only drops that one edge, because
//! signer keys may legitimately be absent from a pruned dataset.

use tracing::{debug, info};

use crate::graph::{GraphError, KeyGraph};
use crate::keyid::{KeyId, KeyIdError};

/// Fixed record width, terminator included.
pub const RECORD_LEN: usize = 18;

/// Errors that abort a keyring load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// A pass-two `'p'` record did not resolve to a key collected in
    /// pass one. The passes walk the same bytes, so this indicates a
    /// corrupted stream.
    #[error("pass 2 could not resolve key {0} as the current-key context")]
    UnresolvedCurrentKey(KeyId),
    /// A record carried a malformed identifier field.
    #[error(transparent)]
    Key(#[from] KeyIdError),
    /// The key table overflowed its provisioned capacity.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A loaded trust graph plus ingest counters.
#[derive(Debug)]
pub struct Ingest {
    /// The constructed graph.
    pub graph: KeyGraph,
    /// Signature edges actually added.
    pub sig_count: usize,
    /// Signature records dropped because the signer (or the current-key
    /// context at stream start) was unresolved.
    pub dropped_sigs: usize,
}

/// Well-formed records in `bytes`: 18-byte chunks whose final byte is a
/// newline. A trailing partial chunk is ignored.
fn records(bytes: &[u8]) -> impl Iterator<Item = &[u8]> {
    bytes
        .chunks_exact(RECORD_LEN)
        .filter(|rec| rec[RECORD_LEN - 1] == b'\n')
}

/// Load a keyring record stream into a [`KeyGraph`] provisioned for
/// `capacity` keys.
///
/// # Errors
///
/// Returns [`IngestError`] on malformed identifiers, capacity overflow,
/// or an unresolvable current-key context; any of these invalidates the
/// whole run.
pub fn load(bytes: &[u8], capacity: usize) -> Result<Ingest, IngestError> {
    let mut graph = KeyGraph::with_capacity(capacity);

    // Pass 1: keys.
    for rec in records(bytes) {
        if rec[0] == b'p' {
            graph.insert_key(KeyId::parse_hex16(&rec[1..17])?)?;
        }
    }
    info!(keys = graph.len(), "pass 1 complete");

    // Pass 2: signatures, resolved against the completed key table.
    let mut current: Option<usize> = None;
    let mut sig_count = 0usize;
    let mut dropped_sigs = 0usize;
    for rec in records(bytes) {
        match rec[0] {
            b'p' => {
                let id = KeyId::parse_hex16(&rec[1..17])?;
                current = Some(
                    graph
                        .lookup_index(id)
                        .ok_or(IngestError::UnresolvedCurrentKey(id))?,
                );
            }
            b's' => {
                let signer = graph.lookup_index(KeyId::parse_hex16(&rec[1..17])?);
                if graph.add_edge(signer, current) {
                    sig_count += 1;
                    if sig_count % 1000 == 0 {
                        debug!(sigs = sig_count, "signatures imported");
                    }
                } else {
                    dropped_sigs += 1;
                }
            }
            _ => {}
        }
    }
    info!(sigs = sig_count, dropped = dropped_sigs, "pass 2 complete");

    Ok(Ingest {
        graph,
        sig_count,
        dropped_sigs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(kind: u8, hex: &str) -> Vec<u8> {
        assert_eq!(hex.len(), 16, "test record payload must be 16 hex digits");
        let mut out = Vec::with_capacity(RECORD_LEN);
        out.push(kind);
        out.extend_from_slice(hex.as_bytes());
        out.push(b'\n');
        out
    }

    fn stream(parts: &[Vec<u8>]) -> Vec<u8> {
        parts.concat()
    }

    const KEY_A: &str = "00000000000000AA";
    const KEY_B: &str = "00000000000000BB";
    const KEY_C: &str = "00000000000000CC";

    #[test]
    fn keys_then_edges() {
        // B is signed by A; both keys known.
        let bytes = stream(&[rec(b'p', KEY_A), rec(b'p', KEY_B), rec(b's', KEY_A)]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.graph.len(), 2);
        assert_eq!(loaded.sig_count, 1);
        assert_eq!(loaded.dropped_sigs, 0);
        assert_eq!(loaded.graph.signed_by(1), &[0]);
        assert_eq!(loaded.graph.signed(0), &[1]);
    }

    #[test]
    fn signer_may_reference_a_later_key() {
        // A is signed by C, declared further down the stream.
        let bytes = stream(&[
            rec(b'p', KEY_A),
            rec(b's', KEY_C),
            rec(b'p', KEY_B),
            rec(b'p', KEY_C),
        ]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.sig_count, 1);
        assert_eq!(loaded.graph.signed_by(0), &[2]);
    }

    #[test]
    fn unknown_signer_is_dropped_not_fatal() {
        let bytes = stream(&[rec(b'p', KEY_A), rec(b's', KEY_C)]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.sig_count, 0);
        assert_eq!(loaded.dropped_sigs, 1);
        assert_eq!(loaded.graph.edge_count(), 0);
    }

    #[test]
    fn signature_before_any_key_is_dropped() {
        let bytes = stream(&[rec(b's', KEY_A), rec(b'p', KEY_A)]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.sig_count, 0);
        assert_eq!(loaded.dropped_sigs, 1);
    }

    #[test]
    fn record_without_terminator_is_discarded() {
        let mut bytes = rec(b'p', KEY_A);
        let mut bad = rec(b'p', KEY_B);
        bad[RECORD_LEN - 1] = b'x';
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&rec(b'p', KEY_C));
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.graph.len(), 2);
        assert_eq!(loaded.graph.lookup_index(KeyId::parse_hex16(KEY_B.as_bytes()).expect("hex")), None);
    }

    #[test]
    fn unrecognized_record_type_is_skipped() {
        let bytes = stream(&[rec(b'p', KEY_A), rec(b'x', KEY_B)]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.graph.len(), 1);
        assert_eq!(loaded.graph.edge_count(), 0);
    }

    #[test]
    fn malformed_identifier_is_fatal() {
        let bytes = stream(&[rec(b'p', "ZZZZZZZZZZZZZZZZ")]);
        assert!(matches!(load(&bytes, 16), Err(IngestError::Key(_))));
    }

    #[test]
    fn capacity_overflow_is_fatal() {
        let bytes = stream(&[rec(b'p', KEY_A), rec(b'p', KEY_B)]);
        assert!(matches!(
            load(&bytes, 1),
            Err(IngestError::Graph(GraphError::CapacityExceeded { capacity: 1 }))
        ));
    }

    #[test]
    fn parallel_signatures_are_counted_individually() {
        let bytes = stream(&[
            rec(b'p', KEY_A),
            rec(b'p', KEY_B),
            rec(b's', KEY_A),
            rec(b's', KEY_A),
        ]);
        let loaded = load(&bytes, 16).expect("load");
        assert_eq!(loaded.sig_count, 2);
        assert_eq!(loaded.graph.signed_by(1), &[0, 0]);
    }
}
