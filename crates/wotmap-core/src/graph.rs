//! Key table and signature adjacency for the trust graph.
//!
//! # Overview
//!
//! [`KeyGraph`] owns a dense table of keys in insertion order plus two
//! adjacency relations per key:
//!
//! - `signed_by` — incoming: indices of the keys that signed this key.
//! - `signed` — outgoing: indices of the keys this key signed.
//!
//! A signature `signer → signee` is recorded in both lists. Edges are
//! never deduplicated — parallel signatures between the same pair are
//! legal and counted individually — and self-signatures are not filtered.
//! No key or edge is ever removed, so a key's index is stable for the
//! life of the graph.
//!
//! ## Capacity
//!
//! The table is provisioned for a fixed number of keys. Inserting past
//! the bound is a hard [`GraphError::CapacityExceeded`]; truncating the
//! key set silently would corrupt every downstream component and
//! distance result.

use crate::keyid::KeyId;

/// Default key-table provisioning, sized for a full keyring dump.
pub const DEFAULT_MAX_KEYS: usize = 160_000;

/// Errors from graph construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The key table is full.
    #[error("key capacity exceeded: table is provisioned for {capacity} keys")]
    CapacityExceeded {
        /// The provisioned bound.
        capacity: usize,
    },
}

#[derive(Debug, Clone)]
struct KeyNode {
    id: KeyId,
    signed_by: Vec<usize>,
    signed: Vec<usize>,
}

/// The directed trust graph: key table plus both adjacency relations.
#[derive(Debug, Clone)]
pub struct KeyGraph {
    keys: Vec<KeyNode>,
    capacity: usize,
    edge_count: usize,
}

impl KeyGraph {
    /// Create a graph provisioned for at most `capacity` keys.
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::new(),
            capacity,
            edge_count: 0,
        }
    }

    /// Create a graph with the default provisioning.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_KEYS)
    }

    /// Append a key and return its dense, zero-based index.
    ///
    /// Indices follow declaration order in the source data. Duplicate
    /// identifiers are not checked here (an insert-time scan would make
    /// construction quadratic for no benefit); [`Self::lookup_index`]
    /// resolves a duplicated identifier to its first insertion.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::CapacityExceeded`] when the table is full.
    pub fn insert_key(&mut self, id: KeyId) -> Result<usize, GraphError> {
        if self.keys.len() >= self.capacity {
            return Err(GraphError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.keys.push(KeyNode {
            id,
            signed_by: Vec::new(),
            signed: Vec::new(),
        });
        Ok(self.keys.len() - 1)
    }

    /// Resolve an identifier to its key index.
    ///
    /// Linear scan in insertion order, first match wins. Only used while
    /// constructing the graph, never in the traversal hot paths.
    #[must_use]
    pub fn lookup_index(&self, id: KeyId) -> Option<usize> {
        self.keys.iter().position(|key| key.id == id)
    }

    /// Record a signature edge `signer → signee` in both adjacency lists.
    ///
    /// Either side may be unresolved (`None`); the edge is then silently
    /// skipped and `false` is returned. Failing one edge instead of the
    /// whole load matches the pruned-dataset policy: signer keys may
    /// legitimately be absent from the input.
    pub fn add_edge(&mut self, signer: Option<usize>, signee: Option<usize>) -> bool {
        let (Some(signer), Some(signee)) = (signer, signee) else {
            return false;
        };
        self.keys[signee].signed_by.push(signer);
        self.keys[signer].signed.push(signee);
        self.edge_count += 1;
        true
    }

    /// Number of keys in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// `true` if the table holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Total number of signature edges (parallel edges counted).
    #[must_use]
    pub const fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// The identifier of the key at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn key_id(&self, index: usize) -> KeyId {
        self.keys[index].id
    }

    /// Indices of the keys that signed `index` (incoming relation).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn signed_by(&self, index: usize) -> &[usize] {
        &self.keys[index].signed_by
    }

    /// Indices of the keys that `index` signed (outgoing relation).
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    #[must_use]
    pub fn signed(&self, index: usize) -> &[usize] {
        &self.keys[index].signed
    }
}

impl Default for KeyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> KeyId {
        KeyId::new(0, n)
    }

    #[test]
    fn insert_assigns_dense_indices() {
        let mut g = KeyGraph::with_capacity(4);
        assert_eq!(g.insert_key(id(10)), Ok(0));
        assert_eq!(g.insert_key(id(20)), Ok(1));
        assert_eq!(g.insert_key(id(30)), Ok(2));
        assert_eq!(g.len(), 3);
        assert_eq!(g.key_id(1), id(20));
    }

    #[test]
    fn lookup_scans_in_insertion_order() {
        let mut g = KeyGraph::with_capacity(4);
        g.insert_key(id(10)).expect("capacity");
        g.insert_key(id(20)).expect("capacity");
        assert_eq!(g.lookup_index(id(20)), Some(1));
        assert_eq!(g.lookup_index(id(99)), None);
    }

    #[test]
    fn duplicate_identifier_resolves_to_first_insertion() {
        let mut g = KeyGraph::with_capacity(4);
        g.insert_key(id(10)).expect("capacity");
        g.insert_key(id(10)).expect("capacity");
        assert_eq!(g.lookup_index(id(10)), Some(0));
    }

    #[test]
    fn edge_lands_in_both_lists() {
        let mut g = KeyGraph::with_capacity(4);
        let a = g.insert_key(id(1)).expect("capacity");
        let b = g.insert_key(id(2)).expect("capacity");
        assert!(g.add_edge(Some(a), Some(b)));
        assert_eq!(g.signed_by(b), &[a]);
        assert_eq!(g.signed(a), &[b]);
        assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn parallel_edges_are_kept() {
        let mut g = KeyGraph::with_capacity(4);
        let a = g.insert_key(id(1)).expect("capacity");
        let b = g.insert_key(id(2)).expect("capacity");
        assert!(g.add_edge(Some(a), Some(b)));
        assert!(g.add_edge(Some(a), Some(b)));
        assert_eq!(g.signed_by(b), &[a, a]);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn unresolved_side_is_a_silent_no_op() {
        let mut g = KeyGraph::with_capacity(4);
        let a = g.insert_key(id(1)).expect("capacity");
        assert!(!g.add_edge(None, Some(a)));
        assert!(!g.add_edge(Some(a), None));
        assert!(!g.add_edge(None, None));
        assert_eq!(g.edge_count(), 0);
        assert!(g.signed_by(a).is_empty());
        assert!(g.signed(a).is_empty());
    }

    #[test]
    fn self_signature_is_not_filtered() {
        let mut g = KeyGraph::with_capacity(4);
        let a = g.insert_key(id(1)).expect("capacity");
        assert!(g.add_edge(Some(a), Some(a)));
        assert_eq!(g.signed_by(a), &[a]);
        assert_eq!(g.signed(a), &[a]);
    }

    #[test]
    fn insert_past_capacity_fails_hard() {
        let mut g = KeyGraph::with_capacity(2);
        g.insert_key(id(1)).expect("capacity");
        g.insert_key(id(2)).expect("capacity");
        assert_eq!(
            g.insert_key(id(3)),
            Err(GraphError::CapacityExceeded { capacity: 2 })
        );
        // The first two keys are untouched by the failed insert.
        assert_eq!(g.len(), 2);
        assert_eq!(g.key_id(0), id(1));
    }
}
