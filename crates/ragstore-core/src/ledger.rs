//! Global record of ingested content hashes.

use std::collections::HashSet;

use crate::normalize::content_hash;
use crate::types::{ContentHash, Document};

/// Set of content hashes shared by both collections.
///
/// A hash is either committed (its document is published in some collection)
/// or pending (reserved by a batch that has not yet published or aborted).
/// Not synchronized; the engine serializes access behind a mutex.
#[derive(Debug, Default, Clone)]
pub struct DedupLedger {
    seen: HashSet<ContentHash>,
    pending: HashSet<ContentHash>,
}

impl DedupLedger {
    pub fn new() -> Self { Self::default() }

    /// Check-and-insert. Returns `false` (and leaves the ledger untouched) if
    /// the document's normalized content was already recorded.
    pub fn accept(&mut self, doc: &Document) -> bool { self.insert(content_hash(&doc.content)) }

    /// Record `hash` as committed. `false` if it already was.
    pub fn insert(&mut self, hash: ContentHash) -> bool { self.seen.insert(hash) }

    pub fn contains(&self, hash: &ContentHash) -> bool { self.seen.contains(hash) }

    /// Forget a committed hash, e.g. when its document leaves a collection.
    pub fn release(&mut self, hash: &ContentHash) -> bool { self.seen.remove(hash) }

    /// Reserve `hash` for an in-flight batch. `false` if it is committed or
    /// already reserved.
    pub fn reserve(&mut self, hash: ContentHash) -> bool {
        if self.seen.contains(&hash) || self.pending.contains(&hash) { return false; }
        self.pending.insert(hash)
    }

    pub fn is_pending(&self, hash: &ContentHash) -> bool { self.pending.contains(hash) }

    pub fn has_pending(&self) -> bool { !self.pending.is_empty() }

    /// Turn a reservation into a committed hash.
    pub fn commit(&mut self, hash: &ContentHash) {
        if let Some(hash) = self.pending.take(hash) { self.seen.insert(hash); }
    }

    /// Drop a reservation without committing it.
    pub fn abort(&mut self, hash: &ContentHash) -> bool { self.pending.remove(hash) }

    /// Number of committed hashes.
    pub fn len(&self) -> usize { self.seen.len() }

    pub fn is_empty(&self) -> bool { self.seen.is_empty() }

    pub fn clear(&mut self) {
        self.seen.clear();
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reservations_block_until_committed_or_aborted() {
        let mut ledger = DedupLedger::new();
        let h = content_hash("pilot boarding area");
        assert!(ledger.reserve(h.clone()));
        assert!(ledger.is_pending(&h));
        assert!(!ledger.reserve(h.clone()));
        assert!(!ledger.contains(&h));
        assert_eq!(ledger.len(), 0);

        assert!(ledger.abort(&h));
        assert!(ledger.reserve(h.clone()));
        ledger.commit(&h);
        assert!(!ledger.has_pending());
        assert!(ledger.contains(&h));
        assert!(!ledger.reserve(h));
    }
}
