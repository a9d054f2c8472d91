//! The two-collection retrieval engine.
//!
//! Each collection publishes an immutable `CollectionState` behind an
//! `RwLock<Arc<_>>`. Readers clone the `Arc` and search without holding any
//! lock; writers build the next state off to the side under the collection's
//! writer mutex and publish it with one pointer swap. Lock order is always
//! general writer, domain writer, ledger.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use ragstore_core::config::{expand_path, EngineConfig, KeywordConfig};
use ragstore_core::error::{Error, Result};
use ragstore_core::ledger::DedupLedger;
use ragstore_core::normalize::{content_hash, normalize};
use ragstore_core::traits::{Classifier, Embedder};
use ragstore_core::types::{Collection, ContentHash, Document, SearchHit};
use ragstore_text::KeywordIndex;
use ragstore_vector::{rebuild, search_text, snapshot, FlatL2Index};

use crate::classify::KeywordClassifier;
use crate::fusion::{fuse, Retriever};

#[derive(Clone)]
struct CollectionState {
    documents: Vec<Document>,
    keywords: KeywordIndex,
    /// `None` until the collection's dense index is first built or restored.
    dense: Option<FlatL2Index>,
}

impl CollectionState {
    fn uninitialized(keyword: &KeywordConfig) -> Self {
        Self { documents: Vec::new(), keywords: KeywordIndex::new(keyword.min_len, keyword.max_len), dense: None }
    }

    fn from_parts(documents: Vec<Document>, dense: FlatL2Index, keyword: &KeywordConfig) -> Self {
        let mut keywords = KeywordIndex::new(keyword.min_len, keyword.max_len);
        for (pos, doc) in documents.iter().enumerate() { keywords.index(pos, &doc.content); }
        Self { documents, keywords, dense: Some(dense) }
    }

    fn resolve(&self, hits: &[SearchHit]) -> Vec<Document> {
        hits.iter().filter_map(|h| self.documents.get(h.position).cloned()).collect()
    }
}

struct CollectionSlot {
    writer: Mutex<()>,
    published: RwLock<Arc<CollectionState>>,
}

impl CollectionSlot {
    fn new(keyword: &KeywordConfig) -> Self {
        Self { writer: Mutex::new(()), published: RwLock::new(Arc::new(CollectionState::uninitialized(keyword))) }
    }

    fn current(&self) -> Result<Arc<CollectionState>> { Ok(Arc::clone(&*self.published.read()?)) }

    fn publish(&self, state: CollectionState) -> Result<()> {
        *self.published.write()? = Arc::new(state);
        Ok(())
    }
}

/// Outcome of one `ingest` call.
#[derive(Debug)]
pub struct IngestReport {
    pub collection: Collection,
    pub accepted: usize,
    /// Documents whose content was already held by either collection.
    pub duplicates: usize,
    /// One `IngestionPartialFailure` per document that could not be indexed.
    pub skipped: Vec<Error>,
}

impl IngestReport {
    fn new(collection: Collection) -> Self { Self { collection, accepted: 0, duplicates: 0, skipped: Vec::new() } }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactReport {
    pub removed: usize,
    pub general: usize,
    pub domain: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionStats {
    pub collection: Collection,
    pub documents: usize,
    pub keywords: usize,
    pub dimension: Option<usize>,
    pub initialized: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStats {
    pub collections: Vec<CollectionStats>,
    pub ledger_size: usize,
}

pub struct Engine {
    config: EngineConfig,
    embedder: Box<dyn Embedder>,
    classifier: Box<dyn Classifier>,
    ledger: Mutex<DedupLedger>,
    /// Signalled whenever a batch commits or aborts its ledger reservations.
    settled: Condvar,
    general: CollectionSlot,
    domain: CollectionSlot,
}

impl Engine {
    /// An engine with both collections empty and uninitialized.
    pub fn new(config: EngineConfig, embedder: Box<dyn Embedder>) -> Self {
        let classifier = Box::new(KeywordClassifier::from_config(&config.classifier, &config.keyword));
        let general = CollectionSlot::new(&config.keyword);
        let domain = CollectionSlot::new(&config.keyword);
        Self { config, embedder, classifier, ledger: Mutex::new(DedupLedger::new()), settled: Condvar::new(), general, domain }
    }

    pub fn with_classifier(mut self, classifier: Box<dyn Classifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// `new`, then restore both collections from their configured storage
    /// directories. A directory with no snapshot yields an empty collection.
    pub fn open(config: EngineConfig, embedder: Box<dyn Embedder>) -> Result<Self> {
        let engine = Self::new(config, embedder);
        for collection in Collection::ALL {
            let dir = engine.storage_dir(collection);
            engine.restore(collection, &dir)?;
        }
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig { &self.config }

    pub fn storage_dir(&self, collection: Collection) -> PathBuf {
        match collection {
            Collection::General => expand_path(&self.config.storage.general_dir),
            Collection::Domain => expand_path(&self.config.storage.domain_dir),
        }
    }

    fn slot(&self, collection: Collection) -> &CollectionSlot {
        match collection {
            Collection::General => &self.general,
            Collection::Domain => &self.domain,
        }
    }

    pub fn classify(&self, text: &str) -> Collection { self.classifier.classify(text) }

    /// Add a batch to `collection`.
    ///
    /// Content is normalized and checked against the global ledger; duplicates
    /// are counted and dropped. The collection is then re-embedded in full and
    /// published atomically. A dimension mismatch or a failure re-embedding
    /// already-indexed documents aborts the batch with nothing committed.
    ///
    /// When another batch holds an uncommitted reservation on one of this
    /// batch's hashes, the call waits for that batch to publish or abort before
    /// deciding what is a duplicate.
    pub fn ingest(&self, documents: Vec<Document>, collection: Collection) -> Result<IngestReport> {
        let slot = self.slot(collection);
        let _writer = slot.writer.lock()?;
        let current = slot.current()?;
        let mut report = IngestReport::new(collection);
        let batch_len = documents.len();

        let mut candidates: Vec<(usize, Document, ContentHash)> = Vec::with_capacity(batch_len);
        for (batch_index, mut doc) in documents.into_iter().enumerate() {
            doc.content = normalize(&doc.content);
            if doc.content.is_empty() {
                report.skipped.push(Error::IngestionPartialFailure { batch_index, reason: "empty content".into() });
                continue;
            }
            let hash = content_hash(&doc.content);
            candidates.push((batch_index, doc, hash));
        }

        let mut reserved = Vec::with_capacity(candidates.len());
        {
            let ledger = self.ledger.lock()?;
            // reserve all or nothing, so a waiting batch never holds reservations
            let mut ledger = self
                .settled
                .wait_while(ledger, |l| candidates.iter().any(|(_, _, hash)| l.is_pending(hash)))?;
            for (batch_index, doc, hash) in candidates {
                if ledger.reserve(hash.clone()) {
                    reserved.push((batch_index, doc, hash));
                } else {
                    debug!("Skipping duplicate document {} ({})", batch_index, hash);
                    report.duplicates += 1;
                }
            }
        }
        if reserved.is_empty() {
            info!("Ingest into {}: nothing new in batch of {} ({} duplicates)", collection, batch_len, report.duplicates);
            return Ok(report);
        }

        let start = Instant::now();
        let incoming: Vec<Document> = reserved.iter().map(|(_, doc, _)| doc.clone()).collect();
        let expected_dim = current.dense.as_ref().and_then(FlatL2Index::dimension);
        let rebuilt = match rebuild(&current.documents, &incoming, self.embedder.as_ref(), expected_dim) {
            Ok(rebuilt) => rebuilt,
            Err(e) => {
                warn!("Ingest into {} aborted: {}", collection, e);
                self.settle(&[], reserved.iter().map(|(_, _, hash)| hash))?;
                return Err(e);
            }
        };

        for (offset, reason) in &rebuilt.rejected {
            report.skipped.push(Error::IngestionPartialFailure { batch_index: reserved[*offset].0, reason: reason.clone() });
        }

        let mut next = CollectionState::clone(&current);
        for offset in &rebuilt.kept {
            let doc = &reserved[*offset].1;
            let pos = next.documents.len();
            next.keywords.index(pos, &doc.content);
            next.documents.push(doc.clone());
        }
        next.dense = Some(rebuilt.index);
        report.accepted = rebuilt.kept.len();
        let total = next.documents.len();
        let committed: Vec<&ContentHash> = rebuilt.kept.iter().map(|offset| &reserved[*offset].2).collect();
        let publish = slot.publish(next);
        match publish {
            Ok(()) => self.settle(&committed, rebuilt.rejected.iter().map(|(offset, _)| &reserved[*offset].2))?,
            Err(e) => {
                self.settle(&[], reserved.iter().map(|(_, _, hash)| hash))?;
                return Err(e);
            }
        }

        info!(
            "Ingest into {}: {} accepted, {} duplicates, {} skipped; {} documents indexed in {:?}",
            collection,
            report.accepted,
            report.duplicates,
            report.skipped.len(),
            total,
            start.elapsed()
        );
        Ok(report)
    }

    /// Resolve a batch's reservations and wake batches waiting on them.
    fn settle<'a>(&self, committed: &[&ContentHash], aborted: impl Iterator<Item = &'a ContentHash>) -> Result<()> {
        {
            let mut ledger = self.ledger.lock()?;
            for hash in committed { ledger.commit(hash); }
            for hash in aborted { ledger.abort(hash); }
        }
        self.settled.notify_all();
        Ok(())
    }

    /// Up to `k` documents for `text`, searching `collection` first.
    ///
    /// With fusion on, the order of precedence is primary dense (top `2k`),
    /// primary keyword (top `k`), then the other collection's dense and
    /// keyword hits when the primary alone yields fewer than `k` distinct
    /// documents. Duplicates by content hash keep their first occurrence.
    ///
    /// With fusion off, keyword hits are returned when there are any and dense
    /// hits otherwise; the other collection is not consulted.
    pub fn query(&self, text: &str, collection: Collection, k: usize, use_fusion: bool) -> Result<Vec<Document>> {
        if k == 0 { return Ok(Vec::new()); }
        let primary = self.slot(collection).current()?;

        if !use_fusion {
            let keyword = primary.keywords.search(text, k);
            let hits = if keyword.is_empty() { self.dense_hits(&primary, text, k)? } else { keyword };
            return Ok(primary.resolve(&hits));
        }

        let mut sources = vec![
            primary.resolve(&self.dense_hits(&primary, text, k.saturating_mul(2))?),
            primary.resolve(&primary.keywords.search(text, k)),
        ];
        let from_primary = fuse(&sources, k);
        if from_primary.len() >= k { return Ok(from_primary); }

        debug!("Primary {} gave {} of {}; consulting {}", collection, from_primary.len(), k, collection.other());
        let secondary = self.slot(collection.other()).current()?;
        sources.push(secondary.resolve(&self.dense_hits(&secondary, text, k.saturating_mul(2))?));
        sources.push(secondary.resolve(&secondary.keywords.search(text, k)));
        Ok(fuse(&sources, k))
    }

    /// Dense hits, or none for a collection that was never initialized.
    fn dense_hits(&self, state: &CollectionState, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        match &state.dense {
            Some(index) => search_text(index, self.embedder.as_ref(), text, k),
            None => Ok(Vec::new()),
        }
    }

    /// Raw dense search over one collection.
    pub fn search_dense(&self, collection: Collection, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let state = self.slot(collection).current()?;
        let index = state.dense.as_ref().ok_or(Error::NotInitialized(collection))?;
        search_text(index, self.embedder.as_ref(), text, k)
    }

    /// Raw keyword search over one collection.
    pub fn search_keyword(&self, collection: Collection, text: &str, k: usize) -> Result<Vec<SearchHit>> {
        let state = self.slot(collection).current()?;
        if state.dense.is_none() { return Err(Error::NotInitialized(collection)); }
        Ok(state.keywords.search(text, k))
    }

    /// Documents of `collection` in position order.
    pub fn documents(&self, collection: Collection) -> Result<Vec<Document>> {
        Ok(self.slot(collection).current()?.documents.clone())
    }

    /// Drop documents whose normalized content repeats an earlier one, scanning
    /// general then domain, and rebuild both collections and the ledger.
    ///
    /// Either both collections are republished or, on error, neither is.
    pub fn compact(&self) -> Result<CompactReport> {
        let _general = self.general.writer.lock()?;
        let _domain = self.domain.writer.lock()?;
        let start = Instant::now();

        let mut ledger = DedupLedger::new();
        let mut report = CompactReport::default();
        let mut next = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let state = self.slot(collection).current()?;
            let mut survivors = Vec::with_capacity(state.documents.len());
            for doc in state.documents.iter() {
                let content = normalize(&doc.content);
                if content.is_empty() || !ledger.insert(content_hash(&content)) {
                    report.removed += 1;
                    continue;
                }
                survivors.push(Document { content, metadata: doc.metadata.clone() });
            }
            let expected_dim = state.dense.as_ref().and_then(FlatL2Index::dimension);
            let rebuilt = rebuild(&survivors, &[], self.embedder.as_ref(), expected_dim)?;
            match collection {
                Collection::General => report.general = survivors.len(),
                Collection::Domain => report.domain = survivors.len(),
            }
            let state = if state.dense.is_none() && survivors.is_empty() {
                CollectionState::uninitialized(&self.config.keyword)
            } else {
                CollectionState::from_parts(survivors, rebuilt.index, &self.config.keyword)
            };
            next.push((collection, state));
        }

        let mut held = self.ledger.lock()?;
        for (collection, state) in next { self.slot(collection).publish(state)?; }
        *held = ledger;
        info!(
            "Compaction removed {} documents in {:?} (general {}, domain {})",
            report.removed,
            start.elapsed(),
            report.general,
            report.domain
        );
        Ok(report)
    }

    /// Write `collection` to `dir` as a snapshot.
    pub fn persist(&self, collection: Collection, dir: &Path) -> Result<()> {
        let state = self.slot(collection).current()?;
        let empty = FlatL2Index::empty();
        snapshot::save(dir, collection, &state.documents, state.dense.as_ref().unwrap_or(&empty))
    }

    /// Replace `collection` with the snapshot stored at `dir`; returns the
    /// number of documents loaded. A missing snapshot leaves the collection
    /// initialized and empty.
    pub fn restore(&self, collection: Collection, dir: &Path) -> Result<usize> {
        let slot = self.slot(collection);
        let _writer = slot.writer.lock()?;
        let next = match snapshot::load(dir, collection)? {
            Some(loaded) => CollectionState::from_parts(loaded.documents, loaded.index, &self.config.keyword),
            None => CollectionState::from_parts(Vec::new(), FlatL2Index::empty(), &self.config.keyword),
        };
        let current = slot.current()?;
        {
            let mut ledger = self.ledger.lock()?;
            for doc in &current.documents { ledger.release(&content_hash(&doc.content)); }
            for doc in &next.documents {
                let hash = content_hash(&doc.content);
                let in_flight = ledger.is_pending(&hash);
                if !ledger.insert(hash) || in_flight {
                    warn!("Restored {} document repeats content already held; run compact to drop it", collection);
                }
            }
        }
        let count = next.documents.len();
        slot.publish(next)?;
        Ok(count)
    }

    /// Persist both collections to their configured directories and drop the engine.
    pub fn shutdown(self) -> Result<()> {
        for collection in Collection::ALL {
            let dir = self.storage_dir(collection);
            self.persist(collection, &dir)?;
        }
        info!("Engine shut down");
        Ok(())
    }

    pub fn stats(&self) -> Result<EngineStats> {
        let mut collections = Vec::with_capacity(Collection::ALL.len());
        for collection in Collection::ALL {
            let state = self.slot(collection).current()?;
            collections.push(CollectionStats {
                collection,
                documents: state.documents.len(),
                keywords: state.keywords.keyword_count(),
                dimension: state.dense.as_ref().and_then(FlatL2Index::dimension),
                initialized: state.dense.is_some(),
            });
        }
        let ledger_size = self.ledger.lock()?.len();
        Ok(EngineStats { collections, ledger_size })
    }
}

/// Routes each query with the engine's classifier and the configured fusion setting.
impl Retriever for Engine {
    fn search(&self, text: &str, k: usize) -> Result<Vec<Document>> {
        let collection = self.classify(text);
        self.query(text, collection, k, self.config.search.use_fusion)
    }
}

/// A retriever pinned to one collection.
pub struct CollectionRetriever<'a> {
    engine: &'a Engine,
    collection: Collection,
    use_fusion: bool,
}

impl<'a> CollectionRetriever<'a> {
    pub fn new(engine: &'a Engine, collection: Collection) -> Self {
        Self { engine, collection, use_fusion: engine.config.search.use_fusion }
    }

    pub fn with_fusion(mut self, use_fusion: bool) -> Self {
        self.use_fusion = use_fusion;
        self
    }
}

impl Retriever for CollectionRetriever<'_> {
    fn search(&self, text: &str, k: usize) -> Result<Vec<Document>> {
        self.engine.query(text, self.collection, k, self.use_fusion)
    }
}
