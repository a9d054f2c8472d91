use std::fs;

use ragstore_core::error::Error;
use ragstore_core::traits::Embedder;
use ragstore_core::types::{Collection, Document};
use ragstore_embed::HashEmbedder;
use ragstore_vector::{rebuild, search_text, snapshot, FlatL2Index};
use tempfile::TempDir;

/// Embeds to a fixed table: content "a:1,2" -> [1.0, 2.0]; "fail" errors.
struct TableEmbedder;

impl Embedder for TableEmbedder {
    fn dim(&self) -> usize { 2 }

    fn embed_text(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        if text.contains("fail") { anyhow::bail!("cannot embed '{text}'"); }
        let (_, nums) = text.split_once(':').ok_or_else(|| anyhow::anyhow!("no vector in '{text}'"))?;
        nums.split(',').map(|n| n.trim().parse::<f32>().map_err(Into::into)).collect()
    }
}

fn docs(items: &[&str]) -> Vec<Document> { items.iter().map(|s| Document::new(*s)).collect() }

#[test]
fn exact_search_orders_by_distance_then_position() {
    let index = FlatL2Index::from_vectors(vec![vec![0.0, 0.0], vec![3.0, 0.0], vec![1.0, 0.0], vec![-1.0, 0.0]], None).unwrap();
    let hits = index.search(&[0.0, 0.0], 3).unwrap();
    assert_eq!(hits, vec![(0, 0.0), (2, 1.0), (3, 1.0)]);
    assert_eq!(index.dimension(), Some(2));
    assert_eq!(index.vector(1), Some(&[3.0f32, 0.0][..]));
}

#[test]
fn query_of_wrong_length_is_a_dimension_mismatch() {
    let index = FlatL2Index::from_vectors(vec![vec![0.0, 0.0]], None).unwrap();
    assert!(matches!(index.search(&[0.0, 0.0, 0.0], 1), Err(Error::DimensionMismatch { expected: 2, actual: 3 })));
}

#[test]
fn rebuild_skips_failing_incoming_documents() {
    let existing = docs(&["a:0,0"]);
    let incoming = docs(&["b:1,1", "fail:2,2", "c:5,5"]);
    let rebuilt = rebuild(&existing, &incoming, &TableEmbedder, None).unwrap();
    assert_eq!(rebuilt.index.len(), 3);
    assert_eq!(rebuilt.kept, vec![0, 2]);
    assert_eq!(rebuilt.rejected.len(), 1);
    assert_eq!(rebuilt.rejected[0].0, 1);
    assert_eq!(rebuilt.index.vector(2), Some(&[5.0f32, 5.0][..]));
}

#[test]
fn rebuild_aborts_when_an_existing_document_fails() {
    let existing = docs(&["fail:0,0"]);
    let err = rebuild(&existing, &docs(&["b:1,1"]), &TableEmbedder, Some(2)).unwrap_err();
    assert!(matches!(err, Error::Embedding(_)));
}

#[test]
fn rebuild_enforces_established_dimension() {
    let err = rebuild(&docs(&["a:0,0"]), &docs(&["b:1,1,1"]), &TableEmbedder, Some(2)).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));

    // with no prior dimension the first vector sets it
    let err = rebuild(&[], &docs(&["a:0,0", "b:1,1,1"]), &TableEmbedder, None).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
}

#[test]
fn search_text_on_empty_index_skips_embedding() {
    // TableEmbedder would error on this query; an empty index never asks it
    let hits = search_text(&FlatL2Index::empty(), &TableEmbedder, "no vector here", 4).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn snapshot_round_trip_restores_dimension_and_rows() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("general");
    let embedder = HashEmbedder::new(16);
    let documents = docs(&["harbor dues schedule", "pilot boarding area", "cargo manifest rules"]);
    let rebuilt = rebuild(&[], &documents, &embedder, None).unwrap();

    snapshot::save(&dir, Collection::General, &documents, &rebuilt.index).unwrap();
    let restored = snapshot::load(&dir, Collection::General).unwrap().expect("snapshot present");

    assert_eq!(restored.documents, documents);
    assert_eq!(restored.index, rebuilt.index);
    assert_eq!(restored.index.dimension(), Some(16));
    let before = search_text(&rebuilt.index, &embedder, "pilot boarding", 2).unwrap();
    let after = search_text(&restored.index, &embedder, "pilot boarding", 2).unwrap();
    assert_eq!(before, after);
}

#[test]
fn loading_missing_snapshot_is_not_an_error() {
    let tmp = TempDir::new().unwrap();
    assert!(snapshot::load(&tmp.path().join("never-saved"), Collection::Domain).unwrap().is_none());
}

#[test]
fn inconsistent_snapshot_is_reported() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path();
    let documents = docs(&["a:0,0", "b:1,1"]);
    let rebuilt = rebuild(&[], &documents, &TableEmbedder, None).unwrap();
    snapshot::save(dir, Collection::Domain, &documents, &rebuilt.index).unwrap();

    fs::remove_file(dir.join(snapshot::DOCSTORE_FILE)).unwrap();
    assert!(matches!(snapshot::load(dir, Collection::Domain), Err(Error::CorruptSnapshot { .. })));

    fs::write(dir.join(snapshot::DOCSTORE_FILE), "{ not json").unwrap();
    assert!(matches!(snapshot::load(dir, Collection::Domain), Err(Error::CorruptSnapshot { .. })));
}

#[test]
fn saving_into_an_unwritable_location_fails_loudly() {
    let tmp = TempDir::new().unwrap();
    let blocker = tmp.path().join("file");
    fs::write(&blocker, "occupied").unwrap();
    let err = snapshot::save(&blocker.join("sub"), Collection::General, &[], &FlatL2Index::empty()).unwrap_err();
    assert!(matches!(err, Error::PersistenceUnavailable { .. }));
}
