//! On-disk snapshot of one collection.
//!
//! A snapshot directory holds two JSON files:
//! - `index.json`: the flat index (dimension + row-major vectors)
//! - `docstore.json`: the documents in position order
//!
//! Row `i` of the index belongs to document `i`. Each file is written to a
//! temp file in the same directory and renamed into place.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use ragstore_core::error::{Error, Result};
use ragstore_core::types::{Collection, Document};

use crate::flat::FlatL2Index;

pub const INDEX_FILE: &str = "index.json";
pub const DOCSTORE_FILE: &str = "docstore.json";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    format_version: u32,
    dimension: Option<usize>,
    count: usize,
    data: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct DocstoreFile {
    format_version: u32,
    collection: Collection,
    saved_at: String,
    documents: Vec<Document>,
}

/// Documents and their dense index as restored from disk.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot {
    pub documents: Vec<Document>,
    pub index: FlatL2Index,
}

pub fn save(dir: &Path, collection: Collection, documents: &[Document], index: &FlatL2Index) -> Result<()> {
    if index.len() != documents.len() {
        return Err(Error::corrupt(dir, format!("refusing to save {} rows for {} documents", index.len(), documents.len())));
    }
    fs::create_dir_all(dir).map_err(|e| Error::persistence(dir, e))?;
    let index_file = IndexFile { format_version: FORMAT_VERSION, dimension: index.dimension(), count: index.len(), data: index.raw().to_vec() };
    write_atomic(&dir.join(INDEX_FILE), &index_file)?;
    let docstore = DocstoreFile {
        format_version: FORMAT_VERSION,
        collection,
        saved_at: chrono::Utc::now().to_rfc3339(),
        documents: documents.to_vec(),
    };
    write_atomic(&dir.join(DOCSTORE_FILE), &docstore)?;
    info!("Saved {} collection ({} documents) to {}", collection, documents.len(), dir.display());
    Ok(())
}

/// `Ok(None)` when there is nothing stored at `dir` yet.
pub fn load(dir: &Path, collection: Collection) -> Result<Option<CollectionSnapshot>> {
    let index_path = dir.join(INDEX_FILE);
    let docstore_path = dir.join(DOCSTORE_FILE);
    match (index_path.exists(), docstore_path.exists()) {
        (false, false) => {
            if dir.exists() && !dir.is_dir() {
                return Err(Error::persistence(dir, std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory")));
            }
            info!("No snapshot at {}; starting {} collection empty", dir.display(), collection);
            return Ok(None);
        }
        (true, false) => return Err(Error::corrupt(dir, format!("{INDEX_FILE} present without {DOCSTORE_FILE}"))),
        (false, true) => return Err(Error::corrupt(dir, format!("{DOCSTORE_FILE} present without {INDEX_FILE}"))),
        (true, true) => {}
    }
    let index_file: IndexFile = read_json(&index_path)?;
    let docstore: DocstoreFile = read_json(&docstore_path)?;
    if index_file.format_version != FORMAT_VERSION || docstore.format_version != FORMAT_VERSION {
        return Err(Error::corrupt(dir, format!("unsupported format version (expected {FORMAT_VERSION})")));
    }
    if docstore.collection != collection {
        warn!("Snapshot at {} was saved from the {} collection; restoring into {}", dir.display(), docstore.collection, collection);
    }
    let index = FlatL2Index::from_parts(index_file.dimension, index_file.data)
        .ok_or_else(|| Error::corrupt(&index_path, "vector buffer does not match dimension"))?;
    if index.len() != index_file.count || index.len() != docstore.documents.len() {
        return Err(Error::corrupt(dir, format!("{} rows for {} documents", index.len(), docstore.documents.len())));
    }
    info!("Loaded {} collection ({} documents, dim {:?}) from {}", collection, docstore.documents.len(), index.dimension(), dir.display());
    Ok(Some(CollectionSnapshot { documents: docstore.documents, index }))
}

fn write_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::persistence(&dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file());
        serde_json::to_writer(&mut writer, value).map_err(|e| Error::persistence(path, e.into()))?;
        writer.flush().map_err(|e| Error::persistence(path, e))?;
    }
    tmp.persist(path).map_err(|e| Error::persistence(path, e.error))?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path).map_err(|e| Error::persistence(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::corrupt(path, e.to_string()))
}
