//! Reads already-chunked documents from `.jsonl` files.
//!
//! Each non-blank line is one JSON `Document` (`{"content": ..., "metadata": {...}}`).
//! Chunking and source-format parsing happen upstream; this only moves chunks
//! from disk into memory.

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::types::Document;

/// A line that could not be decoded as a `Document`.
#[derive(Debug, Clone)]
pub struct LineError {
    pub path: PathBuf,
    pub line: usize,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct LoadedDocuments {
    pub documents: Vec<Document>,
    pub errors: Vec<LineError>,
}

#[derive(Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self { Self }

    pub fn load_directory(&self, data_dir: &Path) -> Result<LoadedDocuments> {
        let files = self.list_jsonl_files(data_dir);
        if files.is_empty() {
            info!("No .jsonl files found under {}", data_dir.display());
            return Ok(LoadedDocuments::default());
        }
        let mut loaded = LoadedDocuments::default();
        for file_path in &files {
            self.load_file_into(file_path, &mut loaded)?;
        }
        info!("Loaded {} documents from {} files ({} bad lines)", loaded.documents.len(), files.len(), loaded.errors.len());
        Ok(loaded)
    }

    pub fn load_file(&self, file_path: &Path) -> Result<LoadedDocuments> {
        let mut loaded = LoadedDocuments::default();
        self.load_file_into(file_path, &mut loaded)?;
        Ok(loaded)
    }

    fn load_file_into(&self, file_path: &Path, loaded: &mut LoadedDocuments) -> Result<()> {
        let content = match fs::read_to_string(file_path) {
            Ok(content) => content,
            Err(_) => String::from_utf8_lossy(&fs::read(file_path)?).to_string(),
        };
        let source = file_path.to_string_lossy().to_string();
        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.trim().is_empty() { continue; }
            match serde_json::from_str::<Document>(line) {
                Ok(mut doc) => {
                    doc.metadata.entry("source".to_string()).or_insert_with(|| source.clone());
                    doc.metadata.entry("line".to_string()).or_insert_with(|| line_no.to_string());
                    loaded.documents.push(doc);
                }
                Err(e) => {
                    warn!("{}:{}: skipping malformed document: {}", file_path.display(), line_no, e);
                    loaded.errors.push(LineError { path: file_path.to_path_buf(), line: line_no, reason: e.to_string() });
                }
            }
        }
        Ok(())
    }

    fn list_jsonl_files(&self, root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(root).into_iter().filter_map(|e| e.ok()).filter(|e| e.file_type().is_file()) {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) == Some("jsonl") { files.push(path.to_path_buf()); }
        }
        files.sort();
        files
    }
}
