//! Load documents from `.json` / `.jsonl` files or directories of them.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::Document;

/// Load every document under `path`.
///
/// - `*.json`: a single object or an array of objects
/// - `*.jsonl`: one object per line, blank lines skipped
/// - directory: all `.json`/`.jsonl` files beneath it, in path order
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    if path.is_dir() {
        let files = list_document_files(path);
        if files.is_empty() {
            info!(dir = %path.display(), "no .json or .jsonl files found");
            return Ok(vec![]);
        }
        let mut all = Vec::new();
        for (file_index, file) in files.iter().enumerate() {
            debug!(file = %file.display(), "loading file {}/{}", file_index + 1, files.len());
            all.extend(load_file(file)?);
        }
        info!(files = files.len(), documents = all.len(), "loaded documents");
        return Ok(all);
    }
    load_file(path)
}

fn load_file(path: &Path) -> Result<Vec<Document>> {
    let content = fs::read_to_string(path)?;
    match extension(path) {
        Some("jsonl") => parse_jsonl(&content),
        Some("json") => parse_json(&content),
        _ => Err(Error::InvalidConfig(format!("unsupported document file: {}", path.display()))),
    }
}

/// Parse a JSON document or array of documents.
pub fn parse_json(content: &str) -> Result<Vec<Document>> {
    match serde_json::from_str::<serde_json::Value>(content)? {
        serde_json::Value::Array(items) => items.into_iter().map(Document::try_from).collect(),
        value => Ok(vec![Document::try_from(value)?]),
    }
}

/// Parse newline-delimited JSON documents.
pub fn parse_jsonl(content: &str) -> Result<Vec<Document>> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Document::try_from(serde_json::from_str::<serde_json::Value>(line)?))
        .collect()
}

fn extension(path: &Path) -> Option<&str> { path.extension().and_then(|s| s.to_str()) }

fn list_document_files(root: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| matches!(extension(p), Some("json" | "jsonl")))
        .collect();
    files.sort();
    files
}
