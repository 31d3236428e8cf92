use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One PDF discovered during a scan. Built fresh on every request and
/// dropped when the request finishes; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    pub filename: String,
    pub folder: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    /// Resolved absolute location, used only to read bytes. Never serialized:
    /// the boundary exposes documents by folder + filename alone.
    #[serde(skip)]
    pub path: PathBuf,
    /// Per-page extracted text; empty vector when extraction failed, one
    /// empty string per page for image-only PDFs.
    #[serde(skip)]
    pub pages: Vec<String>,
}

/// One immediate subdirectory of the root. A folder that ends up empty
/// after filtering is still listed so callers can tell "empty" from
/// "nonexistent".
#[derive(Debug, Clone, Serialize)]
pub struct Folder {
    pub name: String,
    pub pdf_count: usize,
    pub documents: Vec<Document>,
}

impl Folder {
    /// Documents are ordered by byte-wise filename ascending.
    pub fn new(name: String, mut documents: Vec<Document>) -> Self {
        documents.sort_by(|left, right| left.filename.cmp(&right.filename));
        Self {
            name,
            pdf_count: documents.len(),
            documents,
        }
    }
}

/// Identity of a document within the archive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey {
    pub folder: String,
    pub filename: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub document: DocumentKey,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
    /// Human-readable "label: snippet" entries, one per occurrence
    /// ("Filename: ..." at most once, "Page N: ..." per content hit).
    pub matches: Vec<String>,
    pub match_count: usize,
}

/// Request parameters validated once at the boundary before entering the
/// core. An absent cutoff means "no filtering", not "now".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    pub query: Option<String>,
    pub cutoff: Option<DateTime<Utc>>,
}
