use crate::extractor::PdfExtractor;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Content-addressed cache sitting in front of a `PdfExtractor`. Keyed by
/// the sha256 of the file bytes: a rewritten file re-extracts, an untouched
/// one does not. Hits and misses are indistinguishable through the
/// extractor contract.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: Mutex<HashMap<String, Vec<String>>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn digest(bytes: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        format!("{:x}", hasher.finalize())
    }

    pub fn get_or_extract<E: PdfExtractor>(&self, bytes: &[u8], extractor: &E) -> Vec<String> {
        let checksum = Self::digest(bytes);

        {
            let entries = self
                .entries
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(pages) = entries.get(&checksum) {
                return pages.clone();
            }
        }

        let pages = extractor.extract_pages(bytes);

        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.entry(checksum).or_insert_with(|| pages.clone());
        pages
    }
}
