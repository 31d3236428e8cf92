pub mod cache;
pub mod error;
pub mod extractor;
pub mod indexer;
pub mod metadata;
pub mod models;
pub mod search;
pub mod temporal;

#[cfg(test)]
pub(crate) mod test_pdf;

pub use cache::ExtractionCache;
pub use error::{FetchError, IndexError};
pub use extractor::{extract_page_texts, LopdfExtractor, PdfExtractor};
pub use indexer::FolderIndexer;
pub use metadata::FileMetadata;
pub use models::{Document, DocumentKey, Folder, ScanRequest, SearchResult};
pub use search::{normalize_whitespace, search_documents, SNIPPET_CONTEXT_CHARS};
