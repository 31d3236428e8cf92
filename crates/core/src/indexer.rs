use crate::cache::ExtractionCache;
use crate::error::{FetchError, IndexError};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::metadata;
use crate::models::{Document, Folder, SearchResult};
use crate::search::{normalize_whitespace, search_documents};
use crate::temporal;
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Walks one level of the configured root: every immediate subdirectory is
/// a folder, every `*.pdf` inside it a document. Each operation re-scans
/// the tree; the only state kept between calls is the content-addressed
/// extraction cache, which never changes observable results.
pub struct FolderIndexer<E = LopdfExtractor> {
    root: PathBuf,
    extractor: E,
    cache: ExtractionCache,
}

impl FolderIndexer<LopdfExtractor> {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_extractor(root, LopdfExtractor)
    }
}

impl<E: PdfExtractor + Sync> FolderIndexer<E> {
    pub fn with_extractor(root: impl Into<PathBuf>, extractor: E) -> Self {
        Self {
            root: root.into(),
            extractor,
            cache: ExtractionCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn ensure_root(&self) -> Result<(), IndexError> {
        if !self.root.exists() {
            return Err(IndexError::RootMissing(self.root.clone()));
        }
        if !self.root.is_dir() {
            return Err(IndexError::RootNotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// Folders ordered by name ascending; documents within a folder by
    /// byte-wise filename ascending. An unreadable subdirectory is skipped
    /// with a warning, a folder left empty by the cutoff is still listed,
    /// and only a missing root is fatal.
    pub fn list_folders(&self, cutoff: Option<DateTime<Utc>>) -> Result<Vec<Folder>, IndexError> {
        self.ensure_root()?;

        let mut folders = Vec::new();
        for entry in WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(%error, "skipping unreadable entry under root");
                    continue;
                }
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().into_owned();
            let documents = self.scan_folder(entry.path(), &name, cutoff);
            folders.push(Folder::new(name, documents));
        }

        Ok(folders)
    }

    /// Empty and whitespace-only queries return no results without touching
    /// the filesystem; everything else scans, filters, and ranks.
    pub fn search(
        &self,
        query: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        if normalize_whitespace(query).is_empty() {
            return Ok(Vec::new());
        }

        let folders = self.list_folders(cutoff)?;
        let documents: Vec<Document> = folders
            .into_iter()
            .flat_map(|folder| folder.documents)
            .collect();

        Ok(search_documents(&documents, query))
    }

    /// Serves raw bytes for a `folder`/`filename` pair. Both names must be
    /// a single normal path component, and the canonicalized target must
    /// stay under the canonicalized root (symlink escapes included).
    pub fn fetch_document_bytes(&self, folder: &str, filename: &str) -> Result<Vec<u8>, FetchError> {
        let path = self.resolve_document_path(folder, filename)?;
        fs::read(&path).map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => FetchError::NotFound {
                folder: folder.to_string(),
                filename: filename.to_string(),
            },
            _ => FetchError::Io(source),
        })
    }

    /// Metadata and extracted text for a single document, without scanning
    /// the rest of the tree.
    pub fn document_info(&self, folder: &str, filename: &str) -> Result<Document, FetchError> {
        let path = self.resolve_document_path(folder, filename)?;

        let meta = metadata::resolve(&path).map_err(|_| FetchError::NotFound {
            folder: folder.to_string(),
            filename: filename.to_string(),
        })?;
        let bytes = fs::read(&path)?;
        let pages = self.cache.get_or_extract(&bytes, &self.extractor);

        Ok(Document {
            filename: meta.filename,
            folder: folder.to_string(),
            size_bytes: meta.size_bytes,
            modified_at: meta.modified_at,
            path,
            pages,
        })
    }

    fn scan_folder(
        &self,
        dir: &Path,
        folder_name: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Vec<Document> {
        let mut pdf_paths = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    warn!(folder = folder_name, %error, "skipping unreadable entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && has_pdf_extension(entry.path()) {
                pdf_paths.push(entry.path().to_path_buf());
            }
        }

        // Per-file work is independent; `Folder::new` re-sorts afterwards,
        // so the parallelism never shows up in the output ordering.
        pdf_paths
            .par_iter()
            .filter_map(|path| self.build_document(path, folder_name, cutoff))
            .collect()
    }

    fn build_document(
        &self,
        path: &Path,
        folder_name: &str,
        cutoff: Option<DateTime<Utc>>,
    ) -> Option<Document> {
        let meta = match metadata::resolve(path) {
            Ok(meta) => meta,
            Err(error) => {
                warn!(path = %path.display(), %error, "skipping document");
                return None;
            }
        };

        if !temporal::include(cutoff, meta.modified_at) {
            return None;
        }

        let pages = match fs::read(path) {
            Ok(bytes) => self.cache.get_or_extract(&bytes, &self.extractor),
            Err(error) => {
                // Raced with an external delete; partial results win.
                warn!(path = %path.display(), %error, "skipping document");
                return None;
            }
        };

        Some(Document {
            filename: meta.filename,
            folder: folder_name.to_string(),
            size_bytes: meta.size_bytes,
            modified_at: meta.modified_at,
            path: path.to_path_buf(),
            pages,
        })
    }

    fn resolve_document_path(&self, folder: &str, filename: &str) -> Result<PathBuf, FetchError> {
        let rejected = || FetchError::TraversalRejected {
            folder: folder.to_string(),
            filename: filename.to_string(),
        };
        let missing = || FetchError::NotFound {
            folder: folder.to_string(),
            filename: filename.to_string(),
        };

        if !is_single_normal_component(folder) || !is_single_normal_component(filename) {
            warn!(folder, filename, "rejected path traversal attempt");
            return Err(rejected());
        }
        if !has_pdf_extension(Path::new(filename)) {
            return Err(FetchError::NotPdf {
                filename: filename.to_string(),
            });
        }

        let root = self.root.canonicalize().map_err(|_| missing())?;
        let resolved = root
            .join(folder)
            .join(filename)
            .canonicalize()
            .map_err(|_| missing())?;

        if !resolved.starts_with(&root) {
            warn!(folder, filename, "rejected path traversal attempt");
            return Err(rejected());
        }
        if !resolved.is_file() {
            return Err(missing());
        }

        Ok(resolved)
    }
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// True for names like `Q1.pdf`, false for anything with separators,
/// parent/current-dir segments, or an absolute prefix.
fn is_single_normal_component(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    let mut components = Path::new(value).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

#[cfg(test)]
mod tests {
    use super::FolderIndexer;
    use crate::error::{FetchError, IndexError};
    use crate::extractor::PdfExtractor;
    use crate::test_pdf::pdf_with_pages;
    use chrono::{DateTime, TimeZone, Utc};
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::SystemTime;
    use tempfile::tempdir;

    fn write_pdf(
        dir: &Path,
        filename: &str,
        pages: &[&str],
        modified_at: DateTime<Utc>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let path = dir.join(filename);
        fs::write(&path, pdf_with_pages(pages))?;
        let file = fs::OpenOptions::new().write(true).open(&path)?;
        file.set_modified(SystemTime::from(modified_at))?;
        Ok(())
    }

    fn reports_tree() -> Result<tempfile::TempDir, Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let financial = dir.path().join("financial_reports");
        fs::create_dir(&financial)?;

        write_pdf(
            &financial,
            "Q1.pdf",
            &["Revenue grew 10%"],
            Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
        )?;
        write_pdf(
            &financial,
            "Q2.pdf",
            &["Revenue declined"],
            Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        )?;
        Ok(dir)
    }

    #[test]
    fn cutoff_filters_folder_listing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let folders = indexer.list_folders(Some(cutoff))?;

        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "financial_reports");
        assert_eq!(folders[0].pdf_count, 1);
        assert_eq!(folders[0].documents[0].filename, "Q1.pdf");
        Ok(())
    }

    #[test]
    fn no_cutoff_lists_everything_in_filename_order(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        let folders = indexer.list_folders(None)?;

        assert_eq!(folders[0].pdf_count, 2);
        assert_eq!(folders[0].documents[0].filename, "Q1.pdf");
        assert_eq!(folders[0].documents[1].filename, "Q2.pdf");
        Ok(())
    }

    #[test]
    fn search_honors_cutoff_and_ranking() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());
        let cutoff = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

        let filtered = indexer.search("Revenue", Some(cutoff))?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].document.filename, "Q1.pdf");
        assert_eq!(filtered[0].match_count, 1);

        let unfiltered = indexer.search("Revenue", None)?;
        assert_eq!(unfiltered.len(), 2);
        assert_eq!(unfiltered[0].document.filename, "Q1.pdf");
        assert_eq!(unfiltered[1].document.filename, "Q2.pdf");
        assert!(unfiltered.iter().all(|result| result.match_count == 1));
        Ok(())
    }

    #[test]
    fn empty_folder_is_listed_with_zero_count() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("empty_folder"))?;
        let indexer = FolderIndexer::new(dir.path());

        let folders = indexer.list_folders(None)?;

        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].name, "empty_folder");
        assert_eq!(folders[0].pdf_count, 0);
        Ok(())
    }

    #[test]
    fn nested_subdirectories_and_non_pdfs_are_ignored(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let folder = dir.path().join("reports");
        let nested = folder.join("nested");
        fs::create_dir_all(&nested)?;

        write_pdf(
            &folder,
            "kept.pdf",
            &["content"],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )?;
        write_pdf(
            &folder,
            "UPPER.PDF",
            &["content"],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )?;
        write_pdf(
            &nested,
            "hidden.pdf",
            &["content"],
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )?;
        fs::write(folder.join("notes.txt"), b"not a pdf")?;

        let indexer = FolderIndexer::new(dir.path());
        let folders = indexer.list_folders(None)?;

        assert_eq!(folders.len(), 1);
        let filenames: Vec<&str> = folders[0]
            .documents
            .iter()
            .map(|document| document.filename.as_str())
            .collect();
        assert_eq!(filenames, vec!["UPPER.PDF", "kept.pdf"]);
        Ok(())
    }

    #[test]
    fn corrupt_pdf_is_listed_with_empty_text() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let folder = dir.path().join("reports");
        fs::create_dir(&folder)?;
        fs::write(folder.join("broken.pdf"), b"%PDF-1.4\n%broken")?;

        let indexer = FolderIndexer::new(dir.path());
        let folders = indexer.list_folders(None)?;

        assert_eq!(folders[0].pdf_count, 1);
        assert!(folders[0].documents[0].pages.is_empty());

        let results = indexer.search("anything", None)?;
        assert!(results.is_empty());
        Ok(())
    }

    #[test]
    fn listing_is_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        let first = indexer.list_folders(None)?;
        let second = indexer.list_folders(None)?;

        let shape = |folders: &[crate::models::Folder]| {
            folders
                .iter()
                .map(|folder| {
                    (
                        folder.name.clone(),
                        folder
                            .documents
                            .iter()
                            .map(|document| document.filename.clone())
                            .collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(shape(&first), shape(&second));
        Ok(())
    }

    #[test]
    fn missing_root_is_fatal() {
        let indexer = FolderIndexer::new("/nonexistent/reports/root");
        assert!(matches!(
            indexer.list_folders(None),
            Err(IndexError::RootMissing(_))
        ));
        assert!(matches!(
            indexer.search("revenue", None),
            Err(IndexError::RootMissing(_))
        ));
    }

    #[test]
    fn root_pointing_at_file_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let file = dir.path().join("not_a_dir");
        fs::write(&file, b"x")?;

        let indexer = FolderIndexer::new(&file);
        assert!(matches!(
            indexer.list_folders(None),
            Err(IndexError::RootNotADirectory(_))
        ));
        Ok(())
    }

    #[derive(Default)]
    struct CountingExtractor {
        calls: AtomicUsize,
    }

    impl PdfExtractor for CountingExtractor {
        fn extract_pages(&self, _bytes: &[u8]) -> Vec<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Vec::new()
        }
    }

    #[test]
    fn empty_query_performs_no_scan() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::with_extractor(dir.path(), CountingExtractor::default());

        assert!(indexer.search("", None)?.is_empty());
        assert!(indexer.search("   ", None)?.is_empty());
        assert_eq!(indexer.extractor.calls.load(Ordering::SeqCst), 0);

        indexer.search("revenue", None)?;
        assert!(indexer.extractor.calls.load(Ordering::SeqCst) > 0);
        Ok(())
    }

    #[test]
    fn fetch_returns_original_bytes() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        let bytes = indexer.fetch_document_bytes("financial_reports", "Q1.pdf")?;
        let on_disk = fs::read(dir.path().join("financial_reports").join("Q1.pdf"))?;
        assert_eq!(bytes, on_disk);
        Ok(())
    }

    #[test]
    fn fetch_rejects_traversal_attempts() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        assert!(matches!(
            indexer.fetch_document_bytes("..", "x.pdf"),
            Err(FetchError::TraversalRejected { .. })
        ));
        assert!(matches!(
            indexer.fetch_document_bytes("financial_reports", "../../etc/passwd"),
            Err(FetchError::TraversalRejected { .. })
        ));
        assert!(matches!(
            indexer.fetch_document_bytes("/etc", "passwd.pdf"),
            Err(FetchError::TraversalRejected { .. })
        ));
        Ok(())
    }

    #[test]
    fn fetch_distinguishes_missing_and_non_pdf() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        assert!(matches!(
            indexer.fetch_document_bytes("financial_reports", "Q9.pdf"),
            Err(FetchError::NotFound { .. })
        ));
        assert!(matches!(
            indexer.fetch_document_bytes("financial_reports", "notes.txt"),
            Err(FetchError::NotPdf { .. })
        ));
        Ok(())
    }

    #[test]
    fn document_info_resolves_single_document() -> Result<(), Box<dyn std::error::Error>> {
        let dir = reports_tree()?;
        let indexer = FolderIndexer::new(dir.path());

        let document = indexer.document_info("financial_reports", "Q1.pdf")?;

        assert_eq!(document.filename, "Q1.pdf");
        assert_eq!(document.folder, "financial_reports");
        assert_eq!(document.pages.len(), 1);
        assert!(document.pages[0].contains("Revenue grew 10%"));
        Ok(())
    }
}
