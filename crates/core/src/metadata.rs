use crate::error::IndexError;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub filename: String,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Resolves filesystem metadata for one entry. The modification time is
/// converted to tz-aware UTC here, before any cutoff comparison can happen.
/// A file that vanished between listing and stat surfaces as
/// `MetadataUnavailable`; the indexer skips it and continues.
pub fn resolve(path: &Path) -> Result<FileMetadata, IndexError> {
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| IndexError::MetadataUnavailable {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no usable file name",
            ),
        })?
        .to_string();

    let stat = fs::metadata(path).map_err(|source| IndexError::MetadataUnavailable {
        path: path.to_path_buf(),
        source,
    })?;
    let modified = stat
        .modified()
        .map_err(|source| IndexError::MetadataUnavailable {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(FileMetadata {
        filename,
        size_bytes: stat.len(),
        modified_at: DateTime::<Utc>::from(modified),
    })
}
