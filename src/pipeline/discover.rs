//! Candidate discovery: which input-directory entries get submitted.
//!
//! Only regular files whose extension is on [`SUPPORTED_EXTENSIONS`]
//! (compared case-insensitively) become candidates. Entries are returned in
//! lexicographic order of their names so every run walks the directory the
//! same way.

use crate::error::DispatchError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions the OCR service accepts, lower-case and without the dot.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// A file found in the input directory that will be submitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    /// File name exactly as stored on disk; artifact names are built from it.
    pub file_name: OsString,
    /// Display form of `file_name` (lossy for non-UTF-8 names), also sent as
    /// the multipart filename.
    pub name: String,
    /// Lower-cased extension, e.g. `pdf`.
    pub extension: String,
}

/// Result of listing the input directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Eligible files in processing order.
    pub candidates: Vec<CandidateFile>,
    /// Entries skipped because they are not regular files or have another extension.
    pub ignored: usize,
}

/// Lower-cased allow-listed extension of `path`, if any.
pub fn supported_extension(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS
        .contains(&ext.as_str())
        .then_some(ext)
}

/// List candidate files in `input_dir`.
///
/// The caller is expected to have checked that `input_dir` exists; a
/// missing directory is reported as [`DispatchError::InputDirUnreadable`].
/// Entries whose metadata cannot be read are skipped, not fatal.
pub async fn discover(input_dir: &Path) -> Result<Discovery, DispatchError> {
    let unreadable = |source| DispatchError::InputDirUnreadable {
        path: input_dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(input_dir).await.map_err(unreadable)?;
    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
        paths.push(entry.path());
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut discovery = Discovery::default();
    for path in paths {
        // `metadata` follows symlinks, so a link to a regular file counts.
        let is_file = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.is_file(),
            Err(e) => {
                debug!("Skipping {}: {}", path.display(), e);
                false
            }
        };
        if !is_file {
            debug!("Skipping non-file entry {}", path.display());
            discovery.ignored += 1;
            continue;
        }

        let Some(extension) = supported_extension(&path) else {
            debug!("Skipping unsupported file {}", path.display());
            discovery.ignored += 1;
            continue;
        };

        let Some(file_name) = path.file_name().map(|n| n.to_os_string()) else {
            discovery.ignored += 1;
            continue;
        };
        let name = file_name.to_string_lossy().into_owned();

        discovery.candidates.push(CandidateFile {
            path,
            file_name,
            name,
            extension,
        });
    }

    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert_eq!(supported_extension(Path::new("a.PDF")).as_deref(), Some("pdf"));
        assert_eq!(supported_extension(Path::new("b.Tiff")).as_deref(), Some("tiff"));
        assert_eq!(supported_extension(Path::new("c.jpeg")).as_deref(), Some("jpeg"));
        assert_eq!(supported_extension(Path::new("d.bmp")).as_deref(), Some("bmp"));
        assert_eq!(supported_extension(Path::new("notes.txt")), None);
        assert_eq!(supported_extension(Path::new("archive.pdf.zip")), None);
        assert_eq!(supported_extension(Path::new("README")), None);
        assert_eq!(supported_extension(Path::new(".pdf")), None);
    }

    #[tokio::test]
    async fn discover_sorts_and_filters() {
        let dir = TempDir::new().unwrap();
        for name in ["b.png", "a.pdf", "C.JPG", "notes.txt", "z.tif"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let found = discover(dir.path()).await.unwrap();
        let names: Vec<&str> = found.candidates.iter().map(|c| c.name.as_str()).collect();

        // Byte-wise ordering puts upper-case names first.
        assert_eq!(names, vec!["C.JPG", "a.pdf", "b.png", "z.tif"]);
        assert_eq!(found.candidates[0].extension, "jpg");
        assert_eq!(found.ignored, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn discover_keeps_raw_non_utf8_name() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let raw = std::ffi::OsStr::from_bytes(b"scan\xff.pdf");
        std::fs::write(dir.path().join(raw), b"x").unwrap();

        let found = discover(dir.path()).await.unwrap();
        assert_eq!(found.candidates.len(), 1);
        assert_eq!(found.candidates[0].file_name, raw);
        assert_eq!(found.candidates[0].name, "scan\u{FFFD}.pdf");
    }

    #[tokio::test]
    async fn discover_empty_dir() {
        let dir = TempDir::new().unwrap();
        let found = discover(dir.path()).await.unwrap();
        assert!(found.candidates.is_empty());
        assert_eq!(found.ignored, 0);
    }

    #[tokio::test]
    async fn discover_missing_dir_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover(&missing).await,
            Err(DispatchError::InputDirUnreadable { .. })
        ));
    }
}
