//! Artifact persistence: turn an [`OcrResult`] into exactly one output file.
//!
//! | Result | Artifact |
//! |--------|----------|
//! | `Binary(bytes)` | `<name>.processed.pdf`, bytes verbatim |
//! | `Structured(value)` | `<name>.json`, UTF-8, 2-space indent |
//!
//! `serde_json` never escapes non-ASCII characters, so text such as `Größe`
//! lands in the file as written. Object keys keep the order the service sent
//! them in and numbers keep their exact digits (`preserve_order` and
//! `arbitrary_precision`).
//!
//! Artifact names are built from the raw on-disk file name, so a name that
//! is not valid UTF-8 still maps byte-for-byte onto its artifact.
//!
//! Writes go to `<artifact>.tmp` first and are renamed into place, so a
//! process killed mid-write leaves a `.tmp` behind rather than a truncated
//! artifact.

use crate::client::OcrResult;
use crate::error::FileError;
use crate::output::{ArtifactKind, OutputArtifact};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Output path for the input file named `file_name`.
pub fn artifact_path(output_dir: &Path, file_name: &OsStr, kind: ArtifactKind) -> PathBuf {
    let mut artifact = OsString::from(file_name);
    artifact.push(kind.suffix());
    output_dir.join(artifact)
}

/// Serialise `result` into the bytes stored on disk.
pub fn render(name: &str, result: &OcrResult) -> Result<Vec<u8>, FileError> {
    match result {
        OcrResult::Binary(bytes) => Ok(bytes.clone()),
        OcrResult::Structured(value) => {
            serde_json::to_vec_pretty(value).map_err(|source| FileError::EncodeFailed {
                file: name.to_string(),
                source,
            })
        }
    }
}

/// Write the artifact for the input `file_name` into `output_dir`.
///
/// An existing artifact of the same name is replaced.
pub async fn write_artifact(
    output_dir: &Path,
    file_name: &OsStr,
    result: &OcrResult,
) -> Result<OutputArtifact, FileError> {
    let kind = result.kind();
    let path = artifact_path(output_dir, file_name, kind);
    let bytes = render(&file_name.to_string_lossy(), result)?;

    let mut tmp_name = path.clone().into_os_string();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let write_failed = |source| FileError::WriteFailed {
        path: path.clone(),
        source,
    };

    tokio::fs::write(&tmp_path, &bytes)
        .await
        .map_err(write_failed)?;

    if let Err(e) = tokio::fs::rename(&tmp_path, &path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_failed(e));
    }

    debug!("Wrote {} bytes to {}", bytes.len(), path.display());

    Ok(OutputArtifact {
        path,
        kind,
        bytes_written: bytes.len() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn artifact_names_keep_original_extension() {
        let out = Path::new("/data/out");
        assert_eq!(
            artifact_path(out, OsStr::new("scan1.pdf"), ArtifactKind::Json),
            PathBuf::from("/data/out/scan1.pdf.json")
        );
        assert_eq!(
            artifact_path(out, OsStr::new("scan2.png"), ArtifactKind::ProcessedPdf),
            PathBuf::from("/data/out/scan2.png.processed.pdf")
        );
    }

    #[test]
    fn json_render_is_indented_and_keeps_non_ascii() {
        let bytes = render("r.pdf", &OcrResult::Structured(json!({"text": "Größe 東京"}))).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("Größe 東京"), "got: {text}");
        assert!(text.contains("\n  \"text\""), "got: {text}");
    }

    #[test]
    fn json_render_keeps_key_order_and_big_integers() {
        let body = br#"{"text":"hello","confidence":0.9,"pages":2,"id":123456789012345678901234567890}"#;
        let result = crate::client::classify_response("application/json", body).unwrap();
        let text = String::from_utf8(render("r.pdf", &result).unwrap()).unwrap();

        let at = |key: &str| text.find(key).unwrap_or_else(|| panic!("{key} missing: {text}"));
        assert!(at("\"text\"") < at("\"confidence\""), "got: {text}");
        assert!(at("\"confidence\"") < at("\"pages\""), "got: {text}");
        assert!(at("\"pages\"") < at("\"id\""), "got: {text}");
        assert!(
            text.contains("\"id\": 123456789012345678901234567890"),
            "got: {text}"
        );

        let OcrResult::Structured(original) = result else {
            panic!("expected structured result");
        };
        let back: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(back, original);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn artifact_name_keeps_non_utf8_bytes() {
        use std::os::unix::ffi::OsStrExt;

        let dir = TempDir::new().unwrap();
        let raw = OsStr::from_bytes(b"scan\xff.pdf");
        let artifact = write_artifact(dir.path(), raw, &OcrResult::Binary(vec![7]))
            .await
            .unwrap();

        assert_eq!(
            artifact.path.file_name().unwrap().as_bytes(),
            b"scan\xff.pdf.processed.pdf"
        );
        assert_eq!(std::fs::read(&artifact.path).unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn writes_binary_verbatim() {
        let dir = TempDir::new().unwrap();
        let payload = vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff];
        let artifact = write_artifact(dir.path(), OsStr::new("scan2.png"), &OcrResult::Binary(payload.clone()))
            .await
            .unwrap();

        assert_eq!(artifact.kind, ArtifactKind::ProcessedPdf);
        assert_eq!(artifact.bytes_written, payload.len() as u64);
        assert_eq!(std::fs::read(&artifact.path).unwrap(), payload);
        assert!(!dir.path().join("scan2.png.processed.pdf.tmp").exists());
    }

    #[tokio::test]
    async fn writes_json_that_parses_back() {
        let dir = TempDir::new().unwrap();
        let value = json!({"text": "hello"});
        let artifact = write_artifact(dir.path(), OsStr::new("scan1.pdf"), &OcrResult::Structured(value.clone()))
            .await
            .unwrap();

        assert_eq!(artifact.path, dir.path().join("scan1.pdf.json"));
        let back: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&artifact.path).unwrap()).unwrap();
        assert_eq!(back, value);
    }

    #[tokio::test]
    async fn missing_output_dir_is_write_failure() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let err = write_artifact(&missing, OsStr::new("a.pdf"), &OcrResult::Binary(vec![1]))
            .await
            .unwrap_err();
        assert!(matches!(err, FileError::WriteFailed { .. }));
    }
}
