//! ZIP intake: structural validation and sanitized extraction.
//!
//! Everything here works against an in-memory buffer; nothing touches the
//! filesystem. Decompressed sizes are measured by actually inflating each
//! entry (bounded at the cap plus one byte) rather than trusting the sizes
//! recorded in the central directory.

use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{self, Cursor, Read};
use zip::ZipArchive;

/// Largest decompressed size accepted for a single entry (50 MiB)
pub const MAX_ENTRY_SIZE: u64 = 50 * 1024 * 1024;

/// Largest decompressed size accepted for the whole archive (200 MiB)
pub const MAX_TOTAL_SIZE: u64 = 200 * 1024 * 1024;

/// Names that mark an archive as a servable site or app root.
/// Matched case-insensitively anywhere in the entry path.
pub const ENTRY_POINTS: [&str; 4] = ["index.html", "index.htm", "index.js", "package.json"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArchiveError {
    #[error("Invalid ZIP file format")]
    Format,

    #[error("Suspicious file path detected")]
    SuspiciousPath,

    #[error("ZIP file must contain at least one index file (index.html, index.htm, index.js, or package.json)")]
    MissingEntryPoint,

    #[error("Individual file too large")]
    EntryTooLarge,

    #[error("Total uncompressed size too large")]
    TotalSizeExceeded,

    #[error("Archive contains entries that collide after name sanitization: {0}")]
    NameCollision(String),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(e: zip::result::ZipError) -> Self {
        tracing::debug!("ZIP decode failure: {}", e);
        ArchiveError::Format
    }
}

impl From<io::Error> for ArchiveError {
    fn from(e: io::Error) -> Self {
        tracing::debug!("ZIP read failure: {}", e);
        ArchiveError::Format
    }
}

/// Size ceilings applied while inflating entries
#[derive(Debug, Clone, Copy)]
pub struct ArchiveLimits {
    pub max_entry_size: u64,
    pub max_total_size: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entry_size: MAX_ENTRY_SIZE,
            max_total_size: MAX_TOTAL_SIZE,
        }
    }
}

/// One entry of the archive's central directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub is_directory: bool,
    pub decompressed_size: u64,
}

/// Outcome of validating an uploaded archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl ValidationResult {
    fn accepted(files: Vec<String>) -> Self {
        Self {
            valid: true,
            error: None,
            files: Some(files),
        }
    }

    fn rejected(err: &ArchiveError) -> Self {
        Self {
            valid: false,
            error: Some(err.to_string()),
            files: None,
        }
    }
}

/// Archive validation and extraction
pub struct ArchiveService;

impl ArchiveService {
    /// Validate an archive with the default limits
    pub fn validate(buffer: &[u8]) -> ValidationResult {
        Self::validate_with(buffer, &ArchiveLimits::default())
    }

    pub fn validate_with(buffer: &[u8], limits: &ArchiveLimits) -> ValidationResult {
        match Self::inspect(buffer, limits) {
            Ok(entries) => {
                ValidationResult::accepted(entries.into_iter().map(|e| e.path).collect())
            }
            Err(e) => ValidationResult::rejected(&e),
        }
    }

    /// Run the validation checks in order, stopping at the first failure.
    /// Returns every entry (directories included) in central-directory order.
    pub fn inspect(buffer: &[u8], limits: &ArchiveLimits) -> Result<Vec<ArchiveEntry>, ArchiveError> {
        let mut archive = ZipArchive::new(Cursor::new(buffer))?;

        let mut names = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            names.push((entry.name().to_string(), entry.is_dir()));
        }

        if let Some((name, _)) = names.iter().find(|(name, _)| is_suspicious_path(name)) {
            tracing::warn!("Suspicious path in archive: {:?}", name);
            return Err(ArchiveError::SuspiciousPath);
        }

        if !names.iter().any(|(name, _)| is_entry_point(name)) {
            return Err(ArchiveError::MissingEntryPoint);
        }

        let mut entries = Vec::with_capacity(names.len());
        let mut total: u64 = 0;
        for (i, (path, is_directory)) in names.into_iter().enumerate() {
            let decompressed_size = if is_directory {
                0
            } else {
                let mut entry = archive.by_index(i)?;
                measure_entry(&mut entry, limits.max_entry_size)?
            };

            total = total.saturating_add(decompressed_size);
            if total > limits.max_total_size {
                return Err(ArchiveError::TotalSizeExceeded);
            }

            entries.push(ArchiveEntry {
                path,
                is_directory,
                decompressed_size,
            });
        }

        Ok(entries)
    }

    /// Decompress every file entry into a map keyed by sanitized name.
    /// Two entries that sanitize to the same key are rejected, as are
    /// suspicious paths.
    pub fn extract(buffer: &[u8]) -> Result<BTreeMap<String, Vec<u8>>, ArchiveError> {
        Self::extract_with(buffer, &ArchiveLimits::default())
    }

    pub fn extract_with(
        buffer: &[u8],
        limits: &ArchiveLimits,
    ) -> Result<BTreeMap<String, Vec<u8>>, ArchiveError> {
        let mut archive = ZipArchive::new(Cursor::new(buffer))?;
        let mut files = BTreeMap::new();
        let mut total: u64 = 0;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if entry.is_dir() {
                continue;
            }
            if is_suspicious_path(entry.name()) {
                return Err(ArchiveError::SuspiciousPath);
            }

            let key = sanitize_filename(entry.name());
            if files.contains_key(&key) {
                return Err(ArchiveError::NameCollision(key));
            }

            let mut content = Vec::new();
            (&mut entry)
                .take(limits.max_entry_size + 1)
                .read_to_end(&mut content)?;
            if content.len() as u64 > limits.max_entry_size {
                return Err(ArchiveError::EntryTooLarge);
            }
            total = total.saturating_add(content.len() as u64);
            if total > limits.max_total_size {
                return Err(ArchiveError::TotalSizeExceeded);
            }

            files.insert(key, content);
        }

        Ok(files)
    }

    /// Run `inspect` on the blocking pool so large archives don't stall the
    /// runtime. Returns the entry names on success.
    pub async fn inspect_in_background(data: Bytes) -> crate::error::Result<Vec<String>> {
        let entries = tokio::task::spawn_blocking(move || Self::inspect(&data, &ArchiveLimits::default()))
            .await
            .map_err(|e| crate::error::AppError::Internal(format!("Validation task failed: {}", e)))??;
        Ok(entries.into_iter().map(|e| e.path).collect())
    }

    pub async fn extract_in_background(
        data: Bytes,
    ) -> crate::error::Result<BTreeMap<String, Vec<u8>>> {
        let files = tokio::task::spawn_blocking(move || Self::extract(&data))
            .await
            .map_err(|e| crate::error::AppError::Internal(format!("Extraction task failed: {}", e)))??;
        Ok(files)
    }
}

/// Parent traversal, absolute path or embedded NUL
pub fn is_suspicious_path(path: &str) -> bool {
    path.contains("../") || path.starts_with('/') || path.contains('\0')
}

pub fn is_entry_point(path: &str) -> bool {
    let lower = path.to_lowercase();
    ENTRY_POINTS.iter().any(|name| lower.contains(name))
}

/// Replace every character outside `[A-Za-z0-9._-/]` with `_`
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Inflate an entry into a sink, reading at most `cap + 1` bytes
fn measure_entry<R: Read>(entry: &mut R, cap: u64) -> Result<u64, ArchiveError> {
    let read = io::copy(&mut entry.take(cap + 1), &mut io::sink())?;
    if read > cap {
        return Err(ArchiveError::EntryTooLarge);
    }
    Ok(read)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub(crate) fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, content) in entries {
            if name.ends_with('/') {
                writer.add_directory(*name, options).unwrap();
            } else {
                writer.start_file(*name, options).unwrap();
                writer.write_all(content).unwrap();
            }
        }
        writer.finish().unwrap().into_inner()
    }

    fn build_zip_with_zeros(name: &str, len: usize, extra: &[(&str, &[u8])]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(len as u64 >= u32::MAX as u64);
        for (n, content) in extra {
            writer.start_file(*n, options).unwrap();
            writer.write_all(content).unwrap();
        }
        writer.start_file(name, options).unwrap();
        let chunk = vec![0u8; 1024 * 1024];
        let mut remaining = len;
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            writer.write_all(&chunk[..n]).unwrap();
            remaining -= n;
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_accepts_single_index() {
        let content = vec![b'a'; 10 * 1024];
        let zip = build_zip(&[("index.html", &content)]);
        let result = ArchiveService::validate(&zip);
        assert!(result.valid);
        assert_eq!(result.error, None);
        assert_eq!(result.files, Some(vec!["index.html".to_string()]));
    }

    #[test]
    fn test_files_keep_order_and_directories() {
        let zip = build_zip(&[
            ("site/", b""),
            ("site/index.html", b"<html></html>"),
            ("site/css/", b""),
            ("site/css/app.css", b"body{}"),
        ]);
        let result = ArchiveService::validate(&zip);
        assert!(result.valid, "{:?}", result.error);
        assert_eq!(
            result.files.unwrap(),
            vec!["site/", "site/index.html", "site/css/", "site/css/app.css"]
        );
    }

    #[test]
    fn test_rejects_missing_entry_point() {
        let zip = build_zip(&[("a.txt", b"hello")]);
        let result = ArchiveService::validate(&zip);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("index file"));
    }

    #[test]
    fn test_entry_point_is_case_insensitive() {
        let zip = build_zip(&[("App/INDEX.HTML", b"<html></html>")]);
        assert!(ArchiveService::validate(&zip).valid);

        let zip = build_zip(&[("server/package.json", b"{}")]);
        assert!(ArchiveService::validate(&zip).valid);
    }

    #[test]
    fn test_rejects_parent_traversal() {
        let zip = build_zip(&[("index.html", b"ok"), ("../../etc/passwd", b"root")]);
        let result = ArchiveService::validate(&zip);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("Suspicious"));
    }

    #[test]
    fn test_suspicious_path_wins_over_missing_entry_point() {
        let zip = build_zip(&[("../../etc/passwd", b"root")]);
        assert_eq!(
            ArchiveService::inspect(&zip, &ArchiveLimits::default()),
            Err(ArchiveError::SuspiciousPath)
        );
    }

    #[test]
    fn test_suspicious_path_patterns() {
        assert!(is_suspicious_path("../x"));
        assert!(is_suspicious_path("a/../../b"));
        assert!(is_suspicious_path("/etc/passwd"));
        assert!(is_suspicious_path("index\0.html"));
        assert!(!is_suspicious_path("a/b/index.html"));
        assert!(!is_suspicious_path("..hidden/file"));
    }

    #[test]
    fn test_rejects_large_entry() {
        let zip = build_zip_with_zeros("huge.bin", 60 * 1024 * 1024, &[("index.html", b"<html>")]);
        let result = ArchiveService::validate(&zip);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("Individual file too large"));
    }

    #[test]
    fn test_rejects_total_over_limit() {
        let limits = ArchiveLimits {
            max_entry_size: 1024,
            max_total_size: 2048,
        };
        let block = vec![b'x'; 1000];
        let zip = build_zip(&[
            ("index.html", &block),
            ("a.bin", &block),
            ("b.bin", &block),
        ]);
        assert_eq!(
            ArchiveService::inspect(&zip, &limits),
            Err(ArchiveError::TotalSizeExceeded)
        );

        let zip = build_zip(&[("index.html", &block), ("a.bin", &block)]);
        let entries = ArchiveService::inspect(&zip, &limits).unwrap();
        assert_eq!(entries.iter().map(|e| e.decompressed_size).sum::<u64>(), 2000);
    }

    #[test]
    fn test_rejects_garbage() {
        let result = ArchiveService::validate(b"definitely not a zip");
        assert_eq!(
            result,
            ValidationResult {
                valid: false,
                error: Some("Invalid ZIP file format".to_string()),
                files: None,
            }
        );
    }

    #[test]
    fn test_validate_is_deterministic() {
        let zip = build_zip(&[("index.html", b"<html>"), ("notes.txt", b"n")]);
        assert_eq!(ArchiveService::validate(&zip), ArchiveService::validate(&zip));
    }

    #[test]
    fn test_extract_sanitizes_names() {
        let zip = build_zip(&[
            ("site/", b""),
            ("site/index.html", b"<html>"),
            ("site/my page (1).html", b"page"),
            ("site/caf\u{e9}.txt", b"coffee"),
        ]);
        let files = ArchiveService::extract(&zip).unwrap();
        let keys: Vec<&str> = files.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["site/caf_.txt", "site/index.html", "site/my_page__1_.html"]);
        assert_eq!(files["site/my_page__1_.html"], b"page");
        for key in files.keys() {
            assert!(key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "._-/".contains(c)));
        }
    }

    #[test]
    fn test_extract_rejects_collisions() {
        let zip = build_zip(&[("index.html", b"<html>"), ("a b.txt", b"1"), ("a_b.txt", b"2")]);
        assert_eq!(
            ArchiveService::extract(&zip),
            Err(ArchiveError::NameCollision("a_b.txt".to_string()))
        );
    }

    #[test]
    fn test_extract_rejects_traversal() {
        let zip = build_zip(&[("index.html", b"<html>"), ("../evil.sh", b"rm")]);
        assert_eq!(ArchiveService::extract(&zip), Err(ArchiveError::SuspiciousPath));
    }

    #[test]
    fn test_extract_enforces_entry_cap() {
        let limits = ArchiveLimits {
            max_entry_size: 10,
            max_total_size: 100,
        };
        let zip = build_zip(&[("index.html", b"0123456789ABC")]);
        assert_eq!(
            ArchiveService::extract_with(&zip, &limits),
            Err(ArchiveError::EntryTooLarge)
        );
    }

    #[tokio::test]
    async fn test_inspect_in_background() {
        let zip = build_zip(&[("index.js", b"console.log(1)")]);
        let names = ArchiveService::inspect_in_background(Bytes::from(zip))
            .await
            .unwrap();
        assert_eq!(names, vec!["index.js".to_string()]);

        let zip = build_zip(&[("a.txt", b"x")]);
        let err = ArchiveService::inspect_in_background(Bytes::from(zip))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Archive(ArchiveError::MissingEntryPoint)
        ));
    }
}
