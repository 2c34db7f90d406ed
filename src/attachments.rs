//! Attachment storage
//!
//! Files attached to opportunity notes (NO) and presentation reports (RP)
//! live in a bucket addressed by sanitized paths such as
//! `project_42/procedure_42-P1/rp/1710496800000_rapport.pdf`.

use crate::error::{PortfolioError, PortfolioResult};
use crate::types::Attachment;
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Default bucket name
pub const DEFAULT_BUCKET: &str = "Projets DNA";

struct PathRules {
    whitespace: Regex,
    forbidden: Regex,
    slashes: Regex,
    underscores: Regex,
}

fn path_rules() -> &'static PathRules {
    static RULES: OnceLock<PathRules> = OnceLock::new();
    RULES.get_or_init(|| PathRules {
        whitespace: Regex::new(r"\s+").expect("valid regex"),
        forbidden: Regex::new(r"[^a-zA-Z0-9./_-]").expect("valid regex"),
        slashes: Regex::new(r"/+").expect("valid regex"),
        underscores: Regex::new(r"_{2,}").expect("valid regex"),
    })
}

/// Base letter of an accented Latin letter, if it has one
fn strip_accent(c: char) -> Option<char> {
    let base = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'A',
        'ç' => 'c',
        'Ç' => 'C',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'È' | 'É' | 'Ê' | 'Ë' => 'E',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'Ì' | 'Í' | 'Î' | 'Ï' => 'I',
        'ñ' => 'n',
        'Ñ' => 'N',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'Ù' | 'Ú' | 'Û' | 'Ü' => 'U',
        'ý' | 'ÿ' => 'y',
        'Ý' | 'Ÿ' => 'Y',
        _ => return None,
    };
    Some(base)
}

/// Make a bucket path safe: accents dropped, whitespace runs → `_`, any
/// other character outside `[A-Za-z0-9./_-]` → `_`, repeated `/` and `_`
/// collapsed.
pub fn sanitize_path(path: &str) -> String {
    let rules = path_rules();
    let folded: String = path.chars().map(|c| strip_accent(c).unwrap_or(c)).collect();
    let spaced = rules.whitespace.replace_all(&folded, "_");
    let cleaned = rules.forbidden.replace_all(&spaced, "_");
    let slashes = rules.slashes.replace_all(&cleaned, "/");
    rules.underscores.replace_all(&slashes, "_").into_owned()
}

/// Bucket path for a new upload.
///
/// Opportunity-note files go under `project_{ID}/no/`, presentation-report
/// files under `project_{ID}/procedure_{id}/rp/`; the file name is prefixed
/// with the upload time in milliseconds.
pub fn attachment_path(
    project_id: &str,
    procedure_id: Option<&str>,
    file_name: &str,
    timestamp_ms: i64,
) -> String {
    let prefix = match procedure_id {
        Some(procedure_id) => format!("project_{}/procedure_{}/rp", project_id, procedure_id),
        None => format!("project_{}/no", project_id),
    };
    format!("{}/{}_{}", prefix, timestamp_ms, file_name)
}

/// Content type guessed from the file extension
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "csv" => "text/csv",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "zip" => "application/zip",
        "msg" => "application/vnd.ms-outlook",
        _ => "application/octet-stream",
    }
}

/// Blob storage for attachment files
pub trait AttachmentStore {
    /// Store `bytes` at the sanitized `path` (overwriting) and describe it
    fn upload(&self, file_name: &str, bytes: &[u8], path: &str) -> PortfolioResult<Attachment>;

    /// Remove the object at `path`; an empty path does nothing
    fn delete(&self, path: &str) -> PortfolioResult<()>;
}

/// Bucket stored as a directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalAttachmentStore {
    root: PathBuf,
    bucket: String,
    public_base_url: String,
}

impl LocalAttachmentStore {
    pub fn new<P: AsRef<Path>>(
        root: P,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            bucket: bucket.into(),
            public_base_url: public_base_url.into(),
        }
    }

    fn bucket_dir(&self) -> PathBuf {
        self.root.join(&self.bucket)
    }

    /// File of the object at `path`; only relative paths that stay inside
    /// the bucket are accepted
    fn object_file(&self, path: &str) -> PortfolioResult<PathBuf> {
        let relative = Path::new(path);
        let inside_bucket = !path.trim().is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !inside_bucket {
            return Err(PortfolioError::Attachment(format!(
                "Invalid attachment path '{}'",
                path
            )));
        }
        Ok(self.bucket_dir().join(relative))
    }

    /// Public retrieval URL of an object; bucket and path segments are
    /// percent-encoded
    pub fn public_url(&self, path: &str) -> String {
        let segments: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!(
            "{}/{}/{}",
            self.public_base_url.trim_end_matches('/'),
            urlencoding::encode(&self.bucket),
            segments.join("/")
        )
    }
}

impl AttachmentStore for LocalAttachmentStore {
    fn upload(&self, file_name: &str, bytes: &[u8], path: &str) -> PortfolioResult<Attachment> {
        let clean_path = sanitize_path(path);
        let target = self.object_file(&clean_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes).map_err(|e| {
            PortfolioError::Attachment(format!(
                "Upload to bucket \"{}\" failed for {}: {}",
                self.bucket, clean_path, e
            ))
        })?;

        info!(bucket = %self.bucket, path = %clean_path, size = bytes.len(), "attachment uploaded");

        Ok(Attachment {
            name: file_name.to_string(),
            url: self.public_url(&clean_path),
            size: bytes.len() as u64,
            content_type: content_type_for(file_name).to_string(),
            uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            path: clean_path,
        })
    }

    fn delete(&self, path: &str) -> PortfolioResult<()> {
        if path.is_empty() {
            return Ok(());
        }
        let target = self.object_file(path)?;
        if !target.is_file() {
            warn!(bucket = %self.bucket, path, "attachment to delete not found");
            return Err(PortfolioError::Attachment(format!(
                "Nothing deleted: '{}' is not in bucket \"{}\"",
                path, self.bucket
            )));
        }
        fs::remove_file(&target)?;
        info!(bucket = %self.bucket, path, "attachment deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("project_42/no/Note d'opportunité été.pdf"),
            "project_42/no/Note_d_opportunite_ete.pdf"
        );
        assert_eq!(sanitize_path("a//b///c"), "a/b/c");
        assert_eq!(sanitize_path("a  &  b.txt"), "a_b.txt");
        assert_eq!(sanitize_path("Œuvre.pdf"), "_uvre.pdf");
    }

    #[test]
    fn test_attachment_path() {
        assert_eq!(
            attachment_path("42", None, "note.pdf", 1_710_496_800_000),
            "project_42/no/1710496800000_note.pdf"
        );
        assert_eq!(
            attachment_path("42", Some("42-P1"), "rp.docx", 7),
            "project_42/procedure_42-P1/rp/7_rp.docx"
        );
    }

    #[test]
    fn test_content_type() {
        assert_eq!(content_type_for("Rapport.PDF"), "application/pdf");
        assert_eq!(content_type_for("no_extension"), "application/octet-stream");
    }

    #[test]
    fn test_upload_and_delete() {
        let dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(dir.path(), DEFAULT_BUCKET, "http://localhost:8080/files");

        let attachment = store
            .upload("Décision.pdf", b"%PDF-1.7", "project_1/no/1_Décision.pdf")
            .unwrap();

        assert_eq!(attachment.name, "Décision.pdf");
        assert_eq!(attachment.path, "project_1/no/1_Decision.pdf");
        assert_eq!(attachment.size, 8);
        assert_eq!(attachment.content_type, "application/pdf");
        assert_eq!(
            attachment.url,
            "http://localhost:8080/files/Projets%20DNA/project_1/no/1_Decision.pdf"
        );
        assert!(dir.path().join(DEFAULT_BUCKET).join(&attachment.path).exists());

        store.delete(&attachment.path).unwrap();
        assert!(!dir.path().join(DEFAULT_BUCKET).join(&attachment.path).exists());
    }

    #[test]
    fn test_delete_missing_is_error_and_empty_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(dir.path(), DEFAULT_BUCKET, "http://x");
        assert!(store.delete("").is_ok());
        assert!(matches!(
            store.delete("project_1/no/missing.pdf"),
            Err(PortfolioError::Attachment(_))
        ));
    }

    #[test]
    fn test_upload_rejects_paths_outside_bucket() {
        let dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(dir.path().join("store"), DEFAULT_BUCKET, "http://x");
        let outside = dir.path().join("outside.txt");

        assert!(matches!(
            store.upload("x.txt", b"x", "../../outside.txt"),
            Err(PortfolioError::Attachment(_))
        ));
        assert!(matches!(
            store.upload("x.txt", b"x", &outside.to_string_lossy()),
            Err(PortfolioError::Attachment(_))
        ));
        assert!(!outside.exists());
    }

    #[test]
    fn test_delete_keeps_files_outside_bucket() {
        let dir = TempDir::new().unwrap();
        let store = LocalAttachmentStore::new(dir.path().join("store"), DEFAULT_BUCKET, "http://x");
        let outside = dir.path().join("rapport.pdf");
        fs::write(&outside, b"%PDF").unwrap();

        let absolute = store.delete(&outside.to_string_lossy());
        assert!(matches!(absolute, Err(PortfolioError::Attachment(_))));

        let parent = store.delete("../../rapport.pdf");
        assert!(matches!(parent, Err(PortfolioError::Attachment(_))));

        let nested = store.delete("project_1/../../../rapport.pdf");
        assert!(matches!(nested, Err(PortfolioError::Attachment(_))));

        assert!(matches!(store.delete("   "), Err(PortfolioError::Attachment(_))));
        assert!(outside.exists());
    }

    #[test]
    fn test_public_url_encodes_bucket_and_path() {
        let store = LocalAttachmentStore::new("/tmp", "Projets #1 100%", "http://localhost/files/");
        assert_eq!(
            store.public_url("project_1/no/1_a.pdf"),
            "http://localhost/files/Projets%20%231%20100%25/project_1/no/1_a.pdf"
        );
        assert_eq!(
            store.public_url("project_1/no/note d.pdf"),
            "http://localhost/files/Projets%20%231%20100%25/project_1/no/note%20d.pdf"
        );
    }
}
