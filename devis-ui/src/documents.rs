use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use devis_core::{DocumentGenerator, DocumentType, GeneratedDocument, ProposalId, StoreError};
use regex::Regex;
use thiserror::Error;

/// Characters kept out of file names written to disk.
static UNSAFE_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[/\\:*?"<>|\x00-\x1f]"#).expect("valid regex"));

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Generate(#[from] StoreError),
    #[error("cannot write '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Replaces path separators and reserved characters so a server-announced
/// name cannot escape the download directory.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned = UNSAFE_FILENAME_RE.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "document".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes generated documents into one directory.
#[derive(Debug, Clone)]
pub struct DocumentSaver {
    directory: PathBuf,
}

impl DocumentSaver {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Saves `document` under its announced name, or `fallback` when it has
    /// none. Creates the directory when missing and replaces an existing
    /// file of the same name.
    pub async fn save(
        &self,
        document: &GeneratedDocument,
        fallback: impl FnOnce() -> String,
    ) -> Result<PathBuf, DocumentError> {
        let name = sanitize_filename(&document.filename_or(fallback));
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| DocumentError::Write {
                path: self.directory.clone(),
                source,
            })?;
        let path = self.directory.join(name);
        tokio::fs::write(&path, &document.bytes)
            .await
            .map_err(|source| DocumentError::Write {
                path: path.clone(),
                source,
            })?;

        tracing::info!(path = %path.display(), size = document.bytes.len(), "document saved");
        Ok(path)
    }

    /// Generates the document for `id` and saves it.
    pub async fn download(
        &self,
        generator: &dyn DocumentGenerator,
        id: ProposalId,
        doc_type: DocumentType,
        fallback: impl FnOnce() -> String,
    ) -> Result<PathBuf, DocumentError> {
        let document = generator.generate(id, doc_type).await?;
        self.save(&document, fallback).await
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn document(filename: Option<&str>) -> GeneratedDocument {
        GeneratedDocument {
            bytes: b"%PDF-1.4".to_vec(),
            filename: filename.map(str::to_string),
            content_type: Some("application/pdf".into()),
        }
    }

    #[test]
    fn sanitize_strips_separators_and_leading_dots() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_filename("devis:1?.pdf"), "devis_1_.pdf");
        assert_eq!(sanitize_filename("  "), "document");
        assert_eq!(
            sanitize_filename("Proposition_commerciale_OPP-1_20052025_0905.pdf"),
            "Proposition_commerciale_OPP-1_20052025_0905.pdf"
        );
    }

    #[tokio::test]
    async fn save_uses_announced_name() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DocumentSaver::new(dir.path());

        let path = saver
            .save(&document(Some("devis.pdf")), || "proposition_1.pdf".into())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("devis.pdf"));
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn save_falls_back_and_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let saver = DocumentSaver::new(dir.path().join("nested/out"));

        let path = saver
            .save(&document(None), || "proposition_OPP-7.docx".into())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("nested/out/proposition_OPP-7.docx"));
        assert!(path.is_file());
    }
}
