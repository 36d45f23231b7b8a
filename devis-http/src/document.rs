use std::sync::LazyLock;

use async_trait::async_trait;
use devis_core::{DocumentGenerator, DocumentType, GeneratedDocument, ProposalId, StoreError};
use regex::Regex;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderName};

use crate::repository::HttpProposalStore;
use crate::response::{ensure_success, from_reqwest};

/// `filename="..."`, `filename=...` or RFC 5987 `filename*=UTF-8''...`.
static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)filename\*?\s*=\s*(?:UTF-8'')?"?([^";]+)"?"#).expect("valid regex")
});

/// Extracts the announced filename from a `Content-Disposition` header.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    FILENAME_RE
        .captures(header)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|name| !name.is_empty())
}

#[async_trait]
impl DocumentGenerator for HttpProposalStore {
    async fn generate(
        &self,
        id: ProposalId,
        doc_type: DocumentType,
    ) -> Result<GeneratedDocument, StoreError> {
        let url = self.action_url(id, "generate-document");
        tracing::debug!(%url, doc_type = %doc_type, "requesting document");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "doc_type": doc_type.as_str() }))
            .send()
            .await
            .map_err(from_reqwest)?;
        let response = ensure_success(response).await?;

        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let filename = header(CONTENT_DISPOSITION)
            .as_deref()
            .and_then(filename_from_content_disposition);
        let content_type = header(CONTENT_TYPE);
        let bytes = response.bytes().await.map_err(from_reqwest)?.to_vec();

        tracing::info!(id, size = bytes.len(), ?filename, "document received");
        Ok(GeneratedDocument {
            bytes,
            filename,
            content_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn quoted_filename() {
        assert_eq!(
            filename_from_content_disposition(
                r#"attachment; filename="Proposition_commerciale_OPP-1_20052025_0905.pdf""#
            ),
            Some("Proposition_commerciale_OPP-1_20052025_0905.pdf".to_string())
        );
    }

    #[test]
    fn bare_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename=devis.docx"),
            Some("devis.docx".to_string())
        );
    }

    #[test]
    fn extended_filename() {
        assert_eq!(
            filename_from_content_disposition("attachment; filename*=UTF-8''devis.pdf"),
            Some("devis.pdf".to_string())
        );
    }

    #[test]
    fn header_without_filename() {
        assert_eq!(filename_from_content_disposition("attachment"), None);
        assert_eq!(filename_from_content_disposition(r#"attachment; filename="""#), None);
    }
}
