use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::ProposalId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Pdf,
    Word,
}

impl DocumentType {
    pub fn all() -> &'static [DocumentType] {
        &[DocumentType::Pdf, DocumentType::Word]
    }

    /// Value sent as `doc_type` to the generator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "word",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "word" | "docx" => Some(Self::Word),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "docx",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Word => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Word => "WORD",
        }
    }

    /// Name the generator gives its output:
    /// `Proposition_commerciale_<opportunity>_<ddmmYYYY_HHMM>.<ext>`.
    pub fn generated_filename(
        &self,
        opportunity_number: &str,
        at: NaiveDateTime,
    ) -> String {
        format!(
            "Proposition_commerciale_{}_{}.{}",
            opportunity_number,
            at.format("%d%m%Y_%H%M"),
            self.extension()
        )
    }
}

impl fmt::Display for DocumentType {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document produced by the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    /// Name announced by the generator, if any.
    pub filename: Option<String>,
    pub content_type: Option<String>,
}

impl GeneratedDocument {
    /// The announced filename, or `fallback` when the generator gave none.
    pub fn filename_or(
        &self,
        fallback: impl FnOnce() -> String,
    ) -> String {
        self.filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(fallback)
    }
}

/// `proposition_<reference>.<ext>`, where the reference is the opportunity
/// number when known and the proposal id otherwise.
pub fn fallback_filename(
    opportunity_number: Option<&str>,
    id: ProposalId,
    doc_type: DocumentType,
) -> String {
    let reference = opportunity_number
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string());
    format!("proposition_{}.{}", reference, doc_type.extension())
}
