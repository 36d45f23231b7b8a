use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::models::{
    AddressQuery, AddressSuggestion, DocumentType, GeneratedDocument, HistoryEntry,
    PersistedProposal, ProposalId, ProposalPayload,
};

/// Field-level rejections returned by the store, keyed by field name.
/// Non-field errors use the `non_field_errors` key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub const NON_FIELD: &'static str = "non_field_errors";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        field: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.fields.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Every message, in field order, joined by a single space.
    pub fn summary(&self) -> String {
        self.fields
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Reads an error body such as `{"client_name": ["..."], "error": "..."}`.
    /// Returns `None` when the body is not a JSON object or holds no message.
    pub fn from_json_body(body: &str) -> Option<Self> {
        let Value::Object(map) = serde_json::from_str::<Value>(body).ok()? else {
            return None;
        };
        let mut errors = Self::new();
        for (field, value) in map {
            collect_messages(&value, &mut |message| errors.add(field.clone(), message));
        }
        (!errors.is_empty()).then_some(errors)
    }
}

fn collect_messages(
    value: &Value,
    sink: &mut dyn FnMut(String),
) {
    match value {
        Value::String(s) => sink(s.clone()),
        Value::Array(items) => items.iter().for_each(|item| collect_messages(item, sink)),
        Value::Object(map) => map.values().for_each(|item| collect_messages(item, sink)),
        Value::Number(n) => sink(n.to_string()),
        Value::Bool(_) | Value::Null => {}
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Record not found")]
    NotFound,

    #[error("Validation failed: {}", .0.summary())]
    Validation(ValidationErrors),

    #[error("Server error {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl StoreError {
    /// Message the server itself gave for the failure, suitable for showing
    /// to the operator.
    pub fn server_message(&self) -> Option<String> {
        match self {
            Self::Validation(errors) => Some(errors.summary()),
            Self::Server { body, .. } => {
                ValidationErrors::from_json_body(body).map(|errors| errors.summary())
            }
            _ => None,
        }
    }
}

/// CRUD and audit access to proposals.
#[async_trait]
pub trait ProposalStore: Send + Sync {
    async fn list(&self) -> Result<Vec<PersistedProposal>, StoreError>;

    async fn get(
        &self,
        id: ProposalId,
    ) -> Result<PersistedProposal, StoreError>;

    async fn create(
        &self,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError>;

    async fn update(
        &self,
        id: ProposalId,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError>;

    async fn delete(
        &self,
        id: ProposalId,
    ) -> Result<(), StoreError>;

    /// Audit entries, newest first.
    async fn history(
        &self,
        id: ProposalId,
    ) -> Result<Vec<HistoryEntry>, StoreError>;
}

/// Renders a saved proposal as a PDF or Word document.
#[async_trait]
pub trait DocumentGenerator: Send + Sync {
    async fn generate(
        &self,
        id: ProposalId,
        doc_type: DocumentType,
    ) -> Result<GeneratedDocument, StoreError>;
}

/// Free-text address lookup.
#[async_trait]
pub trait AddressGeocoder: Send + Sync {
    async fn search(
        &self,
        query: &AddressQuery,
    ) -> Result<Vec<AddressSuggestion>, StoreError>;
}
