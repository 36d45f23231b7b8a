use std::path::PathBuf;
use std::sync::Arc;

use devis_core::listing::{FilterCriteria, ListingFilterSort, SortSpec};
use devis_core::store::Backend;
use devis_core::{
    DocumentGenerator, DocumentType, HistoryEntry, PersistedProposal, ProposalId, ProposalStore,
    StoreError, fallback_filename,
};

use crate::documents::{DocumentError, DocumentSaver};
use crate::notice::{Notice, Notices};

pub const LIST_FAILED: &str = "Erreur lors de la récupération des devis.";
pub const HISTORY_FAILED: &str = "Erreur lors de la récupération de l'historique.";
pub const DELETED: &str = "Devis supprimé avec succès!";
pub const DELETE_FAILED: &str = "Erreur lors de la suppression du devis.";
pub const DELETE_WARNING: &str = "Cette action est irréversible.";

/// Handle for a delete awaiting confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteToken {
    serial: u64,
    pub id: ProposalId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    Cancelled,
    Failed,
}

/// The proposal table: fetched records plus the operator's filters and sort.
pub struct ListingController {
    store: Arc<dyn ProposalStore>,
    documents: Arc<dyn DocumentGenerator>,
    saver: DocumentSaver,

    records: Vec<PersistedProposal>,
    criteria: FilterCriteria,
    sort: SortSpec,
    history: Vec<HistoryEntry>,
    pending_delete: Option<DeleteToken>,
    delete_serial: u64,

    loading: bool,
    notices: Notices,
}

impl ListingController {
    pub fn new(
        backend: Backend,
        saver: DocumentSaver,
    ) -> Self {
        Self {
            store: backend.store,
            documents: backend.documents,
            saver,
            records: Vec::new(),
            criteria: FilterCriteria::new(),
            sort: SortSpec::latest_first(),
            history: Vec::new(),
            pending_delete: None,
            delete_serial: 0,
            loading: false,
            notices: Notices::default(),
        }
    }

    pub fn records(&self) -> &[PersistedProposal] {
        &self.records
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.take()
    }

    /// Fetches every proposal. On success filters are cleared and the rows
    /// sorted by opportunity number, newest first; on failure the previous
    /// rows stay.
    pub async fn refresh(&mut self) -> Result<usize, StoreError> {
        self.loading = true;
        let result = self.store.list().await;
        self.loading = false;

        match result {
            Ok(records) => {
                tracing::info!(count = records.len(), "proposals fetched");
                self.records = records;
                self.criteria.reset();
                self.sort = SortSpec::latest_first();
                Ok(self.records.len())
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to fetch proposals");
                self.notices.push(Notice::error(LIST_FAILED));
                Err(e)
            }
        }
    }

    /// The rows as currently filtered and sorted.
    pub fn view(&self) -> Vec<&PersistedProposal> {
        ListingFilterSort::apply(&self.records, &self.criteria, &self.sort)
    }

    /// Sets a filter; a blank value removes it.
    pub fn set_filter(
        &mut self,
        key: &str,
        value: &str,
    ) {
        self.criteria.set(key, value);
    }

    pub fn clear_filter(
        &mut self,
        key: &str,
    ) {
        self.criteria.clear(key);
    }

    /// Header click on `key`.
    pub fn request_sort(
        &mut self,
        key: &str,
    ) {
        self.sort.request(key);
    }

    /// Clears every filter and the sort key.
    pub fn reset_view(&mut self) {
        self.criteria.reset();
        self.sort.reset();
    }

    // ── history ──

    /// Fetches the audit trail of `id`, newest first. A failure leaves an
    /// empty history.
    pub async fn show_history(
        &mut self,
        id: ProposalId,
    ) -> &[HistoryEntry] {
        match self.store.history(id).await {
            Ok(entries) => {
                tracing::debug!(id, count = entries.len(), "history fetched");
                self.history = entries;
            }
            Err(e) => {
                tracing::error!(id, error = %e, "failed to fetch history");
                self.history.clear();
                self.notices.push(Notice::error(HISTORY_FAILED));
            }
        }
        &self.history
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// The fetched history as display lines, one block per entry.
    pub fn history_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for entry in &self.history {
            let ip = entry.user_ip.as_deref().unwrap_or("N/A");
            lines.push(format!("{} ({})", entry.timestamp_display(), ip));
            lines.extend(entry.describe_changes().into_iter().map(|c| format!("  {c}")));
        }
        lines
    }

    // ── delete ──

    /// First phase of a delete. Replaces any earlier pending request.
    pub fn request_delete(
        &mut self,
        id: ProposalId,
    ) -> DeleteToken {
        self.delete_serial += 1;
        let token = DeleteToken {
            serial: self.delete_serial,
            id,
        };
        self.pending_delete = Some(token);
        self.notices.push(Notice::warning(DELETE_WARNING));
        token
    }

    pub fn pending_delete(&self) -> Option<DeleteToken> {
        self.pending_delete
    }

    pub fn cancel_delete(
        &mut self,
        token: DeleteToken,
    ) {
        if self.pending_delete == Some(token) {
            self.pending_delete = None;
        }
    }

    /// Second phase. A token that is no longer pending is treated as
    /// cancelled and deletes nothing.
    pub async fn confirm_delete(
        &mut self,
        token: DeleteToken,
    ) -> DeleteOutcome {
        if self.pending_delete != Some(token) {
            return DeleteOutcome::Cancelled;
        }
        self.pending_delete = None;

        match self.store.delete(token.id).await {
            Ok(()) => {
                tracing::info!(id = token.id, "proposal deleted");
                self.notices.push(Notice::success(DELETED));
                // The refresh reports its own failure.
                let _ = self.refresh().await;
                DeleteOutcome::Deleted
            }
            Err(e) => {
                tracing::error!(id = token.id, error = %e, "failed to delete proposal");
                self.notices.push(Notice::error(DELETE_FAILED));
                DeleteOutcome::Failed
            }
        }
    }

    // ── documents ──

    pub async fn download_document(
        &mut self,
        id: ProposalId,
        doc_type: DocumentType,
    ) -> Result<PathBuf, DocumentError> {
        self.notices.push(Notice::info(format!(
            "Génération du {} en cours...",
            doc_type.label()
        )));
        let result = self
            .saver
            .download(self.documents.as_ref(), id, doc_type, || {
                fallback_filename(None, id, doc_type)
            })
            .await;

        match &result {
            Ok(_) => self.notices.push(Notice::success(format!(
                "{} téléchargé avec succès!",
                doc_type.label()
            ))),
            Err(e) => {
                tracing::error!(id, doc_type = %doc_type, error = %e, "document download failed");
                let message = match e {
                    DocumentError::Generate(store_err) => store_err.server_message(),
                    DocumentError::Write { .. } => None,
                }
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("Erreur lors de la génération du {}.", doc_type.as_str()));
                self.notices.push(Notice::error(message));
            }
        }
        result
    }
}
