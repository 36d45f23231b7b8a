//! The three-stage proposal editor.
//!
//! [`ProposalFormController`] owns a [`ProposalDraft`] and walks it through
//! the stages of [`StageMachine`], recomputing premiums on every edit. Store
//! failures never escape as panics: each one becomes a [`Notice`] and, where
//! the caller needs to branch on it, a [`FormError`].

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use devis_core::calculations::{CalculatedPremiums, PremiumCalculator};
use devis_core::store::Backend;
use devis_core::validation::{FormStage, StageMachine, StageValidation};
use devis_core::{
    AddressSuggestion, DocumentGenerator, DocumentType, FieldUpdate, ProposalDraft, ProposalField,
    ProposalId, ProposalStore, StoreError, SubmittedProposal, fallback_filename,
};
use thiserror::Error;

use crate::address::{AddressSearch, SEARCH_FAILED};
use crate::documents::{DocumentError, DocumentSaver};
use crate::notice::{Notice, Notices};

pub const LOAD_FAILED: &str = "Impossible de charger les données du devis.";
pub const SAVE_FAILED: &str = "Erreur lors de la sauvegarde du devis. Veuillez réessayer.";
pub const CREATED: &str = "Devis créé avec succès!";
pub const UPDATED: &str = "Devis modifié avec succès!";
pub const NO_DOCUMENT_ID: &str = "ID du devis non disponible pour le téléchargement.";

#[derive(Debug, Error)]
pub enum FormError {
    #[error("the proposal can only be saved from the last stage")]
    NotAtFinalStage,
    #[error("another operation is in progress")]
    Busy,
    #[error("the proposal has already been saved")]
    AlreadySubmitted,
    #[error("no saved proposal to generate a document for")]
    NothingSubmitted,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Create,
    Edit(ProposalId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPhase {
    Editing(FormStage),
    Submitted(SubmittedProposal),
}

pub struct ProposalFormController {
    store: Arc<dyn ProposalStore>,
    documents: Arc<dyn DocumentGenerator>,
    saver: DocumentSaver,
    address: AddressSearch,

    mode: FormMode,
    draft: ProposalDraft,
    stages: StageMachine,
    premiums: CalculatedPremiums,
    field_errors: BTreeMap<ProposalField, String>,
    submitted: Option<SubmittedProposal>,
    load_error: Option<String>,

    loading_form: bool,
    submitting: bool,
    downloading: bool,
    notices: Notices,
}

impl ProposalFormController {
    pub fn new(
        backend: Backend,
        address: AddressSearch,
        saver: DocumentSaver,
    ) -> Self {
        let draft = ProposalDraft::default();
        let premiums = PremiumCalculator::calculate(&draft.premium_input());
        Self {
            store: backend.store,
            documents: backend.documents,
            saver,
            address,
            mode: FormMode::Create,
            draft,
            stages: StageMachine::new(),
            premiums,
            field_errors: BTreeMap::new(),
            submitted: None,
            load_error: None,
            loading_form: false,
            submitting: false,
            downloading: false,
            notices: Notices::default(),
        }
    }

    // ── accessors ──

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn draft(&self) -> &ProposalDraft {
        &self.draft
    }

    pub fn stage(&self) -> FormStage {
        self.stages.stage()
    }

    pub fn phase(&self) -> FormPhase {
        match &self.submitted {
            Some(summary) => FormPhase::Submitted(summary.clone()),
            None => FormPhase::Editing(self.stages.stage()),
        }
    }

    pub fn premiums(&self) -> CalculatedPremiums {
        self.premiums
    }

    pub fn field_errors(&self) -> &BTreeMap<ProposalField, String> {
        &self.field_errors
    }

    pub fn submitted(&self) -> Option<&SubmittedProposal> {
        self.submitted.as_ref()
    }

    /// Set when the record to edit could not be fetched.
    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn is_loading_form(&self) -> bool {
        self.loading_form
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_downloading(&self) -> bool {
        self.downloading
    }

    pub fn suggestions(&self) -> Vec<AddressSuggestion> {
        self.address.suggestions()
    }

    /// Drains pending notices, including any address search failure.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        if self.address.take_failure() {
            self.notices.push(Notice::warning(SEARCH_FAILED));
        }
        self.notices.take()
    }

    // ── lifecycle ──

    fn reset(
        &mut self,
        mode: FormMode,
    ) {
        self.mode = mode;
        self.draft = ProposalDraft::default();
        self.stages.reset();
        self.field_errors.clear();
        self.submitted = None;
        self.load_error = None;
        self.address.clear();
        self.recompute();
    }

    /// Starts a blank proposal.
    pub fn start_new(&mut self) {
        self.reset(FormMode::Create);
        tracing::debug!("new proposal form");
    }

    /// Leaves the summary (or an abandoned edit) for a blank form.
    pub fn return_home(&mut self) {
        self.reset(FormMode::Create);
    }

    /// Opens an existing proposal for editing. On failure the draft stays at
    /// its defaults and [`Self::load_error`] is set.
    pub async fn load(
        &mut self,
        id: ProposalId,
    ) -> Result<(), FormError> {
        self.reset(FormMode::Edit(id));
        self.loading_form = true;
        let result = self.store.get(id).await;
        self.loading_form = false;

        match result {
            Ok(record) => {
                self.draft = ProposalDraft::from_persisted(&record);
                self.recompute();
                tracing::info!(id, opportunity = %record.opportunity_number, "proposal loaded");
                Ok(())
            }
            Err(e) => {
                tracing::error!(id, error = %e, "failed to load proposal");
                self.load_error = Some(LOAD_FAILED.to_string());
                self.notices.push(Notice::error(LOAD_FAILED));
                Err(e.into())
            }
        }
    }

    // ── editing ──

    fn recompute(&mut self) {
        self.premiums = PremiumCalculator::calculate(&self.draft.premium_input());
    }

    /// Applies one field edit. Editing the site address also schedules an
    /// address search.
    pub fn update(
        &mut self,
        update: FieldUpdate,
    ) {
        if self.submitted.is_some() {
            tracing::debug!(field = %update.field(), "ignoring edit of a saved proposal");
            return;
        }
        let field = update.field();
        if let FieldUpdate::AddressChantier(text) = &update {
            self.address.input(text);
        }
        self.draft.apply(update);
        self.field_errors.remove(&field);
        self.recompute();
    }

    pub fn input_address(
        &mut self,
        text: &str,
    ) {
        self.update(FieldUpdate::AddressChantier(text.to_string()));
    }

    /// Waits until the pending address search has delivered.
    pub async fn settle_address_search(&mut self) {
        self.address.settle().await;
    }

    /// Closes the suggestion list and drops any pending search.
    pub fn dismiss_suggestions(&mut self) {
        self.address.clear();
    }

    /// Copies the chosen suggestion into the address field without
    /// searching again.
    pub fn choose_suggestion(
        &mut self,
        index: usize,
    ) -> Option<AddressSuggestion> {
        let picked = self.address.choose(index)?;
        self.draft.apply(FieldUpdate::AddressChantier(picked.label.clone()));
        self.field_errors.remove(&ProposalField::AddressChantier);
        Some(picked)
    }

    /// Validates the current stage and moves on when it passes. Each
    /// violated rule becomes an error notice and its fields get a marker.
    pub fn advance(&mut self) -> StageValidation {
        let result = self.stages.advance(&self.draft);
        if result.stage_ok() {
            tracing::debug!(stage = %self.stages.stage(), "stage advanced");
        } else {
            for (field, marker) in &result.field_errors {
                self.field_errors.insert(*field, marker.clone());
            }
            for message in &result.messages {
                self.notices.push(Notice::error(message.clone()));
            }
        }
        result
    }

    pub fn retreat(&mut self) -> FormStage {
        self.stages.retreat()
    }

    // ── saving ──

    /// Saves the draft from the last stage: creates in [`FormMode::Create`],
    /// updates otherwise. On failure the form stays on the last stage.
    pub async fn submit(&mut self) -> Result<SubmittedProposal, FormError> {
        if self.submitted.is_some() {
            return Err(FormError::AlreadySubmitted);
        }
        if !self.stages.stage().is_final() {
            return Err(FormError::NotAtFinalStage);
        }
        if self.submitting {
            return Err(FormError::Busy);
        }

        let payload = self.draft.to_payload();
        self.submitting = true;
        let result = match self.mode {
            FormMode::Create => self.store.create(&payload).await,
            FormMode::Edit(id) => self.store.update(id, &payload).await,
        };
        self.submitting = false;

        match result {
            Ok(record) => {
                let summary = SubmittedProposal::from(&record);
                let message = match self.mode {
                    FormMode::Create => CREATED,
                    FormMode::Edit(_) => UPDATED,
                };
                tracing::info!(id = summary.id, opportunity = %summary.opportunity_number, "proposal saved");
                self.notices.push(Notice::success(message));
                self.submitted = Some(summary.clone());
                Ok(summary)
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to save proposal");
                let message = e
                    .server_message()
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| SAVE_FAILED.to_string());
                self.notices.push(Notice::error(message));
                Err(e.into())
            }
        }
    }

    /// Generates a document for the saved proposal and writes it to the
    /// download directory.
    pub async fn download_document(
        &mut self,
        doc_type: DocumentType,
    ) -> Result<PathBuf, FormError> {
        let Some(summary) = self.submitted.clone() else {
            self.notices.push(Notice::error(NO_DOCUMENT_ID));
            return Err(FormError::NothingSubmitted);
        };
        if self.downloading {
            return Err(FormError::Busy);
        }

        self.downloading = true;
        let result = self
            .saver
            .download(self.documents.as_ref(), summary.id, doc_type, || {
                fallback_filename(Some(&summary.opportunity_number), summary.id, doc_type)
            })
            .await;
        self.downloading = false;

        match result {
            Ok(path) => {
                self.notices.push(Notice::success(format!(
                    "Document {} téléchargé.",
                    doc_type.label()
                )));
                Ok(path)
            }
            Err(e) => {
                tracing::error!(id = summary.id, doc_type = %doc_type, error = %e, "document download failed");
                self.notices.push(Notice::error(format!(
                    "Erreur lors du téléchargement du document {}.",
                    doc_type.label()
                )));
                Err(e.into())
            }
        }
    }
}
