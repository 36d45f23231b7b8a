//! Listing, history, delete and document download against the in-memory
//! store, plus a store that always fails.

use std::sync::Arc;

use async_trait::async_trait;
use devis_core::listing::{PRICE_MIN, SortDirection};
use devis_core::store::{Backend, MemoryProposalStore};
use devis_core::{
    DocumentGenerator, DocumentType, FieldUpdate, GeneratedDocument, GuaranteeType, HistoryEntry,
    OuvrageDestination, PersistedProposal, ProposalDraft, ProposalId, ProposalPayload,
    ProposalStore, StoreError,
};
use devis_ui::documents::{DocumentError, DocumentSaver};
use devis_ui::listing::{
    DELETE_FAILED, DELETE_WARNING, DELETED, DeleteOutcome, HISTORY_FAILED, LIST_FAILED,
    ListingController,
};
use devis_ui::notice::Notice;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn payload(
    opportunity: &str,
    client: &str,
    guarantee: GuaranteeType,
    cost: Decimal,
) -> ProposalPayload {
    let mut draft = ProposalDraft::default();
    draft.apply(FieldUpdate::OpportunityNumber(opportunity.into()));
    draft.apply(FieldUpdate::ClientName(client.into()));
    draft.apply(FieldUpdate::GuaranteeType(guarantee));
    draft.apply(FieldUpdate::OuvrageCost(Some(cost)));
    draft.apply(FieldUpdate::TrcRate(Some(dec!(0.01))));
    draft.apply(FieldUpdate::DoRate(Some(dec!(0.02))));
    if guarantee.requires_destination() {
        draft.apply(FieldUpdate::OuvrageDestination(Some(OuvrageDestination::Habitation)));
    }
    draft.to_payload()
}

async fn seeded() -> (Arc<MemoryProposalStore>, TempDir, ListingController) {
    let store = Arc::new(MemoryProposalStore::new());
    store
        .create(&payload("OPP-001", "Alpha Construction", GuaranteeType::Trc, dec!(50000)))
        .await
        .unwrap();
    store
        .create(&payload("OPP-003", "Gamma Promotion", GuaranteeType::Duo, dec!(10000)))
        .await
        .unwrap();
    store
        .create(&payload("OPP-002", "beta immobilier", GuaranteeType::Do, dec!(20000)))
        .await
        .unwrap();

    let downloads = tempfile::tempdir().unwrap();
    let backend = Backend {
        store: store.clone(),
        documents: store.clone(),
    };
    let listing = ListingController::new(backend, DocumentSaver::new(downloads.path()));
    (store, downloads, listing)
}

fn opportunities(listing: &ListingController) -> Vec<String> {
    listing
        .view()
        .iter()
        .map(|r| r.opportunity_number.clone())
        .collect()
}

fn messages(notices: &[Notice]) -> Vec<&str> {
    notices.iter().map(|n| n.message.as_str()).collect()
}

// ── projection ──

#[tokio::test]
async fn refresh_sorts_latest_opportunity_first() {
    let (_store, _dir, mut listing) = seeded().await;

    assert_eq!(listing.refresh().await.unwrap(), 3);

    assert_eq!(opportunities(&listing), vec!["OPP-003", "OPP-002", "OPP-001"]);
    assert_eq!(listing.sort().direction, SortDirection::Descending);
}

#[tokio::test]
async fn filters_combine_and_refresh_clears_them() {
    let (_store, _dir, mut listing) = seeded().await;
    listing.refresh().await.unwrap();

    listing.set_filter("client_name", "A");
    assert_eq!(opportunities(&listing), vec!["OPP-003", "OPP-002", "OPP-001"]);

    // DUO 10000 → 300, DO 20000 → 400, TRC 50000 → 500.
    listing.set_filter(PRICE_MIN, "400");
    assert_eq!(opportunities(&listing), vec!["OPP-002", "OPP-001"]);

    listing.set_filter("guarantee_type", "tr");
    assert_eq!(opportunities(&listing), vec!["OPP-001"]);

    listing.refresh().await.unwrap();
    assert!(listing.criteria().is_empty());
    assert_eq!(listing.view().len(), 3);
}

#[tokio::test]
async fn sort_requests_toggle_and_reset() {
    let (_store, _dir, mut listing) = seeded().await;
    listing.refresh().await.unwrap();

    listing.request_sort("prime_seule_tarif_duo");
    assert_eq!(opportunities(&listing), vec!["OPP-003", "OPP-002", "OPP-001"]);

    listing.request_sort("prime_seule_tarif_duo");
    assert_eq!(opportunities(&listing), vec!["OPP-001", "OPP-002", "OPP-003"]);

    listing.request_sort("client_name");
    assert_eq!(opportunities(&listing), vec!["OPP-001", "OPP-002", "OPP-003"]);

    listing.reset_view();
    assert_eq!(listing.sort().key, None);
    assert_eq!(listing.view().len(), 3);
}

// ── history ──

#[tokio::test]
async fn history_lines_show_creation_and_changes() {
    let (store, _dir, mut listing) = seeded().await;
    let mut changed = payload("OPP-001", "Alpha Construction", GuaranteeType::Trc, dec!(50000));
    changed.is_vip_client = true;
    store.update(1, &changed).await.unwrap();

    let entries = listing.show_history(1).await.len();
    let lines = listing.history_lines();

    assert_eq!(entries, 2);
    assert!(lines.contains(&"  is_vip_client: Non → Oui".to_string()));
    assert!(lines.contains(&"  Devis créé".to_string()));
    // Newest first.
    let vip = lines.iter().position(|l| l.contains("is_vip_client")).unwrap();
    let created = lines.iter().position(|l| l.contains("Devis créé")).unwrap();
    assert!(vip < created);
}

// ── delete ──

#[tokio::test]
async fn confirmed_delete_removes_and_refreshes() {
    let (store, _dir, mut listing) = seeded().await;
    listing.refresh().await.unwrap();

    let token = listing.request_delete(2);
    assert_eq!(messages(&listing.take_notices()), vec![DELETE_WARNING]);

    assert_eq!(listing.confirm_delete(token).await, DeleteOutcome::Deleted);
    assert_eq!(messages(&listing.take_notices()), vec![DELETED]);
    assert_eq!(listing.records().len(), 2);
    assert!(matches!(store.get(2).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn cancelled_or_stale_token_deletes_nothing() {
    let (store, _dir, mut listing) = seeded().await;

    let first = listing.request_delete(1);
    listing.cancel_delete(first);
    assert_eq!(listing.confirm_delete(first).await, DeleteOutcome::Cancelled);

    let stale = listing.request_delete(1);
    let _newer = listing.request_delete(3);
    assert_eq!(listing.confirm_delete(stale).await, DeleteOutcome::Cancelled);
    assert!(listing.pending_delete().is_some());

    assert_eq!(store.list().await.unwrap().len(), 3);
}

#[tokio::test]
async fn failed_delete_reports_error() {
    let (_store, _dir, mut listing) = seeded().await;
    let token = listing.request_delete(99);
    listing.take_notices();

    assert_eq!(listing.confirm_delete(token).await, DeleteOutcome::Failed);
    assert_eq!(messages(&listing.take_notices()), vec![DELETE_FAILED]);
}

// ── documents ──

#[tokio::test]
async fn listing_download_writes_pdf() {
    let (_store, dir, mut listing) = seeded().await;

    let path = listing.download_document(1, DocumentType::Pdf).await.unwrap();

    assert_eq!(path.parent(), Some(dir.path()));
    assert!(std::fs::read_to_string(&path).unwrap().contains("OPP-001"));
    assert_eq!(
        messages(&listing.take_notices()),
        vec!["Génération du PDF en cours...", "PDF téléchargé avec succès!"]
    );
}

#[tokio::test]
async fn listing_download_of_unknown_id_fails() {
    let (_store, _dir, mut listing) = seeded().await;

    let err = listing.download_document(42, DocumentType::Word).await.unwrap_err();

    assert!(matches!(err, DocumentError::Generate(StoreError::NotFound)));
    let notices = listing.take_notices();
    assert_eq!(notices[1].message, "Erreur lors de la génération du word.");
}

// ── failing store ──

/// Every call fails as if the server were down; documents come back unnamed.
struct DownStore;

#[async_trait]
impl ProposalStore for DownStore {
    async fn list(&self) -> Result<Vec<PersistedProposal>, StoreError> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn get(
        &self,
        _id: ProposalId,
    ) -> Result<PersistedProposal, StoreError> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn create(
        &self,
        _payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn update(
        &self,
        _id: ProposalId,
        _payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn delete(
        &self,
        _id: ProposalId,
    ) -> Result<(), StoreError> {
        Err(StoreError::Connection("refused".into()))
    }

    async fn history(
        &self,
        _id: ProposalId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        Err(StoreError::Server {
            status: 500,
            body: "boom".into(),
        })
    }
}

#[async_trait]
impl DocumentGenerator for DownStore {
    async fn generate(
        &self,
        _id: ProposalId,
        _doc_type: DocumentType,
    ) -> Result<GeneratedDocument, StoreError> {
        Ok(GeneratedDocument {
            bytes: b"docx".to_vec(),
            filename: None,
            content_type: None,
        })
    }
}

fn down_listing(dir: &TempDir) -> ListingController {
    let store = Arc::new(DownStore);
    let backend = Backend {
        store: store.clone(),
        documents: store,
    };
    ListingController::new(backend, DocumentSaver::new(dir.path()))
}

#[tokio::test]
async fn failed_refresh_keeps_state_and_notifies() {
    let dir = tempfile::tempdir().unwrap();
    let mut listing = down_listing(&dir);

    assert!(listing.refresh().await.is_err());

    assert!(listing.records().is_empty());
    assert!(!listing.is_loading());
    assert_eq!(messages(&listing.take_notices()), vec![LIST_FAILED]);
}

#[tokio::test]
async fn failed_history_is_empty_with_notice() {
    let dir = tempfile::tempdir().unwrap();
    let mut listing = down_listing(&dir);

    assert!(listing.show_history(1).await.is_empty());
    assert_eq!(messages(&listing.take_notices()), vec![HISTORY_FAILED]);
}

#[tokio::test]
async fn unnamed_document_falls_back_to_id() {
    let dir = tempfile::tempdir().unwrap();
    let mut listing = down_listing(&dir);

    let path = listing.download_document(7, DocumentType::Word).await.unwrap();

    assert_eq!(path, dir.path().join("proposition_7.docx"));
}
