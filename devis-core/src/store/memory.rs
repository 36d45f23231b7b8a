//! In-process store applying the same rules as the proposal API.
//!
//! Used for offline work and as the backend of the controller tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Local, Utc};
use rust_decimal::Decimal;
use serde_json::{Value, json};

use super::factory::{Backend, StoreConfig, StoreFactory};
use super::repository::{DocumentGenerator, ProposalStore, StoreError, ValidationErrors};
use crate::calculations::StoredPremiums;
use crate::models::wire::DecimalLimit;
use crate::models::{
    CREATED_STATUS, DocumentType, FieldChange, GeneratedDocument, GuaranteeType, HistoryEntry,
    PersistedProposal, ProposalId, ProposalPayload,
};

pub const MSG_BLANK: &str = "Ce champ ne peut être vide.";
pub const MSG_DUPLICATE_OPPORTUNITY: &str =
    "Un objet Proposition de devis avec ce champ Numéro d'opportunité existe déjà.";
pub const MSG_TRC_WITH_DESTINATION: &str = "Pour une destination 'Habitation', la garantie 'TRC seule' n'est pas autorisée. Veuillez choisir 'DO seule'.";
pub const MSG_DESTINATION_WITH_TRC: &str =
    "La destination 'Habitation' n'est compatible qu'avec la garantie 'DO seule'.";
pub const MSG_DO_RATE_REQUIRED: &str =
    "Le taux DO est requis pour le type de garantie 'DO seule' si le coût de l'ouvrage est > 0.";
pub const MSG_TRC_RATE_REQUIRED: &str =
    "Le taux TRC est requis pour le type de garantie 'TRC seule' si le coût de l'ouvrage est > 0.";
pub const MSG_NEGATIVE: &str = "Assurez-vous que cette valeur est supérieure ou égale à 0.";

fn too_large_message(limit: DecimalLimit) -> String {
    format!(
        "Assurez-vous qu'il n'y a pas plus de {} chiffres au total, dont {} après la virgule.",
        limit.max_digits, limit.decimal_places
    )
}

const LOCAL_IP: &str = "127.0.0.1";

#[derive(Debug, Default)]
struct MemoryState {
    next_id: ProposalId,
    next_history_id: i64,
    proposals: BTreeMap<ProposalId, PersistedProposal>,
    history: Vec<(ProposalId, HistoryEntry)>,
}

impl MemoryState {
    fn record_history(
        &mut self,
        proposal: ProposalId,
        changes: BTreeMap<String, FieldChange>,
        user_ip: Option<String>,
    ) {
        self.next_history_id += 1;
        self.history.push((
            proposal,
            HistoryEntry {
                id: self.next_history_id,
                timestamp: Utc::now(),
                user_ip,
                changes,
            },
        ));
    }

    fn opportunity_taken(
        &self,
        opportunity_number: &str,
        except: Option<ProposalId>,
    ) -> bool {
        self.proposals
            .values()
            .any(|p| p.opportunity_number == opportunity_number && Some(p.id) != except)
    }
}

/// Proposal store held entirely in memory.
#[derive(Debug)]
pub struct MemoryProposalStore {
    state: Mutex<MemoryState>,
    user_ip: Option<String>,
}

impl MemoryProposalStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            user_ip: Some(LOCAL_IP.to_string()),
        }
    }

    /// Records history entries with `user_ip` instead of the loopback
    /// address.
    pub fn with_user_ip(
        mut self,
        user_ip: Option<String>,
    ) -> Self {
        self.user_ip = user_ip;
        self
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Connection("memory store lock poisoned".to_string()))
    }

    fn validate(
        payload: &ProposalPayload,
        state: &MemoryState,
        except: Option<ProposalId>,
    ) -> Result<(), StoreError> {
        let mut errors = ValidationErrors::new();

        if payload.opportunity_number.trim().is_empty() {
            errors.add("opportunity_number", MSG_BLANK);
        } else if state.opportunity_taken(&payload.opportunity_number, except) {
            errors.add("opportunity_number", MSG_DUPLICATE_OPPORTUNITY);
        }
        if payload.client_name.trim().is_empty() {
            errors.add("client_name", MSG_BLANK);
        }
        for (field, value, limit) in [
            ("ouvrage_cost", Some(payload.ouvrage_cost), DecimalLimit::COST),
            ("trc_rate", payload.trc_rate, DecimalLimit::RATE),
            ("do_rate", payload.do_rate, DecimalLimit::RATE),
        ] {
            if value.is_some_and(|v| v < Decimal::ZERO) {
                errors.add(field, MSG_NEGATIVE);
            } else if value.is_some_and(|v| !limit.admits(v)) {
                errors.add(field, too_large_message(limit));
            }
        }

        if payload.ouvrage_destination.is_some() && payload.guarantee_type == GuaranteeType::Trc {
            errors.add("guarantee_type", MSG_TRC_WITH_DESTINATION);
            errors.add("ouvrage_destination", MSG_DESTINATION_WITH_TRC);
        }
        let costly = payload.ouvrage_cost > Decimal::ZERO;
        if payload.guarantee_type == GuaranteeType::Do && payload.do_rate.is_none() && costly {
            errors.add("do_rate", MSG_DO_RATE_REQUIRED);
        }
        if payload.guarantee_type == GuaranteeType::Trc && payload.trc_rate.is_none() && costly {
            errors.add("trc_rate", MSG_TRC_RATE_REQUIRED);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreError::Validation(errors))
        }
    }
}

impl Default for MemoryProposalStore {
    fn default() -> Self {
        Self::new()
    }
}

fn build_record(
    id: ProposalId,
    payload: &ProposalPayload,
    created_at: Option<chrono::DateTime<Utc>>,
) -> PersistedProposal {
    let premiums = StoredPremiums::from_payload(payload);
    let now = Utc::now();
    PersistedProposal {
        id,
        opportunity_number: payload.opportunity_number.clone(),
        client_name: payload.client_name.clone(),
        guarantee_type: payload.guarantee_type,
        ouvrage_destination: payload.ouvrage_destination,
        work_type: payload.work_type,
        ouvrage_cost: Some(payload.ouvrage_cost),
        address_chantier: payload.address_chantier.clone(),
        ouvrage_description: payload.ouvrage_description.clone(),
        existing_presence: payload.existing_presence,
        is_vip_client: payload.is_vip_client,
        rcmo_desired: payload.rcmo_desired,
        trc_rate: payload.trc_rate,
        do_rate: payload.do_rate,
        prime_seule_tarif_trc: premiums.prime_seule_tarif_trc,
        prime_seule_tarif_do: premiums.prime_seule_tarif_do,
        prime_seule_tarif_duo: premiums.prime_seule_tarif_duo,
        created_at: created_at.or(Some(now)),
        updated_at: Some(now),
    }
}

fn decimal_value(value: Option<Decimal>) -> Value {
    value
        .map(|d| Value::String(d.normalize().to_string()))
        .unwrap_or(Value::Null)
}

/// Audited fields of a record. Decimals are normalized so that `1000.00`
/// and `1000` do not register as a change.
fn audit_values(record: &PersistedProposal) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([
        ("opportunity_number", json!(record.opportunity_number)),
        ("client_name", json!(record.client_name)),
        ("guarantee_type", json!(record.guarantee_type.as_str())),
        (
            "ouvrage_destination",
            json!(record.ouvrage_destination.map(|d| d.as_str()).unwrap_or("")),
        ),
        ("work_type", json!(record.work_type.as_str())),
        ("ouvrage_cost", decimal_value(record.ouvrage_cost)),
        ("address_chantier", json!(record.address_chantier)),
        ("ouvrage_description", json!(record.ouvrage_description)),
        ("existing_presence", json!(record.existing_presence)),
        ("is_vip_client", json!(record.is_vip_client)),
        ("rcmo_desired", json!(record.rcmo_desired)),
        ("trc_rate", decimal_value(record.trc_rate)),
        ("do_rate", decimal_value(record.do_rate)),
        ("prime_seule_tarif_trc", decimal_value(record.prime_seule_tarif_trc)),
        ("prime_seule_tarif_do", decimal_value(record.prime_seule_tarif_do)),
        ("prime_seule_tarif_duo", decimal_value(record.prime_seule_tarif_duo)),
    ])
}

fn diff(
    old: &PersistedProposal,
    new: &PersistedProposal,
) -> BTreeMap<String, FieldChange> {
    let before = audit_values(old);
    audit_values(new)
        .into_iter()
        .filter_map(|(field, after)| {
            let previous = before.get(field).cloned().unwrap_or(Value::Null);
            (previous != after).then(|| (field.to_string(), FieldChange::new(previous, after)))
        })
        .collect()
}

#[async_trait]
impl ProposalStore for MemoryProposalStore {
    async fn list(&self) -> Result<Vec<PersistedProposal>, StoreError> {
        let state = self.state()?;
        Ok(state.proposals.values().cloned().collect())
    }

    async fn get(
        &self,
        id: ProposalId,
    ) -> Result<PersistedProposal, StoreError> {
        let state = self.state()?;
        state.proposals.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(
        &self,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        let mut state = self.state()?;
        Self::validate(payload, &state, None)?;

        state.next_id += 1;
        let record = build_record(state.next_id, payload, None);
        state.proposals.insert(record.id, record.clone());

        let changes = BTreeMap::from([(
            "status".to_string(),
            FieldChange::new(Value::Null, json!(CREATED_STATUS)),
        )]);
        state.record_history(record.id, changes, self.user_ip.clone());

        tracing::info!(id = record.id, opportunity = %record.opportunity_number, "proposal created");
        Ok(record)
    }

    async fn update(
        &self,
        id: ProposalId,
        payload: &ProposalPayload,
    ) -> Result<PersistedProposal, StoreError> {
        let mut state = self.state()?;
        let previous = state.proposals.get(&id).cloned().ok_or(StoreError::NotFound)?;
        Self::validate(payload, &state, Some(id))?;

        let record = build_record(id, payload, previous.created_at);
        let changes = diff(&previous, &record);
        state.proposals.insert(id, record.clone());
        if !changes.is_empty() {
            state.record_history(id, changes, self.user_ip.clone());
        }

        tracing::info!(id, opportunity = %record.opportunity_number, "proposal updated");
        Ok(record)
    }

    async fn delete(
        &self,
        id: ProposalId,
    ) -> Result<(), StoreError> {
        let mut state = self.state()?;
        state.proposals.remove(&id).ok_or(StoreError::NotFound)?;
        state.history.retain(|(proposal, _)| *proposal != id);
        tracing::info!(id, "proposal deleted");
        Ok(())
    }

    async fn history(
        &self,
        id: ProposalId,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let state = self.state()?;
        if !state.proposals.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        let mut entries: Vec<HistoryEntry> = state
            .history
            .iter()
            .filter(|(proposal, _)| *proposal == id)
            .map(|(_, entry)| entry.clone())
            .collect();
        entries.sort_by(|a, b| (b.timestamp, b.id).cmp(&(a.timestamp, a.id)));
        Ok(entries)
    }
}

/// Produces a plain-text stand-in for the generated document; only the
/// naming and content type follow the real generator.
#[async_trait]
impl DocumentGenerator for MemoryProposalStore {
    async fn generate(
        &self,
        id: ProposalId,
        doc_type: DocumentType,
    ) -> Result<GeneratedDocument, StoreError> {
        let state = self.state()?;
        let record = state.proposals.get(&id).ok_or(StoreError::NotFound)?;

        let body = format!(
            "Proposition commerciale {}\nClient: {}\nGarantie: {}\nPrime: {}\n",
            record.opportunity_number,
            record.client_name,
            record.guarantee_type.label(),
            record
                .prime_seule_tarif_duo
                .map(|p| p.to_string())
                .unwrap_or_default(),
        );
        let filename =
            doc_type.generated_filename(&record.opportunity_number, Local::now().naive_local());

        tracing::debug!(id, %filename, "document generated");
        Ok(GeneratedDocument {
            bytes: body.into_bytes(),
            filename: Some(filename),
            content_type: Some(doc_type.content_type().to_string()),
        })
    }
}

/// Factory for the `memory` backend. Every `create` starts from an empty
/// store.
pub struct MemoryStoreFactory;

#[async_trait]
impl StoreFactory for MemoryStoreFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &StoreConfig,
    ) -> Result<Backend, StoreError> {
        let store = Arc::new(MemoryProposalStore::new());
        Ok(Backend {
            store: store.clone(),
            documents: store,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{FieldUpdate, OuvrageDestination, ProposalDraft};

    fn payload(
        opportunity: &str,
        guarantee: GuaranteeType,
    ) -> ProposalPayload {
        let mut draft = ProposalDraft::default();
        draft.apply(FieldUpdate::OpportunityNumber(opportunity.into()));
        draft.apply(FieldUpdate::ClientName("Dupont".into()));
        draft.apply(FieldUpdate::GuaranteeType(guarantee));
        draft.apply(FieldUpdate::OuvrageCost(Some(dec!(100000))));
        draft.apply(FieldUpdate::TrcRate(Some(dec!(0.01))));
        draft.apply(FieldUpdate::DoRate(Some(dec!(0.02))));
        if guarantee.requires_destination() {
            draft.apply(FieldUpdate::OuvrageDestination(Some(OuvrageDestination::Habitation)));
        }
        draft.to_payload()
    }

    #[tokio::test]
    async fn create_assigns_id_and_stored_premiums() {
        let store = MemoryProposalStore::new();

        let record = store.create(&payload("OPP-1", GuaranteeType::Duo)).await.unwrap();

        assert_eq!(record.id, 1);
        assert_eq!(record.prime_seule_tarif_trc, Some(dec!(1000)));
        assert_eq!(record.prime_seule_tarif_do, Some(dec!(2000)));
        assert_eq!(record.prime_seule_tarif_duo, Some(dec!(3000)));
        assert!(record.created_at.is_some());
    }

    #[tokio::test]
    async fn create_rejects_duplicate_opportunity() {
        let store = MemoryProposalStore::new();
        store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        let err = store.create(&payload("OPP-1", GuaranteeType::Do)).await.unwrap_err();

        assert_eq!(err.server_message(), Some(MSG_DUPLICATE_OPPORTUNITY.to_string()));
    }

    #[tokio::test]
    async fn oversized_cost_is_rejected_and_store_stays_usable() {
        let store = MemoryProposalStore::new();
        let mut huge = payload("OPP-1", GuaranteeType::Duo);
        huge.ouvrage_cost = Decimal::MAX;

        let err = store.create(&huge).await.unwrap_err();

        assert_eq!(
            err.server_message(),
            Some("Assurez-vous qu'il n'y a pas plus de 12 chiffres au total, dont 2 après la virgule.".to_string())
        );
        assert!(store.create(&payload("OPP-1", GuaranteeType::Duo)).await.is_ok());
    }

    #[tokio::test]
    async fn update_may_keep_its_own_opportunity() {
        let store = MemoryProposalStore::new();
        let record = store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        let result = store.update(record.id, &payload("OPP-1", GuaranteeType::Trc)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn trc_with_destination_is_rejected() {
        let store = MemoryProposalStore::new();
        let mut p = payload("OPP-1", GuaranteeType::Trc);
        p.ouvrage_destination = Some(OuvrageDestination::Habitation);

        let err = store.create(&p).await.unwrap_err();

        let StoreError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.fields.contains_key("guarantee_type"));
        assert!(errors.fields.contains_key("ouvrage_destination"));
    }

    #[tokio::test]
    async fn missing_rate_is_only_required_with_a_cost() {
        let store = MemoryProposalStore::new();
        let mut p = payload("OPP-1", GuaranteeType::Do);
        p.do_rate = None;

        let err = store.create(&p).await.unwrap_err();
        assert_eq!(err.server_message(), Some(MSG_DO_RATE_REQUIRED.to_string()));

        p.ouvrage_cost = dec!(0);
        assert!(store.create(&p).await.is_ok());
    }

    #[tokio::test]
    async fn history_records_creation_then_diffs_newest_first() {
        let store = MemoryProposalStore::new();
        let record = store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();
        let mut changed = payload("OPP-1", GuaranteeType::Trc);
        changed.client_name = "Durand".into();
        changed.ouvrage_cost = dec!(100000.00);
        store.update(record.id, &changed).await.unwrap();

        let history = store.history(record.id).await.unwrap();

        assert_eq!(history.len(), 2);
        assert!(history[1].is_creation());
        assert_eq!(history[1].user_ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(
            history[0].changes.keys().collect::<Vec<_>>(),
            vec!["client_name"]
        );
        assert_eq!(history[0].changes["client_name"].old, json!("Dupont"));
    }

    #[tokio::test]
    async fn unchanged_update_writes_no_history() {
        let store = MemoryProposalStore::new();
        let record = store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        store.update(record.id, &payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        assert_eq!(store.history(record.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_removes_record_and_history() {
        let store = MemoryProposalStore::new();
        let record = store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        store.delete(record.id).await.unwrap();

        assert_eq!(store.get(record.id).await, Err(StoreError::NotFound));
        assert_eq!(store.history(record.id).await, Err(StoreError::NotFound));
        assert_eq!(store.delete(record.id).await, Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn generated_document_is_named_after_opportunity() {
        let store = MemoryProposalStore::new();
        let record = store.create(&payload("OPP-1", GuaranteeType::Trc)).await.unwrap();

        let doc = store.generate(record.id, DocumentType::Word).await.unwrap();

        let name = doc.filename.unwrap();
        assert!(name.starts_with("Proposition_commerciale_OPP-1_"));
        assert!(name.ends_with(".docx"));
        assert!(!doc.bytes.is_empty());
    }

    #[tokio::test]
    async fn factory_builds_empty_store() {
        let backend = MemoryStoreFactory.create(&StoreConfig::default()).await.unwrap();

        assert!(backend.store.list().await.unwrap().is_empty());
    }
}
