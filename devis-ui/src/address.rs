//! Debounced address lookup for the site address field.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use devis_core::{AddressGeocoder, AddressQuery, AddressSuggestion, GeoPoint};
use tokio::task::JoinHandle;

/// Queries of this many characters or fewer are never sent.
pub const MIN_QUERY_CHARS: usize = 3;

pub const SEARCH_FAILED: &str = "Erreur lors de la recherche d'adresse.";

#[derive(Debug, Clone, PartialEq)]
pub struct AddressSearchSettings {
    pub bias: GeoPoint,
    pub limit: usize,
    pub debounce: Duration,
}

impl Default for AddressSearchSettings {
    fn default() -> Self {
        Self {
            bias: GeoPoint::PARIS,
            limit: AddressQuery::DEFAULT_LIMIT,
            debounce: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Default)]
struct SearchState {
    suggestions: Vec<AddressSuggestion>,
    failed: bool,
}

fn lock(state: &Mutex<SearchState>) -> MutexGuard<'_, SearchState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one geocoder query per pause in typing.
///
/// Each input bumps a query token and aborts the pending task. A task only
/// writes its results while its token is still the latest, so a slow answer
/// for an older query never replaces newer suggestions.
///
/// Must be driven from inside a tokio runtime.
pub struct AddressSearch {
    geocoder: Arc<dyn AddressGeocoder>,
    settings: AddressSearchSettings,
    state: Arc<Mutex<SearchState>>,
    latest: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
}

impl AddressSearch {
    pub fn new(
        geocoder: Arc<dyn AddressGeocoder>,
        settings: AddressSearchSettings,
    ) -> Self {
        Self {
            geocoder,
            settings,
            state: Arc::new(Mutex::new(SearchState::default())),
            latest: Arc::new(AtomicU64::new(0)),
            pending: None,
        }
    }

    /// Cancels whatever is in flight and returns the token for the next query.
    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records a new value of the address field.
    pub fn input(
        &mut self,
        text: &str,
    ) {
        let token = self.supersede();
        if text.chars().count() <= MIN_QUERY_CHARS {
            lock(&self.state).suggestions.clear();
            return;
        }

        let query = AddressQuery::new(text)
            .with_bias(self.settings.bias)
            .with_limit(self.settings.limit);
        let geocoder = Arc::clone(&self.geocoder);
        let state = Arc::clone(&self.state);
        let latest = Arc::clone(&self.latest);
        let debounce = self.settings.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != token {
                return;
            }
            let result = geocoder.search(&query).await;

            let mut state = lock(&state);
            if latest.load(Ordering::SeqCst) != token {
                tracing::debug!(q = %query.text, "discarding stale address results");
                return;
            }
            match result {
                Ok(suggestions) => {
                    tracing::debug!(q = %query.text, count = suggestions.len(), "address suggestions");
                    state.suggestions = suggestions;
                }
                Err(e) => {
                    tracing::warn!(q = %query.text, error = %e, "address search failed");
                    state.suggestions.clear();
                    state.failed = true;
                }
            }
        }));
    }

    /// Waits for the pending search, if any, to finish.
    pub async fn settle(&mut self) {
        if let Some(handle) = self.pending.take() {
            let _ = handle.await;
        }
    }

    pub fn is_searching(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn suggestions(&self) -> Vec<AddressSuggestion> {
        lock(&self.state).suggestions.clone()
    }

    /// Returns and resets the failure flag set by the last failed search.
    pub fn take_failure(&self) -> bool {
        std::mem::take(&mut lock(&self.state).failed)
    }

    /// Takes the suggestion at `index` and clears the list.
    pub fn choose(
        &mut self,
        index: usize,
    ) -> Option<AddressSuggestion> {
        let picked = lock(&self.state).suggestions.get(index).cloned();
        if picked.is_some() {
            self.clear();
        }
        picked
    }

    pub fn clear(&mut self) {
        self.supersede();
        let mut state = lock(&self.state);
        state.suggestions.clear();
        state.failed = false;
    }
}

impl Drop for AddressSearch {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
