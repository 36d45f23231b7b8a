use std::sync::Arc;

use devis_core::AddressGeocoder;
use devis_core::store::{Backend, MemoryStoreFactory, StoreRegistry};
use devis_http::{AdresseGeocoder, HttpStoreFactory};

use crate::address::{AddressSearch, AddressSearchSettings};
use crate::config::AppConfig;
use crate::documents::DocumentSaver;
use crate::form::ProposalFormController;
use crate::listing::ListingController;

/// Registry with every backend this build knows about.
pub fn build_registry() -> StoreRegistry {
    let mut registry = StoreRegistry::new();
    registry.register(Box::new(HttpStoreFactory));
    registry.register(Box::new(MemoryStoreFactory));
    registry
}

/// Everything the controllers need, built once from the configuration.
#[derive(Clone)]
pub struct Services {
    pub backend: Backend,
    pub geocoder: Arc<dyn AddressGeocoder>,
    pub search: AddressSearchSettings,
    pub saver: DocumentSaver,
}

impl Services {
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        tracing::debug!(backend = %config.store.backend, "creating store");
        let backend = build_registry().create(&config.store).await?;
        Ok(Self {
            backend,
            geocoder: Arc::new(AdresseGeocoder::new(&config.geocoder.endpoint)),
            search: config.geocoder.search_settings(),
            saver: DocumentSaver::new(&config.downloads.directory),
        })
    }

    pub fn address_search(&self) -> AddressSearch {
        AddressSearch::new(Arc::clone(&self.geocoder), self.search.clone())
    }

    pub fn form(&self) -> ProposalFormController {
        ProposalFormController::new(self.backend.clone(), self.address_search(), self.saver.clone())
    }

    pub fn listing(&self) -> ListingController {
        ListingController::new(self.backend.clone(), self.saver.clone())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registry_knows_http_and_memory() {
        assert_eq!(build_registry().available_backends(), vec!["http", "memory"]);
    }

    #[tokio::test]
    async fn unknown_backend_is_a_configuration_error() {
        let mut config = AppConfig::default();
        config.store.backend = "postgres".into();

        let err = Services::from_config(&config).await.err().unwrap();

        assert!(err.to_string().contains("memory"));
    }
}
