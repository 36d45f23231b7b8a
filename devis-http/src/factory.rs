use std::sync::Arc;

use async_trait::async_trait;
use devis_core::StoreError;
use devis_core::store::{Backend, StoreConfig, StoreFactory};

use crate::repository::HttpProposalStore;

/// [`StoreFactory`] for the REST API.
///
/// Register this with a [`devis_core::store::StoreRegistry`] to make the
/// `"http"` backend available:
///
/// ```rust,no_run
/// use devis_core::store::StoreRegistry;
/// use devis_http::HttpStoreFactory;
///
/// let mut registry = StoreRegistry::new();
/// registry.register(Box::new(HttpStoreFactory));
/// ```
pub struct HttpStoreFactory;

#[async_trait]
impl StoreFactory for HttpStoreFactory {
    fn backend_name(&self) -> &'static str {
        "http"
    }

    /// Builds a client for `config.base_url`. No request is made until the
    /// first store call.
    async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<Backend, StoreError> {
        let base_url = config.base_url.trim();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(StoreError::Configuration(format!(
                "base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }
        let store = Arc::new(HttpProposalStore::new(base_url));
        Ok(Backend {
            store: store.clone(),
            documents: store,
        })
    }
}
