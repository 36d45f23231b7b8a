use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{DocumentGenerator, ProposalStore, StoreError};

/// Backend-agnostic store configuration.
///
/// `backend` must match the [`StoreFactory::backend_name`] of a registered
/// factory. `base_url` is forwarded unchanged; backends that keep everything
/// in process ignore it.
///
/// | backend  | base_url example                  |
/// |----------|-----------------------------------|
/// | `http`   | `http://localhost:8000/api/`      |
/// | `memory` | (ignored)                         |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"http"`).
    pub backend: String,
    /// Root of the proposal API.
    pub base_url: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: "http".to_string(),
            base_url: "http://localhost:8000/api/".to_string(),
        }
    }
}

/// The collaborators a backend provides. Both handles may point at the same
/// object.
#[derive(Clone)]
pub struct Backend {
    pub store: Arc<dyn ProposalStore>,
    pub documents: Arc<dyn DocumentGenerator>,
}

/// One implementation per backend. Each backend crate exports a unit struct
/// implementing this trait, registered with a [`StoreRegistry`] at startup.
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<Backend, StoreError>;
}

/// Registry of [`StoreFactory`] instances, keyed by backend name.
pub struct StoreRegistry {
    factories: HashMap<&'static str, Box<dyn StoreFactory>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory, replacing any previous one of the same
    /// name.
    pub fn register(
        &mut self,
        factory: Box<dyn StoreFactory>,
    ) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory matching `config.backend`.
    ///
    /// # Errors
    /// * [`StoreError::Configuration`] when no factory is registered under
    ///   the requested name.
    /// * Any error the chosen factory returns.
    pub async fn create(
        &self,
        config: &StoreConfig,
    ) -> Result<Backend, StoreError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                StoreError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        tracing::debug!(backend = %config.backend, base_url = %config.base_url, "creating store backend");
        factory.create(config).await
    }
}

impl Default for StoreRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// tests
// ─────────────────────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::{Backend, StoreConfig, StoreError, StoreFactory, StoreRegistry};
    use crate::store::memory::MemoryProposalStore;

    // ── stub factory ─────────────────────────────────────────────────────
    /// Flips an `AtomicBool` in `create` so tests can prove dispatch
    /// happened.
    struct StubFactory {
        name: &'static str,
        called: Arc<AtomicBool>,
    }

    #[async_trait]
    impl StoreFactory for StubFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &StoreConfig,
        ) -> Result<Backend, StoreError> {
            self.called.store(true, Ordering::SeqCst);
            let store = Arc::new(MemoryProposalStore::new());
            Ok(Backend {
                store: store.clone(),
                documents: store,
            })
        }
    }

    struct FailingFactory;

    #[async_trait]
    impl StoreFactory for FailingFactory {
        fn backend_name(&self) -> &'static str {
            "failing"
        }

        async fn create(
            &self,
            _config: &StoreConfig,
        ) -> Result<Backend, StoreError> {
            Err(StoreError::Connection("intentional failure".to_string()))
        }
    }

    fn stub_factory(name: &'static str) -> (Box<dyn StoreFactory>, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            Box::new(StubFactory {
                name,
                called: flag.clone(),
            }),
            flag,
        )
    }

    fn config(backend: &str) -> StoreConfig {
        StoreConfig {
            backend: backend.to_string(),
            ..StoreConfig::default()
        }
    }

    // ── StoreConfig ──────────────────────────────────────────────────────
    #[test]
    fn config_default_targets_local_api() {
        let cfg = StoreConfig::default();
        assert_eq!(cfg.backend, "http");
        assert_eq!(cfg.base_url, "http://localhost:8000/api/");
    }

    // ── registration ─────────────────────────────────────────────────────
    #[test]
    fn new_registry_has_no_backends() {
        assert!(StoreRegistry::new().available_backends().is_empty());
    }

    #[test]
    fn available_backends_is_sorted() {
        let mut reg = StoreRegistry::new();
        let (f1, _) = stub_factory("memory");
        let (f2, _) = stub_factory("http");
        reg.register(f1);
        reg.register(f2);
        assert_eq!(reg.available_backends(), vec!["http", "memory"]);
    }

    #[test]
    fn duplicate_registration_replaces_previous() {
        let mut reg = StoreRegistry::new();
        let (old, _) = stub_factory("http");
        let (new, _) = stub_factory("http");
        reg.register(old);
        reg.register(new);
        assert_eq!(reg.available_backends(), vec!["http"]);
    }

    // ── dispatch ─────────────────────────────────────────────────────────
    #[tokio::test]
    async fn create_calls_matching_factory_only() {
        let mut reg = StoreRegistry::new();
        let (http, http_called) = stub_factory("http");
        let (memory, memory_called) = stub_factory("memory");
        reg.register(http);
        reg.register(memory);

        let result = reg.create(&config("memory")).await;

        assert!(result.is_ok());
        assert!(memory_called.load(Ordering::SeqCst));
        assert!(!http_called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn configuration_error_names_requested_and_available_backends() {
        let mut reg = StoreRegistry::new();
        let (f, _) = stub_factory("memory");
        reg.register(f);

        match reg.create(&config("postgres")).await {
            Err(StoreError::Configuration(msg)) => {
                assert!(msg.contains("postgres"), "error should name the requested backend");
                assert!(msg.contains("memory"), "error should list available backends");
            }
            Err(other) => panic!("expected Configuration error, got {other:#?}"),
            Ok(_) => panic!("expected Configuration error, got a backend"),
        }
    }

    #[tokio::test]
    async fn create_propagates_factory_error() {
        let mut reg = StoreRegistry::new();
        reg.register(Box::new(FailingFactory));

        let result = reg.create(&config("failing")).await;

        assert!(matches!(
            result,
            Err(StoreError::Connection(msg)) if msg == "intentional failure"
        ));
    }
}
