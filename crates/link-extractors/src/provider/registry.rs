use std::sync::Arc;

use link_cache::{MapOperation, ObservableMap};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::Provider;
use crate::error::ExtractorError;

pub type ProviderOperation = MapOperation<String, Arc<dyn Provider>>;

/// Explicitly registered providers, keyed by id. Every registration change is
/// broadcast so derived views (see [`CatalogAggregator`](super::catalog::CatalogAggregator))
/// can follow along.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: ObservableMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `provider`, replacing and returning any provider with the same id.
    pub fn register(&self, provider: Arc<dyn Provider>) -> Option<Arc<dyn Provider>> {
        let id = provider.id().to_string();
        let previous = self.providers.insert(id.clone(), provider);
        info!(provider = %id, replaced = previous.is_some(), "provider registered");
        previous
    }

    pub fn unregister(&self, id: &str) -> Option<Arc<dyn Provider>> {
        let removed = self.providers.remove(&id.to_string());
        if removed.is_some() {
            info!(provider = %id, "provider unregistered");
        } else {
            debug!(provider = %id, "unregister of unknown provider ignored");
        }
        removed
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(&id.to_string())
    }

    pub fn require(&self, id: &str) -> Result<Arc<dyn Provider>, ExtractorError> {
        self.get(id)
            .ok_or_else(|| ExtractorError::ProviderNotFound(id.to_string()))
    }

    /// Registered ids in sorted order.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.providers.snapshot().into_iter().map(|(id, _)| id).collect();
        ids.sort();
        ids
    }

    /// Registered providers, sorted by id.
    pub fn providers(&self) -> Vec<Arc<dyn Provider>> {
        let mut entries = self.providers.snapshot();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter().map(|(_, provider)| provider).collect()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProviderOperation> {
        self.providers.subscribe()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
