use std::sync::{Arc, Weak};

use link_cache::{
    CollectionsOperationHandler, ListOperation, MapOperation, ObservableList,
    spawn_operation_handler,
};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::Provider;
use super::models::Catalog;
use super::registry::{ProviderOperation, ProviderRegistry};

/// Union of the catalogs of every registered provider, kept in sync with the
/// registry.
pub struct CatalogAggregator {
    catalogs: ObservableList<Catalog>,
    registry: Weak<ProviderRegistry>,
}

impl CatalogAggregator {
    /// Seeds the aggregate from the providers already registered and starts
    /// following the registry. The task ends when the registry is dropped.
    pub fn attach(registry: &Arc<ProviderRegistry>) -> (Arc<Self>, JoinHandle<()>) {
        // Subscribe before seeding so no registration falls in between;
        // replayed additions are ignored.
        let receiver = registry.subscribe();
        let aggregator = Arc::new(Self {
            catalogs: ObservableList::new(),
            registry: Arc::downgrade(registry),
        });
        for provider in registry.providers() {
            aggregator.add_provider(provider.as_ref());
        }
        let task = spawn_operation_handler(receiver, Arc::clone(&aggregator));
        (aggregator, task)
    }

    pub fn catalogs(&self) -> Vec<Catalog> {
        self.catalogs.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ListOperation<Catalog>> {
        self.catalogs.subscribe()
    }

    fn contributes(&self, provider_id: &str) -> bool {
        self.catalogs
            .snapshot()
            .iter()
            .any(|catalog| catalog.provider_id == provider_id)
    }

    fn add_provider(&self, provider: &dyn Provider) {
        if self.contributes(provider.id()) {
            return;
        }
        let catalogs = provider.catalogs();
        debug!(provider = %provider.id(), count = catalogs.len(), "adding provider catalogs");
        for catalog in catalogs {
            self.catalogs.add(catalog);
        }
    }

    fn remove_provider(&self, provider_id: &str) {
        let removed = self
            .catalogs
            .remove_if(|catalog| catalog.provider_id == provider_id);
        debug!(provider = %provider_id, count = removed.len(), "removed provider catalogs");
    }
}

impl CollectionsOperationHandler<ProviderOperation> for CatalogAggregator {
    fn handle_operation(&self, operation: ProviderOperation) {
        match operation {
            MapOperation::Add { value, .. } => self.add_provider(value.as_ref()),
            MapOperation::Remove { key, .. } => self.remove_provider(&key),
        }
    }

    fn on_lagged(&self, skipped: u64) {
        warn!(skipped, "catalog aggregator lagged, rebuilding from registry");
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        self.catalogs.clear();
        for provider in registry.providers() {
            self.add_provider(provider.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::provider::testing::FakeProvider;

    async fn wait_for(aggregator: &CatalogAggregator, expected: usize) -> Vec<Catalog> {
        for _ in 0..100 {
            let catalogs = aggregator.catalogs();
            if catalogs.len() == expected {
                return catalogs;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        aggregator.catalogs()
    }

    #[tokio::test]
    async fn catalogs_follow_registrations() {
        let registry = Arc::new(ProviderRegistry::new());
        registry.register(Arc::new(
            FakeProvider::new("flixhq").with_catalogs(&["Trending", "Latest"]),
        ));

        let (aggregator, task) = CatalogAggregator::attach(&registry);
        assert_eq!(aggregator.catalogs().len(), 2);

        registry.register(Arc::new(FakeProvider::new("sflix").with_catalogs(&["Top"])));
        let catalogs = wait_for(&aggregator, 3).await;
        assert!(catalogs.iter().any(|c| c.provider_id == "sflix"));

        registry.unregister("flixhq");
        let catalogs = wait_for(&aggregator, 1).await;
        assert_eq!(catalogs, vec![Catalog::new("sflix", "Top", "https://sflix/Top")]);

        drop(registry);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn replacing_a_provider_swaps_its_catalogs() {
        let registry = Arc::new(ProviderRegistry::new());
        let (aggregator, _task) = CatalogAggregator::attach(&registry);

        registry.register(Arc::new(FakeProvider::new("flixhq").with_catalogs(&["Old"])));
        wait_for(&aggregator, 1).await;
        registry.register(Arc::new(
            FakeProvider::new("flixhq").with_catalogs(&["New", "Newer"]),
        ));

        let catalogs = wait_for(&aggregator, 2).await;
        let names: Vec<_> = catalogs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["New", "Newer"]);
    }
}
