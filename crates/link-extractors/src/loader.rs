//! Load orchestration.
//!
//! Every provider runs in its own task with its own link channel. Links are
//! merged into the repository as they arrive, so the first stream is
//! observable long before the slowest provider finishes. A failing, slow or
//! cancelled provider only affects its own [`ProviderOutcome`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use link_cache::{CacheKey, CachedLinks, CachedLinksRepository, Episode, MediaLink};
use reqwest::header::HeaderMap;
use serde::Serialize;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};
use url::Url;

use crate::error::{ErrorKind, ExtractorError};
use crate::extractor::{AnyExtractor, LinkSink, link_channel};
use crate::provider::registry::ProviderRegistry;

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Links buffered between a provider and the repository.
    pub channel_capacity: usize,
    /// Upper bound for one provider's extraction; `None` waits forever.
    pub provider_timeout: Option<Duration>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 32,
            provider_timeout: Some(Duration::from_secs(60)),
        }
    }
}

/// What to load, and the metadata the cache entry is created with.
#[derive(Debug, Clone)]
pub struct LinkRequest {
    pub key: CacheKey,
    pub watch_id: String,
    pub thumbnail: Option<String>,
    pub episode: Option<Episode>,
}

impl LinkRequest {
    pub fn new(key: CacheKey) -> Self {
        Self {
            watch_id: key.film_id().to_string(),
            key,
            thumbnail: None,
            episode: None,
        }
    }

    pub fn with_watch_id(mut self, watch_id: impl Into<String>) -> Self {
        self.watch_id = watch_id.into();
        self
    }

    pub fn with_thumbnail(mut self, thumbnail: impl Into<String>) -> Self {
        self.thumbnail = Some(thumbnail.into());
        self
    }

    pub fn with_episode(mut self, episode: Episode) -> Self {
        self.episode = Some(episode);
        self
    }

    fn initial_links(&self) -> CachedLinks {
        let mut links = CachedLinks::new(&self.watch_id, self.key.provider_id.as_str());
        links.thumbnail = self.thumbnail.clone();
        links.episode = self.episode.clone();
        links
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Counts only links that were new to the cache entry.
    Success { streams: usize, subtitles: usize },
    NotFound,
    Failed { kind: ErrorKind, message: String },
}

impl LoadStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, LoadStatus::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOutcome {
    pub provider_id: String,
    pub status: LoadStatus,
}

/// Handle to a load running in the background.
#[derive(Debug)]
pub struct LoadHandle {
    task: JoinHandle<Vec<ProviderOutcome>>,
}

impl LoadHandle {
    /// Stops every provider task. Links merged so far stay cached.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the outcomes; `None` if the load was aborted.
    pub async fn join(self) -> Option<Vec<ProviderOutcome>> {
        self.task.await.ok()
    }
}

#[derive(Clone)]
pub struct LinkLoader {
    repository: Arc<CachedLinksRepository>,
    registry: Arc<ProviderRegistry>,
    config: LoaderConfig,
}

impl LinkLoader {
    pub fn new(
        repository: Arc<CachedLinksRepository>,
        registry: Arc<ProviderRegistry>,
        config: LoaderConfig,
    ) -> Self {
        Self {
            repository,
            registry,
            config,
        }
    }

    pub fn repository(&self) -> &Arc<CachedLinksRepository> {
        &self.repository
    }

    /// Queries every provider in `provider_ids` concurrently and merges their
    /// links into the entry of `request.key`. Outcomes are returned in the
    /// order of `provider_ids`.
    pub async fn load<S: AsRef<str>>(
        &self,
        request: LinkRequest,
        provider_ids: &[S],
    ) -> Vec<ProviderOutcome> {
        self.repository
            .get_or_insert_with(&request.key, || request.initial_links());

        let mut outcomes: Vec<Option<ProviderOutcome>> = vec![None; provider_ids.len()];
        // Dropping the set (e.g. when the surrounding task is aborted) aborts
        // every provider task.
        let mut tasks = JoinSet::new();

        for (index, id) in provider_ids.iter().enumerate() {
            let id = id.as_ref();
            let provider = match self.registry.require(id) {
                Ok(provider) => provider,
                Err(e) => {
                    warn!(provider = %id, "skipping unknown provider");
                    outcomes[index] = Some(ProviderOutcome {
                        provider_id: id.to_string(),
                        status: failed(e),
                    });
                    continue;
                }
            };

            let repository = Arc::clone(&self.repository);
            let config = self.config.clone();
            let key = request.key.clone();
            let provider_id = id.to_string();
            tasks.spawn(async move {
                debug!(provider = %provider_id, key = %key, "loading links");
                let film_id = key.film_id().to_string();
                let (season, episode) = (key.season(), key.episode());
                let status = drive(&repository, &key, &config, move |sink| async move {
                    provider
                        .source_links(&film_id, season, episode, &sink)
                        .await
                })
                .await;
                debug!(provider = %provider_id, key = %key, ?status, "provider finished");
                (
                    index,
                    ProviderOutcome {
                        provider_id,
                        status,
                    },
                )
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!(error = %e, "provider task did not complete"),
            }
        }

        outcomes
            .into_iter()
            .zip(provider_ids)
            .map(|(outcome, id)| {
                outcome.unwrap_or_else(|| ProviderOutcome {
                    provider_id: id.as_ref().to_string(),
                    status: LoadStatus::Failed {
                        kind: ErrorKind::Other,
                        message: "provider task panicked".to_string(),
                    },
                })
            })
            .collect()
    }

    /// Runs [`load`](Self::load) in the background.
    pub fn spawn_load(&self, request: LinkRequest, provider_ids: Vec<String>) -> LoadHandle {
        let loader = self.clone();
        let task = tokio::spawn(async move { loader.load(request, &provider_ids).await });
        LoadHandle { task }
    }

    /// Runs a single extractor against `url` and merges its links into the
    /// entry of `request.key`.
    pub async fn load_extractor(
        &self,
        request: LinkRequest,
        extractor: &AnyExtractor,
        url: &Url,
        headers: &HeaderMap,
    ) -> LoadStatus {
        self.repository
            .get_or_insert_with(&request.key, || request.initial_links());
        debug!(extractor = %extractor.name(), url = %url, key = %request.key, "running extractor");

        drive(&self.repository, &request.key, &self.config, |sink| async move {
            extractor.extract(url, headers, &sink).await
        })
        .await
    }
}

/// Runs `produce` against a fresh link channel while merging everything it
/// sends into `key`. The sink is owned by the producer, so the consumer
/// finishes as soon as the producer does.
async fn drive<F, Fut>(
    repository: &CachedLinksRepository,
    key: &CacheKey,
    config: &LoaderConfig,
    produce: F,
) -> LoadStatus
where
    F: FnOnce(LinkSink) -> Fut,
    Fut: Future<Output = Result<(), ExtractorError>>,
{
    let (sink, mut receiver) = link_channel(config.channel_capacity);
    let timeout = config.provider_timeout;

    let producer = async move {
        let extraction = produce(sink);
        match timeout {
            Some(limit) => tokio::time::timeout(limit, extraction)
                .await
                .unwrap_or_else(|_| Err(ExtractorError::Timeout)),
            None => extraction.await,
        }
    };

    let consumer = async {
        let (mut streams, mut subtitles) = (0usize, 0usize);
        while let Some(link) = receiver.recv().await {
            let is_stream = matches!(link, MediaLink::Stream(_));
            if repository.add_link(key, link) {
                if is_stream {
                    streams += 1;
                } else {
                    subtitles += 1;
                }
            }
        }
        (streams, subtitles)
    };

    let (result, (streams, subtitles)) = tokio::join!(producer, consumer);
    match result {
        Ok(()) => LoadStatus::Success { streams, subtitles },
        Err(ExtractorError::SourceNotFound) => LoadStatus::NotFound,
        Err(e) => {
            warn!(key = %key, error = %e, "extraction failed");
            failed(e)
        }
    }
}

fn failed(error: ExtractorError) -> LoadStatus {
    LoadStatus::Failed {
        kind: error.kind(),
        message: error.to_string(),
    }
}
