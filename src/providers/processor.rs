//! Processor Providers
//!
//! Serves a [`CacheRequest`] from the cache or from its loader, saving
//! fresh values and falling back to stale records when the configuration
//! allows it.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cache::{Record, Source, TwoLayersCache};
use crate::config::Config;
use crate::error::{CacheError, LoaderError, Result};
use crate::persistence::Disk;
use crate::providers::{CacheRequest, EvictPolicy, Reply};

// == Processor Providers ==
/// Loader-aware front of a [`TwoLayersCache`].
#[derive(Clone)]
pub struct ProcessorProviders {
    cache: TwoLayersCache,
    use_expired_data_if_loader_not_available: bool,
}

impl ProcessorProviders {
    /// Wraps an existing cache.
    pub fn new(cache: TwoLayersCache, config: &Config) -> Self {
        Self {
            cache,
            use_expired_data_if_loader_not_available: config
                .use_expired_data_if_loader_not_available,
        }
    }

    /// Opens a disk-backed cache in the configured directory.
    ///
    /// Must be called within a tokio runtime.
    pub async fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let disk = Disk::open(&config.cache_directory).await?;
        info!(
            "Cache opened at {:?}: max_mb_persistence={}, use_expired_data={}",
            config.cache_directory,
            config.max_mb_persistence,
            config.use_expired_data_if_loader_not_available
        );
        Ok(Self::new(TwoLayersCache::new(Arc::new(disk), config), config))
    }

    pub fn cache(&self) -> &TwoLayersCache {
        &self.cache
    }

    // == Process ==
    /// Returns cached data for `request`, or the loader's data when the
    /// cache holds nothing fresh or the request asks for eviction.
    ///
    /// # Errors
    /// - `InvalidRequest` for inconsistent requests
    /// - `NoData` when the loader yields `None` and no record may be served
    /// - `LoaderFailed` when the loader fails and no record may be served
    /// - persistence errors while saving the loader's value
    pub async fn process<T, F, E>(&self, request: &CacheRequest, loader: F) -> Result<Reply<T>>
    where
        T: Serialize + DeserializeOwned,
        F: Future<Output = std::result::Result<Option<T>, E>>,
        E: Into<LoaderError>,
    {
        if let Some(error_msg) = request.validate() {
            return Err(CacheError::InvalidRequest(error_msg));
        }

        let record: Option<Record<T>> = self
            .cache
            .retrieve(
                &request.provider_key,
                &request.dynamic_key,
                &request.dynamic_key_group,
                self.use_expired_data_if_loader_not_available,
                request.life_time_ms,
                request.encrypted,
            )
            .await
            .and_then(|stored| match stored.decode() {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(
                        "Cached data of {} does not match the requested type: {}",
                        request.provider_key, e
                    );
                    None
                }
            });

        let fresh = record.as_ref().is_some_and(|r| !r.is_expired());
        if fresh && !request.evict.evicts() {
            if let Some(record) = record {
                debug!("Serving {} from {:?}", request.provider_key, record.source());
                return Ok(reply_from(record));
            }
        }

        match loader.await {
            Ok(Some(data)) => {
                self.clear_key_if_needed(request).await;
                self.cache
                    .save(
                        &request.provider_key,
                        &request.dynamic_key,
                        &request.dynamic_key_group,
                        &data,
                        request.life_time_ms,
                        request.expirable,
                        request.encrypted,
                    )
                    .await?;
                Ok(Reply::new(data, Source::Cloud))
            }
            Ok(None) => {
                if self.use_expired_data_if_loader_not_available {
                    if let Some(record) = record {
                        return Ok(reply_from(record));
                    }
                }
                self.clear_key_if_needed(request).await;
                Err(CacheError::NoData {
                    provider_key: request.provider_key.clone(),
                })
            }
            Err(e) => {
                self.clear_key_if_needed(request).await;
                match record {
                    Some(record) if self.use_expired_data_if_loader_not_available => {
                        Ok(reply_from(record))
                    }
                    _ => Err(CacheError::LoaderFailed {
                        provider_key: request.provider_key.clone(),
                        source: e.into(),
                    }),
                }
            }
        }
    }

    /// Wipes both tiers.
    pub async fn evict_all(&self) {
        self.cache.evict_all().await;
    }

    async fn clear_key_if_needed(&self, request: &CacheRequest) {
        match request.evict {
            EvictPolicy::None => {}
            EvictPolicy::Provider => self.cache.evict_provider_key(&request.provider_key).await,
            EvictPolicy::DynamicKey => {
                self.cache
                    .evict_dynamic_key(&request.provider_key, &request.dynamic_key)
                    .await
            }
            EvictPolicy::DynamicKeyGroup => {
                self.cache
                    .evict_dynamic_key_group(
                        &request.provider_key,
                        &request.dynamic_key,
                        &request.dynamic_key_group,
                    )
                    .await
            }
        }
    }
}

fn reply_from<T>(record: Record<T>) -> Reply<T> {
    let source = record.source();
    Reply::new(record.into_data(), source)
}
