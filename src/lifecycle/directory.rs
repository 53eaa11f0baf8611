//! # Resource Directory
//!
//! A [`ResourceDirectory`] hands out one shared [`Resource`] per cache key, so every part of an
//! application observing the same endpoint shares its cache and its in-flight fetch.
//!
//! Configurations without a cache key are never shared: each lookup builds a fresh resource.

use crate::configuration::ResourceConfiguration;
use crate::framework::{Exclusive, Resource};
use crate::provider::ResourceProvider;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

type Entry = Box<dyn Any + Send + Sync>;

/// Keyed registry of shared resources, all performing through one provider.
pub struct ResourceDirectory<P> {
    provider: Arc<P>,
    resources: Exclusive<HashMap<String, Entry>>,
}

impl<P: ResourceProvider> ResourceDirectory<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            resources: Exclusive::new(HashMap::new()),
        }
    }

    /// Returns the resource registered under the configuration's cache key, creating and
    /// registering it on first use.
    ///
    /// Lookup and insertion happen atomically. An entry registered under the same key with a
    /// different configuration type is replaced.
    pub fn get_resource<C>(&self, configuration: C) -> Resource<C, P>
    where
        C: ResourceConfiguration<Request = P::Request>,
    {
        let Some(key) = configuration.cache_key() else {
            debug!("No cache key, resource not shared");
            return Resource::new(configuration, Arc::clone(&self.provider));
        };

        self.resources.execute(|resources| {
            if let Some(existing) = resources.get(&key) {
                if let Some(resource) = existing.downcast_ref::<Resource<C, P>>() {
                    debug!(cache_key = %key, "Resource found");
                    return resource.clone();
                }
                warn!(
                    cache_key = %key,
                    "Cache key reused with another configuration type, replacing"
                );
            }

            let resource = Resource::new(configuration, Arc::clone(&self.provider));
            resources.insert(key.clone(), Box::new(resource.clone()));
            info!(cache_key = %key, size = resources.len(), "Resource registered");
            resource
        })
    }

    /// Number of shared resources.
    pub fn len(&self) -> usize {
        self.resources.execute(|resources| resources.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
