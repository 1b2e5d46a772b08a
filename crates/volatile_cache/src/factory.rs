// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Registry of per-consumer caches.

use std::any::{Any, TypeId, type_name};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::Cache;
use crate::cache::CacheName;

/// Identity of a component that owns a dedicated cache.
///
/// Identities created from the same type, or from the same name, are equal.
///
/// # Examples
///
/// ```
/// use volatile_cache::ConsumerId;
///
/// struct PriceService;
///
/// assert_eq!(ConsumerId::of::<PriceService>(), ConsumerId::of::<PriceService>());
/// assert_ne!(ConsumerId::of::<PriceService>(), ConsumerId::named("prices"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId {
    type_id: Option<TypeId>,
    name: CacheName,
}

impl ConsumerId {
    /// Creates the identity of the component type `T`.
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_id: Some(TypeId::of::<T>()),
            name: type_name::<T>(),
        }
    }

    /// Creates an identity from a name.
    #[must_use]
    pub const fn named(name: CacheName) -> Self {
        Self { type_id: None, name }
    }

    /// Returns the human-readable name of this identity.
    #[must_use]
    pub const fn name(&self) -> CacheName {
        self.name
    }
}

type Slot = Arc<dyn Any + Send + Sync>;

/// Hands out one dedicated [`Cache`] per consumer.
///
/// [`create_cache`](Self::create_cache) is idempotent: the first call for a consumer creates the
/// cache and every later call returns the same instance for as long as the factory lives. A
/// consumer may own one cache per key type.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use volatile_cache::{CacheFactory, ConsumerId};
///
/// struct MenuService;
///
/// let factory = CacheFactory::new();
/// let first = factory.create_cache::<String>(ConsumerId::of::<MenuService>());
/// let second = factory.create_cache::<String>(ConsumerId::of::<MenuService>());
///
/// assert!(Arc::ptr_eq(&first, &second));
/// ```
#[derive(Default)]
pub struct CacheFactory {
    caches: DashMap<(ConsumerId, TypeId), Slot>,
}

impl CacheFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide factory.
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: Lazy<CacheFactory> = Lazy::new(CacheFactory::new);
        &GLOBAL
    }

    /// Returns the cache owned by `consumer`, creating it on first use.
    ///
    /// The cache is named after the consumer.
    #[expect(
        clippy::missing_panics_doc,
        reason = "slots are keyed by the key type, so the stored cache always has the requested type"
    )]
    pub fn create_cache<K>(&self, consumer: ConsumerId) -> Arc<Cache<K>>
    where
        K: Eq + Hash + Send + Sync + 'static,
    {
        let slot = self
            .caches
            .entry((consumer, TypeId::of::<K>()))
            .or_insert_with(|| {
                tracing::debug!(cache.name = consumer.name(), "cache.created");
                Arc::new(Cache::builder::<K>().name(consumer.name()).build())
            })
            .clone();

        slot.downcast::<Cache<K>>()
            .expect("cache slot holds a cache of a different key type")
    }

    /// Returns the number of caches created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Returns `true` if no cache has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }
}

impl Debug for CacheFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFactory").field("caches", &self.caches.len()).finish()
    }
}
