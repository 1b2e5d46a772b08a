// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring a [`Cache`].

use std::hash::Hash;
use std::marker::PhantomData;

use crate::Cache;
use crate::cache::CacheName;

const DEFAULT_NAME: CacheName = "volatile_cache";

/// Builder for constructing a [`Cache`].
///
/// Created by calling [`Cache::builder()`].
///
/// # Examples
///
/// ```
/// use volatile_cache::Cache;
///
/// let cache = Cache::builder::<String>()
///     .name("settings")
///     .initial_capacity(64)
///     .build();
/// assert!(cache.is_empty());
/// ```
#[derive(Debug)]
pub struct CacheBuilder<K> {
    name: CacheName,
    initial_capacity: usize,
    _phantom: PhantomData<K>,
}

impl<K> CacheBuilder<K> {
    pub(crate) fn new() -> Self {
        Self {
            name: DEFAULT_NAME,
            initial_capacity: 0,
            _phantom: PhantomData,
        }
    }

    /// Sets the name used to identify the cache in logs and errors.
    #[must_use]
    pub fn name(mut self, name: CacheName) -> Self {
        self.name = name;
        self
    }

    /// Pre-allocates room for the given number of entries.
    ///
    /// This is only a hint; the cache grows as needed and never evicts entries on its own.
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }
}

impl<K> CacheBuilder<K>
where
    K: Eq + Hash,
{
    /// Builds the cache.
    #[must_use]
    pub fn build(self) -> Cache<K> {
        Cache::new(self.name, self.initial_capacity)
    }
}
