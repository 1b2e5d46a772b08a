// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The cache engine.

use std::any::{Any, type_name};
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use volatile_tokens::Token;

use crate::builder::CacheBuilder;
use crate::context::{self, AcquireContext, AmbientScope, TokenCollector};
use crate::{Error, Result};

/// Type alias for cache names used in logs and errors.
pub type CacheName = &'static str;

/// A computed value together with the tokens that decide whether it is still current.
///
/// Never mutated once published; a stale entry is replaced by a new one.
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    tokens: Box<[Token]>,
}

impl CacheEntry {
    fn new<V: Send + Sync + 'static>(value: V, tokens: Box<[Token]>) -> Self {
        Self {
            value: Arc::new(value),
            type_name: type_name::<V>(),
            tokens,
        }
    }

    fn is_stale(&self) -> bool {
        self.tokens.iter().any(|token| !token.is_current())
    }
}

impl Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("tokens", &self.tokens.len())
            .finish_non_exhaustive()
    }
}

/// A value cache whose entries are invalidated by volatile tokens.
///
/// Entries are created by [`get`](Self::get) and [`try_get`](Self::try_get). The `acquire`
/// callback registers the [`Token`]s the value depends on; the entry is served until any of them
/// stops being current, then recomputed on the next read. An entry without tokens never expires.
///
/// # Bubbling
///
/// When an `acquire` callback reads other cached values (from this cache or any other cache),
/// the tokens of those inner entries are registered on the outer computation as well. The outer
/// entry therefore becomes stale whenever an inner entry it was computed from does, without
/// either caller declaring the relationship.
///
/// # Concurrency
///
/// The cache can be shared freely between threads. No lock is held while `acquire` runs, so
/// callbacks may read other cached values, including from this cache. The flip side is that
/// concurrent misses on the same key may each run their `acquire` callback; exactly one of the
/// results is stored and returned to every racing caller, but the tokens of every computation
/// still bubble to its own enclosing computation. Callbacks must therefore be safe to run more
/// than once.
///
/// # Result types
///
/// One key implies one result type. Reading a key with a different type than the one stored
/// under it fails with [`ErrorKind::TypeMismatch`](crate::ErrorKind::TypeMismatch).
///
/// # Examples
///
/// ```
/// use volatile_cache::{Cache, Signals};
///
/// let cache = Cache::builder::<&str>().name("inventory").build();
/// let signals = Signals::new();
///
/// let stock = cache.try_get("outer", |_| {
///     cache.get("inner", |ctx| {
///         ctx.monitor(signals.when("stock.changed"));
///         10_u32
///     })
/// })?;
/// assert_eq!(stock, 10);
///
/// // Triggering the signal invalidates the inner *and* the outer entry.
/// signals.trigger("stock.changed");
/// assert!(!cache.contains_current(&"outer"));
/// # Ok::<(), volatile_cache::Error>(())
/// ```
pub struct Cache<K> {
    name: CacheName,
    entries: DashMap<K, Arc<CacheEntry>>,
}

impl Cache<()> {
    /// Creates a new cache builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use volatile_cache::Cache;
    ///
    /// let cache = Cache::builder::<u64>()
    ///     .name("users")
    ///     .initial_capacity(1_024)
    ///     .build();
    /// assert_eq!(cache.name(), "users");
    /// ```
    #[must_use]
    pub fn builder<K>() -> CacheBuilder<K> {
        CacheBuilder::new()
    }
}

impl<K> Cache<K>
where
    K: Eq + Hash,
{
    pub(crate) fn new(name: CacheName, initial_capacity: usize) -> Self {
        Self {
            name,
            entries: DashMap::with_capacity(initial_capacity),
        }
    }

    /// Returns the name of this cache.
    #[must_use]
    pub fn name(&self) -> CacheName {
        self.name
    }

    /// Returns the cached value for `key`, computing it with `acquire` if it is missing or stale.
    ///
    /// See [`try_get`](Self::try_get) for a variant whose callback can fail.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::TypeMismatch`](crate::ErrorKind::TypeMismatch) if `key` holds a value
    /// of a type other than `V`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use volatile_cache::{Cache, Clock};
    ///
    /// let cache = Cache::builder::<&str>().build();
    /// let clock = Clock::system();
    ///
    /// let value = cache.get("greeting", |ctx| {
    ///     ctx.monitor(clock.when(Duration::from_secs(60)));
    ///     "hello".to_string()
    /// })?;
    /// assert_eq!(value, "hello");
    /// # Ok::<(), volatile_cache::Error>(())
    /// ```
    pub fn get<V, F>(&self, key: K, acquire: F) -> Result<V>
    where
        V: Clone + Send + Sync + 'static,
        F: FnOnce(&AcquireContext<'_, K>) -> V,
    {
        self.try_get(key, |context| Ok(acquire(context)))
    }

    /// Returns the cached value for `key`, computing it with a fallible `acquire` if it is
    /// missing or stale.
    ///
    /// An error returned by `acquire` is handed back unchanged and nothing is stored, so the next
    /// call computes again. The ambient acquisition context is restored before the error (or a
    /// panic) leaves this method.
    ///
    /// # Errors
    ///
    /// Returns the error of `acquire`, or a [`TypeMismatch`](crate::ErrorKind::TypeMismatch)
    /// converted into `E` if `key` holds a value of a type other than `V`.
    ///
    /// # Examples
    ///
    /// ```
    /// use volatile_cache::Cache;
    ///
    /// #[derive(Debug)]
    /// enum AppError {
    ///     Cache(volatile_cache::Error),
    ///     Parse(std::num::ParseIntError),
    /// }
    ///
    /// impl From<volatile_cache::Error> for AppError {
    ///     fn from(error: volatile_cache::Error) -> Self {
    ///         Self::Cache(error)
    ///     }
    /// }
    ///
    /// let cache = Cache::builder::<&str>().build();
    ///
    /// let parsed = cache.try_get("limit", |_| "250".parse::<u32>().map_err(AppError::Parse));
    /// assert_eq!(parsed.unwrap(), 250);
    ///
    /// let failed = cache.try_get("broken", |_| "x".parse::<u32>().map_err(AppError::Parse));
    /// assert!(matches!(failed, Err(AppError::Parse(_))));
    /// ```
    pub fn try_get<V, E, F>(&self, key: K, acquire: F) -> std::result::Result<V, E>
    where
        V: Clone + Send + Sync + 'static,
        E: From<Error>,
        F: FnOnce(&AcquireContext<'_, K>) -> std::result::Result<V, E>,
    {
        let parent = context::current();
        let observed = self.entries.get(&key).map(|entry| Arc::clone(entry.value()));

        let (entry, bubbled) = match observed {
            Some(entry) if !entry.is_stale() => {
                tracing::trace!(cache.name = self.name, cache.activity = "hit", "cache.event");
                (entry, false)
            }
            observed => {
                let activity = if observed.is_some() { "stale" } else { "miss" };
                tracing::trace!(cache.name = self.name, cache.activity = activity, "cache.event");

                let computed = Arc::new(self.compute(&key, acquire)?);
                if let Some(parent) = &parent {
                    parent.monitor_all(&computed.tokens);
                }

                let published = self.publish(key, observed.as_ref(), Arc::clone(&computed));
                let won = Arc::ptr_eq(&published, &computed);
                if !won {
                    tracing::trace!(cache.name = self.name, cache.activity = "race_lost", "cache.event");
                }
                (published, won)
            }
        };

        // A value the caller never receives must not constrain the enclosing computation.
        let value = self.downcast(&entry);
        if !bubbled && value.is_ok() {
            if let Some(parent) = &parent {
                parent.monitor_all(&entry.tokens);
            }
        }

        value.map_err(E::from)
    }

    /// Removes the entry for `key`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns `true` if `key` holds an entry whose tokens are all current.
    #[must_use]
    pub fn contains_current(&self, key: &K) -> bool {
        let entry = self.entries.get(key).map(|entry| Arc::clone(entry.value()));
        entry.is_some_and(|entry| !entry.is_stale())
    }

    /// Returns the number of stored entries, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn compute<V, E, F>(&self, key: &K, acquire: F) -> std::result::Result<CacheEntry, E>
    where
        V: Send + Sync + 'static,
        F: FnOnce(&AcquireContext<'_, K>) -> std::result::Result<V, E>,
    {
        let collector = Arc::new(TokenCollector::default());

        let outcome = {
            let _scope = AmbientScope::enter(Some(Arc::clone(&collector)));
            acquire(&AcquireContext::new(key, &collector))
        };

        match outcome {
            Ok(value) => Ok(CacheEntry::new(value, collector.take_compacted())),
            Err(error) => {
                tracing::debug!(cache.name = self.name, cache.activity = "acquire_failed", "cache.event");
                Err(error)
            }
        }
    }

    /// Publishes `computed` unless a racing caller already stored a current entry.
    ///
    /// Returns the entry that is visible after the call.
    ///
    /// Tokens run user code, so staleness is checked before the shard is locked. A resident entry
    /// is only replaced if it is the one observed by the caller or the one found stale here.
    fn publish(&self, key: K, observed: Option<&Arc<CacheEntry>>, computed: Arc<CacheEntry>) -> Arc<CacheEntry> {
        let stale = self
            .entries
            .get(&key)
            .map(|resident| Arc::clone(resident.value()))
            .filter(|resident| resident.is_stale());

        match self.entries.entry(key) {
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&computed));
                computed
            }
            Entry::Occupied(mut occupied) => {
                let resident = occupied.get();
                let replace = observed.is_some_and(|observed| Arc::ptr_eq(observed, resident))
                    || stale.as_ref().is_some_and(|stale| Arc::ptr_eq(stale, resident));
                if replace {
                    occupied.insert(Arc::clone(&computed));
                    computed
                } else {
                    Arc::clone(resident)
                }
            }
        }
    }

    fn downcast<V>(&self, entry: &CacheEntry) -> Result<V>
    where
        V: Clone + 'static,
    {
        entry
            .value
            .downcast_ref::<V>()
            .cloned()
            .ok_or_else(|| Error::type_mismatch(self.name, type_name::<V>(), entry.type_name))
    }
}

impl<K> Default for Cache<K>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        CacheBuilder::new().build()
    }
}

impl<K> Debug for Cache<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}
