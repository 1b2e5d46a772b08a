// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Acquisition contexts and the thread-scoped ambient slot.
//!
//! Every cache miss runs its `acquire` callback with a fresh [`TokenCollector`] installed as the
//! *ambient* collector of the current thread. A nested [`Cache::get`][crate::Cache::get] reads
//! the ambient collector to find its enclosing computation and re-registers its own tokens there.
//! Installation goes through [`AmbientScope`], whose drop restores the previous collector, so
//! nesting follows the call stack on return, error and unwind alike.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;
use volatile_tokens::Token;

thread_local! {
    static AMBIENT: RefCell<Option<Arc<TokenCollector>>> = const { RefCell::new(None) };
}

/// Returns the collector of the computation currently running on this thread, if any.
pub(crate) fn current() -> Option<Arc<TokenCollector>> {
    AMBIENT.with(|ambient| ambient.borrow().clone())
}

/// Installs a collector as the ambient one until dropped.
///
/// Not `Send`: the scope must be dropped on the thread that created it.
#[must_use]
pub(crate) struct AmbientScope {
    previous: Option<Arc<TokenCollector>>,
    _not_send: PhantomData<*const ()>,
}

impl AmbientScope {
    pub(crate) fn enter(collector: Option<Arc<TokenCollector>>) -> Self {
        let previous = AMBIENT.with(|ambient| ambient.replace(collector));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for AmbientScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // The slot is already gone while the thread is being torn down.
        let _ = AMBIENT.try_with(|ambient| ambient.replace(previous));
    }
}

impl Debug for AmbientScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AmbientScope").finish_non_exhaustive()
    }
}

/// The tokens registered during one computation.
///
/// Shared through `Arc` so worker threads started by
/// [`ParallelCacheContext`][crate::ParallelCacheContext] can register tokens too.
#[derive(Debug, Default)]
pub(crate) struct TokenCollector {
    tokens: Mutex<Vec<Token>>,
}

impl TokenCollector {
    pub(crate) fn monitor(&self, token: Token) {
        self.tokens.lock().push(token);
    }

    pub(crate) fn monitor_all(&self, tokens: &[Token]) {
        if !tokens.is_empty() {
            self.tokens.lock().extend_from_slice(tokens);
        }
    }

    /// Takes the registered tokens, keeping the first occurrence of each token instance.
    pub(crate) fn take_compacted(&self) -> Box<[Token]> {
        let tokens = std::mem::take(&mut *self.tokens.lock());
        let mut seen = HashSet::with_capacity(tokens.len());
        tokens.into_iter().filter(|token| seen.insert(token.clone())).collect()
    }
}

/// The context of one in-flight cache computation.
///
/// Passed to the `acquire` callback of [`Cache::get`][crate::Cache::get]. Register every
/// condition the computed value depends on through [`monitor`][AcquireContext::monitor]; the
/// stored entry becomes stale as soon as any of them stops being current.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use volatile_cache::{Cache, Clock};
///
/// let cache = Cache::builder::<String>().build();
/// let clock = Clock::system();
///
/// let greeting = cache.get("en".to_string(), |ctx| {
///     ctx.monitor(clock.when(Duration::from_secs(300)));
///     format!("hello ({})", ctx.key())
/// })?;
/// assert_eq!(greeting, "hello (en)");
/// # Ok::<(), volatile_cache::Error>(())
/// ```
pub struct AcquireContext<'a, K> {
    key: &'a K,
    collector: &'a TokenCollector,
}

impl<'a, K> AcquireContext<'a, K> {
    pub(crate) fn new(key: &'a K, collector: &'a TokenCollector) -> Self {
        Self { key, collector }
    }

    /// Returns the key being computed.
    #[must_use]
    pub fn key(&self) -> &K {
        self.key
    }

    /// Registers a token the computed value depends on.
    ///
    /// Registering the same token instance more than once has the same effect as registering
    /// it once.
    pub fn monitor(&self, token: impl Into<Token>) {
        self.collector.monitor(token.into());
    }
}

impl<K: Debug> Debug for AcquireContext<'_, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquireContext").field("key", &self.key).finish_non_exhaustive()
    }
}
