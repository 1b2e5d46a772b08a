// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Carrying the acquisition context onto worker threads.

use std::fmt::{self, Debug};
use std::panic;
use std::sync::Arc;
use std::thread;

use crate::context::{self, AmbientScope, TokenCollector};

/// Runs work on other threads while keeping it attached to the current cache computation.
///
/// The ambient acquisition context is thread-scoped, so a [`Cache::get`][crate::Cache::get]
/// issued from a freshly spawned thread does not see the computation that spawned it and its
/// tokens would not bubble. `ParallelCacheContext` captures the context of the calling thread and
/// reinstalls it around the work on each worker, so tokens registered there reach the enclosing
/// computation as if the work had run inline.
///
/// A disabled instance runs everything sequentially on the calling thread.
///
/// # Examples
///
/// ```
/// use volatile_cache::{Cache, ParallelCacheContext, Signals};
///
/// let prices = Cache::builder::<u32>().build();
/// let totals = Cache::builder::<&str>().build();
/// let signals = Signals::new();
/// let parallel = ParallelCacheContext::new();
///
/// let total: u32 = totals.try_get("all", |_| {
///     let parts = parallel.run_in_parallel(vec![1_u32, 2, 3], |id| {
///         prices.get(id, |ctx| {
///             ctx.monitor(signals.when(id));
///             id * 10
///         })
///     });
///     parts.into_iter().sum::<Result<u32, _>>()
/// })?;
/// assert_eq!(total, 60);
///
/// // A price computed on a worker thread still invalidates the total.
/// signals.trigger(&2);
/// assert!(!totals.contains_current(&"all"));
/// # Ok::<(), volatile_cache::Error>(())
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelCacheContext {
    disabled: bool,
}

impl ParallelCacheContext {
    /// Creates an instance that runs work in parallel.
    #[must_use]
    pub const fn new() -> Self {
        Self { disabled: false }
    }

    /// Creates an instance that runs all work sequentially on the calling thread.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { disabled: true }
    }

    /// Returns `true` if work runs sequentially.
    #[must_use]
    pub const fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Wraps `task` so that it runs under the acquisition context of the calling thread.
    ///
    /// The returned task can be moved to another thread and run there.
    #[must_use]
    pub fn capture_task<F, R>(&self, task: F) -> ContextAwareTask<F>
    where
        F: FnOnce() -> R,
    {
        ContextAwareTask {
            collector: context::current(),
            task,
        }
    }

    /// Applies `f` to every item and returns the results in input order.
    ///
    /// Each item runs on its own scoped thread under the acquisition context of the calling
    /// thread. The call returns once every item is done.
    ///
    /// # Panics
    ///
    /// Resumes the panic of the first item (in input order) that panicked, after all items
    /// have finished.
    pub fn run_in_parallel<T, R, F>(&self, items: impl IntoIterator<Item = T>, f: F) -> Vec<R>
    where
        T: Send,
        R: Send,
        F: Fn(T) -> R + Sync,
    {
        let items: Vec<T> = items.into_iter().collect();
        if self.disabled || items.len() <= 1 {
            return items.into_iter().map(f).collect();
        }

        let collector = context::current();
        let f = &f;

        thread::scope(|scope| {
            let handles: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let collector = collector.clone();
                    scope.spawn(move || {
                        let _scope = AmbientScope::enter(collector);
                        f(item)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|payload| panic::resume_unwind(payload)))
                .collect()
        })
    }
}

/// A task bound to the acquisition context that was active when it was created.
///
/// Created by [`ParallelCacheContext::capture_task`].
pub struct ContextAwareTask<F> {
    collector: Option<Arc<TokenCollector>>,
    task: F,
}

impl<F, R> ContextAwareTask<F>
where
    F: FnOnce() -> R,
{
    /// Runs the task with its captured acquisition context installed on the current thread.
    ///
    /// The previous context of the current thread is restored afterwards.
    pub fn run(self) -> R {
        let _scope = AmbientScope::enter(self.collector);
        (self.task)()
    }
}

impl<F> Debug for ContextAwareTask<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextAwareTask")
            .field("captured", &self.collector.is_some())
            .finish_non_exhaustive()
    }
}
