// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! An in-process cache whose entries are invalidated by volatile tokens.
//!
//! Each entry is computed by an `acquire` callback that registers the conditions the value
//! depends on: a point in time, a named signal, the outcome of a background task, or any custom
//! [`VolatileToken`]. The entry is served until one of them stops being current and is then
//! recomputed on the next read.
//!
//! Dependencies compose automatically. When a computation reads other cached values, the tokens
//! of those values are added to its own, so an outer entry is invalidated together with every
//! inner entry it was derived from. This works across caches and, with
//! [`ParallelCacheContext`], across worker threads.
//!
//! # Overview
//!
//! - [`Cache`] - The cache itself, built through [`Cache::builder()`].
//! - [`AcquireContext`] - Handed to `acquire` callbacks for registering tokens.
//! - [`CacheFactory`] - Hands out one dedicated cache per consumer.
//! - [`ParallelCacheContext`] - Keeps work on worker threads attached to the current computation.
//! - [`Clock`], [`Signals`], [`AsyncTokenProvider`] - Token providers.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use volatile_cache::{Cache, Clock, Signals};
//!
//! let settings = Cache::builder::<&str>().name("settings").build();
//! let pages = Cache::builder::<String>().name("pages").build();
//! let clock = Clock::system();
//! let signals = Signals::new();
//!
//! let page = pages.try_get("/home".to_string(), |ctx| {
//!     ctx.monitor(clock.when(Duration::from_secs(600)));
//!     let title = settings.get("title", |ctx| {
//!         ctx.monitor(signals.when("settings.changed"));
//!         "Home".to_string()
//!     })?;
//!     Ok::<_, volatile_cache::Error>(format!("<h1>{title}</h1>"))
//! })?;
//! assert_eq!(page, "<h1>Home</h1>");
//!
//! // Changing the settings invalidates the page built from them.
//! signals.trigger("settings.changed");
//! assert!(!pages.contains_current(&"/home".to_string()));
//! # Ok::<(), volatile_cache::Error>(())
//! ```
//!
//! # Logging
//!
//! Cache activity is reported through [`tracing`](https://docs.rs/tracing) events named
//! `cache.event` with the `cache.name` and `cache.activity` fields.

mod builder;
mod cache;
mod context;
mod error;
mod factory;
mod parallel;

#[doc(inline)]
pub use builder::CacheBuilder;
#[doc(inline)]
pub use cache::{Cache, CacheName};
#[doc(inline)]
pub use context::AcquireContext;
#[doc(inline)]
pub use error::{Error, ErrorKind, Result};
#[doc(inline)]
pub use factory::{CacheFactory, ConsumerId};
#[doc(inline)]
pub use parallel::{ContextAwareTask, ParallelCacheContext};
#[cfg(feature = "test-util")]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
#[doc(inline)]
pub use volatile_tokens::ClockControl;
#[doc(inline)]
pub use volatile_tokens::{AbsoluteExpirationToken, AsyncTokenProvider, Clock, Signals, Token, VolatileToken};
