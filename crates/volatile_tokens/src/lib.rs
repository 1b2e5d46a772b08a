// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Volatile tokens: composable invalidation conditions for cached values.
//!
//! A [`VolatileToken`] answers a single question, "is the value I guard still current?", and is
//! evaluated every time it is asked. Caches attach a set of tokens to each entry and treat the
//! entry as stale as soon as any token stops being current.
//!
//! # Overview
//!
//! - [`VolatileToken`] - The capability implemented by every token.
//! - [`Token`] - A cheap, clonable handle to a token. Equality is identity.
//! - [`Clock`] - Source of time and provider of time-bounded tokens.
//! - `ClockControl` - Manual control over the passage of time (requires `test-util`).
//! - [`Signals`] - Provider of tokens that expire when a signal is triggered.
//! - [`AsyncTokenProvider`] - Provider of tokens decided by a background computation.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use volatile_tokens::{Clock, Signals};
//!
//! let clock = Clock::system();
//! let expires = clock.when(Duration::from_secs(60));
//! assert!(expires.is_current());
//!
//! let signals = Signals::new();
//! let token = signals.when("settings.changed");
//! signals.trigger("settings.changed");
//! assert!(!token.is_current());
//! ```

mod async_token;
mod clock;
#[cfg(any(feature = "test-util", test))]
mod clock_control;
mod expiration;
mod signals;
mod token;

#[doc(inline)]
pub use async_token::AsyncTokenProvider;
#[doc(inline)]
pub use clock::Clock;
#[cfg(any(feature = "test-util", test))]
#[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
#[doc(inline)]
pub use clock_control::ClockControl;
#[doc(inline)]
pub use expiration::AbsoluteExpirationToken;
#[doc(inline)]
pub use signals::Signals;
#[doc(inline)]
pub use token::{Token, VolatileToken};
