// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::{Token, VolatileToken};

/// Provider of tokens that expire when a signal is triggered.
///
/// A signal is any value with value equality (`Eq + Hash`). All callers waiting on equal
/// signal values share a single token instance until the signal is triggered. Triggering
/// removes the signal from the registry and expires its token, so the next
/// [`when`][Signals::when] for the same value hands out a fresh, current token.
///
/// The registry is guarded by a single lock; concurrent `when` and `trigger` calls for the
/// same signal are serialized, so an expired token is never handed out.
///
/// # Examples
///
/// ```
/// use volatile_tokens::Signals;
///
/// let signals = Signals::new();
///
/// let token = signals.when("catalog");
/// assert!(token.is_current());
///
/// signals.trigger("catalog");
/// assert!(!token.is_current());
///
/// let fresh = signals.when("catalog");
/// assert!(fresh.is_current());
/// assert_ne!(token, fresh);
/// ```
pub struct Signals<S> {
    tokens: Mutex<HashMap<S, Arc<SignalToken>>>,
}

impl<S> Signals<S>
where
    S: Eq + Hash,
{
    /// Creates an empty signal registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the token that expires when `signal` is triggered.
    ///
    /// Repeated calls with equal signal values return the same token until the signal is
    /// triggered.
    pub fn when(&self, signal: S) -> Token {
        let mut tokens = self.tokens.lock();
        let token = tokens.entry(signal).or_insert_with(|| Arc::new(SignalToken::new()));
        Token::from(Arc::clone(token))
    }

    /// Expires the token of `signal` and forgets the signal.
    ///
    /// Triggering a signal nobody waits on is a no-op.
    pub fn trigger<Q>(&self, signal: &Q)
    where
        S: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut tokens = self.tokens.lock();
        if let Some(token) = tokens.remove(signal) {
            token.expire();
            tracing::debug!(signals.pending = tokens.len(), "signal.triggered");
        }
    }

    /// Returns the number of signals that have been observed but not yet triggered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    /// Returns `true` if no signal is currently being observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

impl<S: Eq + Hash> Default for Signals<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Debug for Signals<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signals")
            .field("pending", &self.tokens.lock().len())
            .finish()
    }
}

#[derive(Debug)]
struct SignalToken {
    current: AtomicBool,
}

impl SignalToken {
    fn new() -> Self {
        Self {
            current: AtomicBool::new(true),
        }
    }

    fn expire(&self) {
        self.current.store(false, Ordering::Release);
    }
}

impl VolatileToken for SignalToken {
    fn is_current(&self) -> bool {
        self.current.load(Ordering::Acquire)
    }
}
