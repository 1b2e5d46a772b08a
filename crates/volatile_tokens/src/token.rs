// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Answers whether the value it guards is still current.
///
/// Implementations must evaluate their condition on every call to
/// [`is_current`][VolatileToken::is_current]; caches never memoize the answer.
///
/// # Examples
///
/// ```
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// use volatile_tokens::{Token, VolatileToken};
///
/// #[derive(Debug)]
/// struct FeatureFlag(AtomicBool);
///
/// impl VolatileToken for FeatureFlag {
///     fn is_current(&self) -> bool {
///         self.0.load(Ordering::Acquire)
///     }
/// }
///
/// let token = Token::new(FeatureFlag(AtomicBool::new(true)));
/// assert!(token.is_current());
/// ```
pub trait VolatileToken: Debug + Send + Sync {
    /// Returns `true` while the guarded value may still be used.
    fn is_current(&self) -> bool;
}

/// A shared handle to a [`VolatileToken`].
///
/// Cloning a token is inexpensive (an `Arc` clone) and every clone refers to the same
/// underlying token. Equality and hashing are based on identity: two handles are equal only
/// if they point to the same token instance, which is what token de-duplication relies on.
#[derive(Debug, Clone)]
pub struct Token(Arc<dyn VolatileToken>);

impl Token {
    /// Wraps a token implementation in a shared handle.
    #[must_use]
    pub fn new(token: impl VolatileToken + 'static) -> Self {
        Self(Arc::new(token))
    }

    /// Returns `true` while the underlying token is current.
    #[must_use]
    pub fn is_current(&self) -> bool {
        self.0.is_current()
    }

    /// Returns `true` if both handles refer to the same token instance.
    #[must_use]
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.address() == other.address()
    }

    fn address(&self) -> *const () {
        Arc::as_ptr(&self.0).cast::<()>()
    }
}

impl<T: VolatileToken + 'static> From<Arc<T>> for Token {
    fn from(token: Arc<T>) -> Self {
        Self(token)
    }
}

impl From<Arc<dyn VolatileToken>> for Token {
    fn from(token: Arc<dyn VolatileToken>) -> Self {
        Self(token)
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Flag(AtomicBool);

    impl VolatileToken for Flag {
        fn is_current(&self) -> bool {
            self.0.load(Ordering::Acquire)
        }
    }

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Token: Send, Sync, Clone);
    }

    #[test]
    fn is_current_is_read_on_every_call() {
        let flag = Arc::new(Flag(AtomicBool::new(true)));
        let token = Token::from(Arc::clone(&flag));
        assert!(token.is_current());

        flag.0.store(false, Ordering::Release);
        assert!(!token.is_current());
    }

    #[test]
    fn clones_are_equal_and_distinct_tokens_are_not() {
        let first = Token::new(Flag(AtomicBool::new(true)));
        let second = Token::new(Flag(AtomicBool::new(true)));

        assert_eq!(first, first.clone());
        assert_ne!(first, second);
        assert!(Token::ptr_eq(&first, &first.clone()));
    }

    #[test]
    fn hash_set_deduplicates_by_identity() {
        let token = Token::new(Flag(AtomicBool::new(true)));
        let other = Token::new(Flag(AtomicBool::new(true)));

        let set: HashSet<Token> = [token.clone(), token, other].into_iter().collect();
        assert_eq!(set.len(), 2);
    }
}
