// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for cache operations.

use crate::cache::CacheName;

/// A specialized [`Result`] type for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised by the cache itself.
///
/// Errors returned by `acquire` callbacks never pass through this type: [`Cache::try_get`]
/// hands them back to the caller unchanged.
///
/// [`Cache::try_get`]: crate::Cache::try_get
///
/// # Examples
///
/// ```
/// use volatile_cache::{Cache, ErrorKind};
///
/// let cache = Cache::builder::<&str>().build();
/// cache.get("answer", |_| 42_u32)?;
///
/// let error = cache.get("answer", |_| "forty-two").unwrap_err();
/// assert!(matches!(error.kind(), ErrorKind::TypeMismatch { .. }));
/// # Ok::<(), volatile_cache::Error>(())
/// ```
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error(ErrorKind);

/// The kinds of [`Error`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// A key was read with a result type that differs from the type stored under it.
    ///
    /// One key implies one result type for the lifetime of that key in a given cache.
    #[error("cache '{cache}' holds a value of type '{found}' under this key, but '{expected}' was requested")]
    TypeMismatch {
        /// The name of the cache that was read.
        cache: CacheName,
        /// The type requested by the caller.
        expected: &'static str,
        /// The type actually stored.
        found: &'static str,
    },
}

impl Error {
    pub(crate) const fn from_kind(kind: ErrorKind) -> Self {
        Self(kind)
    }

    pub(crate) const fn type_mismatch(cache: CacheName, expected: &'static str, found: &'static str) -> Self {
        Self::from_kind(ErrorKind::TypeMismatch { cache, expected, found })
    }

    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> &ErrorKind {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assert_types() {
        static_assertions::assert_impl_all!(Error: Send, Sync, std::error::Error);
    }

    #[test]
    fn type_mismatch_display_names_both_types() {
        let error = Error::type_mismatch("settings", "alloc::string::String", "u32");

        assert!(matches!(error.kind(), ErrorKind::TypeMismatch { .. }));
        assert_eq!(
            error.to_string(),
            "cache 'settings' holds a value of type 'u32' under this key, but 'alloc::string::String' was requested"
        );
    }
}
