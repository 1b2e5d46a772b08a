// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::{Clock, VolatileToken};

/// A token that is current until an absolute point in time.
///
/// The token re-reads its clock on every [`is_current`][VolatileToken::is_current] call.
/// Usually created through [`Clock::when`] or [`Clock::when_utc`].
#[derive(Debug, Clone)]
pub struct AbsoluteExpirationToken {
    clock: Clock,
    // `None` when the expiry lies beyond what `SystemTime` can represent.
    expires_at: Option<SystemTime>,
}

impl AbsoluteExpirationToken {
    /// Creates a token that expires at the given instant.
    #[must_use]
    pub fn at(clock: Clock, expires_at: SystemTime) -> Self {
        Self {
            clock,
            expires_at: Some(expires_at),
        }
    }

    /// Creates a token that expires once `duration` has elapsed from the clock's current time.
    #[must_use]
    pub fn after(clock: Clock, duration: Duration) -> Self {
        let expires_at = clock.system_time().checked_add(duration);
        Self { clock, expires_at }
    }

    /// Returns the instant at which this token expires.
    ///
    /// Returns `None` if the token never expires.
    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }
}

impl VolatileToken for AbsoluteExpirationToken {
    fn is_current(&self) -> bool {
        self.expires_at.is_none_or(|expires_at| self.clock.system_time() < expires_at)
    }
}
