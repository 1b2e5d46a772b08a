// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::{Duration, SystemTime};

use crate::{AbsoluteExpirationToken, Token};

/// Source of the current time and provider of time-bounded tokens.
///
/// Tokens created by the clock sample the time again every time they are asked whether they are
/// current, so a token never caches its own answer.
///
/// # Testing
///
/// The system clock cannot be controlled. When the `test-util` feature is enabled, a clock can be
/// created from a `ClockControl` (or via `Clock::new_frozen`); time then
/// only moves when the control advances it, which makes expiry tests fast and deterministic.
///
/// # Cloning and shared state
///
/// Cloning a clock is inexpensive and every clone observes the same time. Clones of a controlled
/// clock observe every adjustment made through the control.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use volatile_tokens::Clock;
///
/// let clock = Clock::system();
///
/// let token = clock.when(Duration::from_secs(30));
/// assert!(token.is_current());
///
/// let expired = clock.when_utc(clock.system_time() - Duration::from_secs(1));
/// assert!(!expired.is_current());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Clock(ClockState);

#[derive(Debug, Clone, Default)]
enum ClockState {
    #[default]
    System,
    #[cfg(any(feature = "test-util", test))]
    ClockControl(crate::ClockControl),
}

impl Clock {
    /// Creates a clock that reads the operating system's wall-clock time.
    #[must_use]
    pub fn system() -> Self {
        Self(ClockState::System)
    }

    #[cfg(any(feature = "test-util", test))]
    pub(crate) fn with_control(control: &crate::ClockControl) -> Self {
        Self(ClockState::ClockControl(control.clone()))
    }

    /// Creates a new frozen clock.
    ///
    /// This is a convenience method equivalent to calling `ClockControl::new().to_clock()`.
    ///
    /// > **Note**: The returned clock will not advance time.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::thread::sleep;
    /// use std::time::Duration;
    ///
    /// use volatile_tokens::Clock;
    ///
    /// let clock = Clock::new_frozen();
    /// let time = clock.system_time();
    ///
    /// sleep(Duration::from_micros(1));
    ///
    /// assert_eq!(time, clock.system_time());
    /// ```
    #[cfg(any(feature = "test-util", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
    #[must_use]
    pub fn new_frozen() -> Self {
        crate::ClockControl::new().to_clock()
    }

    /// Creates a new frozen clock at the specified time.
    #[cfg(any(feature = "test-util", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "test-util")))]
    #[must_use]
    pub fn new_frozen_at(time: impl Into<SystemTime>) -> Self {
        crate::ClockControl::new_at(time).to_clock()
    }

    /// Retrieves the current time in UTC.
    ///
    /// > **Note**: The system time is not monotonic and can be affected by system clock changes.
    #[must_use]
    pub fn system_time(&self) -> SystemTime {
        match &self.0 {
            ClockState::System => SystemTime::now(),
            #[cfg(any(feature = "test-util", test))]
            ClockState::ClockControl(control) => control.system_time(),
        }
    }

    /// Returns a token that is current until `duration` has elapsed from now.
    ///
    /// A zero duration yields a token that is already expired. A duration so large that the
    /// expiry cannot be represented yields a token that never expires.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    ///
    /// use volatile_tokens::Clock;
    ///
    /// let clock = Clock::system();
    ///
    /// let token = clock.when(Duration::from_secs(10));
    /// assert!(token.is_current());
    ///
    /// let expired = clock.when(Duration::ZERO);
    /// assert!(!expired.is_current());
    /// ```
    #[must_use]
    pub fn when(&self, duration: Duration) -> Token {
        Token::new(AbsoluteExpirationToken::after(self.clone(), duration))
    }

    /// Returns a token that is current until the given absolute instant.
    ///
    /// An instant in the past yields a token that is already expired.
    #[must_use]
    pub fn when_utc(&self, expires_at: SystemTime) -> Token {
        Token::new(AbsoluteExpirationToken::at(self.clone(), expires_at))
    }
}
