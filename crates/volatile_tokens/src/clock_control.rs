// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;

use crate::Clock;

/// Controls the passage of time for the clocks created from it.
///
/// Time only moves when the control is advanced. Every [`Clock`] created via
/// [`to_clock`][ClockControl::to_clock] shares the control's state, so tokens created by those
/// clocks expire exactly when the test says so.
///
/// A new control starts at [`SystemTime::UNIX_EPOCH`].
///
/// # Examples
///
/// ```
/// use std::time::{Duration, SystemTime};
///
/// use volatile_tokens::ClockControl;
///
/// let control = ClockControl::new();
/// let clock = control.to_clock();
/// assert_eq!(clock.system_time(), SystemTime::UNIX_EPOCH);
///
/// control.advance(Duration::from_secs(5));
/// assert_eq!(clock.system_time(), SystemTime::UNIX_EPOCH + Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ClockControl {
    now: Arc<Mutex<SystemTime>>,
}

impl Default for ClockControl {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockControl {
    /// Creates a new control frozen at the Unix epoch.
    #[must_use]
    pub fn new() -> Self {
        Self::new_at(SystemTime::UNIX_EPOCH)
    }

    /// Creates a new control frozen at the given time.
    #[must_use]
    pub fn new_at(time: impl Into<SystemTime>) -> Self {
        Self {
            now: Arc::new(Mutex::new(time.into())),
        }
    }

    /// Creates a new control frozen at the current system time.
    #[must_use]
    pub fn now() -> Self {
        Self::new_at(SystemTime::now())
    }

    /// Creates a clock whose time is driven by this control.
    #[must_use]
    pub fn to_clock(&self) -> Clock {
        Clock::with_control(self)
    }

    /// Moves time forward by the given number of milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    /// Moves time forward by the given duration.
    ///
    /// Time saturates instead of overflowing when advanced past the representable range.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock();
        if let Some(next) = now.checked_add(duration) {
            *now = next;
        }
    }

    /// Moves time to the given instant, forward or backward.
    pub fn advance_to(&self, time: impl Into<SystemTime>) {
        *self.now.lock() = time.into();
    }

    pub(crate) fn system_time(&self) -> SystemTime {
        *self.now.lock()
    }
}

impl From<ClockControl> for Clock {
    fn from(control: ClockControl) -> Self {
        control.to_clock()
    }
}

impl From<&ClockControl> for Clock {
    fn from(control: &ClockControl) -> Self {
        control.to_clock()
    }
}
