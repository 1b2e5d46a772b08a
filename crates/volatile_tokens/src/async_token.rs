// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::{Token, VolatileToken};

/// Provider of tokens whose validity is decided by a background computation.
///
/// [`get_token`][AsyncTokenProvider::get_token] starts the given task on a background thread and
/// returns immediately. The task receives a callback through which it registers the tokens it
/// depends on. The returned token is:
///
/// - current while the task is still running,
/// - current after the task finished only if every registered token is current,
/// - not current if the task panicked.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use volatile_tokens::{AsyncTokenProvider, Signals};
///
/// let signals = Arc::new(Signals::new());
/// let provider = AsyncTokenProvider::new();
///
/// let watched = Arc::clone(&signals);
/// let token = provider.get_token(move |monitor| monitor(watched.when("index.rebuilt")));
/// assert!(token.is_current());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct AsyncTokenProvider {
    _private: (),
}

impl AsyncTokenProvider {
    /// Creates a new provider.
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Runs `task` in the background and returns a token reflecting its outcome.
    ///
    /// # Panics
    ///
    /// Panics if the operating system fails to create the background thread.
    pub fn get_token<F>(&self, task: F) -> Token
    where
        F: FnOnce(&mut dyn FnMut(Token)) + Send + 'static,
    {
        let token = Arc::new(AsyncToken::default());
        let worker = Arc::clone(&token);

        thread::Builder::new()
            .name("volatile-async-token".to_string())
            .spawn(move || {
                let mut collected = Vec::new();
                let outcome = catch_unwind(AssertUnwindSafe(|| task(&mut |token| collected.push(token))));

                let progress = match outcome {
                    Ok(()) => Progress::Completed(collected.into_boxed_slice()),
                    Err(_) => {
                        tracing::warn!("async token task panicked");
                        Progress::Failed
                    }
                };
                *worker.progress.lock() = progress;
            })
            .expect("failed to spawn the async token thread");

        Token::from(token)
    }
}

#[derive(Debug, Default)]
struct AsyncToken {
    progress: Mutex<Progress>,
}

#[derive(Debug, Default)]
enum Progress {
    #[default]
    Running,
    Completed(Box<[Token]>),
    Failed,
}

impl VolatileToken for AsyncToken {
    fn is_current(&self) -> bool {
        match &*self.progress.lock() {
            Progress::Running => true,
            Progress::Completed(tokens) => tokens.iter().all(Token::is_current),
            Progress::Failed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::{ClockControl, Signals};

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(Instant::now() < deadline, "condition was not met in time");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn current_while_task_runs() {
        let (release, gate) = mpsc::channel::<()>();
        let token = AsyncTokenProvider::new().get_token(move |_| {
            let _ = gate.recv();
        });

        assert!(token.is_current());
        release.send(()).unwrap();
    }

    #[test]
    fn reflects_registered_tokens_after_completion() {
        let signals = Arc::new(Signals::new());
        let (done_tx, done_rx) = mpsc::channel();

        let watched = Arc::clone(&signals);
        let token = AsyncTokenProvider::new().get_token(move |monitor| {
            monitor(watched.when("rebuild"));
            done_tx.send(()).unwrap();
        });

        done_rx.recv().unwrap();
        assert!(token.is_current());

        signals.trigger(&"rebuild");
        wait_until(|| !token.is_current());
    }

    #[test]
    fn expires_with_time_based_dependency() {
        let control = ClockControl::new();
        let clock = control.to_clock();
        let (done_tx, done_rx) = mpsc::channel();

        let token = AsyncTokenProvider::new().get_token(move |monitor| {
            monitor(clock.when(Duration::from_secs(1)));
            done_tx.send(()).unwrap();
        });
        done_rx.recv().unwrap();

        control.advance(Duration::from_secs(1));
        wait_until(|| !token.is_current());
    }

    #[test]
    fn panicking_task_is_not_current() {
        let token = AsyncTokenProvider::new().get_token(|_| panic!("boom"));

        wait_until(|| !token.is_current());
    }
}
