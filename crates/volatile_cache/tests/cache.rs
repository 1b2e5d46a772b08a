// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for cache reads, expiry and token bubbling.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use volatile_cache::{AsyncTokenProvider, Cache, Clock, Error, ErrorKind, Signals, Token, VolatileToken};
use volatile_tokens::ClockControl;

/// Counts how often a computation ran.
#[derive(Debug, Default)]
struct Calls(AtomicUsize);

impl Calls {
    fn record(&self) -> usize {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }
}

#[test]
fn value_without_tokens_is_permanent() {
    let cache = Cache::builder::<&str>().build();
    let calls = Calls::default();

    let first = cache
        .get("k", |_| {
            calls.record();
            Arc::new(vec![1, 2, 3])
        })
        .unwrap();
    let second = cache
        .get("k", |_| {
            calls.record();
            Arc::new(vec![4, 5, 6])
        })
        .unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.count(), 1);
}

#[test]
fn time_token_expires_with_controlled_clock() {
    let control = ClockControl::new();
    let clock = control.to_clock();
    let cache = Cache::builder::<&str>().build();
    let calls = Calls::default();
    let read = || {
        cache
            .get("k", |ctx| {
                ctx.monitor(clock.when(Duration::from_millis(50)));
                calls.record()
            })
            .unwrap()
    };

    assert_eq!(read(), 1);
    control.advance_millis(49);
    assert_eq!(read(), 1);

    control.advance_millis(1);
    assert_eq!(read(), 2);
    assert_eq!(read(), 2);
}

#[test]
fn time_token_expires_with_system_clock() {
    let clock = Clock::system();
    let cache = Cache::builder::<&str>().build();
    let calls = Calls::default();
    let read = || {
        cache
            .get("k", |ctx| {
                ctx.monitor(clock.when(Duration::from_millis(50)));
                calls.record()
            })
            .unwrap()
    };

    assert_eq!(read(), 1);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(read(), 2);
    assert_eq!(read(), 2);
}

#[test]
fn signal_invalidates_entry() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();
    let calls = Calls::default();
    let read = || {
        cache
            .get("k", |ctx| {
                ctx.monitor(signals.when("sig"));
                calls.record()
            })
            .unwrap()
    };

    assert_eq!(read(), 1);
    assert_eq!(read(), 1);

    signals.trigger("sig");
    assert!(!cache.contains_current(&"k"));
    assert_eq!(read(), 2);
    assert_eq!(read(), 2);
}

#[test]
fn inner_tokens_bubble_to_outer_entry() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();
    let outer_calls = Calls::default();
    let read_outer = || {
        cache
            .try_get("outer", |_| {
                outer_calls.record();
                cache.get("inner", |ctx| {
                    ctx.monitor(signals.when("s"));
                    1_u32
                })
            })
            .unwrap()
    };

    assert_eq!(read_outer(), 1);
    assert_eq!(read_outer(), 1);
    assert_eq!(outer_calls.count(), 1);

    signals.trigger("s");

    assert_eq!(read_outer(), 1);
    assert_eq!(outer_calls.count(), 2);
}

#[test]
fn warm_inner_entry_still_bubbles() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();
    let inner = || {
        cache.get("inner", |ctx| {
            ctx.monitor(signals.when("s"));
            7_u32
        })
    };

    inner().unwrap();
    let outer = cache.try_get("outer", |_| inner().map(|v| v * 2)).unwrap();
    assert_eq!(outer, 14);
    assert!(cache.contains_current(&"outer"));

    signals.trigger("s");

    assert!(!cache.contains_current(&"outer"));
}

#[test]
fn bubbling_crosses_caches_and_levels() {
    let regions = Cache::builder::<u32>().name("regions").build();
    let stores = Cache::builder::<&str>().name("stores").build();
    let reports = Cache::builder::<String>().name("reports").build();
    let signals = Signals::new();

    let report = reports
        .try_get("weekly".to_string(), |_| {
            stores.try_get("downtown", |_| {
                regions.get(1, |ctx| {
                    ctx.monitor(signals.when("region.1"));
                    "north".to_string()
                })
            })
        })
        .unwrap();
    assert_eq!(report, "north");

    signals.trigger("region.1");

    assert!(!regions.contains_current(&1));
    assert!(!stores.contains_current(&"downtown"));
    assert!(!reports.contains_current(&"weekly".to_string()));
}

#[test]
fn sibling_entries_do_not_share_tokens() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();

    cache
        .get("a", |ctx| {
            ctx.monitor(signals.when("a"));
        })
        .unwrap();
    cache
        .get("b", |ctx| {
            ctx.monitor(signals.when("b"));
        })
        .unwrap();

    signals.trigger("a");

    assert!(!cache.contains_current(&"a"));
    assert!(cache.contains_current(&"b"));
}

#[derive(Debug)]
struct CountingToken {
    checks: AtomicUsize,
}

impl VolatileToken for CountingToken {
    fn is_current(&self) -> bool {
        self.checks.fetch_add(1, Ordering::Relaxed);
        true
    }
}

#[test]
fn duplicate_registrations_collapse() {
    let cache = Cache::builder::<&str>().build();
    let counting = Arc::new(CountingToken {
        checks: AtomicUsize::new(0),
    });
    let token = Token::from(Arc::clone(&counting));

    cache
        .get("k", |ctx| {
            ctx.monitor(token.clone());
            ctx.monitor(token.clone());
        })
        .unwrap();

    assert!(cache.contains_current(&"k"));
    assert_eq!(counting.checks.load(Ordering::Relaxed), 1);
}

#[test]
fn async_token_holds_entry_until_task_invalidates() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();
    let provider = AsyncTokenProvider::new();
    let watched = signals.when("remote");
    let token = provider.get_token(move |monitor| monitor(watched));

    cache
        .get("k", |ctx| {
            ctx.monitor(token.clone());
        })
        .unwrap();
    assert!(cache.contains_current(&"k"));

    signals.trigger("remote");
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    while cache.contains_current(&"k") && std::time::Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }

    assert!(!cache.contains_current(&"k"));
}

#[test]
fn type_mismatch_is_reported() {
    let cache = Cache::builder::<&str>().name("typed").build();
    cache.get("k", |_| 1_u32).unwrap();

    let error: Error = cache.get("k", |_| "one".to_string()).unwrap_err();

    match error.kind() {
        ErrorKind::TypeMismatch { cache, expected, found } => {
            assert_eq!(*cache, "typed");
            assert_eq!(*found, "u32");
            assert!(expected.ends_with("String"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(cache.get("k", |_| 2_u32).unwrap(), 1);
}

#[test]
fn mismatched_hit_does_not_bubble() {
    let inner = Cache::builder::<&str>().name("inner").build();
    let outer = Cache::builder::<&str>().name("outer").build();
    let signals = Signals::new();
    inner
        .get("k", |ctx| {
            ctx.monitor(signals.when("inner"));
            1_u32
        })
        .unwrap();

    let value = outer
        .try_get("outer", |_| {
            let mismatch = inner.get("k", |_| "one".to_string());
            assert!(mismatch.is_err());
            Ok::<_, Error>(0_u8)
        })
        .unwrap();
    assert_eq!(value, 0);

    signals.trigger("inner");

    assert!(!inner.contains_current(&"k"));
    assert!(outer.contains_current(&"outer"));
}

#[derive(Debug, PartialEq)]
enum LoadError {
    Cache,
    Offline,
}

impl From<Error> for LoadError {
    fn from(_: Error) -> Self {
        Self::Cache
    }
}

#[test]
fn acquire_error_restores_outer_context() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();

    let outer: Result<u32, LoadError> = cache.try_get("outer", |ctx| {
        let failed: Result<u32, LoadError> = cache.try_get("inner", |_| Err(LoadError::Offline));
        assert_eq!(failed, Err(LoadError::Offline));
        ctx.monitor(signals.when("outer"));
        Ok(3)
    });

    assert_eq!(outer, Ok(3));
    assert!(!cache.contains_current(&"inner"));

    signals.trigger("outer");
    assert!(!cache.contains_current(&"outer"));
}

#[test]
fn panic_in_inner_acquire_restores_outer_context() {
    let cache = Cache::builder::<&str>().build();
    let signals = Signals::new();

    let outer = cache
        .try_get("outer", |_| {
            let panicked = catch_unwind(AssertUnwindSafe(|| {
                cache.get("broken", |_| -> u32 { panic!("acquire failed") })
            }));
            assert!(panicked.is_err());

            cache.get("inner", |ctx| {
                ctx.monitor(signals.when("inner"));
                5_u32
            })
        })
        .unwrap();

    assert_eq!(outer, 5);
    assert!(!cache.contains_current(&"broken"));

    signals.trigger("inner");
    assert!(!cache.contains_current(&"outer"));
}

#[test]
fn panic_in_acquire_stores_nothing() {
    let cache = Cache::builder::<&str>().build();

    let result = catch_unwind(AssertUnwindSafe(|| cache.get("k", |_| -> u32 { panic!("acquire failed") })));

    assert!(result.is_err());
    assert!(cache.is_empty());
    assert_eq!(cache.get("k", |_| 1_u32).unwrap(), 1);
}

#[test]
fn invalidate_and_clear_remove_entries() {
    let cache = Cache::builder::<u32>().build();
    let calls = Calls::default();

    for key in 0..3 {
        cache.get(key, |_| calls.record()).unwrap();
    }
    assert_eq!(cache.len(), 3);

    assert!(cache.invalidate(&1));
    assert!(!cache.invalidate(&1));
    assert_eq!(cache.len(), 2);

    cache.clear();
    assert!(cache.is_empty());
    cache.get(0, |_| calls.record()).unwrap();
    assert_eq!(calls.count(), 4);
}
