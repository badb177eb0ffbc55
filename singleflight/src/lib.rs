//! Per-key call coalescing.
//!
//! When N callers concurrently request the same key, exactly one of them
//! (the leader) runs the upstream function; the rest block until the leader
//! finishes and then observe the *same* result, value or error. Once the
//! leader completes, the in-flight record is removed and the next caller
//! for that key starts a fresh invocation.
//!
//! This is the layer that keeps a cache miss from turning into a stampede
//! on the backing source.
//!
//! # Example
//!
//! ```
//! use singleflight::SingleFlight;
//!
//! let flight: SingleFlight<String, String> = SingleFlight::new();
//! let value = flight.run("key", || Ok("loaded".to_owned())).unwrap();
//! assert_eq!(value, "loaded");
//! ```
//!
//! # Thread Safety
//!
//! The in-flight map's lock is held only for the short critical sections
//! around record insert/lookup/removal, never across the upstream call.
//! Waiters release the map lock before blocking on the record's condvar.

#![warn(missing_docs)]
#![warn(clippy::all)]

use ahash::AHashMap;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;

/// One in-flight upstream call.
///
/// `result` is `None` until the leader completes; waiters block on `done`
/// until it flips to `Some` and then clone the shared outcome.
struct Call<T, E> {
    result: Mutex<Option<Result<T, E>>>,
    done: Condvar,
}

impl<T, E> Call<T, E> {
    fn new() -> Self {
        Self {
            result: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn wait(&self) -> Result<T, E>
    where
        T: Clone,
        E: Clone,
    {
        let mut result = self.result.lock();
        while result.is_none() {
            self.done.wait(&mut result);
        }
        result.as_ref().expect("woken without result").clone()
    }

    fn complete(&self, outcome: Result<T, E>) {
        *self.result.lock() = Some(outcome);
        self.done.notify_all();
    }
}

/// Coalesces concurrent calls for the same key into a single invocation.
///
/// `T` and `E` must be `Clone` because every coalesced caller receives the
/// one shared outcome.
pub struct SingleFlight<T, E> {
    calls: Mutex<AHashMap<String, Arc<Call<T, E>>>>,
}

impl<T, E> Default for SingleFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> SingleFlight<T, E>
where
    T: Clone,
    E: Clone,
{
    /// Create an empty coalescer.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(AHashMap::new()),
        }
    }

    /// Run `f` for `key`, coalescing with any call already in flight.
    ///
    /// At most one invocation of `f` runs per key at any moment across the
    /// process. Callers that arrive while a call is in flight block until
    /// it completes and return its result; a failed call hands the same
    /// error to every waiter. There is no retry at this layer.
    pub fn run<F>(&self, key: &str, f: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let call = {
            let mut calls = self.calls.lock();
            if let Some(existing) = calls.get(key) {
                let existing = existing.clone();
                drop(calls);
                return existing.wait();
            }
            let call = Arc::new(Call::new());
            calls.insert(key.to_owned(), call.clone());
            call
        };

        let outcome = f();
        call.complete(outcome.clone());
        self.calls.lock().remove(key);
        outcome
    }

    /// Number of keys with a call currently in flight.
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_single_caller() {
        let flight: SingleFlight<String, String> = SingleFlight::new();
        let value = flight.run("key", || Ok("v".to_owned())).unwrap();
        assert_eq!(value, "v");
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn test_concurrent_callers_share_one_invocation() {
        let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(100));

        let mut handles = Vec::new();
        for _ in 0..100 {
            let flight = flight.clone();
            let invocations = invocations.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                flight.run("x", || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(100));
                    Ok("x-value".to_owned())
                })
            }));
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), "x-value");
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(flight.in_flight(), 0);
    }

    #[test]
    fn test_error_shared_with_all_waiters() {
        let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(10));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let flight = flight.clone();
            let invocations = invocations.clone();
            let barrier = barrier.clone();
            handles.push(thread::spawn(move || {
                barrier.wait();
                flight.run("broken", || {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(Duration::from_millis(50));
                    Err::<String, _>("upstream failed".to_owned())
                })
            }));
        }

        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap_err(), "upstream failed");
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_sequential_calls_invoke_again() {
        let flight: SingleFlight<u32, String> = SingleFlight::new();
        let invocations = AtomicUsize::new(0);

        for expected in 1..=3 {
            let value = flight
                .run("key", || {
                    Ok(invocations.fetch_add(1, Ordering::SeqCst) as u32 + 1)
                })
                .unwrap();
            assert_eq!(value, expected);
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_distinct_keys_run_independently() {
        let flight: Arc<SingleFlight<String, String>> = Arc::new(SingleFlight::new());
        let invocations = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(32));

        let mut handles = Vec::new();
        for k in 0..4 {
            for _ in 0..8 {
                let flight = flight.clone();
                let invocations = invocations.clone();
                let barrier = barrier.clone();
                let key = format!("key{k}");
                handles.push(thread::spawn(move || {
                    barrier.wait();
                    flight.run(&key, || {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(50));
                        Ok(key.clone())
                    })
                }));
            }
        }

        for handle in handles {
            assert!(handle.join().unwrap().is_ok());
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 4);
    }
}
