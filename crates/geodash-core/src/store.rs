//! Minimal synchronous publish/subscribe state container.
//!
//! `set_state` merges a patch and notifies every subscriber before it
//! returns. There is no batching and no re-entrancy guard: a subscriber
//! that calls `set_state` again runs that nested notification to
//! completion before the outer fan-out continues. The internal lock is
//! never held while subscribers run.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// State that can absorb a partial update
pub trait Mergeable: Clone {
    type Patch;

    /// Shallow-merge `patch` into `self`
    fn merge(&mut self, patch: Self::Patch);
}

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

struct Inner<S> {
    state: Arc<S>,
    // Keyed by subscription order so fan-out follows subscription order
    listeners: BTreeMap<u64, Listener<S>>,
    next_id: u64,
}

/// Reactive store over an immutable state snapshot
pub struct ReactiveStore<S> {
    inner: Arc<Mutex<Inner<S>>>,
}

impl<S> Clone for ReactiveStore<S> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<S> ReactiveStore<S>
where
    S: Mergeable + Send + Sync + 'static,
{
    pub fn new(initial: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: Arc::new(initial),
                listeners: BTreeMap::new(),
                next_id: 0,
            })),
        }
    }

    /// Current snapshot
    pub fn get_state(&self) -> Arc<S> {
        Arc::clone(&lock(&self.inner).state)
    }

    /// Merge `patch` and synchronously notify all subscribers with the new snapshot
    pub fn set_state(&self, patch: S::Patch) {
        let (snapshot, listeners) = {
            let mut inner = lock(&self.inner);
            let mut next = S::clone(&inner.state);
            next.merge(patch);
            inner.state = Arc::new(next);
            let listeners: Vec<Listener<S>> = inner.listeners.values().cloned().collect();
            (Arc::clone(&inner.state), listeners)
        };

        for listener in listeners {
            listener(&snapshot);
        }
    }

    /// Register a subscriber. It stays registered until [`Subscription::unsubscribe`].
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&S) + Send + Sync + 'static,
    {
        let id = {
            let mut inner = lock(&self.inner);
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, Arc::new(listener));
            id
        };

        let weak: Weak<Mutex<Inner<S>>> = Arc::downgrade(&self.inner);
        Subscription {
            release: Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner).listeners.remove(&id);
                }
            }),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }
}

/// Handle returned by [`ReactiveStore::subscribe`]
pub struct Subscription {
    release: Box<dyn FnOnce() + Send + Sync>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        (self.release)();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, Default, PartialEq)]
    struct Counter {
        value: i64,
        label: &'static str,
    }

    #[derive(Default)]
    struct CounterPatch {
        value: Option<i64>,
        label: Option<&'static str>,
    }

    impl Mergeable for Counter {
        type Patch = CounterPatch;

        fn merge(&mut self, patch: CounterPatch) {
            if let Some(value) = patch.value {
                self.value = value;
            }
            if let Some(label) = patch.label {
                self.label = label;
            }
        }
    }

    fn value(v: i64) -> CounterPatch {
        CounterPatch { value: Some(v), label: None }
    }

    #[test]
    fn test_shallow_merge_keeps_other_fields() {
        let store = ReactiveStore::new(Counter { value: 1, label: "a" });
        store.set_state(value(2));
        assert_eq!(*store.get_state(), Counter { value: 2, label: "a" });

        store.set_state(CounterPatch { value: None, label: Some("b") });
        assert_eq!(*store.get_state(), Counter { value: 2, label: "b" });
    }

    #[test]
    fn test_notifies_before_returning() {
        let store = ReactiveStore::new(Counter::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = store.subscribe(move |s: &Counter| sink.lock().unwrap().push(s.value));

        store.set_state(value(1));
        assert_eq!(*seen.lock().unwrap(), vec![1]);
        store.set_state(value(2));
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let store = ReactiveStore::new(Counter::default());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        store.set_state(value(1));
        sub.unsubscribe();
        store.set_state(value(2));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.subscriber_count(), 0);
    }

    #[test]
    fn test_nested_set_state_completes_before_outer_returns() {
        let store = ReactiveStore::new(Counter::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        let nested_store = store.clone();
        let first_log = Arc::clone(&log);
        let _first = store.subscribe(move |s: &Counter| {
            first_log.lock().unwrap().push(format!("first:{}", s.value));
            if s.value == 1 {
                nested_store.set_state(value(10));
            }
        });

        let second_log = Arc::clone(&log);
        let _second = store.subscribe(move |s: &Counter| {
            second_log.lock().unwrap().push(format!("second:{}", s.value));
        });

        store.set_state(value(1));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:1", "first:10", "second:10", "second:1"]
        );
        assert_eq!(store.get_state().value, 10);
    }
}
