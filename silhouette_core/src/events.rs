// Copyright 2026 the Silhouette Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Multi-listener event dispatch.
//!
//! [`Listeners`] holds any number of callbacks for one event. Callbacks are
//! invoked in subscription order and report failure by returning
//! [`ListenerError`]; a failing callback never prevents delivery to the
//! callbacks after it. The failures are handed back to the caller, which
//! decides how to surface them (the projection tree counts them and forwards
//! them to its trace sink).

use alloc::borrow::Cow;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

/// Error reported by a listener callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListenerError {
    message: Cow<'static, str>,
}

impl ListenerError {
    /// Creates an error with the given message.
    #[must_use]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ListenerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener failed: {}", self.message)
    }
}

impl core::error::Error for ListenerError {}

/// Result type returned by listener callbacks.
pub type ListenerResult = Result<(), ListenerError>;

/// Handle returned by [`Listeners::add`], used to unsubscribe.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerKey(pub(crate) u64);

impl fmt::Debug for ListenerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerKey({})", self.0)
    }
}

type Callback<T> = Box<dyn FnMut(&T) -> ListenerResult>;

/// An ordered set of callbacks for one event type.
pub struct Listeners<T> {
    entries: Vec<(ListenerKey, Callback<T>)>,
    next_key: u64,
}

impl<T> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Listeners<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners")
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl<T> Listeners<T> {
    /// Creates an empty listener set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_key: 0,
        }
    }

    /// Adds a callback and returns its key.
    pub fn add(&mut self, callback: impl FnMut(&T) -> ListenerResult + 'static) -> ListenerKey {
        let key = ListenerKey(self.next_key);
        self.next_key += 1;
        self.entries.push((key, Box::new(callback)));
        key
    }

    /// Adds a callback under a key allocated by the caller.
    ///
    /// Lets several listener sets share one key space. Later calls to
    /// [`add`](Self::add) allocate past `key`.
    pub(crate) fn add_with_key(
        &mut self,
        key: ListenerKey,
        callback: impl FnMut(&T) -> ListenerResult + 'static,
    ) {
        self.next_key = self.next_key.max(key.0 + 1);
        self.entries.push((key, Box::new(callback)));
    }

    /// Removes the callback registered under `key`.
    ///
    /// Returns `false` if no such callback exists.
    pub fn remove(&mut self, key: ListenerKey) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(k, _)| *k != key);
        self.entries.len() != before
    }

    /// Number of registered callbacks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no callbacks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes every callback.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Invokes every callback with `value`, in subscription order.
    ///
    /// Failures are appended to `failures`; delivery always continues.
    pub fn notify(&mut self, value: &T, failures: &mut Vec<ListenerError>) {
        for (_, callback) in &mut self.entries {
            if let Err(err) = callback(value) {
                failures.push(err);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    #[test]
    fn delivers_in_subscription_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut listeners = Listeners::<u32>::new();
        for tag in 0..3 {
            let log = Rc::clone(&log);
            listeners.add(move |v: &u32| {
                log.borrow_mut().push((tag, *v));
                Ok(())
            });
        }
        let mut failures = Vec::new();
        listeners.notify(&7, &mut failures);
        assert_eq!(*log.borrow(), vec![(0, 7), (1, 7), (2, 7)]);
        assert!(failures.is_empty());
    }

    #[test]
    fn failure_does_not_stop_delivery() {
        let hits = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::<()>::new();
        listeners.add(|_| Err(ListenerError::new("boom")));
        let h = Rc::clone(&hits);
        listeners.add(move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        });
        let mut failures = Vec::new();
        listeners.notify(&(), &mut failures);
        assert_eq!(*hits.borrow(), 1);
        assert_eq!(failures, vec![ListenerError::new("boom")]);
    }

    #[test]
    fn remove_unsubscribes() {
        let hits = Rc::new(RefCell::new(0));
        let mut listeners = Listeners::<()>::new();
        let h = Rc::clone(&hits);
        let key = listeners.add(move |_| {
            *h.borrow_mut() += 1;
            Ok(())
        });
        assert!(listeners.remove(key));
        assert!(!listeners.remove(key));
        listeners.notify(&(), &mut Vec::new());
        assert_eq!(*hits.borrow(), 0);
        assert!(listeners.is_empty());
    }

    #[test]
    fn caller_keys_and_own_keys_do_not_collide() {
        let mut listeners = Listeners::<()>::new();
        listeners.add_with_key(ListenerKey(0), |_| Ok(()));
        listeners.add_with_key(ListenerKey(4), |_| Ok(()));
        let own = listeners.add(|_| Ok(()));
        assert_eq!(own, ListenerKey(5));
        assert!(listeners.remove(own));
        assert_eq!(listeners.len(), 2);
    }
}
