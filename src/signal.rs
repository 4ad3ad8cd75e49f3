//! A one-shot completion signal.
//!
//! Any number of threads may block on the signal, and any number of tasks may
//! register a waker on it. Firing it wakes all of them, and every later wait
//! returns immediately. The signal carries no value; the settled outcome is
//! read from the promise after the signal fires.
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::task::Waker;

#[derive(Debug, Default)]
pub(crate) struct Signal {
    inner: Mutex<Inner>,
    cond: Condvar,
}

#[derive(Debug, Default)]
struct Inner {
    fired: bool,
    wakers: Vec<Waker>,
}

impl Signal {
    pub fn new() -> Self {
        Self::default()
    }

    /// A signal that has already fired.
    pub fn fired() -> Self {
        Self {
            inner: Mutex::new(Inner {
                fired: true,
                wakers: vec![],
            }),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until the signal fires.
    pub fn wait(&self) {
        let inner = self.lock();
        let _inner = self
            .cond
            .wait_while(inner, |inner| !inner.fired)
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Fire the signal. Returns `false` if it had already fired.
    pub fn signal(&self) -> bool {
        let wakers = {
            let mut inner = self.lock();
            if inner.fired {
                return false;
            }
            inner.fired = true;
            std::mem::take(&mut inner.wakers)
        };
        self.cond.notify_all();
        for waker in wakers {
            waker.wake();
        }
        true
    }

    /// Arrange for `waker` to be woken when the signal fires.
    ///
    /// Returns `false` without registering anything if the signal has
    /// already fired.
    pub fn register(&self, waker: &Waker) -> bool {
        let mut inner = self.lock();
        if inner.fired {
            return false;
        }
        match inner.wakers.iter_mut().find(|w| w.will_wake(waker)) {
            Some(existing) => existing.clone_from(waker),
            None => inner.wakers.push(waker.clone()),
        }
        true
    }
}
