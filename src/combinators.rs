//! `all`, `race` and `all_settled`.
//!
//! Every combinator is an ordinary computation promise that attaches
//! [`then_with`](Promise::then_with) handlers to its inputs and settles
//! through cloned [`Fulfill`]/[`Reject`] handles. The shared accumulator is
//! the only state the handlers touch, and it records whether the combined
//! promise has already been settled.
//!
//! Inputs are never cancelled. When `all` rejects or `race` settles, the
//! remaining inputs keep their workers until they finish on their own.
use crate::builder::Builder;
use crate::error::Reason;
use crate::promise::{Fulfill, Promise, Reject, State};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub(crate) const ALL_WORKER_NAME: &str = "promise-all";
pub(crate) const RACE_WORKER_NAME: &str = "promise-race";
pub(crate) const ALL_SETTLED_WORKER_NAME: &str = "promise-all-settled";

/// The outcome of one input to [`Promise::all_settled`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(Reason),
}

impl<T> Settled<T> {
    pub fn state(&self) -> State {
        match self {
            Settled::Fulfilled(_) => State::Fulfilled,
            Settled::Rejected(_) => State::Rejected,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&Reason> {
        match self {
            Settled::Fulfilled(_) => None,
            Settled::Rejected(reason) => Some(reason),
        }
    }
}

/// Per-input results, kept in input order.
struct Gather<R> {
    slots: Vec<Option<R>>,
    remaining: usize,
    done: bool,
}

impl<R> Gather<R> {
    fn new(len: usize) -> Self {
        Self {
            slots: (0..len).map(|_| None).collect(),
            remaining: len,
            done: false,
        }
    }

    /// Store the result for `index`. Returns every result, in order, once
    /// the last one arrives.
    fn record(&mut self, index: usize, result: R) -> Option<Vec<R>> {
        if self.done {
            return None;
        }
        self.slots[index] = Some(result);
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        self.done = true;
        std::mem::take(&mut self.slots).into_iter().collect()
    }

    /// Stop gathering. Returns `true` for the first caller only.
    fn stop(&mut self) -> bool {
        !std::mem::replace(&mut self.done, true)
    }
}

fn lock<R>(gather: &Mutex<Gather<R>>) -> MutexGuard<'_, Gather<R>> {
    gather.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<T: Clone + Send + 'static> Promise<T> {
    /// Fulfill with every input's value, in input order, once all inputs
    /// fulfill. Reject with the first rejection observed.
    ///
    /// # Examples
    ///
    /// ```
    /// use promises::Promise;
    ///
    /// let all = Promise::all(vec![Promise::resolve(1), Promise::resolve(2)]);
    /// assert_eq!(all.wait().unwrap(), vec![1, 2]);
    ///
    /// let failed = Promise::all(vec![Promise::resolve(1), Promise::reject("boom")]);
    /// assert_eq!(failed.wait().unwrap_err().to_string(), "boom");
    /// ```
    pub fn all<I>(promises: I) -> Promise<Vec<T>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let promises: Vec<_> = promises.into_iter().collect();
        Builder::new()
            .name(ALL_WORKER_NAME)
            .spawn(move |fulfill: Fulfill<Vec<T>>, reject: Reject<Vec<T>>| {
                if promises.is_empty() {
                    fulfill.fulfill(Vec::new());
                    return;
                }
                let gather = Arc::new(Mutex::new(Gather::new(promises.len())));
                for (index, promise) in promises.into_iter().enumerate() {
                    let on_fulfilled = {
                        let gather = Arc::clone(&gather);
                        let fulfill = fulfill.clone();
                        move |value: T| {
                            let values = lock(&gather).record(index, value);
                            if let Some(values) = values {
                                fulfill.fulfill(values);
                            }
                            Ok(None)
                        }
                    };
                    let on_rejected = {
                        let gather = Arc::clone(&gather);
                        let reject = reject.clone();
                        move |reason: Reason| {
                            let first = lock(&gather).stop();
                            if first {
                                reject.reject(reason);
                            }
                            Ok(None)
                        }
                    };
                    promise.then_with(on_fulfilled, on_rejected);
                }
            })
    }

    /// Settle the same way as whichever input settles first.
    ///
    /// An empty input has nothing to settle with; the returned promise is
    /// rejected as abandoned.
    pub fn race<I>(promises: I) -> Promise<T>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let promises: Vec<_> = promises.into_iter().collect();
        Builder::new()
            .name(RACE_WORKER_NAME)
            .spawn(move |fulfill: Fulfill<T>, reject: Reject<T>| {
                let finished = Arc::new(AtomicBool::new(false));
                for promise in promises {
                    let on_fulfilled = {
                        let finished = Arc::clone(&finished);
                        let fulfill = fulfill.clone();
                        move |value: T| {
                            if !finished.swap(true, Ordering::AcqRel) {
                                fulfill.fulfill(value);
                            }
                            Ok(None)
                        }
                    };
                    let on_rejected = {
                        let finished = Arc::clone(&finished);
                        let reject = reject.clone();
                        move |reason: Reason| {
                            if !finished.swap(true, Ordering::AcqRel) {
                                reject.reject(reason);
                            }
                            Ok(None)
                        }
                    };
                    promise.then_with(on_fulfilled, on_rejected);
                }
            })
    }

    /// Fulfill with every input's outcome, in input order, once all inputs
    /// settle. Never rejects.
    pub fn all_settled<I>(promises: I) -> Promise<Vec<Settled<T>>>
    where
        I: IntoIterator<Item = Promise<T>>,
    {
        let promises: Vec<_> = promises.into_iter().collect();
        Builder::new()
            .name(ALL_SETTLED_WORKER_NAME)
            .spawn(move |fulfill: Fulfill<Vec<Settled<T>>>, _reject| {
                if promises.is_empty() {
                    fulfill.fulfill(Vec::new());
                    return;
                }
                let gather = Arc::new(Mutex::new(Gather::new(promises.len())));
                let record = move |index: usize, outcome: Settled<T>| {
                    let outcomes = lock(&gather).record(index, outcome);
                    if let Some(outcomes) = outcomes {
                        fulfill.clone().fulfill(outcomes);
                    }
                };
                let record = Arc::new(record);
                for (index, promise) in promises.into_iter().enumerate() {
                    let on_fulfilled = {
                        let record = Arc::clone(&record);
                        move |value: T| {
                            record(index, Settled::Fulfilled(value));
                            Ok(None)
                        }
                    };
                    let on_rejected = {
                        let record = Arc::clone(&record);
                        move |reason: Reason| {
                            record(index, Settled::Rejected(reason));
                            Ok(None)
                        }
                    };
                    promise.then_with(on_fulfilled, on_rejected);
                }
            })
    }
}
