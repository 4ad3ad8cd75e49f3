use crate::builder::Builder;
use crate::error::{Error, Reason, RejectedError};
use crate::signal::Signal;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread::{self, Thread};

pub(crate) const ABANDONED: &str = "promise abandoned before settlement";

/// Where a promise is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    Pending,
    Fulfilled,
    Rejected,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Pending => write!(f, "pending"),
            State::Fulfilled => write!(f, "fulfilled"),
            State::Rejected => write!(f, "rejected"),
        }
    }
}

#[derive(Debug)]
enum Outcome<T> {
    Pending,
    Fulfilled(T),
    Rejected(Reason),
}

impl<T> Outcome<T> {
    fn state(&self) -> State {
        match self {
            Outcome::Pending => State::Pending,
            Outcome::Fulfilled(_) => State::Fulfilled,
            Outcome::Rejected(_) => State::Rejected,
        }
    }
}

#[derive(Debug)]
struct Shared<T> {
    outcome: Mutex<Outcome<T>>,
    signal: Signal,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Outcome<T>> {
        self.outcome.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from pending to `outcome`. The outcome is stored before the
    /// signal fires, so anyone released by the signal sees it.
    fn settle(&self, outcome: Outcome<T>) -> bool {
        {
            let mut current = self.lock();
            if !matches!(*current, Outcome::Pending) {
                return false;
            }
            *current = outcome;
        }
        self.signal.signal();
        true
    }
}

/// The settling end of a computation promise, shared by its [`Fulfill`] and
/// [`Reject`] handles. Dropping the last one while still pending rejects the
/// promise.
struct Settler<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Settler<T> {
    fn settle(&self, outcome: Outcome<T>) -> bool {
        let state = outcome.state();
        let settled = self.shared.settle(outcome);
        if settled {
            log::trace!("promise {state}");
        } else {
            log::debug!("promise already settled, ignoring {state} outcome");
        }
        settled
    }
}

impl<T> Drop for Settler<T> {
    fn drop(&mut self) {
        if self.shared.settle(Outcome::Rejected(Reason::from(ABANDONED))) {
            log::debug!("{ABANDONED}");
        }
    }
}

/// Fulfills a computation promise.
///
/// Handles may be cloned and moved to other threads. The first settlement
/// of the promise wins, whether it comes through a `Fulfill` or a
/// [`Reject`].
pub struct Fulfill<T> {
    settler: Arc<Settler<T>>,
}

impl<T> Fulfill<T> {
    /// Returns `true` if this call settled the promise.
    pub fn fulfill(self, value: T) -> bool {
        self.settler.settle(Outcome::Fulfilled(value))
    }
}

impl<T> Clone for Fulfill<T> {
    fn clone(&self) -> Self {
        Self {
            settler: Arc::clone(&self.settler),
        }
    }
}

impl<T> fmt::Debug for Fulfill<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fulfill").finish_non_exhaustive()
    }
}

/// Rejects a computation promise. See [`Fulfill`].
pub struct Reject<T> {
    settler: Arc<Settler<T>>,
}

impl<T> Reject<T> {
    /// Returns `true` if this call settled the promise.
    pub fn reject(self, reason: impl Into<Reason>) -> bool {
        self.settler.settle(Outcome::Rejected(reason.into()))
    }
}

impl<T> Clone for Reject<T> {
    fn clone(&self) -> Self {
        Self {
            settler: Arc::clone(&self.settler),
        }
    }
}

impl<T> fmt::Debug for Reject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reject").finish_non_exhaustive()
    }
}

/// Settle through whichever handle matches `result`.
pub(crate) fn settle<T>(fulfill: Fulfill<T>, reject: Reject<T>, result: Result<T, Reason>) {
    match result {
        Ok(value) => {
            fulfill.fulfill(value);
        }
        Err(reason) => {
            reject.reject(reason);
        }
    }
}

/// The eventual result of a computation.
///
/// A promise is either built already settled ([`Promise::resolve`],
/// [`Promise::reject`], [`Promise::settled`]) or from a computation that runs
/// on its own worker thread ([`Promise::new`], [`Builder::spawn`]). The
/// computation receives a [`Fulfill`] and a [`Reject`] handle and settles the
/// promise through exactly one of them.
///
/// Cloning a promise is cheap; all clones observe the same settlement.
///
/// # Examples
///
/// ```
/// use promises::Promise;
///
/// let promise = Promise::new(|fulfill, _reject| {
///     fulfill.fulfill(6 * 7);
/// });
/// assert_eq!(promise.wait().unwrap(), 42);
///
/// let failed = Promise::<i32>::new(|_fulfill, reject| {
///     reject.reject("hello");
/// });
/// assert_eq!(failed.wait().unwrap_err().to_string(), "hello");
/// ```
pub struct Promise<T> {
    shared: Arc<Shared<T>>,
    worker: Option<Thread>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            worker: self.worker.clone(),
        }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("state", &self.state())
            .field("worker", &self.worker.as_ref().and_then(Thread::name))
            .finish()
    }
}

impl<T: Send + 'static> Promise<T> {
    /// Run `computation` on a new `promise-worker` thread.
    ///
    /// If the computation panics, the promise is rejected with the panic
    /// message. If it returns after dropping both handles without settling,
    /// the promise is rejected as abandoned.
    pub fn new<F>(computation: F) -> Self
    where
        F: FnOnce(Fulfill<T>, Reject<T>) + Send + 'static,
    {
        Builder::new().spawn(computation)
    }

    pub(crate) fn spawn_on<F>(builder: thread::Builder, computation: F) -> Self
    where
        F: FnOnce(Fulfill<T>, Reject<T>) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            outcome: Mutex::new(Outcome::Pending),
            signal: Signal::new(),
        });
        // Held until the spawn outcome is known, so that a failed spawn is
        // reported as such rather than as an abandoned promise.
        let settler = Arc::new(Settler {
            shared: Arc::clone(&shared),
        });
        let worker_settler = Arc::clone(&settler);

        let spawned = builder.spawn(move || {
            let fulfill = Fulfill {
                settler: Arc::clone(&worker_settler),
            };
            let reject = Reject {
                settler: Arc::clone(&worker_settler),
            };
            let result = panic::catch_unwind(AssertUnwindSafe(move || computation(fulfill, reject)));
            if let Err(payload) = result {
                let reason = Reason::from_panic(payload);
                log::warn!("promise computation panicked: {reason}");
                worker_settler.settle(Outcome::Rejected(reason));
            }
        });

        let worker = match spawned {
            Ok(handle) => {
                log::trace!("spawned promise worker {:?}", handle.thread().name());
                Some(handle.thread().clone())
            }
            Err(err) => {
                log::error!("failed to spawn promise worker: {err}");
                settler.settle(Outcome::Rejected(Reason::new(format!(
                    "failed to spawn promise worker: {err}"
                ))));
                None
            }
        };

        Self { shared, worker }
    }
}

impl<T> Promise<T> {
    fn from_outcome(outcome: Outcome<T>) -> Self {
        Self {
            shared: Arc::new(Shared {
                outcome: Mutex::new(outcome),
                signal: Signal::fired(),
            }),
            worker: None,
        }
    }

    /// An already fulfilled promise. No worker is spawned.
    pub fn resolve(value: T) -> Self {
        Self::from_outcome(Outcome::Fulfilled(value))
    }

    /// An already rejected promise. No worker is spawned.
    pub fn reject(reason: impl Into<Reason>) -> Self {
        Self::from_outcome(Outcome::Rejected(reason.into()))
    }

    /// An already settled promise built from exactly one of `value` and
    /// `reason`.
    ///
    /// ```
    /// use promises::{Error, Promise};
    ///
    /// let both = Promise::settled(Some(1), Some("no".into()));
    /// assert_eq!(both.unwrap_err(), Error::BothValueAndReason);
    /// ```
    pub fn settled(value: Option<T>, reason: Option<Reason>) -> Result<Self, Error> {
        match (value, reason) {
            (Some(_), Some(_)) => Err(Error::BothValueAndReason),
            (Some(value), None) => Ok(Self::resolve(value)),
            (None, Some(reason)) => Ok(Self::reject(reason)),
            (None, None) => Err(Error::NeitherValueNorReason),
        }
    }

    /// The state at the instant of the call. A pending answer may be stale
    /// by the time it is read; use [`wait`](Self::wait) for a settled view.
    pub fn state(&self) -> State {
        self.shared.lock().state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == State::Pending
    }

    pub fn is_fulfilled(&self) -> bool {
        self.state() == State::Fulfilled
    }

    pub fn is_rejected(&self) -> bool {
        self.state() == State::Rejected
    }

    /// The worker thread running this promise's computation, if it has one.
    pub fn worker(&self) -> Option<&Thread> {
        self.worker.as_ref()
    }
}

impl<T: Clone> Promise<T> {
    /// Block until the promise settles, then return its value or its
    /// rejection. Safe to call any number of times from any number of
    /// threads; every call sees the same outcome.
    pub fn wait(&self) -> Result<T, RejectedError> {
        self.shared.signal.wait();
        self.outcome()
    }

    fn outcome(&self) -> Result<T, RejectedError> {
        match &*self.shared.lock() {
            Outcome::Fulfilled(value) => Ok(value.clone()),
            Outcome::Rejected(reason) => Err(RejectedError::new(reason.clone())),
            Outcome::Pending => unreachable!("completion signal fired before settlement"),
        }
    }
}

impl<T: Clone> Future for Promise<T> {
    type Output = Result<T, RejectedError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared.signal.register(cx.waker()) {
            Poll::Pending
        } else {
            Poll::Ready(self.outcome())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    #[test]
    fn resolve_is_fulfilled_without_worker() {
        let promise = Promise::resolve("value");
        assert!(promise.is_fulfilled());
        assert!(promise.worker().is_none());
        assert_eq!(promise.wait().unwrap(), "value");
    }

    #[test]
    fn reject_is_rejected_without_worker() {
        let promise = Promise::<()>::reject("reason");
        assert!(promise.is_rejected());
        assert!(promise.worker().is_none());
        assert_eq!(promise.wait().unwrap_err().reason(), &"reason");
    }

    #[test]
    fn settled_requires_exactly_one() {
        assert!(Promise::settled(Some(1), None).unwrap().is_fulfilled());
        assert!(Promise::<i32>::settled(None, Some("no".into()))
            .unwrap()
            .is_rejected());
        assert_eq!(
            Promise::<i32>::settled(None, None).unwrap_err(),
            Error::NeitherValueNorReason
        );
        assert_eq!(
            Promise::settled(Some(1), Some("no".into())).unwrap_err(),
            Error::BothValueAndReason
        );
    }

    #[test]
    fn pending_until_the_computation_settles() {
        let (tx, rx) = channel::<i32>();
        let promise = Promise::new(move |fulfill, _| {
            let value = rx.recv().unwrap();
            fulfill.fulfill(value);
        });
        assert!(promise.is_pending());
        assert!(promise.worker().is_some());
        tx.send(5).unwrap();
        assert_eq!(promise.wait().unwrap(), 5);
        assert!(promise.is_fulfilled());
        assert!(!promise.is_rejected());
        assert!(!promise.is_pending());
    }

    #[test]
    fn first_settlement_wins() {
        let (tx, rx) = channel();
        let promise = Promise::new(move |fulfill: Fulfill<i32>, reject| {
            let again = fulfill.clone();
            tx.send((fulfill.fulfill(1), again.fulfill(2), reject.reject("late")))
                .unwrap();
        });
        assert_eq!(promise.wait().unwrap(), 1);
        assert_eq!(rx.recv().unwrap(), (true, false, false));
    }

    #[test]
    fn settlement_from_another_thread() {
        let promise = Promise::new(|fulfill, _| {
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                fulfill.fulfill(String::from("later"));
            });
        });
        assert_eq!(promise.wait().unwrap(), "later");
    }

    #[test]
    fn panicking_computation_rejects() {
        let promise = Promise::<i32>::new(|_, _| panic!("kaboom"));
        assert_eq!(promise.wait().unwrap_err().to_string(), "kaboom");
    }

    #[test]
    fn dropping_handles_abandons() {
        let promise = Promise::<i32>::new(|fulfill, reject| {
            drop(fulfill);
            drop(reject);
        });
        assert_eq!(promise.wait().unwrap_err().to_string(), ABANDONED);
    }

    #[test]
    fn concurrent_waiters_agree() {
        let promise = Promise::new(|fulfill, _| {
            thread::sleep(Duration::from_millis(20));
            fulfill.fulfill(vec![1, 2, 3]);
        });
        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let promise = promise.clone();
                thread::spawn(move || promise.wait())
            })
            .collect();
        for waiter in waiters {
            let value = waiter.join().expect("A waiter thread has panicked");
            assert_eq!(value.unwrap(), vec![1, 2, 3]);
        }
        assert_eq!(promise.wait().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn promise_is_a_future() {
        let promise = Promise::new(|fulfill, _| {
            thread::sleep(Duration::from_millis(10));
            fulfill.fulfill(7u8);
        });
        assert_eq!(block_on(promise.clone()).unwrap(), 7);
        assert_eq!(block_on(promise).unwrap(), 7);

        let rejected = Promise::<u8>::reject("nope");
        assert_eq!(block_on(rejected).unwrap_err().to_string(), "nope");
    }

    #[test]
    fn state_display() {
        assert_eq!(State::Pending.to_string(), "pending");
        assert_eq!(State::Fulfilled.to_string(), "fulfilled");
        assert_eq!(State::Rejected.to_string(), "rejected");
    }

    #[test]
    fn debug_shows_state() {
        let debug = format!("{:?}", Promise::resolve(1));
        assert!(debug.contains("Fulfilled"));
    }
}
