//! `then`, `catch` and `finally`.
//!
//! Each derives a new promise whose worker waits on the source and then
//! runs the handler. The caller never blocks.
use crate::builder::Builder;
use crate::error::Reason;
use crate::promise::{settle, Promise};

pub(crate) const THEN_WORKER_NAME: &str = "promise-then";

/// What a chaining handler produces.
///
/// `Ok(Some(value))` settles the derived promise with `value`. `Ok(None)`
/// hands the source's own outcome through unchanged. `Err(reason)` rejects
/// the derived promise.
pub type Handled<T> = Result<Option<T>, Reason>;

impl<T: Clone + Send + 'static> Promise<T> {
    /// Chain a handler for the fulfilled value. A rejection passes through
    /// untouched.
    ///
    /// # Examples
    ///
    /// ```
    /// use promises::Promise;
    ///
    /// let replaced = Promise::resolve(2).then(|v| Ok(Some(v * 10)));
    /// assert_eq!(replaced.wait().unwrap(), 20);
    ///
    /// // A handler that yields nothing keeps the original value.
    /// let kept = Promise::resolve(2).then(|_| Ok(None));
    /// assert_eq!(kept.wait().unwrap(), 2);
    /// ```
    pub fn then<F>(self, on_fulfilled: F) -> Promise<T>
    where
        F: FnOnce(T) -> Handled<T> + Send + 'static,
    {
        self.chain(Some(on_fulfilled), None::<fn(Reason) -> Handled<T>>)
    }

    /// Chain handlers for both outcomes. A value produced by `on_rejected`
    /// recovers the derived promise into the fulfilled state.
    pub fn then_with<F, R>(self, on_fulfilled: F, on_rejected: R) -> Promise<T>
    where
        F: FnOnce(T) -> Handled<T> + Send + 'static,
        R: FnOnce(Reason) -> Handled<T> + Send + 'static,
    {
        self.chain(Some(on_fulfilled), Some(on_rejected))
    }

    /// Chain a handler for the rejection reason only.
    ///
    /// ```
    /// use promises::Promise;
    ///
    /// let recovered = Promise::reject("boom").catch(|_| Ok(Some("recovered")));
    /// assert_eq!(recovered.wait().unwrap(), "recovered");
    /// ```
    pub fn catch<R>(self, on_rejected: R) -> Promise<T>
    where
        R: FnOnce(Reason) -> Handled<T> + Send + 'static,
    {
        self.chain(None::<fn(T) -> Handled<T>>, Some(on_rejected))
    }

    /// Run `f` once the source settles, either way, and pass the source's
    /// outcome through unchanged. A panic in `f` rejects the derived promise.
    pub fn finally<F>(self, f: F) -> Promise<T>
    where
        F: FnOnce() + Send + 'static,
    {
        Builder::new()
            .name(THEN_WORKER_NAME)
            .spawn(move |fulfill, reject| {
                let outcome = self.wait().map_err(Reason::from);
                f();
                settle(fulfill, reject, outcome);
            })
    }

    fn chain<F, R>(self, on_fulfilled: Option<F>, on_rejected: Option<R>) -> Promise<T>
    where
        F: FnOnce(T) -> Handled<T> + Send + 'static,
        R: FnOnce(Reason) -> Handled<T> + Send + 'static,
    {
        Builder::new()
            .name(THEN_WORKER_NAME)
            .spawn(move |fulfill, reject| {
                let outcome = match self.wait() {
                    Ok(value) => match on_fulfilled {
                        Some(handler) => match handler(value.clone()) {
                            Ok(Some(replacement)) => Ok(replacement),
                            Ok(None) => Ok(value),
                            Err(reason) => Err(reason),
                        },
                        None => Ok(value),
                    },
                    Err(err) => match on_rejected {
                        Some(handler) => match handler(err.reason().clone()) {
                            Ok(Some(recovered)) => Ok(recovered),
                            Ok(None) => Err(err.into_reason()),
                            Err(reason) => Err(reason),
                        },
                        None => Err(err.into_reason()),
                    },
                };
                settle(fulfill, reject, outcome);
            })
    }
}
