use crate::promise::{Fulfill, Promise, Reject};
use std::thread;

pub(crate) const DEFAULT_WORKER_NAME: &str = "promise-worker";

/// Configures the worker thread behind a computation promise.
///
/// # Examples
///
/// ```
/// use promises::Builder;
///
/// let promise = Builder::new()
///     .name("answer")
///     .spawn(|fulfill, _reject| {
///         fulfill.fulfill(42);
///     });
/// assert_eq!(promise.wait().unwrap(), 42);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Builder {
    name: Option<String>,
    stack_size: Option<usize>,
}

impl Builder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the worker thread. Defaults to `promise-worker`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Stack size of the worker thread, in bytes.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.stack_size = Some(size);
        self
    }

    /// Start `computation` on a new worker thread and return the promise it
    /// settles.
    pub fn spawn<T, F>(self, computation: F) -> Promise<T>
    where
        T: Send + 'static,
        F: FnOnce(Fulfill<T>, Reject<T>) + Send + 'static,
    {
        Promise::spawn_on(self.into_thread_builder(), computation)
    }

    fn into_thread_builder(self) -> thread::Builder {
        let name = self
            .name
            .unwrap_or_else(|| DEFAULT_WORKER_NAME.to_string());
        let builder = thread::Builder::new().name(name);
        match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_name() {
        let promise = Builder::new().spawn(|fulfill, _| {
            fulfill.fulfill(thread::current().name().map(str::to_owned));
        });
        let worker = promise.worker().expect("computation promises have a worker");
        assert_eq!(worker.name(), Some(DEFAULT_WORKER_NAME));
        assert_eq!(
            promise.wait().unwrap().as_deref(),
            Some(DEFAULT_WORKER_NAME)
        );
    }

    #[test]
    fn custom_name_and_stack_size() {
        let promise = Builder::new()
            .name("fetcher")
            .stack_size(256 * 1024)
            .spawn(|fulfill, _| {
                fulfill.fulfill(thread::current().name().map(str::to_owned));
            });
        assert_eq!(promise.wait().unwrap().as_deref(), Some("fetcher"));
    }
}
