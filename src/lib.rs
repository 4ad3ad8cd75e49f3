//! Thread-backed promises.
//!
//! A [`Promise`] is the eventual value, or rejection [`Reason`], of a
//! computation running on its own worker thread. Promises chain with
//! [`then`](Promise::then), [`catch`](Promise::catch) and
//! [`finally`](Promise::finally), combine with [`all`](Promise::all),
//! [`race`](Promise::race) and [`all_settled`](Promise::all_settled), and are
//! consumed either by blocking on [`wait`](Promise::wait) or by awaiting them
//! as a [`std::future::Future`].
//!
//! # Examples
//!
//! ```
//! use promises::Promise;
//! use std::thread;
//! use std::time::Duration;
//!
//! let slow = Promise::new(|fulfill, _reject| {
//!     thread::sleep(Duration::from_millis(10));
//!     fulfill.fulfill(1);
//! });
//! let doubled = slow.then(|v| Ok(Some(v * 2)));
//! let all = Promise::all(vec![doubled, Promise::resolve(3)]);
//! assert_eq!(all.wait().unwrap(), vec![2, 3]);
//! ```
//!
//! There is no cancellation. A worker runs until its computation returns,
//! even when nobody is left to observe the result.
mod builder;
mod chain;
mod combinators;
mod error;
mod promise;
mod signal;

pub use builder::Builder;
pub use chain::Handled;
pub use combinators::Settled;
pub use error::{Error, Reason, RejectedError};
pub use promise::{Fulfill, Promise, Reject, State};
