use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why a promise was rejected.
///
/// Reasons are plain messages. They are cheap to clone so that every waiter
/// on a rejected promise observes the same reason.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Reason {
    message: Arc<str>,
}

impl Reason {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string().into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Turn a caught panic payload into a reason.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        if let Some(s) = payload.downcast_ref::<&str>() {
            Self::new(s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            Self::new(s)
        } else {
            Self::new("computation panicked")
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.message, f)
    }
}

impl From<&str> for Reason {
    fn from(message: &str) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for Reason {
    fn from(message: String) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<RejectedError> for Reason {
    fn from(err: RejectedError) -> Self {
        err.reason
    }
}

impl PartialEq<&str> for Reason {
    fn eq(&self, other: &&str) -> bool {
        &*self.message == *other
    }
}

impl PartialEq<str> for Reason {
    fn eq(&self, other: &str) -> bool {
        &*self.message == other
    }
}

/// Returned by [`Promise::wait`](crate::Promise::wait) when the promise was
/// rejected. Displays as the bare reason message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct RejectedError {
    reason: Reason,
}

impl RejectedError {
    pub(crate) fn new(reason: Reason) -> Self {
        Self { reason }
    }

    pub fn reason(&self) -> &Reason {
        &self.reason
    }

    pub fn into_reason(self) -> Reason {
        self.reason
    }
}

/// Errors raised synchronously while building an already settled promise.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("both reason and value is set")]
    BothValueAndReason,
    #[error("neither value nor reason is set")]
    NeitherValueNorReason,
}
