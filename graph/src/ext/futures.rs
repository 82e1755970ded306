use futures03::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;

#[derive(Debug, Default)]
struct Shared {
    canceled: AtomicBool,
    notify: Notify,
}

impl Shared {
    fn cancel(&self) {
        self.canceled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Cancels every future made cancelable through one of its handles when
/// dropped.
#[derive(Debug, Default)]
pub struct CancelGuard {
    shared: Arc<Shared>,
}

impl CancelGuard {
    /// Creates a guard that initially guards nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A more readable `drop`.
    pub fn cancel(self) {}

    pub fn handle(&self) -> CancelHandle {
        CancelHandle {
            shared: self.shared.clone(),
            deadline: None,
        }
    }
}

impl Drop for CancelGuard {
    fn drop(&mut self) {
        self.shared.cancel();
    }
}

/// Why a cancelable future stopped before completing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    Canceled,
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CancelReason::Canceled => write!(f, "operation canceled"),
            CancelReason::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Observes a `CancelGuard` and, optionally, a deadline. Handles are cheap
/// to clone; dropping one has no effect.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    shared: Arc<Shared>,
    deadline: Option<Instant>,
}

impl CancelHandle {
    /// A handle that is only ever canceled by its deadline, if one is set.
    pub fn never() -> Self {
        CancelHandle {
            shared: Arc::new(Shared::default()),
            deadline: None,
        }
    }

    /// Adds a deadline to the handle. An earlier deadline already on the
    /// handle is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        });
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolves once the guard is canceled or the deadline passes.
    pub async fn canceled(&self) -> CancelReason {
        let notified = self.shared.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.shared.is_canceled() {
            return CancelReason::Canceled;
        }
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = &mut notified => CancelReason::Canceled,
                _ = tokio::time::sleep_until(deadline) => CancelReason::DeadlineExceeded,
            },
            None => {
                notified.await;
                CancelReason::Canceled
            }
        }
    }
}

pub trait CancelToken {
    fn cancel_reason(&self) -> Option<CancelReason>;

    fn is_canceled(&self) -> bool {
        self.cancel_reason().is_some()
    }

    fn check_cancel(&self) -> Result<(), CancelReason> {
        match self.cancel_reason() {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }
}

impl CancelToken for CancelHandle {
    fn cancel_reason(&self) -> Option<CancelReason> {
        if self.shared.is_canceled() {
            Some(CancelReason::Canceled)
        } else if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(CancelReason::DeadlineExceeded)
        } else {
            None
        }
    }
}

pub trait FutureExtension: Future + Sized {
    /// Runs the future until it completes or `handle` is canceled,
    /// whichever happens first. A handle that is already canceled keeps
    /// the future from being polled at all.
    fn cancelable<'a>(
        self,
        handle: &CancelHandle,
    ) -> BoxFuture<'a, Result<Self::Output, CancelReason>>
    where
        Self: Send + 'a,
        Self::Output: Send + 'a;
}

impl<F: Future> FutureExtension for F {
    fn cancelable<'a>(
        self,
        handle: &CancelHandle,
    ) -> BoxFuture<'a, Result<Self::Output, CancelReason>>
    where
        Self: Send + 'a,
        Self::Output: Send + 'a,
    {
        let handle = handle.clone();
        async move {
            tokio::select! {
                biased;
                reason = handle.canceled() => Err(reason),
                output = self => Ok(output),
            }
        }
        .boxed()
    }
}
