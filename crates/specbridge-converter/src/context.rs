//! Per-call cancellation and progress reporting.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::ConvertError;

/// A cloneable cancellation flag shared with the caller.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Called with the running byte total after each chunk.
pub type ProgressFn = Arc<dyn Fn(u64) + Send + Sync>;

/// Caller-supplied context for one conversion or validation call.
#[derive(Clone, Default)]
pub struct Context {
    cancel: CancelToken,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_progress(mut self, progress: impl Fn(u64) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// `Err(Cancelled)` once the token has fired.
    pub fn check(&self) -> Result<(), ConvertError> {
        if self.is_cancelled() {
            Err(ConvertError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn meter(&self) -> Meter<'_> {
        Meter {
            progress: self.progress.as_ref(),
            total: 0,
        }
    }
}

/// Running byte counter for one call. Totals only grow.
pub(crate) struct Meter<'a> {
    progress: Option<&'a ProgressFn>,
    total: u64,
}

impl Meter<'_> {
    pub(crate) fn advance(&mut self, bytes: usize) {
        self.total += bytes as u64;
        if let Some(progress) = self.progress {
            progress(self.total);
        }
    }
}
