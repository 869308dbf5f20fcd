//! Render context: cancellation flag and optional deadline.
//!
//! Clones share the same cancellation flag, so a handle kept by the caller can
//! stop a render running elsewhere. The pipeline polls [`RenderContext::check`]
//! between stages; long-running sources should poll it too.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::Interrupted;

#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that expires `timeout` from now. The cancellation
    /// flag stays shared with `self`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a context with an absolute deadline. An earlier existing
    /// deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// `Err` once the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
