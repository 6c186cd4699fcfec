//! Run-wide cancellation flag.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cheap to clone; every clone observes the same flag.
///
/// Cancelling stops new page requests, new submissions and new delete calls. Work already running
/// in a pool is left to finish.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Cancel this token on Ctrl+C. Can only be installed once per process.
    pub fn cancel_on_ctrlc(&self) -> Result<()> {
        let token = self.clone();
        ctrlc::set_handler(move || token.cancel()).context("set Ctrl+C handler")
    }
}
