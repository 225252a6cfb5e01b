//! Progress and cancellation plumbing for long-running jobs

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Context for background install and launch tasks
#[derive(Clone)]
pub struct TaskContext {
    pub status_callback: Arc<dyn Fn(String) + Send + Sync>,
    pub log_callback: Arc<dyn Fn(String) + Send + Sync>,
    pub progress_callback: Arc<dyn Fn(f32) + Send + Sync>,
    pub cancel_flag: Arc<AtomicBool>,
}

impl TaskContext {
    pub fn new(
        status: impl Fn(String) + Send + Sync + 'static,
        log: impl Fn(String) + Send + Sync + 'static,
        progress: impl Fn(f32) + Send + Sync + 'static,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            status_callback: Arc::new(status),
            log_callback: Arc::new(log),
            progress_callback: Arc::new(progress),
            cancel_flag: cancel,
        }
    }

    /// A context that discards everything; used by tests and one-shot helpers
    pub fn silent() -> Self {
        Self::new(|_| {}, |_| {}, |_| {}, Arc::new(AtomicBool::new(false)))
    }

    pub fn set_status(&self, msg: String) {
        (self.status_callback)(msg);
    }

    pub fn log(&self, msg: String) {
        (self.log_callback)(msg);
    }

    pub fn set_progress(&self, p: f32) {
        (self.progress_callback)(p.clamp(0.0, 1.0));
    }

    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }
}
