//! Per-task execution context.
//!
//! The scheduler creates one [`TaskContext`] per partition (read) or output path
//! (write) and calls [`TaskContext::mark_completed`] when the task finishes,
//! whether it succeeded, failed, or was cancelled. Readers register a listener
//! that releases their input handle, so a consumer that stops iterating early
//! does not leak it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use tracing::trace;

type Listener = Box<dyn FnOnce() + Send>;

/// Completion hooks and identity of one running task.
pub struct TaskContext {
    partition_id: usize,
    completed: AtomicBool,
    listeners: Mutex<Vec<Listener>>,
}

impl TaskContext {
    pub fn new(partition_id: usize) -> Self {
        Self {
            partition_id,
            completed: AtomicBool::new(false),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn partition_id(&self) -> usize {
        self.partition_id
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }

    /// Run `listener` when the task completes.
    ///
    /// A listener added after completion runs immediately.
    pub fn add_completion_listener(&self, listener: impl FnOnce() + Send + 'static) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.is_completed() {
            drop(listeners);
            listener();
            return;
        }
        listeners.push(Box::new(listener));
    }

    /// Mark the task finished and run every listener once, most recent first.
    /// Later calls are no-ops.
    pub fn mark_completed(&self) {
        let listeners = {
            let mut guard = self
                .listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.completed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *guard)
        };
        trace!(
            partition = self.partition_id,
            listeners = listeners.len(),
            "task completed"
        );
        for listener in listeners.into_iter().rev() {
            listener();
        }
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listeners_run_once_in_reverse_order() {
        let ctx = TaskContext::new(3);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let order = Arc::clone(&order);
            ctx.add_completion_listener(move || order.lock().unwrap().push(i));
        }
        ctx.mark_completed();
        ctx.mark_completed();
        assert_eq!(*order.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn late_listener_runs_immediately() {
        let ctx = TaskContext::default();
        ctx.mark_completed();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        ctx.add_completion_listener(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
