//! UI-affinity execution context.
//!
//! Widget instantiation and anchor emission must happen on the host's UI
//! context. The pipeline only knows the [`UiExecutor`] capability; hosts
//! bridge it to their real main thread, while [`UiThreadExecutor`] provides a
//! dedicated single-threaded context and [`InlineExecutor`] runs tasks on the
//! calling thread for tests.

use log::debug;

pub type UiTask = Box<dyn FnOnce() + Send + 'static>;

/// A single-threaded execution context with UI affinity.
pub trait UiExecutor: Send + Sync {
    fn execute(&self, task: UiTask);
}

/// Runs tasks immediately on the calling thread.
#[derive(Debug, Default)]
pub struct InlineExecutor;

impl UiExecutor for InlineExecutor {
    fn execute(&self, task: UiTask) {
        task();
    }
}

/// Owns one dedicated thread that drains tasks in submission order. Dropping
/// the executor closes the queue; the thread exits after finishing what was
/// already submitted.
pub struct UiThreadExecutor {
    tx: async_channel::Sender<UiTask>,
}

impl Default for UiThreadExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl UiThreadExecutor {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded::<UiTask>();
        std::thread::Builder::new()
            .name("marquee-ui".into())
            .spawn(move || {
                while let Ok(task) = rx.recv_blocking() {
                    task();
                }
                debug!("[UI] Executor thread shutting down.");
            })
            .expect("failed to spawn UI executor thread");
        UiThreadExecutor { tx }
    }
}

impl UiExecutor for UiThreadExecutor {
    fn execute(&self, task: UiTask) {
        // Send only fails when the thread is gone; tasks are then dropped,
        // which matches the no-op semantics of a torn-down pipeline.
        let _ = self.tx.send_blocking(task);
    }
}
