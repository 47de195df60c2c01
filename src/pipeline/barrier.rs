//! Fan-out/fan-in synchronization for the prepare stage.

use std::sync::atomic::{AtomicUsize, Ordering};

/// A counting barrier: `enter` once per dispatched unit of work, `leave`
/// exactly once per entered unit regardless of success or failure, and
/// `wait` resolves only after every entered unit has left.
///
/// All `enter` calls must happen before the first `leave`; the orchestrator
/// enters for the whole batch before dispatching any unit.
pub struct PrepareBarrier {
    pending: AtomicUsize,
    done_tx: async_channel::Sender<()>,
    done_rx: async_channel::Receiver<()>,
}

impl Default for PrepareBarrier {
    fn default() -> Self {
        Self::new()
    }
}

impl PrepareBarrier {
    pub fn new() -> Self {
        let (done_tx, done_rx) = async_channel::bounded(1);
        PrepareBarrier { pending: AtomicUsize::new(0), done_tx, done_rx }
    }

    pub fn enter(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub fn leave(&self) {
        let previous = self.pending.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "leave() without matching enter()");
        if previous == 1 {
            // Single-use: the capacity-1 channel absorbs the only signal.
            let _ = self.done_tx.try_send(());
        }
    }

    /// Resolves once all entered units have left. A batch of zero units
    /// resolves immediately.
    pub async fn wait(&self) {
        if self.pending.load(Ordering::SeqCst) == 0 {
            return;
        }
        let _ = self.done_rx.recv().await;
    }
}
