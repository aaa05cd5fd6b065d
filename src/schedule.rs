// SPDX-License-Identifier: MIT
//! Cancellable delayed task primitive.
//!
//! The sidebar sync controller expresses every debounce / re-sync / reload
//! delay through [`DelayedTask`]: arm a timer, and either let it fire or
//! replace it with a fresh one (the old handle aborts on drop).  A timer that
//! has already fired runs its task to completion; `cancel` only prevents
//! not-yet-fired timers from running.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a task scheduled to run once after a fixed delay.
#[derive(Debug)]
pub struct DelayedTask {
    fired: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl DelayedTask {
    /// Arm a timer that runs `task` after `delay` unless cancelled first.
    pub fn schedule<F>(delay: Duration, task: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let fired = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&fired);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            flag.store(true, Ordering::SeqCst);
            task.await;
        });
        Self { fired, handle }
    }

    /// Cancel the timer if it has not fired yet.  A fired task is left to run
    /// to completion.
    pub fn cancel(&self) {
        if !self.fired.load(Ordering::SeqCst) {
            self.handle.abort();
        }
    }

    /// Abort unconditionally, even mid-run.  Used at disposal, where no
    /// callback may fire afterwards.
    pub fn abort(&self) {
        self.handle.abort();
    }

    /// Whether the delay elapsed and the task started running.
    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Drop for DelayedTask {
    // Replacing a pending timer (`slot = Some(DelayedTask::schedule(..))`)
    // must cancel the previous one.
    fn drop(&mut self) {
        self.cancel();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn flag() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[tokio::test]
    async fn fires_after_delay() {
        let ran = flag();
        let ran2 = Arc::clone(&ran);
        let task = DelayedTask::schedule(Duration::from_millis(20), async move {
            ran2.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(task.has_fired());
        assert!(ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn cancel_before_delay_prevents_run() {
        let ran = flag();
        let ran2 = Arc::clone(&ran);
        let task = DelayedTask::schedule(Duration::from_millis(100), async move {
            ran2.store(true, Ordering::SeqCst);
        });
        task.cancel();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!task.has_fired());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn replacing_handle_cancels_previous_timer() {
        let ran = flag();
        let ran2 = Arc::clone(&ran);
        let mut slot = Some(DelayedTask::schedule(
            Duration::from_millis(100),
            async move {
                ran2.store(true, Ordering::SeqCst);
            },
        ));
        slot = Some(DelayedTask::schedule(Duration::from_millis(20), async {}));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!ran.load(Ordering::SeqCst));
        assert!(slot.take().map(|t| t.has_fired()).unwrap_or(false));
    }

    #[tokio::test]
    async fn cancel_after_fire_lets_task_finish() {
        let finished = flag();
        let finished2 = Arc::clone(&finished);
        let task = DelayedTask::schedule(Duration::from_millis(10), async move {
            tokio::time::sleep(Duration::from_millis(60)).await;
            finished2.store(true, Ordering::SeqCst);
        });
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert!(task.has_fired());
        task.cancel();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(finished.load(Ordering::SeqCst));
    }
}
