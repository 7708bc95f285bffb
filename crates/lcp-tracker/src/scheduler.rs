//! Timers driving the tracker: the finalize deadline, the settle delay before
//! the first heuristic attempt, and bounded polling after activation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::LcpConfig;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PollOutcome {
    /// Keep polling.
    Pending,
    /// A candidate exists or the tracker settled; stop polling.
    Done,
}

/// Callbacks the scheduler fires. Implementations must not block.
pub trait LcpPort: Send + Sync + 'static {
    fn finalize(&self);
    fn poll(&self) -> PollOutcome;
}

/// Handle for the timers of one activation. Dropping it cancels them.
pub struct LcpSchedule {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl LcpSchedule {
    /// Spawn the finalize timer and the fallback poller.
    pub fn arm(port: Arc<dyn LcpPort>, config: &LcpConfig) -> Self {
        let cancel = CancellationToken::new();
        let started = Instant::now();

        let finalize_port = Arc::clone(&port);
        let finalize_token = cancel.clone();
        let finalize_delay = Duration::from_millis(config.finalize_delay_ms);
        let finalize = tokio::spawn(async move {
            tokio::select! {
                _ = finalize_token.cancelled() => {
                    debug!(target: "lcp-tracker", "finalize timer cancelled");
                }
                _ = sleep(finalize_delay) => {
                    finalize_port.finalize();
                }
            }
        });

        let poll_token = cancel.clone();
        let settle = Duration::from_millis(config.fallback_settle_ms);
        let interval = Duration::from_millis(config.poll_interval_ms.max(1));
        let deadline = started + Duration::from_millis(config.poll_ceiling_ms);
        let poller = tokio::spawn(async move {
            tokio::select! {
                _ = poll_token.cancelled() => return,
                _ = sleep(settle) => {}
            }
            loop {
                if port.poll() == PollOutcome::Done {
                    debug!(target: "lcp-tracker", "lcp polling done");
                    break;
                }
                let next = Instant::now() + interval;
                if next > deadline {
                    debug!(target: "lcp-tracker", "lcp polling ceiling reached");
                    break;
                }
                tokio::select! {
                    _ = poll_token.cancelled() => break,
                    _ = sleep_until(next) => {}
                }
            }
        });

        Self {
            cancel,
            tasks: vec![finalize, poller],
        }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel and wait for the timer tasks to exit.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
    }
}

impl Drop for LcpSchedule {
    fn drop(&mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingPort {
        finalized: AtomicBool,
        polls: AtomicUsize,
        done_after: usize,
    }

    impl LcpPort for CountingPort {
        fn finalize(&self) {
            self.finalized.store(true, Ordering::SeqCst);
        }

        fn poll(&self) -> PollOutcome {
            let n = self.polls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.done_after > 0 && n >= self.done_after {
                PollOutcome::Done
            } else {
                PollOutcome::Pending
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn finalize_fires_after_delay() {
        let port = Arc::new(CountingPort::default());
        let _schedule = LcpSchedule::arm(port.clone(), &LcpConfig::default());

        sleep(Duration::from_millis(4_999)).await;
        assert!(!port.finalized.load(Ordering::SeqCst));
        sleep(Duration::from_millis(2)).await;
        assert!(port.finalized.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_at_ceiling() {
        let port = Arc::new(CountingPort::default());
        let _schedule = LcpSchedule::arm(port.clone(), &LcpConfig::default());

        sleep(Duration::from_millis(1_400)).await;
        assert_eq!(port.polls.load(Ordering::SeqCst), 0);

        sleep(Duration::from_secs(30)).await;
        // settle at 1.5s, then every 500ms up to 15s
        assert_eq!(port.polls.load(Ordering::SeqCst), 28);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_stops_when_done() {
        let port = Arc::new(CountingPort {
            done_after: 3,
            ..CountingPort::default()
        });
        let _schedule = LcpSchedule::arm(port.clone(), &LcpConfig::default());
        sleep(Duration::from_secs(20)).await;
        assert_eq!(port.polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_disarms_everything() {
        let port = Arc::new(CountingPort::default());
        let schedule = LcpSchedule::arm(port.clone(), &LcpConfig::default());
        sleep(Duration::from_millis(100)).await;
        schedule.shutdown().await;

        sleep(Duration::from_secs(20)).await;
        assert!(!port.finalized.load(Ordering::SeqCst));
        assert_eq!(port.polls.load(Ordering::SeqCst), 0);
    }
}
