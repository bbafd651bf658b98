//! Polling, backoff and cancellation for chain waits
//!
//! Every wait in this crate (receipt mining, message status) runs through a
//! `Poller`: fresh probe, then a bounded sleep raced against the caller's
//! cancel signal, until the deadline.

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{BridgeError, RpcError};
use crate::types::MessageStatus;

/// Whether an RPC error message describes a temporary condition (timeouts,
/// rate limits, overloaded or lagging nodes)
pub fn is_transient_message(error: &str) -> bool {
    let error_lower = error.to_lowercase();

    error_lower.contains("timeout")
        || error_lower.contains("timed out")
        || error_lower.contains("connection")
        || error_lower.contains("network")
        || error_lower.contains("rate limit")
        || error_lower.contains("too many requests")
        || error_lower.contains("503")
        || error_lower.contains("502")
        || error_lower.contains("temporarily unavailable")
        || error_lower.contains("header not found")
}

/// Poll cadence: steady interval, exponential backoff after transient errors
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Delay between probes while nothing is failing
    pub interval: Duration,
    /// Upper bound for the backoff delay
    pub max_interval: Duration,
    /// Growth factor per consecutive transient failure
    pub backoff_multiplier: f64,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(interval: Duration) -> Self {
        Self {
            interval,
            max_interval: interval.max(Duration::from_secs(60)),
            ..Default::default()
        }
    }

    /// Delay before the next probe after `failures` consecutive transient errors
    pub fn backoff_for_attempt(&self, failures: u32) -> Duration {
        if failures == 0 {
            return self.interval;
        }
        let secs = self.interval.as_secs_f64() * self.backoff_multiplier.powi(failures as i32);
        Duration::from_secs_f64(secs.min(self.max_interval.as_secs_f64()))
    }
}

/// Receiving half of a cancellation channel
///
/// Cheap to clone; every clone observes the same `CancelHandle`.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal(Option<watch::Receiver<bool>>);

/// Sending half of a cancellation channel
#[derive(Debug)]
pub struct CancelHandle(watch::Sender<bool>);

impl CancelHandle {
    pub fn cancel(&self) {
        let _ = self.0.send(true);
    }
}

impl CancelSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        Self(None)
    }

    pub fn channel() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle(tx), CancelSignal(Some(rx)))
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once the handle has cancelled; pending forever otherwise
    pub async fn cancelled(&mut self) {
        let Some(rx) = self.0.as_mut() else {
            return std::future::pending().await;
        };
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Handle dropped without cancelling
                return std::future::pending().await;
            }
        }
    }
}

/// Per-wait parameters supplied by the caller
#[derive(Debug, Clone)]
pub struct WaitOptions {
    /// How long a single wait may take before failing with `Timeout`
    pub timeout: Duration,
    pub poll: PollPolicy,
    pub cancel: CancelSignal,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30 * 60),
            poll: PollPolicy::default(),
            cancel: CancelSignal::never(),
        }
    }
}

impl WaitOptions {
    pub fn new(timeout: Duration, poll: PollPolicy) -> Self {
        Self {
            timeout,
            poll,
            cancel: CancelSignal::never(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelSignal) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Drives one bounded wait
pub(crate) struct Poller {
    what: String,
    started: Instant,
    deadline: Instant,
    policy: PollPolicy,
    cancel: CancelSignal,
    failures: u32,
    last_error: Option<RpcError>,
    pub(crate) last_status: MessageStatus,
}

impl Poller {
    pub(crate) fn new(what: impl Into<String>, opts: &WaitOptions) -> Self {
        let started = Instant::now();
        Self {
            what: what.into(),
            started,
            deadline: started + opts.timeout,
            policy: opts.poll.clone(),
            cancel: opts.cancel.clone(),
            failures: 0,
            last_error: None,
            last_status: MessageStatus::Submitted,
        }
    }

    pub(crate) fn what(&self) -> &str {
        &self.what
    }

    /// Record a successful probe
    pub(crate) fn succeeded(&mut self) {
        self.failures = 0;
        self.last_error = None;
    }

    /// Absorb a probe failure. Transient RPC errors are kept for a retry,
    /// anything else ends the wait.
    pub(crate) fn absorb(&mut self, err: BridgeError) -> Result<(), BridgeError> {
        match err {
            BridgeError::Rpc(e) if e.is_transient() => {
                self.failures += 1;
                warn!(
                    what = %self.what,
                    failures = self.failures,
                    error = %e,
                    "Transient RPC error while polling, retrying"
                );
                self.last_error = Some(e);
                Ok(())
            }
            BridgeError::Rpc(e) => Err(BridgeError::StageUnreachable {
                what: self.what.clone(),
                reason: e.to_string(),
            }),
            other => Err(other),
        }
    }

    /// Sleep until the next probe. Fails once the deadline has passed or the
    /// cancel signal fires.
    pub(crate) async fn tick(&mut self) -> Result<(), BridgeError> {
        if self.cancel.is_cancelled() {
            return Err(self.cancelled());
        }

        let now = Instant::now();
        if now >= self.deadline {
            return Err(self.expired());
        }

        let delay = self
            .policy
            .backoff_for_attempt(self.failures)
            .min(self.deadline - now);
        debug!(what = %self.what, delay_ms = delay.as_millis() as u64, "Waiting before next poll");

        let mut cancel = self.cancel.clone();
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = cancel.cancelled() => Err(self.cancelled()),
        }
    }

    fn cancelled(&self) -> BridgeError {
        BridgeError::Cancelled {
            what: self.what.clone(),
        }
    }

    fn expired(&mut self) -> BridgeError {
        match self.last_error.take() {
            Some(e) => BridgeError::StageUnreachable {
                what: self.what.clone(),
                reason: format!("deadline reached while RPC kept failing: {}", e),
            },
            None => BridgeError::Timeout {
                what: self.what.clone(),
                waited: self.started.elapsed(),
                last: self.last_status,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_policy_backoff() {
        let policy = PollPolicy {
            interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        };

        assert_eq!(policy.backoff_for_attempt(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(5));
    }

    #[test]
    fn test_transient_messages() {
        assert!(is_transient_message("request timed out"));
        assert!(is_transient_message("429 Too Many Requests"));
        assert!(is_transient_message("header not found"));
        assert!(!is_transient_message("replacement transaction underpriced"));
        assert!(!is_transient_message("execution reverted: not proven"));
        assert!(!is_transient_message("something odd"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_times_out() {
        let opts = WaitOptions::new(
            Duration::from_secs(10),
            PollPolicy::with_interval(Duration::from_secs(3)),
        );
        let mut poller = Poller::new("relay", &opts);

        let mut ticks = 0;
        let err = loop {
            match poller.tick().await {
                Ok(()) => ticks += 1,
                Err(e) => break e,
            }
        };

        // 3 + 3 + 3 + 1 seconds of sleeping
        assert_eq!(ticks, 4);
        assert!(matches!(err, BridgeError::Timeout { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poller_reports_unreachable_when_rpc_kept_failing() {
        let opts = WaitOptions::new(
            Duration::from_secs(5),
            PollPolicy::with_interval(Duration::from_secs(1)),
        );
        let mut poller = Poller::new("output root", &opts);

        let err = loop {
            poller
                .absorb(BridgeError::Rpc(RpcError::Transport("connection refused".into())))
                .unwrap();
            if let Err(e) = poller.tick().await {
                break e;
            }
        };

        assert!(matches!(err, BridgeError::StageUnreachable { .. }));
    }

    #[test]
    fn test_poller_rejects_permanent_rpc_errors() {
        let mut poller = Poller::new("status", &WaitOptions::default());
        let err = poller
            .absorb(BridgeError::Rpc(RpcError::Decode("short return data".into())))
            .unwrap_err();
        assert!(matches!(err, BridgeError::StageUnreachable { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let (handle, signal) = CancelSignal::channel();
        let opts = WaitOptions::new(
            Duration::from_secs(3600),
            PollPolicy::with_interval(Duration::from_secs(600)),
        )
        .with_cancel(signal);
        let mut poller = Poller::new("challenge period", &opts);

        let started = Instant::now();
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.cancel();
        });

        let err = poller.tick().await.unwrap_err();
        canceller.await.unwrap();

        assert!(matches!(err, BridgeError::Cancelled { .. }));
        assert!(started.elapsed() < Duration::from_secs(600));
    }
}
