//! Service readiness probing
//!
//! One reusable poll-until-predicate-or-timeout primitive ([`Poller`])
//! parameterized by interval, budget, and a progress throttle, instead of
//! per-call-site polling loops. Two probes gate installation, in order:
//! container health first, then application-level HTTP reachability, since
//! container health alone does not mean the web layer is serving yet.
//!
//! A timeout is never fatal here. Callers downgrade it to a warning and
//! proceed; downstream tools either succeed anyway or fail with a clearer
//! diagnostic than "timed out".

pub mod container;
pub mod handler;
pub mod http;

pub use handler::{LoggingHandler, NoOpHandler, ProbeEvent, ProbeHandler};

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Outcome of a polling run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Predicate became true
    Ready { attempts: u32, elapsed_secs: u64 },

    /// Budget exhausted
    TimedOut { attempts: u32, elapsed_secs: u64 },
}

impl ProbeOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, ProbeOutcome::Ready { .. })
    }
}

/// Poll-until-predicate primitive
///
/// The predicate is checked immediately on the first attempt, then every
/// `interval` until it returns true or `budget` is spent. The final sleep is
/// clamped so a never-true predicate times out after exactly the budget,
/// not earlier and not an interval late.
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    pub interval: Duration,
    pub budget: Duration,

    /// Emit a `Waiting` event every this many failed attempts
    pub progress_every: u32,
}

impl Default for Poller {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            budget: Duration::from_secs(120),
            progress_every: 6,
        }
    }
}

impl Poller {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self {
            interval,
            budget,
            ..Self::default()
        }
    }

    /// Polls `predicate` until it returns true or the budget runs out
    pub async fn run<F, Fut>(
        &self,
        target: &str,
        handler: &dyn ProbeHandler,
        mut predicate: F,
    ) -> ProbeOutcome
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        handler.on_probe(&ProbeEvent::Started {
            target: target.to_string(),
        });

        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if predicate().await {
                let elapsed = start.elapsed();
                handler.on_probe(&ProbeEvent::Ready {
                    target: target.to_string(),
                    attempts,
                    elapsed,
                });
                return ProbeOutcome::Ready {
                    attempts,
                    elapsed_secs: elapsed.as_secs(),
                };
            }

            if self.progress_every > 0 && attempts % self.progress_every == 0 {
                handler.on_probe(&ProbeEvent::Waiting {
                    target: target.to_string(),
                    attempts,
                    elapsed: start.elapsed(),
                });
            }

            let elapsed = start.elapsed();
            if elapsed >= self.budget {
                handler.on_probe(&ProbeEvent::TimedOut {
                    target: target.to_string(),
                    attempts,
                    elapsed,
                });
                return ProbeOutcome::TimedOut {
                    attempts,
                    elapsed_secs: elapsed.as_secs(),
                };
            }

            let remaining = self.budget - elapsed;
            sleep(self.interval.min(remaining)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_ready_after_k_intervals() {
        // Predicate becomes true on the 4th check, i.e. after 3 intervals.
        let calls = Arc::new(AtomicU32::new(0));
        let calls_in = Arc::clone(&calls);

        let poller = Poller::new(Duration::from_secs(2), Duration::from_secs(60));
        let outcome = poller
            .run("test", &NoOpHandler, move || {
                let calls = Arc::clone(&calls_in);
                async move { calls.fetch_add(1, Ordering::SeqCst) + 1 >= 4 }
            })
            .await;

        match outcome {
            ProbeOutcome::Ready {
                attempts,
                elapsed_secs,
            } => {
                assert_eq!(attempts, 4);
                assert_eq!(elapsed_secs, 6);
            }
            other => panic!("expected Ready, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_takes_one_attempt() {
        let poller = Poller::new(Duration::from_secs(5), Duration::from_secs(60));
        let outcome = poller.run("test", &NoOpHandler, || async { true }).await;
        assert_eq!(
            outcome,
            ProbeOutcome::Ready {
                attempts: 1,
                elapsed_secs: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_true_times_out_at_exact_budget() {
        let poller = Poller::new(Duration::from_secs(7), Duration::from_secs(30));
        let outcome = poller.run("test", &NoOpHandler, || async { false }).await;

        match outcome {
            ProbeOutcome::TimedOut { elapsed_secs, .. } => {
                // Final sleep is clamped to the remaining budget.
                assert_eq!(elapsed_secs, 30);
            }
            other => panic!("expected TimedOut, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_events_are_throttled() {
        use std::sync::Mutex;

        struct Recorder(Mutex<Vec<String>>);
        impl ProbeHandler for Recorder {
            fn on_probe(&self, event: &ProbeEvent) {
                let tag = match event {
                    ProbeEvent::Started { .. } => "started",
                    ProbeEvent::Waiting { .. } => "waiting",
                    ProbeEvent::Ready { .. } => "ready",
                    ProbeEvent::TimedOut { .. } => "timeout",
                };
                self.0.lock().unwrap().push(tag.to_string());
            }
        }

        let recorder = Recorder(Mutex::new(Vec::new()));
        let poller = Poller {
            interval: Duration::from_secs(1),
            budget: Duration::from_secs(10),
            progress_every: 4,
        };
        poller.run("test", &recorder, || async { false }).await;

        let events = recorder.0.lock().unwrap();
        let waits = events.iter().filter(|e| *e == "waiting").count();
        // 11 attempts over a 10s budget at 1s intervals -> waiting at 4 and 8.
        assert_eq!(waits, 2);
        assert_eq!(events.last().map(String::as_str), Some("timeout"));
    }
}
