//! Probe progress handler trait and events

use std::time::Duration;
use tracing::{info, warn};

/// Events emitted while waiting on an external service
#[derive(Debug, Clone)]
pub enum ProbeEvent {
    /// Polling started
    Started { target: String },

    /// Still waiting; emitted throttled, not on every attempt
    Waiting {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Predicate satisfied
    Ready {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },

    /// Budget exhausted without the predicate becoming true
    TimedOut {
        target: String,
        attempts: u32,
        elapsed: Duration,
    },
}

/// Trait for handling probe progress events
pub trait ProbeHandler: Send + Sync {
    fn on_probe(&self, event: &ProbeEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProbeHandler for NoOpHandler {
    fn on_probe(&self, _event: &ProbeEvent) {
        // Intentionally empty
    }
}

/// Handler that reports progress through tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProbeHandler for LoggingHandler {
    fn on_probe(&self, event: &ProbeEvent) {
        match event {
            ProbeEvent::Started { target } => {
                info!(target = %target, "Waiting for service");
            }
            ProbeEvent::Waiting {
                target,
                attempts,
                elapsed,
            } => {
                info!(
                    target = %target,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Still waiting"
                );
            }
            ProbeEvent::Ready {
                target,
                attempts,
                elapsed,
            } => {
                info!(
                    target = %target,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Service is ready"
                );
            }
            ProbeEvent::TimedOut {
                target,
                attempts,
                elapsed,
            } => {
                warn!(
                    target = %target,
                    attempts,
                    elapsed_secs = elapsed.as_secs(),
                    "Readiness timed out; continuing anyway"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProbeHandler for CountingHandler {
        fn on_probe(&self, _event: &ProbeEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_custom_handler_receives_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: Arc::clone(&count),
        };

        handler.on_probe(&ProbeEvent::Started {
            target: "db".to_string(),
        });
        handler.on_probe(&ProbeEvent::Ready {
            target: "db".to_string(),
            attempts: 3,
            elapsed: Duration::from_secs(6),
        });

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_noop_handler_ignores_events() {
        NoOpHandler.on_probe(&ProbeEvent::TimedOut {
            target: "web".to_string(),
            attempts: 10,
            elapsed: Duration::from_secs(120),
        });
    }
}
