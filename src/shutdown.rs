//! Shutdown flag and the interruptible sleeper used between cycles.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::traits::Sleeper;

/// Granularity at which a sleeping loop notices a shutdown request.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Shared flag set when the process should stop.
#[derive(Debug, Default, Clone)]
pub struct Shutdown {
    requested: Arc<AtomicBool>,
}

impl Shutdown {
    /// A flag that has not been raised.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    /// Whether the flag has been raised.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Raise the flag on SIGINT, SIGTERM or SIGHUP.
    ///
    /// Needs the `termination` feature of `ctrlc`; without it SIGTERM keeps
    /// its default action and kills the process.
    pub fn install_signal_handler(&self) -> Result<(), ctrlc::Error> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || shutdown.request())
    }
}

/// Sleeper blocking the current thread, cut short by [`Shutdown`].
#[derive(Debug, Clone)]
pub struct ThreadSleeper {
    shutdown: Shutdown,
}

impl ThreadSleeper {
    /// Sleeper that wakes early once `shutdown` is raised.
    pub const fn new(shutdown: Shutdown) -> Self {
        Self { shutdown }
    }
}

impl Sleeper for ThreadSleeper {
    fn sleep(&mut self, duration: Duration) {
        // No representable deadline: wait for shutdown alone.
        let deadline = Instant::now().checked_add(duration);
        while !self.shutdown.is_requested() {
            let remaining = deadline.map_or(POLL_INTERVAL, |deadline| {
                deadline.saturating_duration_since(Instant::now())
            });
            if remaining.is_zero() {
                break;
            }
            std::thread::sleep(remaining.min(POLL_INTERVAL));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!other.is_requested());
        shutdown.request();
        assert!(other.is_requested());
    }

    #[test]
    fn test_sleeper_returns_immediately_after_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.request();
        let mut sleeper = ThreadSleeper::new(shutdown);

        let started = Instant::now();
        sleeper.sleep(Duration::from_secs(300));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_sleeper_wakes_on_request_from_other_thread() {
        let shutdown = Shutdown::new();
        let mut sleeper = ThreadSleeper::new(shutdown.clone());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            shutdown.request();
        });

        let started = Instant::now();
        sleeper.sleep(Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().expect("signaller thread");
    }

    #[test]
    fn test_unbounded_duration_does_not_overflow() {
        let shutdown = Shutdown::new();
        let mut sleeper = ThreadSleeper::new(shutdown.clone());

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            shutdown.request();
        });

        let started = Instant::now();
        sleeper.sleep(Duration::MAX);
        sleeper.sleep(Duration::from_secs(u64::MAX));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().expect("signaller thread");
    }

    #[test]
    fn test_sleeper_sleeps_full_short_duration() {
        let mut sleeper = ThreadSleeper::new(Shutdown::new());
        let started = Instant::now();
        sleeper.sleep(Duration::from_millis(50));
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}
