//! Scripted collaborators for testing without a camera or server.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::events::Event;
use crate::shutdown::Shutdown;
use crate::traits::{Camera, CaptureError, EventSink, Sleeper, TransferError, TransferSession};

/// Smallest byte sequence accepted as a JPEG by the capture validation.
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0xFF, 0xD9];

/// Mock camera writing a fixed payload, or failing on request.
pub struct MockCamera {
    payload: Vec<u8>,
    script: VecDeque<bool>,
    fail_by_default: bool,
    captures: usize,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCamera {
    /// Camera that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            payload: FAKE_JPEG.to_vec(),
            script: VecDeque::new(),
            fail_by_default: false,
            captures: 0,
        }
    }

    /// Fail every capture not covered by a script.
    #[must_use]
    pub const fn failing(mut self) -> Self {
        self.fail_by_default = true;
        self
    }

    /// Write `payload` instead of a fake JPEG.
    #[must_use]
    pub fn writing(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Outcomes (`true` = success) for the next captures, in order.
    #[must_use]
    pub fn with_script<I: IntoIterator<Item = bool>>(mut self, outcomes: I) -> Self {
        self.script = outcomes.into_iter().collect();
        self
    }

    /// Number of capture calls so far.
    pub const fn captures(&self) -> usize {
        self.captures
    }
}

impl Camera for MockCamera {
    fn capture(&mut self, output: &Path) -> Result<(), CaptureError> {
        self.captures += 1;
        let succeed = self.script.pop_front().unwrap_or(!self.fail_by_default);
        if !succeed {
            return Err(CaptureError::Device("mock camera failure".to_owned()));
        }
        std::fs::write(output, &self.payload)?;
        Ok(())
    }
}

/// Outcome of one scripted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// Transfer succeeds.
    Ok,
    /// Transfer fails; session stays usable.
    Fail,
    /// Session-level protocol error.
    Protocol,
}

/// Mock transfer session replaying scripted outcomes.
pub struct MockTransfer {
    script: VecDeque<PutOutcome>,
    default: PutOutcome,
    puts: Vec<(PathBuf, String)>,
    closes: usize,
}

impl Default for MockTransfer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransfer {
    /// Session where every transfer succeeds.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            script: VecDeque::new(),
            default: PutOutcome::Ok,
            puts: Vec::new(),
            closes: 0,
        }
    }

    /// Outcome for transfers not covered by a script.
    #[must_use]
    pub const fn with_default(mut self, outcome: PutOutcome) -> Self {
        self.default = outcome;
        self
    }

    /// Outcomes for the next transfers, in order.
    #[must_use]
    pub fn with_script<I: IntoIterator<Item = PutOutcome>>(mut self, outcomes: I) -> Self {
        self.script = outcomes.into_iter().collect();
        self
    }

    /// Every transfer attempted so far as (local path, remote name).
    pub fn puts(&self) -> &[(PathBuf, String)] {
        &self.puts
    }

    /// Remote names attempted so far.
    pub fn names(&self) -> Vec<&str> {
        self.puts.iter().map(|(_, name)| name.as_str()).collect()
    }

    /// How many times the session was closed.
    pub const fn closes(&self) -> usize {
        self.closes
    }
}

impl TransferSession for MockTransfer {
    fn put(&mut self, local_path: &Path, remote_name: &str) -> Result<(), TransferError> {
        self.puts
            .push((local_path.to_path_buf(), remote_name.to_owned()));
        match self.script.pop_front().unwrap_or(self.default) {
            PutOutcome::Ok => Ok(()),
            PutOutcome::Fail => Err(TransferError::Failed {
                name: remote_name.to_owned(),
                reason: "mock failure".to_owned(),
            }),
            PutOutcome::Protocol => Err(TransferError::Protocol("mock socket closed".to_owned())),
        }
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}

/// Mock sleeper recording requested durations without blocking.
#[derive(Default)]
pub struct MockSleeper {
    slept: Vec<Duration>,
    stop_after: Option<(usize, Shutdown)>,
}

impl MockSleeper {
    /// Sleeper that never blocks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise `shutdown` during the `count`th sleep.
    #[must_use]
    pub fn shutdown_after(mut self, count: usize, shutdown: Shutdown) -> Self {
        self.stop_after = Some((count, shutdown));
        self
    }

    /// Durations requested so far.
    pub fn slept(&self) -> &[Duration] {
        &self.slept
    }
}

impl Sleeper for MockSleeper {
    fn sleep(&mut self, duration: Duration) {
        self.slept.push(duration);
        if let Some((count, shutdown)) = &self.stop_after {
            if self.slept.len() >= *count {
                shutdown.request();
            }
        }
    }
}

/// Sink keeping every event in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: RefCell<Vec<Event>>,
}

impl RecordingSink {
    /// Events recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.events.borrow().clone()
    }

    /// Recorded events matching `predicate`.
    pub fn count<P: Fn(&Event) -> bool>(&self, predicate: P) -> usize {
        self.events.borrow().iter().filter(|e| predicate(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &Event) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("IMG_1.jpg");
        let mut camera = MockCamera::new().with_script([false, true]);

        assert!(camera.capture(&path).is_err());
        assert!(!path.exists());
        camera.capture(&path).expect("second capture succeeds");
        assert_eq!(std::fs::read(&path).expect("read"), FAKE_JPEG);
        assert_eq!(camera.captures(), 2);
    }

    #[test]
    fn test_mock_transfer_script_then_default() {
        let mut transfer = MockTransfer::new()
            .with_script([PutOutcome::Protocol, PutOutcome::Fail])
            .with_default(PutOutcome::Ok);

        let path = Path::new("IMG_1.jpg");
        assert!(transfer
            .put(path, "IMG_1.jpg")
            .is_err_and(|e| e.is_protocol()));
        assert!(transfer
            .put(path, "IMG_1.jpg")
            .is_err_and(|e| !e.is_protocol()));
        assert!(transfer.put(path, "IMG_1.jpg").is_ok());
        assert_eq!(transfer.puts().len(), 3);
    }

    #[test]
    fn test_mock_sleeper_raises_shutdown() {
        let shutdown = Shutdown::new();
        let mut sleeper = MockSleeper::new().shutdown_after(2, shutdown.clone());

        sleeper.sleep(Duration::from_secs(300));
        assert!(!shutdown.is_requested());
        sleeper.sleep(Duration::from_secs(300));
        assert!(shutdown.is_requested());
        assert_eq!(sleeper.slept().len(), 2);
    }
}
