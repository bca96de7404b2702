//! Bounded retry queue for uploads that failed.
//!
//! Each pending upload is retried once per capture cycle until it succeeds
//! or its retry budget is spent. There is no backoff: the capture interval
//! already spaces attempts out.

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::events::Event;
use crate::traits::{EventSink, TransferError};

/// An upload waiting for another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    /// Local image path.
    pub local_path: PathBuf,
    /// Remote file name.
    pub remote_name: String,
    /// Retry number of the next attempt, starting at 1.
    pub attempts: u32,
}

impl PendingUpload {
    /// Entry for an image whose first upload just failed.
    pub fn new(local_path: PathBuf, remote_name: String) -> Self {
        Self {
            local_path,
            remote_name,
            attempts: 1,
        }
    }
}

/// Counts of what one retry pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RetryPass {
    /// Entries uploaded and removed.
    pub resolved: usize,
    /// Entries that failed and stay queued.
    pub requeued: usize,
    /// Entries dropped after their last retry.
    pub abandoned: usize,
}

/// Ordered queue of pending uploads.
#[derive(Debug, Clone)]
pub struct RetryQueue {
    entries: VecDeque<PendingUpload>,
    max_attempts: u32,
}

impl RetryQueue {
    /// Empty queue granting each entry `max_attempts` retries.
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            entries: VecDeque::new(),
            max_attempts,
        }
    }

    /// Queue an image whose immediate upload failed.
    pub fn push(&mut self, local_path: PathBuf, remote_name: String) {
        self.entries
            .push_back(PendingUpload::new(local_path, remote_name));
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Queued entries in processing order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingUpload> {
        self.entries.iter()
    }

    /// Retry every entry queued at the start of the pass exactly once.
    ///
    /// `upload` performs the transfer; on success it is also where the
    /// caller persists its counter, so persistence directly follows the
    /// confirmed upload. A failed entry goes to the tail with its attempt
    /// count raised, unless it just used its last retry, in which case it
    /// is dropped.
    pub fn retry_pass<E, F>(&mut self, events: &E, mut upload: F) -> RetryPass
    where
        E: EventSink + ?Sized,
        F: FnMut(&PendingUpload) -> Result<(), TransferError>,
    {
        let mut pass = RetryPass::default();
        let snapshot = self.entries.len();

        for _ in 0..snapshot {
            let Some(mut entry) = self.entries.pop_front() else {
                break;
            };

            match upload(&entry) {
                Ok(()) => {
                    events.emit(&Event::RetrySucceeded {
                        name: entry.remote_name,
                        attempt: entry.attempts,
                        max: self.max_attempts,
                    });
                    pass.resolved += 1;
                }
                Err(err) if entry.attempts < self.max_attempts => {
                    events.emit(&Event::RetryFailed {
                        name: entry.remote_name.clone(),
                        attempt: entry.attempts,
                        max: self.max_attempts,
                        error: err.to_string(),
                    });
                    entry.attempts += 1;
                    self.entries.push_back(entry);
                    pass.requeued += 1;
                }
                Err(err) => {
                    events.emit(&Event::RetryAbandoned {
                        name: entry.remote_name,
                        max: self.max_attempts,
                        error: err.to_string(),
                    });
                    pass.abandoned += 1;
                }
            }
        }

        pass
    }
}
