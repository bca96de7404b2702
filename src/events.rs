//! Typed daemon events and the sink that writes them to the log.

use std::fmt;
use std::path::PathBuf;

use log::Level;

use crate::traits::EventSink;

/// Something the daemon did or failed to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The SFTP session is up.
    SessionOpened {
        /// Server host.
        host: String,
        /// Server port.
        port: u16,
    },
    /// The SFTP session could not be established.
    SessionFailed {
        /// Failure description.
        error: String,
    },
    /// The SFTP session was closed.
    SessionClosed,
    /// The counter file was read at start-up.
    CounterLoaded {
        /// Next image number.
        value: u64,
    },
    /// The counter file could not be written.
    CounterSaveFailed {
        /// Value that should have been persisted.
        value: u64,
        /// Failure description.
        error: String,
    },
    /// An image was written to disk.
    Captured {
        /// Local path of the image.
        path: PathBuf,
    },
    /// Capture failed; no upload this cycle.
    CaptureFailed {
        /// Failure description.
        error: String,
    },
    /// An image reached the server.
    Uploaded {
        /// Remote name.
        name: String,
    },
    /// An immediate upload failed and the image was queued for retry.
    UploadFailed {
        /// Remote name.
        name: String,
        /// Failure description.
        error: String,
    },
    /// The session reported a protocol error; the loop pauses.
    ProtocolPause {
        /// Failure description.
        error: String,
        /// Pause length in seconds.
        pause_secs: u64,
    },
    /// A queued upload succeeded on retry.
    RetrySucceeded {
        /// Remote name.
        name: String,
        /// Retry number that succeeded.
        attempt: u32,
        /// Retry budget.
        max: u32,
    },
    /// A queued upload failed again and stays queued.
    RetryFailed {
        /// Remote name.
        name: String,
        /// Retry number that failed.
        attempt: u32,
        /// Retry budget.
        max: u32,
        /// Failure description.
        error: String,
    },
    /// A queued upload ran out of retries and was dropped.
    RetryAbandoned {
        /// Remote name.
        name: String,
        /// Retry budget.
        max: u32,
        /// Failure of the last retry.
        error: String,
    },
    /// An aged-out local image was deleted.
    OldImageRemoved {
        /// Deleted path.
        path: PathBuf,
    },
    /// A single file could not be inspected or deleted during cleanup.
    CleanupEntryFailed {
        /// Offending path.
        path: PathBuf,
        /// Failure description.
        error: String,
    },
    /// The capture directory could not be swept at all.
    CleanupFailed {
        /// Failure description.
        error: String,
    },
    /// Shutdown was requested; the loop is exiting.
    ShutdownRequested,
}

impl Event {
    /// Severity the event is logged at.
    pub const fn level(&self) -> Level {
        match self {
            Self::SessionOpened { .. }
            | Self::SessionClosed
            | Self::CounterLoaded { .. }
            | Self::Captured { .. }
            | Self::Uploaded { .. }
            | Self::RetrySucceeded { .. }
            | Self::OldImageRemoved { .. }
            | Self::ShutdownRequested => Level::Info,
            Self::RetryFailed { .. } | Self::CleanupEntryFailed { .. } => Level::Warn,
            Self::SessionFailed { .. }
            | Self::CounterSaveFailed { .. }
            | Self::CaptureFailed { .. }
            | Self::UploadFailed { .. }
            | Self::ProtocolPause { .. }
            | Self::RetryAbandoned { .. }
            | Self::CleanupFailed { .. } => Level::Error,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionOpened { host, port } => {
                write!(f, "SFTP session initialized ({host}:{port})")
            }
            Self::SessionFailed { error } => {
                write!(f, "SFTP session initialization failed: {error}")
            }
            Self::SessionClosed => write!(f, "SFTP session closed"),
            Self::CounterLoaded { value } => write!(f, "Next image number: {value}"),
            Self::CounterSaveFailed { value, error } => {
                write!(f, "Could not persist image counter {value}: {error}")
            }
            Self::Captured { path } => write!(f, "Image captured: {}", path.display()),
            Self::CaptureFailed { error } => write!(f, "Error capturing image: {error}"),
            Self::Uploaded { name } => write!(f, "Image sent to the SFTP server: {name}"),
            Self::UploadFailed { name, error } => {
                write!(f, "Upload of {name} failed, queued for retry: {error}")
            }
            Self::ProtocolPause { error, pause_secs } => {
                write!(f, "SSH protocol error: {error}; pausing {pause_secs}s")
            }
            Self::RetrySucceeded { name, attempt, max } => {
                write!(f, "Retry attempt {attempt}/{max} for {name} successful")
            }
            Self::RetryFailed {
                name,
                attempt,
                max,
                error,
            } => write!(f, "Retry attempt {attempt}/{max} for {name} failed: {error}"),
            Self::RetryAbandoned { name, max, error } => write!(
                f,
                "Max retry attempts ({max}) reached for {name}. Upload failed: {error}"
            ),
            Self::OldImageRemoved { path } => {
                write!(f, "Old local image removed: {}", path.display())
            }
            Self::CleanupEntryFailed { path, error } => {
                write!(f, "Could not clean up {}: {error}", path.display())
            }
            Self::CleanupFailed { error } => {
                write!(f, "Error during local directory cleanup: {error}")
            }
            Self::ShutdownRequested => write!(f, "Shutdown requested, stopping capture loop"),
        }
    }
}

/// Sink forwarding events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &Event) {
        log::log!(event.level(), "{event}");
    }
}
