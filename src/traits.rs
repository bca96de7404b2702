//! Collaborator traits and error types shared by the capture/upload pipeline.
//!
//! Every side effect of the daemon sits behind one of these traits so the
//! main loop can be driven by real hardware and a real SFTP server in
//! production and by scripted doubles in tests.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;

use crate::events::Event;

/// Error type for image capture.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The external capture tool could not be started.
    #[error("failed to launch {tool}: {source}")]
    Launch {
        /// Program name.
        tool: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },
    /// The external capture tool ran but reported failure.
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        /// Program name.
        tool: String,
        /// Exit status of the tool.
        status: ExitStatus,
        /// Trimmed standard error output.
        stderr: String,
    },
    /// The backend reported success but the output is not a usable image.
    #[error("invalid capture at {}: {reason}", path.display())]
    InvalidImage {
        /// Expected output path.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },
    /// Camera device error (V4L2 backend).
    #[error("camera device error: {0}")]
    Device(String),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error type for the transfer session.
#[derive(Debug, Error)]
pub enum TransferError {
    /// TCP connection to the server failed.
    #[error("could not reach {host}:{port}: {source}")]
    Connect {
        /// Server host.
        host: String,
        /// Server port.
        port: u16,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },
    /// The server rejected the credentials.
    #[error("authentication rejected for {username}")]
    AuthRejected {
        /// Login name that was rejected.
        username: String,
    },
    /// Session-level SSH failure: the connection itself is in trouble.
    #[error("SSH session error: {0}")]
    Protocol(String),
    /// A single transfer failed while the session stayed usable.
    #[error("transfer of {name} failed: {reason}")]
    Failed {
        /// Remote file name.
        name: String,
        /// Failure description.
        reason: String,
    },
}

impl TransferError {
    /// Whether this failure concerns the session rather than one file.
    ///
    /// The main loop pauses after a protocol failure instead of moving on
    /// to the next step of the cycle.
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Connect { .. })
    }
}

/// Abstraction over a still camera.
pub trait Camera {
    /// Write one image to `output`.
    fn capture(&mut self, output: &Path) -> Result<(), CaptureError>;
}

impl<C: Camera + ?Sized> Camera for Box<C> {
    fn capture(&mut self, output: &Path) -> Result<(), CaptureError> {
        (**self).capture(output)
    }
}

/// Abstraction over a connected file-transfer session.
pub trait TransferSession {
    /// Upload `local_path` into the remote directory as `remote_name`.
    ///
    /// Implementations never retry; retry policy belongs to the caller.
    fn put(&mut self, local_path: &Path, remote_name: &str) -> Result<(), TransferError>;

    /// End the session.
    fn close(&mut self) {}
}

/// Abstraction over blocking waits between cycles.
pub trait Sleeper {
    /// Block for `duration`, or less if the process is shutting down.
    fn sleep(&mut self, duration: Duration);
}

/// Receiver of everything the daemon reports.
pub trait EventSink {
    /// Record one event.
    fn emit(&self, event: &Event);
}

impl<S: EventSink + ?Sized> EventSink for &S {
    fn emit(&self, event: &Event) {
        (**self).emit(event);
    }
}
