//! Pi-Cam-Uplink: periodic camera capture with SFTP upload for Raspberry Pi
//!
//! This library captures a still image every interval, uploads it over SFTP,
//! retries failed uploads a bounded number of times and prunes old images
//! from local disk. Every side effect sits behind a trait so the loop runs
//! against real hardware in production and against mocks in tests.

pub mod capture;
pub mod cleanup;
pub mod config;
pub mod counter;
#[cfg(feature = "v4l2")]
pub mod device;
pub mod events;
pub mod retry;
pub mod shutdown;
pub mod traits;
pub mod transfer;
pub mod uploader;
pub mod validation;

#[cfg(test)]
pub mod mock;

pub use capture::{CapturedImage, CommandCamera};
pub use config::{CaptureBackend, Config};
pub use counter::CounterStore;
#[cfg(feature = "v4l2")]
pub use device::V4L2Device;
pub use events::{Event, LogSink};
pub use retry::{PendingUpload, RetryQueue};
pub use shutdown::{Shutdown, ThreadSleeper};
pub use traits::{Camera, CaptureError, EventSink, Sleeper, TransferError, TransferSession};
pub use transfer::SftpSession;
pub use uploader::{CycleOutcome, Uploader};
