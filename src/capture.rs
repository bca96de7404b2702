//! Image naming and the external-tool camera backend.

use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Local};

use crate::config::Config;
use crate::events::Event;
use crate::traits::{Camera, CaptureError, EventSink};
use crate::validation::validate_jpeg;

/// Timestamp layout embedded in image names.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// An image written to the local capture directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Local path of the image.
    pub path: PathBuf,
    /// File name, also used as the remote name.
    pub name: String,
}

/// Build the file name for image number `counter` taken at `taken_at`.
pub fn image_name(counter: u64, taken_at: &DateTime<Local>) -> String {
    format!("IMG_{counter}_{}.jpg", taken_at.format(TIMESTAMP_FORMAT))
}

/// Camera backend running an external still-capture program.
///
/// The program is invoked as `<tool> [args...] -o <output>`; exit status 0
/// means the image was written.
#[derive(Debug, Clone)]
pub struct CommandCamera {
    tool: String,
    args: Vec<String>,
}

impl CommandCamera {
    /// Create a backend running `tool` with no extra arguments.
    pub fn new<S: Into<String>>(tool: S) -> Self {
        Self {
            tool: tool.into(),
            args: Vec::new(),
        }
    }

    /// Create a backend from the `capture_tool` and `capture_args` settings.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.capture_tool.clone()).with_args(config.capture_args.clone())
    }

    /// Extra arguments placed before `-o`.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }
}

impl Camera for CommandCamera {
    fn capture(&mut self, output: &Path) -> Result<(), CaptureError> {
        let result = Command::new(&self.tool)
            .args(&self.args)
            .arg("-o")
            .arg(output)
            .output()
            .map_err(|source| CaptureError::Launch {
                tool: self.tool.clone(),
                source,
            })?;

        if result.status.success() {
            Ok(())
        } else {
            Err(CaptureError::ToolFailed {
                tool: self.tool.clone(),
                status: result.status,
                stderr: String::from_utf8_lossy(&result.stderr).trim().to_owned(),
            })
        }
    }
}

/// Capture image number `counter` into `local_dir`.
///
/// Returns `None` on any failure after reporting it to `events`; a failed
/// capture only skips the upload of the current cycle.
pub fn capture_image<C, E>(
    camera: &mut C,
    local_dir: &Path,
    counter: u64,
    events: &E,
) -> Option<CapturedImage>
where
    C: Camera + ?Sized,
    E: EventSink + ?Sized,
{
    let name = image_name(counter, &Local::now());
    let path = local_dir.join(&name);

    match camera.capture(&path).and_then(|()| validate_jpeg(&path)) {
        Ok(_) => {
            events.emit(&Event::Captured { path: path.clone() });
            Some(CapturedImage { path, name })
        }
        Err(err) => {
            events.emit(&Event::CaptureFailed {
                error: err.to_string(),
            });
            None
        }
    }
}
