//! V4L2 still-capture backend using the v4l crate.
//!
//! Negotiates MJPEG so a single frame is already a JPEG file.

use std::path::Path;

use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::config::Config;
use crate::traits::{Camera, CaptureError};

/// Frames discarded before the one that is kept, so auto exposure settles.
const WARMUP_FRAMES: usize = 5;
/// Number of mmap buffers requested from the driver.
const BUFFER_COUNT: u32 = 4;

/// V4L2 camera writing one MJPEG frame per capture.
pub struct V4L2Device {
    device: Device,
    card: String,
    width: u32,
    height: u32,
}

impl V4L2Device {
    /// Open a V4L2 device by index (e.g., 0 for /dev/video0) and request
    /// MJPEG at `width`x`height`.
    pub fn open(index: u32, width: u32, height: u32) -> Result<Self, CaptureError> {
        let device = Device::new(index as usize)
            .map_err(|err| CaptureError::Device(format!("open /dev/video{index}: {err}")))?;

        let caps = device
            .query_caps()
            .map_err(|err| CaptureError::Device(err.to_string()))?;
        if !caps
            .capabilities
            .contains(v4l::capability::Flags::VIDEO_CAPTURE | v4l::capability::Flags::STREAMING)
        {
            return Err(CaptureError::Device(format!(
                "{} cannot stream video capture",
                caps.card
            )));
        }

        let mut camera = Self {
            device,
            card: caps.card,
            width,
            height,
        };
        camera.negotiate_format()?;
        Ok(camera)
    }

    /// Open the device named by the `v4l2_*` settings.
    pub fn from_config(config: &Config) -> Result<Self, CaptureError> {
        Self::open(config.v4l2_device, config.v4l2_width, config.v4l2_height)
    }

    /// Card name reported by the driver.
    pub fn card(&self) -> &str {
        &self.card
    }

    /// Resolution accepted by the driver.
    pub const fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn negotiate_format(&mut self) -> Result<(), CaptureError> {
        let mut fmt = self
            .device
            .format()
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        fmt.width = self.width;
        fmt.height = self.height;
        fmt.fourcc = FourCC::new(b"MJPG");

        let fmt = self
            .device
            .set_format(&fmt)
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        if fmt.fourcc != FourCC::new(b"MJPG") {
            return Err(CaptureError::Device(format!(
                "{} does not support MJPEG (driver chose {})",
                self.card, fmt.fourcc
            )));
        }

        // The driver may round the resolution to one it supports.
        self.width = fmt.width;
        self.height = fmt.height;
        Ok(())
    }
}

impl Camera for V4L2Device {
    fn capture(&mut self, output: &Path) -> Result<(), CaptureError> {
        let mut stream = Stream::with_buffers(&self.device, Type::VideoCapture, BUFFER_COUNT)
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        for _ in 0..WARMUP_FRAMES {
            stream
                .next()
                .map_err(|err| CaptureError::Device(err.to_string()))?;
        }

        let (buf, meta) = stream
            .next()
            .map_err(|err| CaptureError::Device(err.to_string()))?;

        let used = (meta.bytesused as usize).min(buf.len());
        let frame = buf
            .get(..used)
            .ok_or_else(|| CaptureError::Device("frame buffer shorter than reported".to_owned()))?;

        std::fs::write(output, frame)?;
        Ok(())
    }
}
