//! Pi-cam-uplink daemon: capture, upload, retry, prune, forever.

use std::fs::{self, OpenOptions};
use std::path::Path;

use anyhow::Context;
use env_logger::{Env, Target};
use pi_cam_uplink::{
    Camera, CaptureBackend, CommandCamera, Config, Event, EventSink, LogSink, SftpSession,
    Shutdown, ThreadSleeper, Uploader,
};

fn main() {
    if let Err(err) = run() {
        log::error!("{err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;
    init_logging(&config.log_file);
    log::info!("Starting pi-cam-uplink");

    fs::create_dir_all(&config.local_dir)
        .with_context(|| format!("creating {}", config.local_dir.display()))?;

    let shutdown = Shutdown::new();
    shutdown
        .install_signal_handler()
        .context("installing signal handler")?;

    let events = LogSink;
    let camera = open_camera(&config)?;

    let session = match SftpSession::connect(&config) {
        Ok(session) => {
            events.emit(&Event::SessionOpened {
                host: config.host.clone(),
                port: config.port,
            });
            session
        }
        Err(err) => {
            events.emit(&Event::SessionFailed {
                error: err.to_string(),
            });
            return Err(err).context("SFTP session initialization failed");
        }
    };

    // On failure the session has already been closed.
    let mut uploader = Uploader::new(
        &config,
        camera,
        session,
        ThreadSleeper::new(shutdown.clone()),
        events,
        shutdown,
    )
    .context("loading image counter")?;

    uploader.run();
    uploader.close();
    Ok(())
}

/// Log to the configured file, falling back to stderr if it cannot be opened.
fn init_logging(log_file: &Path) {
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or("info"));

    match OpenOptions::new().create(true).append(true).open(log_file) {
        Ok(file) => {
            builder.target(Target::Pipe(Box::new(file)));
        }
        Err(err) => {
            eprintln!(
                "Cannot open log file {}: {err}; logging to stderr",
                log_file.display()
            );
        }
    }

    builder.init();
}

fn open_camera(config: &Config) -> anyhow::Result<Box<dyn Camera>> {
    match config.capture_backend {
        CaptureBackend::Command => Ok(Box::new(CommandCamera::from_config(config))),
        #[cfg(feature = "v4l2")]
        CaptureBackend::V4l2 => {
            let device = pi_cam_uplink::V4L2Device::from_config(config)
                .context("opening V4L2 camera")?;
            log::info!(
                "Using V4L2 camera {} at {}x{}",
                device.card(),
                device.resolution().0,
                device.resolution().1
            );
            Ok(Box::new(device))
        }
        #[cfg(not(feature = "v4l2"))]
        CaptureBackend::V4l2 => {
            anyhow::bail!("capture_backend \"v4l2\" requires building with the v4l2 feature")
        }
    }
}
