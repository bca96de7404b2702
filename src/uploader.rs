//! The capture, upload, cleanup and retry loop.

use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use crate::capture::capture_image;
use crate::cleanup::{sweep, SweepReport};
use crate::config::Config;
use crate::counter::{CounterError, CounterStore};
use crate::events::Event;
use crate::retry::{RetryPass, RetryQueue};
use crate::shutdown::Shutdown;
use crate::traits::{Camera, EventSink, Sleeper, TransferSession};

/// How one call to [`Uploader::run_cycle`] ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Capture, upload, cleanup, sleep and retry pass all ran.
    Completed {
        /// Whether this cycle's image reached the server immediately.
        uploaded: bool,
        /// What the retry pass did.
        retries: RetryPass,
    },
    /// A protocol error cut the cycle short after the pause.
    Paused,
    /// Shutdown was requested during the interval sleep.
    Stopped,
}

/// Drives one camera and one transfer session.
///
/// The running counter is the number given to the next capture. It
/// advances and is persisted after every confirmed upload, including a
/// successful retry of an older image. A retry therefore consumes a number
/// that no file carries, and the persisted value can run ahead of the
/// highest number on disk.
pub struct Uploader<C, T, S, E> {
    camera: C,
    session: T,
    sleeper: S,
    events: E,
    store: CounterStore,
    counter: u64,
    queue: RetryQueue,
    local_dir: PathBuf,
    interval: Duration,
    protocol_pause: Duration,
    retention: Duration,
    shutdown: Shutdown,
}

impl<C, T, S, E> Uploader<C, T, S, E>
where
    C: Camera,
    T: TransferSession,
    S: Sleeper,
    E: EventSink,
{
    /// Build the loop and load the persisted counter.
    ///
    /// If the counter cannot be loaded the session is closed before the
    /// error is returned.
    pub fn new(
        config: &Config,
        camera: C,
        mut session: T,
        sleeper: S,
        events: E,
        shutdown: Shutdown,
    ) -> Result<Self, CounterError> {
        let store = CounterStore::new(&config.counter_file);
        let counter = match store.load() {
            Ok(counter) => counter,
            Err(err) => {
                end_session(&mut session, &events);
                return Err(err);
            }
        };
        events.emit(&Event::CounterLoaded { value: counter });

        Ok(Self {
            camera,
            session,
            sleeper,
            events,
            store,
            counter,
            queue: RetryQueue::new(config.max_retry_attempts),
            local_dir: config.local_dir.clone(),
            interval: config.capture_interval(),
            protocol_pause: config.protocol_pause(),
            retention: config.retention(),
            shutdown,
        })
    }

    /// Run cycles until shutdown is requested.
    pub fn run(&mut self) {
        while !self.shutdown.is_requested() {
            self.run_cycle();
        }
        self.events.emit(&Event::ShutdownRequested);
    }

    /// Capture, upload once, sweep, sleep, then retry the queue once.
    pub fn run_cycle(&mut self) -> CycleOutcome {
        let mut uploaded = false;

        if let Some(image) =
            capture_image(&mut self.camera, &self.local_dir, self.counter, &self.events)
        {
            match self.session.put(&image.path, &image.name) {
                Ok(()) => {
                    self.events.emit(&Event::Uploaded {
                        name: image.name.clone(),
                    });
                    advance_counter(&self.store, &mut self.counter, &self.events);
                    uploaded = true;
                }
                Err(err) => {
                    self.events.emit(&Event::UploadFailed {
                        name: image.name.clone(),
                        error: err.to_string(),
                    });
                    self.queue.push(image.path, image.name);

                    if err.is_protocol() {
                        self.events.emit(&Event::ProtocolPause {
                            error: err.to_string(),
                            pause_secs: self.protocol_pause.as_secs(),
                        });
                        self.sleeper.sleep(self.protocol_pause);
                        return CycleOutcome::Paused;
                    }
                }
            }
        }

        self.cleanup(SystemTime::now());
        self.sleeper.sleep(self.interval);

        if self.shutdown.is_requested() {
            return CycleOutcome::Stopped;
        }

        let retries = self.retry_pending();
        CycleOutcome::Completed { uploaded, retries }
    }

    /// Delete local images older than the retention window.
    pub fn cleanup(&self, now: SystemTime) -> SweepReport {
        sweep(&self.local_dir, self.retention, now, &self.events)
    }

    /// Give every queued upload one more attempt.
    pub fn retry_pending(&mut self) -> RetryPass {
        let Self {
            session,
            events,
            store,
            counter,
            queue,
            ..
        } = self;
        let events: &E = events;

        queue.retry_pass(events, |entry| {
            session.put(&entry.local_path, &entry.remote_name)?;
            advance_counter(store, counter, events);
            Ok(())
        })
    }

    /// Number the next capture will get.
    pub const fn counter(&self) -> u64 {
        self.counter
    }

    /// Uploads waiting for a retry.
    pub const fn queue(&self) -> &RetryQueue {
        &self.queue
    }

    /// The camera backend.
    pub const fn camera(&self) -> &C {
        &self.camera
    }

    /// The transfer session.
    pub const fn session(&self) -> &T {
        &self.session
    }

    /// The sleeper.
    pub const fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// The event sink.
    pub const fn events(&self) -> &E {
        &self.events
    }

    /// Close the session and tear the loop down, handing back the session.
    pub fn close(mut self) -> T {
        end_session(&mut self.session, &self.events);
        self.session
    }
}

fn end_session<T: TransferSession, E: EventSink + ?Sized>(session: &mut T, events: &E) {
    session.close();
    events.emit(&Event::SessionClosed);
}

/// Advance the running counter and persist it.
///
/// A failed write is reported and the in-memory counter still advances.
fn advance_counter<E: EventSink + ?Sized>(store: &CounterStore, counter: &mut u64, events: &E) {
    *counter += 1;
    if let Err(err) = store.save(*counter) {
        events.emit(&Event::CounterSaveFailed {
            value: *counter,
            error: err.to_string(),
        });
    }
}
