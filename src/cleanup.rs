//! Retention sweep over the local capture directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use crate::events::Event;
use crate::traits::EventSink;

/// Files removed by one sweep.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Deleted paths.
    pub removed: Vec<PathBuf>,
    /// Entries that could not be inspected or deleted.
    pub failed: usize,
}

/// Delete every regular file in `dir` last modified more than `retention`
/// before `now`.
///
/// Never fails: an unreadable directory or file is reported to `events`
/// and skipped.
pub fn sweep<E>(dir: &Path, retention: Duration, now: SystemTime, events: &E) -> SweepReport
where
    E: EventSink + ?Sized,
{
    let mut report = SweepReport::default();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            events.emit(&Event::CleanupFailed {
                error: format!("{}: {err}", dir.display()),
            });
            return report;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                events.emit(&Event::CleanupFailed {
                    error: format!("{}: {err}", dir.display()),
                });
                report.failed += 1;
                continue;
            }
        };
        let path = entry.path();

        match expired(&path, retention, now) {
            Ok(false) => {}
            Ok(true) => match fs::remove_file(&path) {
                Ok(()) => {
                    events.emit(&Event::OldImageRemoved { path: path.clone() });
                    report.removed.push(path);
                }
                Err(err) => {
                    events.emit(&Event::CleanupEntryFailed {
                        path,
                        error: err.to_string(),
                    });
                    report.failed += 1;
                }
            },
            Err(err) => {
                events.emit(&Event::CleanupEntryFailed {
                    path,
                    error: err.to_string(),
                });
                report.failed += 1;
            }
        }
    }

    report
}

/// Whether `path` is a regular file strictly older than `retention`.
fn expired(path: &Path, retention: Duration, now: SystemTime) -> std::io::Result<bool> {
    let metadata = fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let modified = metadata.modified()?;
    // A timestamp in the future yields Err and the file is kept.
    Ok(now
        .duration_since(modified)
        .is_ok_and(|age| age > retention))
}
