// Per-path statistics over an open session
// Paths are handled one after another; a failing path never aborts the pass

use crate::errors::RemoteError;
use crate::models::{FilesystemStat, ObjectStat, ObjectTotals, WalkEntry};
use crate::sftp::RemoteSession;
use crate::telemetry;
use tracing::{debug, error};

/// Capacity of every path whose query succeeded, in path order.
/// Failed paths are logged and left out rather than reported as zero.
pub fn filesystem_stats<S>(session: &S, paths: &[String]) -> Vec<FilesystemStat>
where
    S: RemoteSession + ?Sized,
{
    let mut stats = Vec::with_capacity(paths.len());
    for path in paths {
        match session.capacity(path) {
            Ok(capacity) => {
                debug!(path = %path, ?capacity, "Collected filesystem stats");
                stats.push(FilesystemStat::from_capacity(path.as_str(), capacity));
            }
            Err(e) => {
                error!(event = "collecting filesystem stats", path = %path, error = %e);
                telemetry::record_capacity_error();
            }
        }
    }
    stats
}

/// Object count and size for every path, in path order. Always one entry
/// per path; zero when nothing below it could be read.
pub fn object_stats<S>(session: &S, paths: &[String]) -> Vec<ObjectStat>
where
    S: RemoteSession + ?Sized,
{
    paths
        .iter()
        .map(|path| {
            let totals = aggregate_objects(session.walk(path), |e| {
                error!(
                    event = "collecting object stats",
                    path = %path,
                    entry = %e.path(),
                    error = %e
                );
                telemetry::record_walk_error();
            });
            debug!(path = %path, count = totals.count, size = totals.size, "Collected object stats");
            ObjectStat::new(path.as_str(), totals)
        })
        .collect()
}

/// Sum count and size of the non-directory entries.
///
/// Errors are handed to `on_error` and the entry is skipped; aggregation
/// always continues with the rest of the traversal.
pub fn aggregate_objects<I, F>(entries: I, mut on_error: F) -> ObjectTotals
where
    I: IntoIterator<Item = Result<WalkEntry, RemoteError>>,
    F: FnMut(&RemoteError),
{
    let mut totals = ObjectTotals::default();
    for entry in entries {
        match entry {
            Ok(entry) if entry.is_dir => {}
            Ok(entry) => totals.add(entry.size),
            Err(e) => on_error(&e),
        }
    }
    totals
}
