//! Archiving or deleting a run's duplicates.

use super::{DisposalReport, Disposed, DuplicateRun, Unclassified};
use crate::core::store::HashStore;
use crate::core::transfer::{move_file, unique_path, TransferFailure};
use crate::error::DisposalError;
use crate::events::{DisposeEvent, Event, EventSender};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Dispose every entry of `run`, archiving into `archive` when given.
///
/// Per-file failures are collected into the report. Only an archive
/// directory that cannot be created fails the whole call.
pub(super) fn dispose_run(
    run: &DuplicateRun,
    archive: Option<&Path>,
    store: &dyn HashStore,
    events: &EventSender,
) -> Result<DisposalReport, DisposalError> {
    if let Some(directory) = archive {
        fs::create_dir_all(directory).map_err(|e| DisposalError::ArchiveDirectory {
            path: directory.to_path_buf(),
            source: e,
        })?;
    }

    info!(
        run_id = %run.id(),
        total = run.len(),
        archive = ?archive,
        "Disposing duplicates"
    );
    events.send(Event::Dispose(DisposeEvent::Started {
        total: run.len(),
        archive: archive.map(Path::to_path_buf),
    }));

    let mut report = DisposalReport::default();

    for path in run.paths() {
        let outcome = match archive {
            Some(directory) => archive_one(path, directory),
            None => delete_one(path),
        };

        match outcome {
            Ok(disposed) => {
                match &disposed {
                    Disposed::Archived { path, destination } => {
                        info!(path = %path.display(), destination = %destination.display(), "Archived duplicate");
                        events.send(Event::Dispose(DisposeEvent::Archived {
                            path: path.clone(),
                            destination: destination.clone(),
                        }));
                    }
                    Disposed::Deleted { path } => {
                        info!(path = %path.display(), "Deleted duplicate");
                        events.send(Event::Dispose(DisposeEvent::Deleted { path: path.clone() }));
                    }
                }

                match store.remove(path) {
                    Ok(true) => report.records_removed += 1,
                    Ok(false) => {}
                    Err(e) => warn!(path = %path.display(), error = %e, "Could not drop store record"),
                }

                report.disposed.push(disposed);
            }
            Err(e) => {
                warn!(error = %e, "Disposal failed");
                events.send(Event::Dispose(DisposeEvent::Failed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }));
                report.failed.push(Unclassified {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        run_id = %run.id(),
        disposed = report.disposed.len(),
        failed = report.failed.len(),
        "Disposal finished"
    );
    events.send(Event::Dispose(DisposeEvent::Completed {
        disposed: report.disposed.len(),
        failed: report.failed.len(),
    }));

    Ok(report)
}

fn archive_one(path: &Path, directory: &Path) -> Result<Disposed, DisposalError> {
    let name = path.file_name().map(PathBuf::from).unwrap_or_default();
    let destination = unique_path(&directory.join(name));

    move_file(path, &destination).map_err(|failure| match failure {
        TransferFailure::Io(source) => DisposalError::Move {
            path: path.to_path_buf(),
            destination: destination.clone(),
            source,
        },
        TransferFailure::SizeMismatch { expected, actual } => DisposalError::SizeMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        },
    })?;

    Ok(Disposed::Archived {
        path: path.to_path_buf(),
        destination,
    })
}

fn delete_one(path: &Path) -> Result<Disposed, DisposalError> {
    fs::remove_file(path).map_err(|source| DisposalError::Delete {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(Disposed::Deleted {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::DuplicateEntry;
    use crate::core::store::InMemoryHashStore;
    use crate::events::null_sender;
    use tempfile::TempDir;

    fn run_of(paths: &[&Path]) -> DuplicateRun {
        let mut run = DuplicateRun::new();
        for path in paths {
            run.push(DuplicateEntry {
                path: path.to_path_buf(),
                original: PathBuf::from("/library/original.jpg"),
            });
        }
        run
    }

    #[test]
    fn archive_collisions_get_numbered_names() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("2022/IMG_0001.jpg");
        let second = temp_dir.path().join("2023/IMG_0001.jpg");
        for path in [&first, &second] {
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"duplicate").unwrap();
        }
        let archive = temp_dir.path().join("trash");

        let report = dispose_run(
            &run_of(&[&first, &second]),
            Some(&archive),
            &InMemoryHashStore::new(),
            &null_sender(),
        )
        .unwrap();

        assert_eq!(report.disposed.len(), 2);
        assert!(archive.join("IMG_0001.jpg").exists());
        assert!(archive.join("IMG_0001-01.jpg").exists());
        assert!(!first.exists());
        assert!(!second.exists());
    }

    #[test]
    fn failure_does_not_stop_remaining_entries() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone.jpg");
        let present = temp_dir.path().join("here.jpg");
        fs::write(&present, b"duplicate").unwrap();

        let report = dispose_run(
            &run_of(&[&missing, &present]),
            None,
            &InMemoryHashStore::new(),
            &null_sender(),
        )
        .unwrap();

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].path, missing);
        assert_eq!(report.disposed.len(), 1);
        assert!(!present.exists());
    }

    #[test]
    fn disposed_path_loses_its_store_record() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stale.jpg");
        fs::write(&path, b"duplicate").unwrap();
        let store = InMemoryHashStore::new();
        store.add_or_update(&path, "0f0f0f0f0f0f0f0f").unwrap();

        let report = dispose_run(&run_of(&[&path]), None, &store, &null_sender()).unwrap();

        assert_eq!(report.records_removed, 1);
        assert_eq!(store.record_count().unwrap(), 0);
    }

    #[test]
    fn uncreatable_archive_directory_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("trash");
        fs::write(&blocker, b"a file, not a directory").unwrap();

        let result = dispose_run(
            &run_of(&[]),
            Some(&blocker.join("nested")),
            &InMemoryHashStore::new(),
            &null_sender(),
        );

        assert!(matches!(result, Err(DisposalError::ArchiveDirectory { .. })));
    }
}
