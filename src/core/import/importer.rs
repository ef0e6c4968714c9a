//! Import executor.

use super::planner::{plan_destination, UNSORTED_DIR};
use super::sidecar::Sidecar;
use super::{ImportFailure, ImportOptions, ImportOutcome, ImportSummary, MediaKind};
use crate::core::engine::{CancellationToken, DuplicateDetector, IncomingClassification};
use crate::core::hasher::Fingerprint;
use crate::core::metadata::{parse_exif_date, ExifExtractor, MetadataExtractor};
use crate::core::scanner::{ExtensionFilter, MediaScanner, ScanConfig, WalkDirScanner};
use crate::core::transfer::{copy_verified, unique_path, TransferFailure};
use crate::error::{ImportError, MediaVaultError};
use crate::events::{null_sender, Event, EventSender, ImportEvent, ImportProgress};
use chrono::{Local, NaiveDateTime, TimeZone};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime};
use tracing::{debug, info, warn};

/// Imports media into the detector's library root
pub struct MediaImporter<'a> {
    detector: &'a DuplicateDetector,
    extractor: Box<dyn MetadataExtractor>,
    options: ImportOptions,
    images: ExtensionFilter,
}

impl<'a> MediaImporter<'a> {
    pub fn new(detector: &'a DuplicateDetector, options: ImportOptions) -> Self {
        let images = ExtensionFilter::new(&options.image_extensions).with_hidden(true);
        Self {
            detector,
            extractor: Box::new(ExifExtractor),
            options,
            images,
        }
    }

    /// Replace the EXIF reader (e.g., for testing)
    pub fn with_extractor(mut self, extractor: Box<dyn MetadataExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    fn root(&self) -> &Path {
        self.detector.root()
    }

    /// Import everything below `source` without progress reporting
    pub fn run(&self, source: &Path) -> Result<ImportSummary, MediaVaultError> {
        self.run_with_events(source, &CancellationToken::new(), &null_sender())
    }

    pub fn run_with_events(
        &self,
        source: &Path,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<ImportSummary, MediaVaultError> {
        let start_time = Instant::now();
        if !source.is_dir() {
            return Err(ImportError::SourceNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }

        let unsorted = self.root().join(UNSORTED_DIR);
        fs::create_dir_all(&unsorted).map_err(|e| ImportError::Io {
            path: unsorted.clone(),
            source: e,
        })?;

        let files = self.collect(source)?;
        let mut summary = ImportSummary {
            source: source.to_path_buf(),
            images_found: files.iter().filter(|(_, k)| *k == MediaKind::Image).count(),
            videos_found: files.iter().filter(|(_, k)| *k == MediaKind::Video).count(),
            ..Default::default()
        };

        info!(
            source = %source.display(),
            root = %self.root().display(),
            images = summary.images_found,
            videos = summary.videos_found,
            "Import started"
        );
        events.send(Event::Import(ImportEvent::Started {
            source: source.to_path_buf(),
            total: files.len(),
        }));

        for (index, (path, kind)) in files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(completed = index, "Import cancelled");
                summary.cancelled = true;
                break;
            }

            match self.import_with_retry(path, *kind) {
                Ok(outcome) => {
                    if self.options.delete_after_copy && !outcome.left_at_source() {
                        if let Err(e) = remove_original(path) {
                            warn!(error = %e, "Imported, but the original was kept");
                            summary.originals_kept.push(path.clone());
                        }
                    }
                    self.record(&mut summary, path, outcome, events);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed processing media file");
                    events.send(Event::Import(ImportEvent::Failed {
                        path: path.clone(),
                        message: e.to_string(),
                    }));
                    summary.failures.push(ImportFailure {
                        path: path.clone(),
                        kind: *kind,
                        reason: e.to_string(),
                    });
                }
            }

            events.send(Event::Import(ImportEvent::Progress(ImportProgress {
                completed: index + 1,
                total: files.len(),
                current_path: path.clone(),
            })));
        }

        summary.duration_ms = start_time.elapsed().as_millis() as u64;
        let imported = summary.images_imported + summary.videos_imported;
        let duplicates = summary.duplicates_archived + summary.duplicates_skipped;

        info!(
            images = summary.images_imported,
            videos = summary.videos_imported,
            images_failed = summary.images_failed(),
            videos_failed = summary.videos_failed(),
            duplicates,
            duration_ms = summary.duration_ms,
            "Import complete"
        );
        events.send(Event::Import(ImportEvent::Completed {
            imported,
            duplicates,
            failed: summary.failures.len(),
        }));

        Ok(summary)
    }

    /// Media below `source`, in walk order, tagged by kind
    fn collect(&self, source: &Path) -> Result<Vec<(PathBuf, MediaKind)>, MediaVaultError> {
        let extensions: Vec<&String> = self
            .options
            .image_extensions
            .iter()
            .chain(&self.options.video_extensions)
            .collect();
        let config = ScanConfig {
            include_hidden: false,
            ..ScanConfig::with_extensions(&extensions)
        };

        let walk = WalkDirScanner::new(config).scan(source)?;
        for error in &walk.errors {
            warn!(error = %error, "Skipped unreadable entry in import source");
        }

        Ok(walk
            .files
            .into_iter()
            .map(|file| {
                let kind = match file.path.file_name().and_then(|n| n.to_str()) {
                    Some(name) if self.images.matches_name(name) => MediaKind::Image,
                    _ => MediaKind::Video,
                };
                (file.path, kind)
            })
            .collect())
    }

    fn record(
        &self,
        summary: &mut ImportSummary,
        source: &Path,
        outcome: ImportOutcome,
        events: &EventSender,
    ) {
        match outcome {
            ImportOutcome::Imported { to, kind, .. } => {
                if to.starts_with(self.root().join(UNSORTED_DIR)) {
                    summary.unsorted += 1;
                }
                match kind {
                    MediaKind::Image => summary.images_imported += 1,
                    MediaKind::Video => summary.videos_imported += 1,
                }
                events.send(Event::Import(ImportEvent::Imported {
                    from: source.to_path_buf(),
                    to,
                }));
            }
            ImportOutcome::DuplicateArchived { to, .. } => {
                summary.duplicates_archived += 1;
                events.send(Event::Import(ImportEvent::DuplicateRouted {
                    path: source.to_path_buf(),
                    destination: Some(to),
                }));
            }
            ImportOutcome::DuplicateSkipped { .. } => {
                summary.duplicates_skipped += 1;
                events.send(Event::Import(ImportEvent::DuplicateRouted {
                    path: source.to_path_buf(),
                    destination: None,
                }));
            }
        }
    }

    fn import_with_retry(
        &self,
        path: &Path,
        kind: MediaKind,
    ) -> Result<ImportOutcome, MediaVaultError> {
        let attempts = self.options.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.import_one(path, kind) {
                Ok(outcome) => return Ok(outcome),
                Err(e) if attempt < attempts => {
                    debug!(path = %path.display(), attempt, error = %e, "Retrying import");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Import a single file, leaving the original in place.
    ///
    /// A failed attempt leaves nothing behind in the library, so it can be
    /// retried. Removing originals under `delete_after_copy` happens once,
    /// after the file has been imported.
    pub fn import_one(
        &self,
        source: &Path,
        kind: MediaKind,
    ) -> Result<ImportOutcome, MediaVaultError> {
        if !source.is_file() {
            return Err(ImportError::SourceNotFound {
                path: source.to_path_buf(),
            }
            .into());
        }

        let sidecar = Sidecar::locate(source)?;
        let taken = self.capture_time(source, kind, sidecar.as_ref());
        let mut destination = plan_destination(self.root(), source, taken);

        let mut register_as: Option<Fingerprint> = None;
        let mut duplicate_of: Option<PathBuf> = None;

        if kind == MediaKind::Image && self.options.prevent_duplicates {
            match self.detector.classify_incoming(source, &destination)? {
                IncomingClassification::Unique(fingerprint) => register_as = Some(fingerprint),
                IncomingClassification::Duplicate { original } => {
                    let Some(archive) = self.detector.archive_directory() else {
                        info!(
                            path = %source.display(),
                            original = %original.display(),
                            "Duplicate skipped"
                        );
                        return Ok(ImportOutcome::DuplicateSkipped { original });
                    };
                    let name = destination.file_name().map(PathBuf::from).unwrap_or_default();
                    destination = unique_path(&archive.join(name));
                    duplicate_of = Some(original);
                }
                IncomingClassification::Unclassifiable { reason } => {
                    debug!(path = %source.display(), reason = %reason, "Importing without duplicate check");
                }
                IncomingClassification::Excluded => {}
            }
        }

        self.copy(source, &destination)?;

        // Registration stamps the store mtime, so the capture time goes first
        if let Some(taken) = taken {
            apply_mtime(&destination, taken);
        }

        if let Some(fingerprint) = &register_as {
            if let Err(e) = self.detector.register(&destination, fingerprint) {
                let _ = fs::remove_file(&destination);
                return Err(e);
            }
        }

        if let Some(sidecar) = &sidecar {
            match sidecar.copy_beside(&destination) {
                Ok(copied) => debug!(sidecar = %copied.display(), "Copied sidecar"),
                Err(e) => warn!(error = %e, "Sidecar not copied"),
            }
        }

        match duplicate_of {
            Some(original) => {
                info!(
                    path = %source.display(),
                    archived = %destination.display(),
                    original = %original.display(),
                    "Duplicate archived"
                );
                Ok(ImportOutcome::DuplicateArchived {
                    to: destination,
                    original,
                })
            }
            None => {
                info!(from = %source.display(), to = %destination.display(), "Imported");
                Ok(ImportOutcome::Imported {
                    to: destination,
                    kind,
                    registered: register_as.is_some(),
                })
            }
        }
    }

    fn capture_time(
        &self,
        source: &Path,
        kind: MediaKind,
        sidecar: Option<&Sidecar>,
    ) -> Option<NaiveDateTime> {
        let embedded = match kind {
            MediaKind::Image => self
                .extractor
                .date_taken(source)
                .and_then(|raw| parse_exif_date(&raw)),
            MediaKind::Video => None,
        };

        embedded.or_else(|| sidecar.and_then(|s| s.taken))
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<(), ImportError> {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| ImportError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        copy_verified(source, destination).map_err(|failure| match failure {
            TransferFailure::Io(e) => ImportError::Copy {
                from: source.to_path_buf(),
                to: destination.to_path_buf(),
                source: e,
            },
            TransferFailure::SizeMismatch { expected, actual } => ImportError::SizeMismatch {
                path: source.to_path_buf(),
                expected,
                actual,
            },
        })?;
        Ok(())
    }
}

/// Delete an imported original and its sidecar
fn remove_original(source: &Path) -> Result<(), ImportError> {
    match Sidecar::locate(source) {
        Ok(Some(sidecar)) => {
            if let Err(e) = fs::remove_file(&sidecar.path) {
                warn!(path = %sidecar.path.display(), error = %e, "Could not remove sidecar");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "Could not look up sidecar"),
    }

    fs::remove_file(source).map_err(|e| ImportError::Io {
        path: source.to_path_buf(),
        source: e,
    })
}

/// Stamp the capture time, read as local time, onto the file's mtime
fn apply_mtime(path: &Path, taken: NaiveDateTime) {
    let Some(local) = Local.from_local_datetime(&taken).earliest() else {
        return;
    };
    let time = SystemTime::from(local);

    let result = fs::File::options()
        .write(true)
        .open(path)
        .and_then(|file| file.set_modified(time));
    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "Could not set modification time");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::engine::ArchiveConfig;
    use crate::core::hasher::CachePolicy;
    use crate::core::store::file_mtime;
    use image::{ImageBuffer, Rgb, RgbImage};
    use std::time::UNIX_EPOCH;
    use tempfile::TempDir;

    /// Dates come from a fixed map instead of EXIF
    struct FixedDates(Vec<(&'static str, &'static str)>);

    impl MetadataExtractor for FixedDates {
        fn date_taken(&self, path: &Path) -> Option<String> {
            let name = path.file_name()?.to_str()?;
            self.0
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, date)| date.to_string())
        }
    }

    fn gradient() -> RgbImage {
        ImageBuffer::from_fn(96, 64, |x, y| Rgb([(x * 2) as u8, (y * 3) as u8, 90]))
    }

    fn stripes() -> RgbImage {
        ImageBuffer::from_fn(96, 64, |x, _| {
            if (x / 12) % 2 == 0 {
                Rgb([240, 240, 240])
            } else {
                Rgb([15, 15, 15])
            }
        })
    }

    struct Fixture {
        _temp_dir: TempDir,
        import: PathBuf,
        library: PathBuf,
    }

    fn fixture() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let import = temp_dir.path().join("takeout");
        let library = temp_dir.path().join("library");
        fs::create_dir_all(&import).unwrap();
        fs::create_dir_all(&library).unwrap();
        Fixture {
            _temp_dir: temp_dir,
            import,
            library,
        }
    }

    fn detector(library: &Path, archive: ArchiveConfig) -> DuplicateDetector {
        let mut detector = DuplicateDetector::builder(library).archive(archive).build();
        detector.exclude_directories([UNSORTED_DIR]).unwrap();
        detector
    }

    #[test]
    fn dated_image_lands_in_year_folder_and_is_registered() {
        let fx = fixture();
        gradient().save(fx.import.join("IMG_0001.jpg")).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let importer = MediaImporter::new(&detector, ImportOptions::default())
            .with_extractor(Box::new(FixedDates(vec![("IMG_0001.jpg", "2023:07:04 10:15:00")])));

        let summary = importer.run(&fx.import).unwrap();

        let landed = fx.library.join("2023/20230704_101500.jpg");
        assert_eq!(summary.images_imported, 1);
        assert!(landed.exists());
        assert!(fx.import.join("IMG_0001.jpg").exists());
        assert!(detector.store().get_hash(&landed).unwrap().is_some());

        let expected = Local
            .from_local_datetime(&parse_exif_date("2023:07:04 10:15:00").unwrap())
            .earliest()
            .map(SystemTime::from)
            .unwrap();
        let mtime = fs::metadata(&landed).unwrap().modified().unwrap();
        assert_eq!(
            mtime.duration_since(UNIX_EPOCH).unwrap().as_secs(),
            expected.duration_since(UNIX_EPOCH).unwrap().as_secs()
        );
    }

    #[test]
    fn registered_mtime_matches_applied_capture_time() {
        let fx = fixture();
        gradient().save(fx.import.join("IMG_0001.jpg")).unwrap();
        let detector = DuplicateDetector::builder(&fx.library)
            .cache_policy(CachePolicy::CheckMtime)
            .build();
        let importer = MediaImporter::new(&detector, ImportOptions::default())
            .with_extractor(Box::new(FixedDates(vec![("IMG_0001.jpg", "2021:02:03 04:05:06")])));

        importer.run(&fx.import).unwrap();

        let landed = fx.library.join("2021/20210203_040506.jpg");
        let record = detector.store().get_record(&landed).unwrap().unwrap();
        assert!((record.mtime - file_mtime(&landed).unwrap()).abs() < 1e-6);

        let rescan = detector.scan(&fx.library).unwrap();
        assert_eq!(rescan.cache_hits, 1);
    }

    #[test]
    fn undated_image_goes_to_unsorted_without_registration() {
        let fx = fixture();
        gradient().save(fx.import.join("scan.png")).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let importer = MediaImporter::new(&detector, ImportOptions::default())
            .with_extractor(Box::new(FixedDates(vec![])));

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.unsorted, 1);
        assert!(fx.library.join("unsorted/scan.png").exists());
        assert_eq!(detector.store().record_count().unwrap(), 0);
    }

    #[test]
    fn sidecar_supplies_date_and_is_copied() {
        let fx = fixture();
        fs::write(fx.import.join("clip.mp4"), b"not really a video").unwrap();
        fs::write(
            fx.import.join("clip.mp4.json"),
            r#"{"photoTakenTime": {"timestamp": "1688465700"}}"#,
        )
        .unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let importer = MediaImporter::new(&detector, ImportOptions::default());

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.videos_imported, 1);
        assert!(fx.library.join("2023/20230704_101500.mp4").exists());
        assert!(fx.library.join("2023/_json/20230704_101500.json").exists());
    }

    #[test]
    fn duplicate_is_skipped_when_archive_inactive() {
        let fx = fixture();
        gradient().save(fx.import.join("a.jpg")).unwrap();
        fs::copy(fx.import.join("a.jpg"), fx.import.join("b.jpg")).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let options = ImportOptions {
            delete_after_copy: true,
            ..Default::default()
        };
        let importer = MediaImporter::new(&detector, options).with_extractor(Box::new(
            FixedDates(vec![
                ("a.jpg", "2023:07:04 10:15:00"),
                ("b.jpg", "2023:07:05 09:00:00"),
            ]),
        ));

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.images_imported, 1);
        assert_eq!(summary.duplicates_skipped, 1);
        assert!(!fx.import.join("a.jpg").exists());
        assert!(fx.import.join("b.jpg").exists());
        assert!(!fx.library.join("2023/20230705_090000.jpg").exists());
    }

    #[cfg(unix)]
    #[test]
    fn undeletable_original_is_imported_once() {
        use std::os::unix::fs::PermissionsExt;

        let fx = fixture();
        gradient().save(fx.import.join("a.jpg")).unwrap();
        fs::set_permissions(&fx.import, fs::Permissions::from_mode(0o555)).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let options = ImportOptions {
            delete_after_copy: true,
            ..Default::default()
        };
        let importer = MediaImporter::new(&detector, options)
            .with_extractor(Box::new(FixedDates(vec![("a.jpg", "2023:07:04 10:15:00")])));

        let summary = importer.run(&fx.import).unwrap();
        let source_left = fx.import.join("a.jpg").exists();
        fs::set_permissions(&fx.import, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(summary.images_imported, 1);
        assert_eq!(summary.duplicates_skipped, 0);
        assert!(summary.failures.is_empty());
        // root ignores directory permissions, so the removal may succeed
        assert_eq!(summary.originals_kept.len(), usize::from(source_left));
        let landed: Vec<_> = fs::read_dir(fx.library.join("2023"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .collect();
        assert_eq!(landed.len(), 1);
        assert_eq!(detector.store().record_count().unwrap(), 1);
    }

    #[test]
    fn duplicate_is_archived_when_archive_active() {
        let fx = fixture();
        gradient().save(fx.import.join("a.jpg")).unwrap();
        fs::copy(fx.import.join("a.jpg"), fx.import.join("b.jpg")).unwrap();
        stripes().save(fx.import.join("c.jpg")).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::new(true, Some("trash".into())));
        let importer = MediaImporter::new(&detector, ImportOptions::default()).with_extractor(
            Box::new(FixedDates(vec![
                ("a.jpg", "2023:07:04 10:15:00"),
                ("b.jpg", "2023:07:05 09:00:00"),
                ("c.jpg", "2023:07:06 09:00:00"),
            ])),
        );

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.images_imported, 2);
        assert_eq!(summary.duplicates_archived, 1);
        assert!(fx.library.join("trash/20230705_090000.jpg").exists());
        assert_eq!(detector.store().record_count().unwrap(), 2);
    }

    #[test]
    fn duplicate_checks_can_be_disabled() {
        let fx = fixture();
        gradient().save(fx.import.join("a.jpg")).unwrap();
        fs::copy(fx.import.join("a.jpg"), fx.import.join("b.jpg")).unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let options = ImportOptions {
            prevent_duplicates: false,
            ..Default::default()
        };
        let importer = MediaImporter::new(&detector, options)
            .with_extractor(Box::new(FixedDates(vec![])));

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.images_imported, 2);
        assert!(fx.library.join("unsorted/a.jpg").exists());
        assert!(fx.library.join("unsorted/b.jpg").exists());
    }

    #[test]
    fn undecodable_image_is_still_imported() {
        let fx = fixture();
        fs::write(fx.import.join("IMG_0002.HEIC"), b"ftypheic").unwrap();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let importer = MediaImporter::new(&detector, ImportOptions::default())
            .with_extractor(Box::new(FixedDates(vec![("IMG_0002.HEIC", "2022:01:02 03:04:05")])));

        let summary = importer.run(&fx.import).unwrap();

        assert_eq!(summary.images_imported, 1);
        assert!(fx.library.join("2022/20220102_030405.HEIC").exists());
        assert_eq!(detector.store().record_count().unwrap(), 0);
    }

    #[test]
    fn missing_source_directory_fails() {
        let fx = fixture();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let importer = MediaImporter::new(&detector, ImportOptions::default());

        let result = importer.run(&fx.import.join("missing"));

        assert!(matches!(
            result,
            Err(MediaVaultError::Import(ImportError::SourceNotFound { .. }))
        ));
    }

    #[test]
    fn vanished_file_fails_after_retries() {
        let fx = fixture();
        let detector = detector(&fx.library, ArchiveConfig::default());
        let options = ImportOptions {
            max_attempts: 3,
            ..Default::default()
        };
        let importer = MediaImporter::new(&detector, options);

        let result = importer.import_with_retry(&fx.import.join("gone.jpg"), MediaKind::Image);

        assert!(result.is_err());
    }
}
