//! Duplicate detector implementation.

use super::disposal::dispose_run;
use super::{
    ArchiveConfig, CancellationToken, Classification, DisposalReport, DuplicateEntry,
    DuplicateRun, IncomingClassification, ScanReport, Unclassified,
};
use crate::core::exclusion::ExclusionSet;
use crate::core::hasher::{CachePolicy, CachedFingerprinter, Fingerprint, HasherConfig};
use crate::core::scanner::{MediaScanner, ScanConfig, WalkDirScanner, DEFAULT_IMAGE_EXTENSIONS};
use crate::core::store::{HashStore, InMemoryHashStore};
use crate::error::{MediaVaultError, StoreError};
use crate::events::{null_sender, Event, EventSender, ScanEvent, ScanProgress};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Builder for a `DuplicateDetector`
pub struct DetectorBuilder {
    root: PathBuf,
    extensions: Vec<String>,
    include_hidden: bool,
    archive: ArchiveConfig,
    store: Option<Box<dyn HashStore>>,
    hasher: HasherConfig,
    cache_policy: CachePolicy,
    force_recompute: bool,
}

impl DetectorBuilder {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_IMAGE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
            archive: ArchiveConfig::default(),
            store: None,
            hasher: HasherConfig::new(),
            cache_policy: CachePolicy::default(),
            force_recompute: false,
        }
    }

    /// Filename suffixes to scan, compared case-sensitively
    pub fn extensions<S: AsRef<str>>(mut self, extensions: &[S]) -> Self {
        self.extensions = extensions.iter().map(|e| e.as_ref().to_string()).collect();
        self
    }

    /// Also scan dot-files and dot-directories (skipped by default)
    pub fn include_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn archive(mut self, archive: ArchiveConfig) -> Self {
        self.archive = archive;
        self
    }

    /// Set the hash store (defaults to an in-memory store)
    pub fn store(mut self, store: Box<dyn HashStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn hasher(mut self, hasher: HasherConfig) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    /// Always decode, ignoring fingerprints already in the store
    pub fn force_recompute(mut self, force: bool) -> Self {
        self.force_recompute = force;
        self
    }

    /// Build the detector. An active archive directory starts out excluded
    /// so archived duplicates are never scanned again.
    pub fn build(self) -> DuplicateDetector {
        let fingerprinter = CachedFingerprinter::new(self.hasher.build())
            .policy(self.cache_policy)
            .force_recompute(self.force_recompute);

        let root = absolutize(&self.root);
        let mut exclusions = ExclusionSet::new();
        if let Some(archive) = self.archive.target() {
            if let Err(e) = exclusions.add(&root, archive) {
                warn!(error = %e, "Archive directory not excluded");
            }
        }

        DuplicateDetector {
            root,
            scan_config: ScanConfig {
                include_hidden: self.include_hidden,
                ..ScanConfig::with_extensions(&self.extensions)
            },
            exclusions,
            archive: self.archive,
            store: self
                .store
                .unwrap_or_else(|| Box::new(InMemoryHashStore::new())),
            fingerprinter,
        }
    }
}

/// Classifies media files against a hash store
pub struct DuplicateDetector {
    root: PathBuf,
    scan_config: ScanConfig,
    exclusions: ExclusionSet,
    archive: ArchiveConfig,
    store: Box<dyn HashStore>,
    fingerprinter: CachedFingerprinter,
}

impl DuplicateDetector {
    pub fn builder(root: impl Into<PathBuf>) -> DetectorBuilder {
        DetectorBuilder::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn store(&self) -> &dyn HashStore {
        self.store.as_ref()
    }

    pub fn archive(&self) -> &ArchiveConfig {
        &self.archive
    }

    pub fn exclusions(&self) -> &ExclusionSet {
        &self.exclusions
    }

    /// Archive directory resolved against the root, if archiving is active
    pub fn archive_directory(&self) -> Option<PathBuf> {
        self.archive.target().map(|dir| self.root.join(dir))
    }

    /// Exclude one or more directories from scanning and registration.
    ///
    /// Relative entries are taken from the root. Nothing is added if any
    /// entry is empty.
    pub fn exclude_directories<I, P>(&mut self, directories: I) -> Result<(), MediaVaultError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut updated = self.exclusions.clone();
        for directory in directories {
            updated.add(&self.root, directory)?;
        }
        self.exclusions = updated;
        Ok(())
    }

    /// Scan a directory without progress reporting
    pub fn scan(&self, directory: &Path) -> Result<ScanReport, MediaVaultError> {
        self.scan_with_events(directory, &CancellationToken::new(), &null_sender())
    }

    /// Walk `directory` and check every selected file.
    ///
    /// Files are selected by extension. Hidden files and directories (names
    /// starting with `.`) are left out unless `include_hidden` was set on the
    /// builder, as are excluded directories.
    ///
    /// Only an unusable `directory` fails the scan. Everything per-file ends
    /// up in the report.
    pub fn scan_with_events(
        &self,
        directory: &Path,
        cancel: &CancellationToken,
        events: &EventSender,
    ) -> Result<ScanReport, MediaVaultError> {
        let start_time = Instant::now();
        let directory = absolutize(directory);
        let mut run = DuplicateRun::new();

        info!(
            run_id = %run.id(),
            directory = %directory.display(),
            algorithm = self.fingerprinter.algorithm_name(),
            "Scan started"
        );
        events.send(Event::Scan(ScanEvent::Started {
            root: directory.clone(),
            run_id: run.id().to_string(),
        }));

        let scanner = WalkDirScanner::new(self.scan_config.clone())
            .with_exclusions(self.exclusions.clone());
        let walk = scanner.scan(&directory)?;

        let total = walk.files.len();
        events.send(Event::Scan(ScanEvent::FilesDiscovered { total }));

        let mut errors: Vec<String> = walk.errors.iter().map(|e| e.to_string()).collect();
        let mut new = 0;
        let mut duplicates = 0;
        let mut already_registered = 0;
        let mut excluded = 0;
        let mut cache_hits = 0;
        let mut unclassifiable = Vec::new();
        let mut cancelled = false;

        for (index, file) in walk.files.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(run_id = %run.id(), completed = index, "Scan cancelled");
                events.send(Event::Scan(ScanEvent::Cancelled));
                cancelled = true;
                break;
            }

            match self.classify(&file.path, &mut run) {
                Ok((classification, from_cache)) => {
                    if from_cache {
                        cache_hits += 1;
                    }
                    match classification {
                        Classification::New => new += 1,
                        Classification::Duplicate {
                            self_match: true, ..
                        } => already_registered += 1,
                        Classification::Duplicate { .. } => {
                            duplicates += 1;
                            events.send(Event::Scan(ScanEvent::DuplicateFound {
                                path: file.path.clone(),
                            }));
                        }
                        Classification::Excluded => excluded += 1,
                        Classification::Unclassifiable { reason } => {
                            events.send(Event::Scan(ScanEvent::Error {
                                path: file.path.clone(),
                                message: reason.clone(),
                            }));
                            unclassifiable.push(Unclassified {
                                path: file.path.clone(),
                                reason,
                            });
                        }
                    }
                }
                Err(e) => {
                    warn!(path = %file.path.display(), error = %e, "Check failed");
                    events.send(Event::Scan(ScanEvent::Error {
                        path: file.path.clone(),
                        message: e.to_string(),
                    }));
                    errors.push(format!("{}: {}", file.path.display(), e));
                }
            }

            events.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                completed: index + 1,
                total,
                current_path: file.path.clone(),
                duplicates,
            })));
        }

        let report = ScanReport {
            root: directory,
            files_scanned: total,
            new,
            duplicates,
            already_registered,
            excluded,
            cache_hits,
            unclassifiable,
            errors,
            run,
            duration_ms: start_time.elapsed().as_millis() as u64,
            cancelled,
        };

        info!(
            run_id = %report.run.id(),
            scanned = report.files_scanned,
            new = report.new,
            duplicates = report.duplicates,
            already_registered = report.already_registered,
            unclassifiable = report.unclassifiable.len(),
            cache_hits = report.cache_hits,
            duration_ms = report.duration_ms,
            "Scan finished"
        );
        events.send(Event::Scan(ScanEvent::Completed {
            scanned: report.files_scanned,
            new: report.new,
            duplicates: report.duplicates,
            unclassifiable: report.unclassifiable.len(),
        }));

        Ok(report)
    }

    /// Classify one file, registering it if its fingerprint is new.
    ///
    /// Duplicates that match a different registered path are appended to
    /// `run`. Only store failures are returned as errors.
    pub fn check(
        &self,
        file: &Path,
        run: &mut DuplicateRun,
    ) -> Result<Classification, MediaVaultError> {
        self.classify(file, run).map(|(classification, _)| classification)
    }

    fn classify(
        &self,
        file: &Path,
        run: &mut DuplicateRun,
    ) -> Result<(Classification, bool), MediaVaultError> {
        let file = absolutize(file);

        if self.is_excluded_directory_of(&file) {
            debug!(path = %file.display(), "File is in an excluded directory");
            return Ok((Classification::Excluded, false));
        }

        let fingerprinted = match self.fingerprinter.fingerprint(&file, self.store()) {
            Ok(fingerprinted) => fingerprinted,
            Err(MediaVaultError::Hash(e)) => {
                warn!(path = %file.display(), error = %e, "Cannot fingerprint file");
                return Ok((
                    Classification::Unclassifiable {
                        reason: e.to_string(),
                    },
                    false,
                ));
            }
            Err(e) => return Err(e),
        };
        let from_cache = fingerprinted.from_cache;
        let fingerprint = fingerprinted.fingerprint;

        if let Some(original) = self.registered_original(&file, &fingerprint)? {
            let self_match = original == file;
            if !self_match {
                info!(
                    run_id = %run.id(),
                    path = %file.display(),
                    original = %original.display(),
                    "Duplicate found"
                );
                run.push(DuplicateEntry {
                    path: file.clone(),
                    original: original.clone(),
                });
            } else {
                debug!(path = %file.display(), "File matches its own registration");
            }
            return Ok((
                Classification::Duplicate {
                    original,
                    self_match,
                },
                from_cache,
            ));
        }

        match self.store.add_or_update(&file, fingerprint.as_str()) {
            Ok(()) => {
                debug!(path = %file.display(), hash = %fingerprint, "Registered");
                Ok((Classification::New, from_cache))
            }
            Err(e @ StoreError::NotFound { .. }) => {
                warn!(path = %file.display(), error = %e, "File vanished before registration");
                Ok((
                    Classification::Unclassifiable {
                        reason: e.to_string(),
                    },
                    from_cache,
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Check a file that is about to be imported to `destination`.
    ///
    /// Nothing is registered; call `register` with the returned fingerprint
    /// once the copy is in place.
    pub fn classify_incoming(
        &self,
        source: &Path,
        destination: &Path,
    ) -> Result<IncomingClassification, MediaVaultError> {
        let destination = absolutize(destination);
        if self.is_excluded_directory_of(&destination) {
            debug!(
                destination = %destination.display(),
                "Destination is excluded, skipping duplicate check"
            );
            return Ok(IncomingClassification::Excluded);
        }

        let fingerprint = match self.fingerprinter.compute(source) {
            Ok(fingerprint) => fingerprint,
            Err(e) => {
                warn!(path = %source.display(), error = %e, "Cannot fingerprint incoming file");
                return Ok(IncomingClassification::Unclassifiable {
                    reason: e.to_string(),
                });
            }
        };

        match self.registered_original(&absolutize(source), &fingerprint)? {
            Some(original) => Ok(IncomingClassification::Duplicate { original }),
            None => Ok(IncomingClassification::Unique(fingerprint)),
        }
    }

    /// Record `path` under a fingerprint computed earlier
    pub fn register(&self, path: &Path, fingerprint: &Fingerprint) -> Result<(), MediaVaultError> {
        let path = absolutize(path);
        self.store.add_or_update(&path, fingerprint.as_str())?;
        debug!(path = %path.display(), hash = %fingerprint, "Registered");
        Ok(())
    }

    /// Archive or delete every duplicate in `run`
    pub fn dispose(&self, run: &DuplicateRun) -> Result<DisposalReport, MediaVaultError> {
        self.dispose_with_events(run, &null_sender())
    }

    pub fn dispose_with_events(
        &self,
        run: &DuplicateRun,
        events: &EventSender,
    ) -> Result<DisposalReport, MediaVaultError> {
        let report = dispose_run(
            run,
            self.archive_directory().as_deref(),
            self.store(),
            events,
        )?;
        Ok(report)
    }

    fn is_excluded_directory_of(&self, file: &Path) -> bool {
        file.parent()
            .is_some_and(|directory| self.exclusions.is_excluded(directory))
    }

    /// Registered path carrying `fingerprint`, preferring one other than `file`
    fn registered_original(
        &self,
        file: &Path,
        fingerprint: &Fingerprint,
    ) -> Result<Option<PathBuf>, StoreError> {
        if !self.store.hash_exists(fingerprint.as_str())? {
            return Ok(None);
        }

        let paths = self.store.paths_with_hash(fingerprint.as_str())?;
        let original = paths
            .iter()
            .find(|p| p.as_path() != file)
            .or_else(|| paths.first())
            .cloned()
            .unwrap_or_else(|| file.to_path_buf());

        Ok(Some(original))
    }
}

fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}
