//! Store-backed fingerprint cache.
//!
//! The hash store doubles as a cache keyed by path: if a record exists for
//! the exact path, its hash is reused and the file is not decoded. Under
//! `CachePolicy::TrustPath` a file modified in place keeps returning its old
//! hash; `CheckMtime` compares the stored mtime first, and `force_recompute`
//! skips the lookup entirely.

use super::traits::{Fingerprint, HashAlgorithm};
use crate::core::store::{file_mtime, HashStore};
use crate::error::{HashError, MediaVaultError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// When a stored hash may stand in for recomputation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Any record for the path is reused, even if the file changed since
    #[default]
    TrustPath,
    /// Reuse only when the stored mtime matches the file's current mtime
    CheckMtime,
}

/// A fingerprint plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprinted {
    pub fingerprint: Fingerprint,
    pub from_cache: bool,
}

/// Wraps an algorithm with the path cache
pub struct CachedFingerprinter {
    algorithm: Box<dyn HashAlgorithm>,
    policy: CachePolicy,
    force_recompute: bool,
}

impl CachedFingerprinter {
    pub fn new(algorithm: Box<dyn HashAlgorithm>) -> Self {
        Self {
            algorithm,
            policy: CachePolicy::default(),
            force_recompute: false,
        }
    }

    pub fn policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ignore stored hashes and always decode
    pub fn force_recompute(mut self, force: bool) -> Self {
        self.force_recompute = force;
        self
    }

    pub fn algorithm_name(&self) -> &'static str {
        self.algorithm.name()
    }

    /// Fingerprint without consulting any store
    pub fn compute(&self, path: &Path) -> Result<Fingerprint, HashError> {
        self.algorithm.hash_file(path)
    }

    /// Fingerprint `path`, consulting `store` first.
    ///
    /// Decode failures come back as `MediaVaultError::Hash`; store failures
    /// as `MediaVaultError::Store`.
    pub fn fingerprint(
        &self,
        path: &Path,
        store: &dyn HashStore,
    ) -> Result<Fingerprinted, MediaVaultError> {
        if !self.force_recompute {
            if let Some(record) = store.get_record(path)? {
                let fresh = match self.policy {
                    CachePolicy::TrustPath => true,
                    CachePolicy::CheckMtime => file_mtime(path)
                        .map(|mtime| (mtime - record.mtime).abs() < 1e-6)
                        .unwrap_or(false),
                };

                if fresh {
                    debug!(path = %path.display(), "Fingerprint cache hit");
                    return Ok(Fingerprinted {
                        fingerprint: Fingerprint::from_stored(record.hash),
                        from_cache: true,
                    });
                }
            }
        }

        let fingerprint = self.compute(path)?;
        Ok(Fingerprinted {
            fingerprint,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemoryHashStore;
    use image::DynamicImage;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Hashes file bytes instead of pixels and counts invocations
    struct CountingHasher {
        calls: Arc<AtomicUsize>,
    }

    impl HashAlgorithm for CountingHasher {
        fn hash_image(&self, _image: &DynamicImage) -> Result<Fingerprint, HashError> {
            unreachable!("hash_file is overridden")
        }

        fn hash_file(&self, path: &Path) -> Result<Fingerprint, HashError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let bytes = fs::read(path).map_err(|e| HashError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Fingerprint::from_bytes(&bytes))
        }

        fn name(&self) -> &'static str {
            "bytes"
        }
    }

    fn setup() -> (TempDir, Arc<AtomicUsize>, CachedFingerprinter) {
        let temp_dir = TempDir::new().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let fingerprinter = CachedFingerprinter::new(Box::new(CountingHasher {
            calls: Arc::clone(&calls),
        }));
        (temp_dir, calls, fingerprinter)
    }

    #[test]
    fn miss_computes_hash() {
        let (temp_dir, calls, fingerprinter) = setup();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, [0xAB]).unwrap();
        let store = InMemoryHashStore::new();

        let result = fingerprinter.fingerprint(&path, &store).unwrap();

        assert_eq!(result.fingerprint.as_str(), "ab");
        assert!(!result.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hit_reuses_stored_hash_without_decoding() {
        let (temp_dir, calls, fingerprinter) = setup();
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, [0xAB]).unwrap();
        let store = InMemoryHashStore::new();
        store.add_or_update(&path, "cafe").unwrap();

        let result = fingerprinter.fingerprint(&path, &store).unwrap();

        assert_eq!(result.fingerprint.as_str(), "cafe");
        assert!(result.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn force_recompute_bypasses_store() {
        let (temp_dir, calls, fingerprinter) = setup();
        let fingerprinter = fingerprinter.force_recompute(true);
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, [0xAB]).unwrap();
        let store = InMemoryHashStore::new();
        store.add_or_update(&path, "cafe").unwrap();

        let result = fingerprinter.fingerprint(&path, &store).unwrap();

        assert_eq!(result.fingerprint.as_str(), "ab");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn check_mtime_rejects_modified_file() {
        let (temp_dir, _calls, fingerprinter) = setup();
        let fingerprinter = fingerprinter.policy(CachePolicy::CheckMtime);
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, [0xAB]).unwrap();
        let store = InMemoryHashStore::new();
        store.add_or_update(&path, "cafe").unwrap();

        let file = fs::OpenOptions::new().write(true).open(&path).unwrap();
        file.set_modified(std::time::UNIX_EPOCH + std::time::Duration::from_secs(86_400))
            .unwrap();
        drop(file);

        let result = fingerprinter.fingerprint(&path, &store).unwrap();

        assert_eq!(result.fingerprint.as_str(), "ab");
        assert!(!result.from_cache);
    }

    #[test]
    fn check_mtime_accepts_unchanged_file() {
        let (temp_dir, calls, fingerprinter) = setup();
        let fingerprinter = fingerprinter.policy(CachePolicy::CheckMtime);
        let path = temp_dir.path().join("a.jpg");
        fs::write(&path, [0xAB]).unwrap();
        let store = InMemoryHashStore::new();
        store.add_or_update(&path, "cafe").unwrap();

        let result = fingerprinter.fingerprint(&path, &store).unwrap();

        assert!(result.from_cache);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
