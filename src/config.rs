//! Properties file loading.
//!
//! The properties file is YAML by default (any format the `config` crate
//! recognizes by extension works). It is read once at startup into a typed
//! `AppConfig`; environment variables prefixed `MEDIA_VAULT__` override
//! individual keys, e.g. `MEDIA_VAULT__IMAGE_HANDLING__ARCHIVE=true`.

use crate::core::engine::{ArchiveConfig, DuplicateDetector};
use crate::core::store::HashStore;
use crate::core::import::{ImportOptions, UNSORTED_DIR};
use crate::core::scanner::{DEFAULT_IMAGE_EXTENSIONS, DEFAULT_VIDEO_EXTENSIONS};
use crate::error::{ConfigError, MediaVaultError};
use config::{Config, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Name of the properties file
pub const PROPERTIES_FILE: &str = "properties.yaml";

/// Environment variable naming the directory whose `.config/` holds the
/// properties file
pub const MEDIA_DB_ENV: &str = "MEDIA_DB";

const ENV_PREFIX: &str = "MEDIA_VAULT";
const DEFAULT_DB_FILE: &str = "media.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseSettings,
    #[serde(default)]
    pub image_handling: ImageHandling,
    #[serde(default)]
    pub video_handling: VideoHandling,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Root of the media library
    pub directory: PathBuf,
    /// Hash database, `<directory>/media.db` when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageHandling {
    #[serde(default)]
    pub archive: bool,
    #[serde(default)]
    pub delete_after_copy: bool,
    /// Archive directory for duplicates, relative to the library root or absolute
    #[serde(default)]
    pub trash_directory: Option<PathBuf>,
    #[serde(default)]
    pub duplicate_detection: DuplicateDetection,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
}

impl Default for ImageHandling {
    fn default() -> Self {
        Self {
            archive: false,
            delete_after_copy: false,
            trash_directory: None,
            duplicate_detection: DuplicateDetection::default(),
            image_extensions: default_image_extensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicateDetection {
    #[serde(default = "default_true")]
    pub prevent_duplicates: bool,
    /// A single directory or a list
    #[serde(default = "default_exclusions", deserialize_with = "one_or_many")]
    pub exclusion_directories: Vec<String>,
}

impl Default for DuplicateDetection {
    fn default() -> Self {
        Self {
            prevent_duplicates: true,
            exclusion_directories: default_exclusions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoHandling {
    #[serde(default = "default_video_extensions")]
    pub video_extensions: Vec<String>,
}

impl Default for VideoHandling {
    fn default() -> Self {
        Self {
            video_extensions: default_video_extensions(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_exclusions() -> Vec<String> {
    vec![UNSORTED_DIR.to_string()]
}

fn default_image_extensions() -> Vec<String> {
    DEFAULT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn default_video_extensions() -> Vec<String> {
    DEFAULT_VIDEO_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(one) => vec![one],
        OneOrMany::Many(many) => many,
    })
}

impl AppConfig {
    /// Locate and load the properties file.
    ///
    /// `explicit` wins; otherwise `$MEDIA_DB/.config/properties.yaml`, then
    /// the platform config directory.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let path = resolve_path(
            explicit,
            std::env::var_os(MEDIA_DB_ENV),
            dirs::config_dir(),
        )?;
        let config = Self::from_file(&path)?;
        Ok((config, path))
    }

    /// Load a specific properties file plus environment overrides
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::Missing {
                path: path.to_path_buf(),
            });
        }

        let invalid = |e: config::ConfigError| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        };

        let settings = Config::builder()
            .add_source(ConfigFile::from(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(invalid)?;

        let config: AppConfig = settings.try_deserialize().map_err(invalid)?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        if self.database.directory.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "database.directory must be set".to_string(),
            });
        }
        if self
            .image_handling
            .duplicate_detection
            .exclusion_directories
            .iter()
            .any(|d| d.trim().is_empty())
        {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "exclusion_directories must not contain empty entries".to_string(),
            });
        }
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.database.directory
    }

    pub fn db_path(&self) -> PathBuf {
        self.database
            .db_path
            .clone()
            .unwrap_or_else(|| self.database.directory.join(DEFAULT_DB_FILE))
    }

    pub fn archive(&self) -> ArchiveConfig {
        ArchiveConfig::new(
            self.image_handling.archive,
            self.image_handling.trash_directory.clone(),
        )
    }

    pub fn exclusion_directories(&self) -> &[String] {
        &self.image_handling.duplicate_detection.exclusion_directories
    }

    /// Detector over the library root with the configured exclusions
    pub fn detector(
        &self,
        store: Box<dyn HashStore>,
        force_recompute: bool,
    ) -> Result<DuplicateDetector, MediaVaultError> {
        let mut detector = DuplicateDetector::builder(self.root())
            .extensions(&self.image_handling.image_extensions)
            .archive(self.archive())
            .store(store)
            .force_recompute(force_recompute)
            .build();
        detector.exclude_directories(self.exclusion_directories())?;
        Ok(detector)
    }

    pub fn import_options(&self) -> ImportOptions {
        ImportOptions {
            delete_after_copy: self.image_handling.delete_after_copy,
            prevent_duplicates: self.image_handling.duplicate_detection.prevent_duplicates,
            image_extensions: self.image_handling.image_extensions.clone(),
            video_extensions: self.video_handling.video_extensions.clone(),
            ..ImportOptions::default()
        }
    }
}

/// Pick the properties file location
pub fn resolve_path(
    explicit: Option<&Path>,
    media_db: Option<OsString>,
    config_dir: Option<PathBuf>,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    if let Some(media_db) = media_db.filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(media_db).join(".config").join(PROPERTIES_FILE));
    }

    config_dir
        .map(|dir| dir.join("media-vault").join(PROPERTIES_FILE))
        .ok_or(ConfigError::NoLocation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::InMemoryHashStore;
    use std::fs;
    use tempfile::TempDir;

    fn write_properties(dir: &Path, contents: &str) -> PathBuf {
        let path = dir.join(PROPERTIES_FILE);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn minimal_file_gets_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_properties(temp_dir.path(), "database:\n  directory: /srv/media\n");

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.root(), Path::new("/srv/media"));
        assert_eq!(config.db_path(), PathBuf::from("/srv/media/media.db"));
        assert!(config.image_handling.duplicate_detection.prevent_duplicates);
        assert_eq!(config.exclusion_directories(), ["unsorted"]);
        assert!(!config.archive().is_active());
        assert!(config.image_handling.image_extensions.contains(&".JPG".to_string()));
        assert!(config.video_handling.video_extensions.contains(&".mov".to_string()));
    }

    #[test]
    fn full_file_is_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_properties(
            temp_dir.path(),
            r#"
database:
  directory: /srv/media
  db_path: /srv/db/hashes.db
image_handling:
  archive: true
  delete_after_copy: true
  trash_directory: trash
  duplicate_detection:
    prevent_duplicates: false
    exclusion_directories:
      - unsorted
      - scans
"#,
        );

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.db_path(), PathBuf::from("/srv/db/hashes.db"));
        assert_eq!(config.archive().target(), Some(Path::new("trash")));
        assert_eq!(config.exclusion_directories(), ["unsorted", "scans"]);
        let options = config.import_options();
        assert!(options.delete_after_copy);
        assert!(!options.prevent_duplicates);
    }

    #[test]
    fn single_exclusion_directory_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_properties(
            temp_dir.path(),
            "database:\n  directory: /srv/media\nimage_handling:\n  duplicate_detection:\n    exclusion_directories: unsorted\n",
        );

        let config = AppConfig::from_file(&path).unwrap();

        assert_eq!(config.exclusion_directories(), ["unsorted"]);
    }

    #[test]
    fn missing_file_is_reported() {
        let temp_dir = TempDir::new().unwrap();

        let result = AppConfig::from_file(&temp_dir.path().join(PROPERTIES_FILE));

        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn missing_directory_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let path = write_properties(temp_dir.path(), "image_handling:\n  archive: true\n");

        let result = AppConfig::from_file(&path);

        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn detector_excludes_configured_directories() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("library");
        fs::create_dir_all(root.join("unsorted")).unwrap();
        let path = write_properties(
            temp_dir.path(),
            &format!("database:\n  directory: {}\n", root.display()),
        );
        let config = AppConfig::from_file(&path).unwrap();

        let detector = config
            .detector(Box::new(InMemoryHashStore::new()), false)
            .unwrap();

        assert_eq!(detector.exclusions().len(), 1);
        assert!(detector.exclusions().is_excluded(&root.join("unsorted")));
    }

    #[test]
    fn resolve_prefers_explicit_then_media_db() {
        let explicit = resolve_path(
            Some(Path::new("/etc/vault.yaml")),
            Some("/srv/media".into()),
            None,
        )
        .unwrap();
        assert_eq!(explicit, PathBuf::from("/etc/vault.yaml"));

        let from_env = resolve_path(None, Some("/srv/media".into()), Some("/home/u/.config".into()))
            .unwrap();
        assert_eq!(from_env, PathBuf::from("/srv/media/.config/properties.yaml"));

        let fallback = resolve_path(None, None, Some("/home/u/.config".into())).unwrap();
        assert_eq!(
            fallback,
            PathBuf::from("/home/u/.config/media-vault/properties.yaml")
        );

        assert!(matches!(
            resolve_path(None, None, None),
            Err(ConfigError::NoLocation)
        ));
    }
}
