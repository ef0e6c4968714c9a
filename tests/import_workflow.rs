//! Integration tests for importing a backup export into a library.

use assert_fs::prelude::*;
use image::{ImageBuffer, Rgb, RgbImage};
use media_vault::core::engine::{ArchiveConfig, DuplicateDetector};
use media_vault::core::import::{ImportOptions, MediaImporter};
use media_vault::core::store::{HashStore, SqliteHashStore};
use predicates::prelude::*;
use std::fs;
use std::path::Path;

/// 2023-07-04 10:15:00 UTC
const TAKEN: &str = r#"{"title": "IMG_0001.jpg", "photoTakenTime": {"timestamp": "1688465700", "formatted": "Jul 4, 2023"}}"#;

fn gradient() -> RgbImage {
    ImageBuffer::from_fn(120, 80, |x, y| Rgb([(x * 2) as u8, (y * 3) as u8, 64]))
}

fn write_jpeg(path: &Path, image: &RgbImage) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    image.save(path).unwrap();
}

fn detector(library: &Path, archive: ArchiveConfig) -> DuplicateDetector {
    let store = SqliteHashStore::open(&library.join("media.db")).unwrap();
    let mut detector = DuplicateDetector::builder(library)
        .store(Box::new(store))
        .archive(archive)
        .build();
    fs::create_dir_all(library.join("unsorted")).unwrap();
    detector.exclude_directories(["unsorted"]).unwrap();
    detector
}

#[test]
fn dated_photo_lands_in_its_year_with_sidecar() {
    let export = assert_fs::TempDir::new().unwrap();
    let library = assert_fs::TempDir::new().unwrap();
    write_jpeg(&export.path().join("IMG_0001.jpg"), &gradient());
    export.child("IMG_0001.jpg.json").write_str(TAKEN).unwrap();
    let detector = detector(library.path(), ArchiveConfig::default());

    let summary = MediaImporter::new(&detector, ImportOptions::default())
        .run(export.path())
        .unwrap();

    assert_eq!(summary.images_found, 1);
    assert_eq!(summary.images_imported, 1);
    assert!(summary.failures.is_empty());
    let landed = library.child("2023/20230704_101500.jpg");
    landed.assert(predicate::path::exists());
    library
        .child("2023/_json/20230704_101500.json")
        .assert(predicate::str::contains("photoTakenTime"));
    assert!(detector.store().get_hash(landed.path()).unwrap().is_some());
    export
        .child("IMG_0001.jpg")
        .assert(predicate::path::exists());
}

#[test]
fn undated_media_goes_to_unsorted_unregistered() {
    let export = assert_fs::TempDir::new().unwrap();
    let library = assert_fs::TempDir::new().unwrap();
    write_jpeg(&export.path().join("scan.jpg"), &gradient());
    export.child("clip.mov").write_binary(b"not really a movie").unwrap();
    let detector = detector(library.path(), ArchiveConfig::default());

    let summary = MediaImporter::new(&detector, ImportOptions::default())
        .run(export.path())
        .unwrap();

    assert_eq!(summary.images_imported, 1);
    assert_eq!(summary.videos_imported, 1);
    assert_eq!(summary.unsorted, 2);
    library
        .child("unsorted/scan.jpg")
        .assert(predicate::path::exists());
    library
        .child("unsorted/clip.mov")
        .assert(predicate::path::exists());
    assert_eq!(detector.store().record_count().unwrap(), 0);
}

#[test]
fn importing_the_same_export_twice_skips_duplicates() {
    let export = assert_fs::TempDir::new().unwrap();
    let library = assert_fs::TempDir::new().unwrap();
    write_jpeg(&export.path().join("IMG_0001.jpg"), &gradient());
    export.child("IMG_0001.jpg.json").write_str(TAKEN).unwrap();
    let detector = detector(library.path(), ArchiveConfig::default());
    let importer = MediaImporter::new(&detector, ImportOptions::default());

    importer.run(export.path()).unwrap();
    let second = importer.run(export.path()).unwrap();

    assert_eq!(second.images_imported, 0);
    assert_eq!(second.duplicates_skipped, 1);
    library
        .child("2023/20230704_101500-01.jpg")
        .assert(predicate::path::missing());
}

#[test]
fn duplicates_are_archived_when_archiving_is_on() {
    let export = assert_fs::TempDir::new().unwrap();
    let library = assert_fs::TempDir::new().unwrap();
    write_jpeg(&export.path().join("IMG_0001.jpg"), &gradient());
    export.child("IMG_0001.jpg.json").write_str(TAKEN).unwrap();
    let detector = detector(
        library.path(),
        ArchiveConfig::new(true, Some("trash".into())),
    );
    let importer = MediaImporter::new(&detector, ImportOptions::default());

    importer.run(export.path()).unwrap();
    let second = importer.run(export.path()).unwrap();

    assert_eq!(second.duplicates_archived, 1);
    library
        .child("trash")
        .assert(predicate::path::is_dir());
    let archived: Vec<_> = fs::read_dir(library.path().join("trash"))
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|x| x == "jpg"))
        .collect();
    assert_eq!(archived.len(), 1);
}

#[test]
fn delete_after_copy_empties_the_export() {
    let export = assert_fs::TempDir::new().unwrap();
    let library = assert_fs::TempDir::new().unwrap();
    write_jpeg(&export.path().join("IMG_0001.jpg"), &gradient());
    export.child("IMG_0001.jpg.json").write_str(TAKEN).unwrap();
    let detector = detector(library.path(), ArchiveConfig::default());
    let options = ImportOptions {
        delete_after_copy: true,
        ..ImportOptions::default()
    };

    let summary = MediaImporter::new(&detector, options)
        .run(export.path())
        .unwrap();

    assert_eq!(summary.images_imported, 1);
    export
        .child("IMG_0001.jpg")
        .assert(predicate::path::missing());
    export
        .child("IMG_0001.jpg.json")
        .assert(predicate::path::missing());
    library
        .child("2023/20230704_101500.jpg")
        .assert(predicate::path::exists());
}

#[test]
fn missing_export_directory_is_an_error() {
    let library = assert_fs::TempDir::new().unwrap();
    let detector = detector(library.path(), ArchiveConfig::default());

    let result = MediaImporter::new(&detector, ImportOptions::default())
        .run(&library.path().join("nope"));

    assert!(result.is_err());
}
