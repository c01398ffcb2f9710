// Reframe lifecycle scenarios

use super::*;
use crate::catalog::CatalogEvent;
use crate::reframe::template::REFRAME_TEMPLATE;
use std::path::Path;
use tempfile::TempDir;

/// Working directory with one video and the given reframe names.
fn setup(reframes: &[&str]) -> (TempDir, Catalog) {
    let tmp = TempDir::new().unwrap();
    std::fs::write(tmp.path().join("GOPR0001.360"), b"video bytes").unwrap();
    for name in reframes {
        let file = tmp.path().join(compose_file_name("GOPR0001", name));
        std::fs::write(file, format!("data for {}", name)).unwrap();
    }
    let mut catalog = Catalog::open(tmp.path()).unwrap();
    catalog.take_events();
    (tmp, catalog)
}

fn dir_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_validate_name() {
    assert!(validate_name("Take 1"));
    assert!(validate_name(&"x".repeat(50)));
    assert!(!validate_name(&"x".repeat(51)));
    assert!(!validate_name(""));
    for c in ['/', '\\', '.', '@', '"', '\'', '~', '|', '$', '%', '*', '?'] {
        assert!(!validate_name(&format!("bad{}name", c)), "accepted '{}'", c);
    }
    // Length counts characters, not bytes
    assert!(validate_name(&"ä".repeat(50)));
}

#[test]
fn test_compose_file_name() {
    assert_eq!(compose_file_name("GOPR0001", "Take 1"), "GOPR0001.Take 1.reframe");
}

#[test]
fn test_create_writes_template() {
    let (tmp, mut catalog) = setup(&[]);

    let record = create(&mut catalog, "GOPR0001", "Take 1").unwrap();
    assert_eq!(record.reframe_name(), "Take 1");
    assert_eq!(std::fs::read(tmp.path().join("GOPR0001.Take 1.reframe")).unwrap(), REFRAME_TEMPLATE);
    assert_eq!(record.file.size, REFRAME_TEMPLATE.len() as u64);

    let video = catalog.video("GOPR0001").unwrap();
    assert_eq!(video.reframes.len(), 1);

    let events = catalog.take_events();
    assert_eq!(events, vec![CatalogEvent::ReframeAdded {
        base_name: "GOPR0001".to_string(),
        reframe_name: "Take 1".to_string(),
    }]);
}

#[test]
fn test_create_existing_name_fails_without_changes() {
    let (tmp, mut catalog) = setup(&["Take 1"]);
    let before = dir_names(tmp.path());
    let content_before = std::fs::read(tmp.path().join("GOPR0001.Take 1.reframe")).unwrap();

    let err = create(&mut catalog, "GOPR0001", "Take 1").unwrap_err();
    assert!(matches!(err, ReframeError::FileAlreadyExists(_)));
    assert_eq!(dir_names(tmp.path()), before);
    assert_eq!(std::fs::read(tmp.path().join("GOPR0001.Take 1.reframe")).unwrap(), content_before);
    assert_eq!(catalog.video("GOPR0001").unwrap().reframes.len(), 1);
}

#[test]
fn test_create_detects_out_of_band_file() {
    let (tmp, mut catalog) = setup(&[]);
    // Written after the scan, unknown to the catalog
    std::fs::write(tmp.path().join("GOPR0001.Late.reframe"), b"x").unwrap();

    let err = create(&mut catalog, "GOPR0001", "Late").unwrap_err();
    assert!(matches!(err, ReframeError::FileAlreadyExists(_)));
}

#[test]
fn test_create_invalid_name() {
    let (tmp, mut catalog) = setup(&[]);
    let err = create(&mut catalog, "GOPR0001", "a.b").unwrap_err();
    assert!(matches!(err, ReframeError::InvalidName(_)));
    assert_eq!(dir_names(tmp.path()), vec!["GOPR0001.360"]);
}

#[test]
fn test_create_for_unknown_video() {
    let (_tmp, mut catalog) = setup(&[]);
    let err = create(&mut catalog, "GOPR9999", "Take 1").unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));
}

#[test]
fn test_automatic_name_skips_taken() {
    let (_tmp, catalog) = setup(&["Unknown 1", "Unknown 2", "Unknown 3"]);
    let path = new_automatic_path(&catalog, "GOPR0001", "Unknown").unwrap();
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "GOPR0001.Unknown 4.reframe");
}

#[test]
fn test_automatic_name_fills_gap() {
    let (_tmp, catalog) = setup(&["Unknown 1", "Unknown 3"]);
    let path = new_automatic_path(&catalog, "GOPR0001", "Unknown").unwrap();
    assert_eq!(path.file_name().unwrap().to_str().unwrap(), "GOPR0001.Unknown 2.reframe");
}

#[test]
fn test_create_automatic() {
    let (tmp, mut catalog) = setup(&["Unknown 1"]);
    let record = create_automatic(&mut catalog, "GOPR0001", "Unknown").unwrap();
    assert_eq!(record.reframe_name(), "Unknown 2");
    assert!(tmp.path().join("GOPR0001.Unknown 2.reframe").exists());
}

#[test]
fn test_copy_then_delete_matches_rename() {
    let (tmp, mut catalog) = setup(&["Original"]);
    let original_bytes = std::fs::read(tmp.path().join("GOPR0001.Original.reframe")).unwrap();

    copy(&mut catalog, "GOPR0001", "Original", "Renamed").unwrap();
    assert!(tmp.path().join("GOPR0001.Original.reframe").exists());
    delete(&mut catalog, "GOPR0001", "Original").unwrap();

    assert!(!tmp.path().join("GOPR0001.Original.reframe").exists());
    assert_eq!(std::fs::read(tmp.path().join("GOPR0001.Renamed.reframe")).unwrap(), original_bytes);

    let names: Vec<&str> = catalog.video("GOPR0001").unwrap().reframes.iter().map(|r| r.reframe_name()).collect();
    assert_eq!(names, vec!["Renamed"]);
}

#[test]
fn test_rename_is_a_move_and_keeps_position() {
    let (tmp, mut catalog) = setup(&["A", "B", "C"]);
    let order_before: Vec<String> = catalog.video("GOPR0001").unwrap().reframes.iter()
        .map(|r| r.reframe_name().to_string()).collect();
    let bytes = std::fs::read(tmp.path().join("GOPR0001.B.reframe")).unwrap();

    let record = rename(&mut catalog, "GOPR0001", "B", "Bee").unwrap();
    assert_eq!(record.reframe_name(), "Bee");
    assert!(!tmp.path().join("GOPR0001.B.reframe").exists());
    assert_eq!(std::fs::read(tmp.path().join("GOPR0001.Bee.reframe")).unwrap(), bytes);

    let order_after: Vec<String> = catalog.video("GOPR0001").unwrap().reframes.iter()
        .map(|r| r.reframe_name().to_string()).collect();
    let expected: Vec<String> = order_before.iter()
        .map(|n| if n == "B" { "Bee".to_string() } else { n.clone() })
        .collect();
    assert_eq!(order_after, expected);

    let events = catalog.take_events();
    assert_eq!(events, vec![CatalogEvent::ReframeUpdated {
        base_name: "GOPR0001".to_string(),
        old_reframe_name: "B".to_string(),
        reframe_name: "Bee".to_string(),
    }]);
}

#[test]
fn test_rename_to_taken_name_leaves_both() {
    let (tmp, mut catalog) = setup(&["A", "B"]);
    let err = rename(&mut catalog, "GOPR0001", "A", "B").unwrap_err();
    assert!(matches!(err, ReframeError::FileAlreadyExists(_)));
    assert!(tmp.path().join("GOPR0001.A.reframe").exists());
    assert!(tmp.path().join("GOPR0001.B.reframe").exists());
}

#[test]
fn test_delete_missing_file_reports_mismatch() {
    let (tmp, mut catalog) = setup(&["Gone"]);
    std::fs::remove_file(tmp.path().join("GOPR0001.Gone.reframe")).unwrap();

    let err = delete(&mut catalog, "GOPR0001", "Gone").unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));
    // Record stays until the host rescans
    assert!(catalog.video("GOPR0001").unwrap().has_reframe("Gone"));
}

#[test]
fn test_delete_unknown_reframe() {
    let (_tmp, mut catalog) = setup(&[]);
    let err = delete(&mut catalog, "GOPR0001", "Nope").unwrap_err();
    assert!(matches!(err, ReframeError::FileMissing(_)));
}
