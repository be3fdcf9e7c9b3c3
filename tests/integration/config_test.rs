// Tests for persisted monitor settings

use std::fs;
use std::path::PathBuf;

use systatus::core::config::MonitorConfig;
use tempfile::TempDir;

#[test]
fn test_missing_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_save_and_reload() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("systatus").join("config.json");

    let mut config = MonitorConfig::default();
    config.set_smoothing_window(4).unwrap();
    config.set_system_volume(PathBuf::from("/mnt/data"));
    config.save_to(&path).unwrap();

    assert!(path.exists());

    let loaded = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(loaded.smoothing_window(), 4);
    assert_eq!(loaded.resolve_system_volume(), PathBuf::from("/mnt/data"));
}

#[test]
fn test_empty_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "  \n").unwrap();

    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_corrupt_file_gives_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let config = MonitorConfig::load_from(&path).unwrap();
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn test_saved_file_is_pretty_json() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");

    MonitorConfig::default().save_to(&path).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("\n"));
    assert!(content.contains("\"gpu_smoothing_window\": 1"));
}
