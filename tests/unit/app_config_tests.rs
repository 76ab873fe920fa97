/*!
 * Tests for application configuration functionality
 */

use std::path::PathBuf;

use annograph::app_config::{Config, LogLevel};
use annograph::database::JournalMode;

use crate::common::create_temp_dir;

/// Test default configuration values
#[test]
fn test_default_config_withNoParameters_shouldHaveCorrectDefaults() {
    let config = Config::default();

    assert_eq!(config.log_level, LogLevel::Info);
    assert_eq!(config.database.path, None);
    assert_eq!(config.database.journal_mode, JournalMode::Wal);
    assert!(config.validate().is_ok());
}

#[test]
fn test_save_thenFromFile_shouldRestoreConfig() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    let mut config = Config::default();
    config.log_level = LogLevel::Trace;
    config.database.path = Some(PathBuf::from("/var/lib/annograph/packages.db"));
    config.database.journal_mode = JournalMode::Memory;

    config.save(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();

    assert_eq!(loaded, config);
}

#[test]
fn test_loadOrDefault_withMissingFile_shouldWriteDefaults() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");

    let config = Config::load_or_default(&path).unwrap();

    assert_eq!(config, Config::default());
    assert!(path.exists());
    assert_eq!(Config::from_file(&path).unwrap(), config);
}

#[test]
fn test_fromFile_withInvalidJson_shouldFailWithContext() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, "{ not json").unwrap();

    let error = Config::from_file(&path).unwrap_err();

    assert!(error.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_fromFile_withUnknownJournalMode_shouldFail() {
    let dir = create_temp_dir().unwrap();
    let path = dir.path().join("conf.json");
    std::fs::write(&path, r#"{"database": {"journal_mode": "truncate"}}"#).unwrap();

    assert!(Config::from_file(&path).is_err());
}

#[test]
fn test_databasePath_shouldPreferConfiguredPath() {
    let mut config = Config::default();
    let configured = PathBuf::from("/tmp/packages.db");
    config.database.path = Some(configured.clone());

    assert_eq!(config.database_path().unwrap(), configured);
}
