//! Configuration loading: JSON file, defaults and environment overrides.

use super::common::{clear_env, write_config, ENV_MUTEX};
use std::path::PathBuf;
use tempfile::tempdir;
use updatecache::config::{Config, ConfigError};
use updatecache::pipeline::Grouping;

#[test]
fn test_load_full_document() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{
            "redis": { "host": "cache.internal", "port": 6380, "db": 2, "timeout_ms": 1000 },
            "database": { "path": "/srv/statements.db", "busy_timeout_ms": 250 },
            "grouping": "buffered"
        }"#,
    );

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.redis.host, "cache.internal");
    assert_eq!(config.redis.port, 6380);
    assert_eq!(config.redis.db, 2);
    assert_eq!(config.redis.timeout_ms, 1000);
    assert_eq!(config.database.path, PathBuf::from("/srv/statements.db"));
    assert_eq!(config.database.busy_timeout_ms, 250);
    assert_eq!(config.grouping, Grouping::Buffered);
}

#[test]
fn test_missing_sections_use_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), r#"{ "database": { "path": "s.db" } }"#);

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.redis.host, "127.0.0.1");
    assert_eq!(config.redis.port, 6379);
    assert_eq!(config.redis.db, 0);
    assert_eq!(config.grouping, Grouping::Adjacent);
}

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "redis": { "port": 6380 }, "database": { "path": "s.db" } }"#,
    );

    std::env::set_var("UPDATECACHE_REDIS__PORT", "7000");
    std::env::set_var("UPDATECACHE_DATABASE__PATH", "/override.db");
    let config = Config::load_from_path(&path);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.redis.port, 7000);
    assert_eq!(config.database.path, PathBuf::from("/override.db"));
}

#[test]
fn test_missing_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let err = Config::load_from_path(&dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_malformed_json() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), r#"{ "redis": { "port": "#);

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Extract(_)));
}

#[test]
fn test_wrong_type_rejected() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(
        dir.path(),
        r#"{ "redis": { "port": "not a port" }, "database": { "path": "s.db" } }"#,
    );

    assert!(matches!(
        Config::load_from_path(&path),
        Err(ConfigError::Extract(_))
    ));
}

#[test]
fn test_database_path_required() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = write_config(dir.path(), r#"{ "redis": { "host": "localhost" } }"#);

    let err = Config::load_from_path(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("database.path"));
}
