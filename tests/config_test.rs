use colrs::config::{global_config, set_global_config};
use colrs::series::ConstructOptions;
use colrs::{EngineConfig, Error};
use tempfile::tempdir;

#[test]
fn test_yaml_and_toml_files() {
    let dir = tempdir().unwrap();
    let mut config = EngineConfig::default();
    config.threading.worker_threads = 3;
    config.construction.nan_to_null = true;

    let yaml = dir.path().join("colrs.yaml");
    config.save_to_file(&yaml).unwrap();
    assert_eq!(EngineConfig::from_file(&yaml).unwrap(), config);

    let toml = dir.path().join("colrs.toml");
    config.save_to_file(&toml).unwrap();
    assert_eq!(EngineConfig::from_file(&toml).unwrap(), config);
}

#[test]
fn test_unsupported_and_missing_files() {
    let dir = tempdir().unwrap();
    let ini = dir.path().join("colrs.ini");
    std::fs::write(&ini, "threads=2").unwrap();
    assert!(matches!(EngineConfig::from_file(&ini), Err(Error::Config(_))));
    assert!(matches!(
        EngineConfig::from_file(dir.path().join("absent.yaml")),
        Err(Error::Config(_))
    ));
}

#[test]
fn test_environment_overrides_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("colrs.toml");
    std::fs::write(&path, "[threading]\nparallel_min_len = 10\n").unwrap();

    std::env::set_var("COLRS_PARALLEL_MIN_LEN", "20");
    let config = EngineConfig::load_with_precedence(Some(&path));
    std::env::remove_var("COLRS_PARALLEL_MIN_LEN");

    assert_eq!(config.unwrap().threading.parallel_min_len, 20);
}

#[test]
fn test_invalid_values_rejected() {
    let config = EngineConfig::from_yaml("logging:\n  level: chatty\n").unwrap();
    assert!(config.validate().is_err());
    assert!(set_global_config(config).is_err());
}

#[test]
fn test_global_config_feeds_construction_defaults() {
    let original = global_config();
    let mut config = original.clone();
    config.construction.strict = false;
    set_global_config(config).unwrap();
    assert!(!ConstructOptions::default().strict);
    set_global_config(original).unwrap();
    assert!(ConstructOptions::default().strict);
}
