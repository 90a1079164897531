use std::fs;
use std::time::Duration;

use taskboard::config::{Config, CONFIG_FILE};
use taskboard::ids::IdStrategy;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = Config::load_from_dir(dir.path());

    assert_eq!(config.storage.key, "task-manager-state");
    assert_eq!(config.storage.lock_timeout_ms, 5000);
    assert_eq!(config.source.path.to_str(), Some("tasks.json"));
    assert_eq!(config.source.delay(), Duration::from_millis(500));
    assert_eq!(config.tasks.id_strategy, IdStrategy::Ulid);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let toml = r#"
[storage]
key = "team-board"

[source]
path = "/srv/tasks.json"
delay_ms = 0

[tasks]
id_strategy = "sequential"
"#;
    fs::write(dir.path().join(CONFIG_FILE), toml)?;

    let config = Config::load_from_dir(dir.path());

    assert_eq!(config.storage.key, "team-board");
    assert_eq!(config.storage.lock_timeout_ms, 5000);
    assert_eq!(
        config.source.resolve_path(dir.path()).to_str(),
        Some("/srv/tasks.json")
    );
    assert!(config.source.delay().is_zero());
    assert_eq!(config.tasks.id_strategy, IdStrategy::Sequential);
    Ok(())
}

#[test]
fn invalid_config_falls_back_to_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);

    fs::write(&path, "[tasks]\nid_strategy = \"random\"\n")?;
    assert!(Config::load(&path).is_err());
    assert_eq!(Config::load_from_dir(dir.path()).tasks.id_strategy, IdStrategy::Ulid);

    fs::write(&path, "[storage]\nkey = \"\"\n")?;
    assert!(Config::load(&path).is_err());
    assert_eq!(Config::load_from_dir(dir.path()).storage.key, "task-manager-state");
    Ok(())
}

#[test]
fn saved_config_loads_back() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(CONFIG_FILE);
    let mut config = Config::default();
    config.source.delay_ms = 25;
    config.tasks.id_strategy = IdStrategy::Sequential;
    config.save(&path)?;

    let loaded = Config::load(&path)?;
    assert_eq!(loaded.source.delay_ms, 25);
    assert_eq!(loaded.tasks.id_strategy, IdStrategy::Sequential);
    Ok(())
}
